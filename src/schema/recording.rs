//! Recording types: an ordered frame sequence plus session metadata.

use serde::{Deserialize, Serialize};

use super::Frame;

/// Recording file version this build reads and writes.
pub const RECORDING_VERSION: u32 = 1;

/// Model id used when the visualization has no model loaded.
pub const UNKNOWN_MODEL: &str = "unknown";

/// A complete, validated recording.
///
/// Construct through [`Recording::new`] or [`RecordingDocument::into_recording`];
/// both enforce the timing invariants, so a `Recording` in hand always has at
/// least one frame, starts at 0 ms, never goes back in time and lasts at least
/// as long as its final frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    version: u32,
    model_id: String,
    prompt: String,
    created_at: String,
    duration: u32,
    frames: Vec<Frame>,
}

impl Recording {
    /// Assemble a recording from captured frames.
    pub fn new(
        model_id: impl Into<String>,
        prompt: impl Into<String>,
        created_at: impl Into<String>,
        duration_ms: u32,
        frames: Vec<Frame>,
    ) -> Result<Self, RecordingError> {
        let recording = Self {
            version: RECORDING_VERSION,
            model_id: model_id.into(),
            prompt: prompt.into(),
            created_at: created_at.into(),
            duration: duration_ms,
            frames,
        };
        recording.validate()?;
        Ok(recording)
    }

    fn validate(&self) -> Result<(), RecordingError> {
        if self.version != RECORDING_VERSION {
            return Err(RecordingError::UnsupportedVersion(self.version));
        }
        let Some(first) = self.frames.first() else {
            return Err(RecordingError::Invalid("recording has no frames".into()));
        };
        if first.timestamp != 0 {
            return Err(RecordingError::Invalid(format!(
                "first frame starts at {} ms, expected 0",
                first.timestamp
            )));
        }
        if let Some(i) = self
            .frames
            .windows(2)
            .position(|pair| pair[1].timestamp < pair[0].timestamp)
        {
            return Err(RecordingError::Invalid(format!(
                "frame {} goes back in time ({} ms after {} ms)",
                i + 1,
                self.frames[i + 1].timestamp,
                self.frames[i].timestamp
            )));
        }
        let last = self.last_timestamp();
        if self.duration < last {
            return Err(RecordingError::Invalid(format!(
                "duration {} ms is shorter than last frame at {} ms",
                self.duration, last
            )));
        }
        Ok(())
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// ISO-8601 creation time.
    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    /// Total length in milliseconds.
    pub fn duration_ms(&self) -> u32 {
        self.duration
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Number of frames (always at least one).
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Get a frame by index.
    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// Index of the last frame.
    pub fn last_index(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    fn last_timestamp(&self) -> u32 {
        self.frames.last().map_or(0, |f| f.timestamp)
    }
}

/// Recording file as found on disk, before validation.
///
/// `version` and `frames` are optional here so that a document missing them
/// is reported as an invalid recording rather than a parse failure.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingDocument {
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub frames: Option<Vec<Frame>>,
}

impl RecordingDocument {
    /// Validate the document and turn it into a [`Recording`].
    pub fn into_recording(self) -> Result<Recording, RecordingError> {
        let version = self
            .version
            .ok_or_else(|| RecordingError::Invalid("missing version".into()))?;
        let frames = self
            .frames
            .ok_or_else(|| RecordingError::Invalid("missing frames".into()))?;
        if frames.is_empty() {
            return Err(RecordingError::Invalid("frames array is empty".into()));
        }
        let last = frames.last().map_or(0, |f| f.timestamp);

        let recording = Recording {
            version,
            model_id: self.model_id.unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
            prompt: self.prompt,
            created_at: self.created_at,
            duration: self.duration.unwrap_or(last),
            frames,
        };
        recording.validate()?;
        Ok(recording)
    }
}

/// Playback rate multiplier. Only these four rates exist.
///
/// Serializes as the bare multiplier (`0.5`, `1`, `2`, `4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "f64")]
pub enum PlaybackSpeed {
    Half,
    #[default]
    Normal,
    Double,
    Quadruple,
}

impl PlaybackSpeed {
    pub const ALL: [PlaybackSpeed; 4] = [
        PlaybackSpeed::Half,
        PlaybackSpeed::Normal,
        PlaybackSpeed::Double,
        PlaybackSpeed::Quadruple,
    ];

    /// Virtual milliseconds elapsed per wall-clock millisecond.
    pub fn multiplier(self) -> f64 {
        match self {
            PlaybackSpeed::Half => 0.5,
            PlaybackSpeed::Normal => 1.0,
            PlaybackSpeed::Double => 2.0,
            PlaybackSpeed::Quadruple => 4.0,
        }
    }

    /// Parse one of the supported multipliers.
    pub fn from_multiplier(value: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|speed| (speed.multiplier() - value).abs() < f64::EPSILON)
    }
}

impl From<PlaybackSpeed> for f64 {
    fn from(speed: PlaybackSpeed) -> f64 {
        speed.multiplier()
    }
}

impl std::fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.multiplier())
    }
}

/// A recording file was rejected. Every variant leaves the caller's state
/// untouched.
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("Invalid recording file: {0}")]
    Invalid(String),

    #[error("Invalid recording file: unsupported version {0}")]
    UnsupportedVersion(u32),

    #[error("Failed to parse recording file: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Failed to read recording file: {0}")]
    Io(#[from] std::io::Error),
}
