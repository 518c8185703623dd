//! Scan recorder: samples the live visualization into a frame sequence.

use chrono::{DateTime, SecondsFormat, Utc};

use super::clock::elapsed_ms;
use crate::schema::{Frame, Recording, RecordingError, StateSnapshot, UNKNOWN_MODEL};

/// Session metadata attached to a recording when it stops.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Model the scans were taken from.
    pub model_id: String,
    /// Prompt the scans were run against.
    pub prompt: String,
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self {
            model_id: UNKNOWN_MODEL.to_string(),
            prompt: String::new(),
        }
    }
}

/// What the recorder did with a state notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Frame appended.
    Captured,
    /// A scan is in flight; nothing captured.
    ScanInFlight,
    /// Same state as the last frame; nothing captured.
    Duplicate,
    /// Not recording.
    Idle,
}

#[derive(Debug)]
struct Session {
    start_ms: f64,
    started_at: DateTime<Utc>,
    frames: Vec<Frame>,
    was_scanning: bool,
}

/// Records visualization snapshots while active.
///
/// The visualization owner calls [`Recorder::on_state_settled`] after every
/// state change; the recorder decides whether that change becomes a frame.
///
/// ```ignore
/// let mut recorder = Recorder::new();
/// recorder.start(clock.now_ms(), Utc::now(), &snapshot);
/// // ... owner notifies on every change
/// recorder.on_state_settled(clock.now_ms(), &snapshot);
/// let recording = recorder.stop(clock.now_ms(), &info)?;
/// ```
#[derive(Debug, Default)]
pub struct Recorder {
    session: Option<Session>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a recording session is active.
    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Frames captured so far in the active session.
    pub fn frames_captured(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.frames.len())
    }

    /// Milliseconds since the active session started.
    pub fn elapsed_ms(&self, now_ms: f64) -> u32 {
        self.session
            .as_ref()
            .map_or(0, |s| elapsed_ms(s.start_ms, now_ms))
    }

    /// Begin recording, capturing `snapshot` as frame 0.
    ///
    /// Returns false (and changes nothing) if already recording.
    pub fn start(&mut self, now_ms: f64, started_at: DateTime<Utc>, snapshot: &StateSnapshot) -> bool {
        if self.session.is_some() {
            return false;
        }
        self.session = Some(Session {
            start_ms: now_ms,
            started_at,
            frames: vec![snapshot.to_frame(0)],
            was_scanning: snapshot.scan_in_progress,
        });
        log::info!("Recording started");
        true
    }

    /// Handle a state-change notification from the visualization owner.
    pub fn on_state_settled(&mut self, now_ms: f64, snapshot: &StateSnapshot) -> CaptureOutcome {
        let Some(session) = self.session.as_mut() else {
            return CaptureOutcome::Idle;
        };

        let scan_completed = session.was_scanning && !snapshot.scan_in_progress;
        session.was_scanning = snapshot.scan_in_progress;

        if snapshot.scan_in_progress {
            log::debug!("Skipping capture: scan in flight");
            return CaptureOutcome::ScanInFlight;
        }

        let last_timestamp = session.frames.last().map_or(0, |f| f.timestamp);
        let timestamp = elapsed_ms(session.start_ms, now_ms).max(last_timestamp);
        let candidate = snapshot.to_frame(timestamp);

        let duplicate = session
            .frames
            .last()
            .is_some_and(|last| last.same_state(&candidate));
        if duplicate && !scan_completed {
            return CaptureOutcome::Duplicate;
        }

        session.frames.push(candidate);
        CaptureOutcome::Captured
    }

    /// Stop recording and assemble the captured frames.
    ///
    /// Returns `Ok(None)` if no session was active.
    pub fn stop(&mut self, now_ms: f64, info: &SessionInfo) -> Result<Option<Recording>, RecordingError> {
        let Some(session) = self.session.take() else {
            return Ok(None);
        };
        if session.frames.is_empty() {
            return Ok(None);
        }

        let last_timestamp = session.frames.last().map_or(0, |f| f.timestamp);
        let duration = elapsed_ms(session.start_ms, now_ms).max(last_timestamp);
        let frame_count = session.frames.len();

        let recording = Recording::new(
            info.model_id.clone(),
            info.prompt.clone(),
            session
                .started_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            duration,
            session.frames,
        )?;

        log::info!("Recording stopped: {} frames", frame_count);
        Ok(Some(recording))
    }
}
