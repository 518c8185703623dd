//! Recording player: advances a playhead against a host-supplied clock.

use serde::Serialize;

use crate::schema::{Frame, PlaybackSpeed, Recording};

/// Wall-clock/virtual-time pair the playhead is measured from.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Anchor {
    wall_ms: f64,
    offset_ms: f64,
}

/// Player state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// At frame 0, not advancing.
    #[default]
    Stopped,
    /// Holding the current frame.
    Paused,
    /// Advancing on every tick.
    Playing,
}

/// Plays back a loaded [`Recording`].
///
/// The player owns no timer. The host calls [`Player::tick`] once per render
/// frame with its current time, and every control takes `now_ms` from the
/// same clock, so frame selection is a pure function of the timestamps fed
/// in.
///
/// ```ignore
/// let mut player = Player::new();
/// player.load(recording);
/// player.play(clock.now_ms());
/// loop {
///     player.tick(clock.now_ms());
///     draw(player.current_frame());
/// }
/// ```
#[derive(Debug, Default)]
pub struct Player {
    recording: Option<Recording>,
    current_index: usize,
    speed: PlaybackSpeed,
    state: PlaybackState,
    anchor: Option<Anchor>,
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the loaded recording and rewind.
    pub fn load(&mut self, recording: Recording) {
        self.recording = Some(recording);
        self.current_index = 0;
        self.state = PlaybackState::Stopped;
        self.anchor = None;
    }

    /// Unload the recording.
    pub fn close(&mut self) -> Option<Recording> {
        self.stop();
        self.recording.take()
    }

    pub fn recording(&self) -> Option<&Recording> {
        self.recording.as_ref()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.recording.as_ref()?.frame(self.current_index)
    }

    pub fn frame_count(&self) -> usize {
        self.recording.as_ref().map_or(0, Recording::len)
    }

    /// Timestamp of the current frame.
    pub fn position_ms(&self) -> u32 {
        self.current_frame().map_or(0, |f| f.timestamp)
    }

    /// Length of the loaded recording.
    pub fn duration_ms(&self) -> u32 {
        self.recording.as_ref().map_or(0, Recording::duration_ms)
    }

    /// Start or resume playback from the current frame.
    pub fn play(&mut self, now_ms: f64) {
        if self.recording.is_none() || self.is_playing() {
            return;
        }
        self.anchor = Some(self.anchor_at_current(now_ms));
        self.state = PlaybackState::Playing;
    }

    /// Stop advancing, keeping the current frame.
    pub fn pause(&mut self) {
        self.anchor = None;
        if self.recording.is_some() {
            self.state = PlaybackState::Paused;
        }
    }

    /// Stop advancing and rewind to frame 0.
    pub fn stop(&mut self) {
        self.anchor = None;
        self.current_index = 0;
        self.state = PlaybackState::Stopped;
    }

    /// Jump to `index`, clamped to the recording.
    pub fn seek_to(&mut self, index: usize, now_ms: f64) {
        let Some(recording) = self.recording.as_ref() else {
            return;
        };
        self.current_index = index.min(recording.last_index());
        if self.is_playing() {
            self.anchor = Some(self.anchor_at_current(now_ms));
        }
    }

    /// Change playback rate without moving the playhead.
    ///
    /// While playing, the virtual time reached so far under the old rate
    /// becomes the new anchor offset, so the next tick continues from exactly
    /// where the old rate left off.
    pub fn set_speed(&mut self, speed: PlaybackSpeed, now_ms: f64) {
        if let Some(anchor) = self.anchor.filter(|_| self.is_playing()) {
            let reached = self.target_ms(anchor, now_ms).max(f64::from(self.position_ms()));
            self.anchor = Some(Anchor {
                wall_ms: now_ms,
                offset_ms: reached,
            });
        }
        self.speed = speed;
    }

    /// Virtual time the playhead should show at `now_ms`, if playing.
    pub fn target_time(&self, now_ms: f64) -> Option<f64> {
        let anchor = self.anchor.filter(|_| self.is_playing())?;
        Some(self.target_ms(anchor, now_ms))
    }

    /// Advance the playhead to `now_ms`. Returns true if the frame changed.
    ///
    /// Moves forward only, to the last frame whose timestamp has been
    /// reached. On reaching the final frame playback pauses there.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        let Some(target) = self.target_time(now_ms) else {
            return false;
        };
        let Some(recording) = self.recording.as_ref() else {
            return false;
        };

        let frames = recording.frames();
        let last = recording.last_index();
        let mut index = self.current_index;
        while index < last
            && frames
                .get(index + 1)
                .is_some_and(|next| f64::from(next.timestamp) <= target)
        {
            index += 1;
        }

        let changed = index != self.current_index;
        self.current_index = index;
        if index >= last {
            self.pause();
        }
        changed
    }

    fn anchor_at_current(&self, now_ms: f64) -> Anchor {
        Anchor {
            wall_ms: now_ms,
            offset_ms: f64::from(self.position_ms()),
        }
    }

    fn target_ms(&self, anchor: Anchor, now_ms: f64) -> f64 {
        anchor.offset_ms + (now_ms - anchor.wall_ms) * self.speed.multiplier()
    }
}

/// Render milliseconds as `m:ss`.
pub fn format_time(ms: u32) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
