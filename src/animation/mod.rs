//! Scan recording and playback.
//!
//! The [`Recorder`] samples visualization snapshots into a [`Recording`],
//! the [`Player`] replays one against a host clock, and the
//! [`PlaybackEngine`] owns both together with export state.
//!
//! # Timing model
//!
//! Nothing here owns a timer. The host passes its current time (directly or
//! through a [`Clock`]) to every operation that depends on it:
//!
//! ```text
//! target = anchor.offset + (now - anchor.wall) * speed
//! index  = last frame with timestamp <= target   (forward only)
//! ```
//!
//! Seeking and speed changes re-anchor at the current position, so the next
//! tick continues without a jump.
//!
//! [`Recording`]: crate::schema::Recording

mod clock;
mod engine;
pub mod format;
mod player;
mod recorder;

#[cfg(not(target_arch = "wasm32"))]
pub use clock::SystemClock;
pub use clock::{Clock, ManualClock, elapsed_ms};
pub use engine::{EngineStatus, PlaybackEngine};
pub use player::{PlaybackState, Player, format_time};
pub use recorder::{CaptureOutcome, Recorder, SessionInfo};
