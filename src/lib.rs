//! Neural MRI replay - scan recording, deterministic playback and export.
//!
//! This crate captures time-ordered snapshots of the neural MRI scan
//! visualization, replays them against a host-supplied clock with seek and
//! speed control, and exports them as a looping GIF (built here from
//! scratch) or as WebM through a platform video encoder.
//!
//! # Architecture
//!
//! - `schema`: Frames, recordings, playback speeds and configuration
//! - `animation`: Recorder, player, clock and the [`PlaybackEngine`] that owns them
//! - `export`: Raster bridge, GIF encoder, WebM driver and download sinks
//!
//! # Example
//!
//! ```rust,no_run
//! use nmri_replay::{
//!     animation::{ManualClock, PlaybackEngine},
//!     export::{ExportOptions, MemorySink, SwatchSurface},
//!     schema::{ScanMode, StateSnapshot},
//! };
//!
//! let mut engine = PlaybackEngine::new(ManualClock::new(0.0));
//!
//! // Record two states half a second apart
//! engine.start_recording(&StateSnapshot::default());
//! engine.clock().advance(500.0);
//! engine.on_state_settled(&StateSnapshot {
//!     mode: ScanMode::Fmri,
//!     ..Default::default()
//! });
//! engine.stop_recording().unwrap();
//!
//! // Export through an offline renderer
//! let mut surface = SwatchSurface::new(160, 120);
//! let mut sink = MemorySink::default();
//! pollster::block_on(engine.export_gif(&mut surface, &mut sink, &mut ExportOptions::gif()))
//!     .unwrap();
//! println!("{} bytes", sink.delivered[0].bytes.len());
//! ```

pub mod animation;
pub mod export;
pub mod schema;

// WebAssembly bindings (only for wasm32 target)
#[cfg(target_arch = "wasm32")]
pub mod wasm;

// Re-export commonly used types
pub use animation::{Clock, EngineStatus, ManualClock, PlaybackEngine, Player, Recorder};
pub use export::{ExportArtifact, ExportError, ExportOptions};
pub use schema::{Frame, PlaybackSpeed, Recording, RecordingError, ReplayConfig, ScanMode};
