//! Schema module - Recording, frame and configuration types.

mod config;
mod frame;
mod recording;

pub use config::*;
pub use frame::*;
pub use recording::*;
