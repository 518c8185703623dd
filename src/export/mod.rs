//! Export of recordings to animated GIF and WebM.
//!
//! Both exporters drive a [`RasterBridge`] frame by frame: each frame's
//! state is applied to the live visualization, the renderer is given a fixed
//! settle window, and the resulting raster is read back and encoded. Exports
//! are all-or-nothing: an [`ExportArtifact`] exists only once every frame has
//! been encoded, and only then is it handed to a [`DownloadSink`].

pub mod gif;
mod raster;
mod sink;
mod swatch;
pub mod webm;

pub use gif::{encode_captured, encode_gif, export_gif};
pub use raster::{Raster, RasterBridge, RenderSurface, SETTLE_DELAY_MS};
#[cfg(not(target_arch = "wasm32"))]
pub use sink::DirectorySink;
pub use sink::{DownloadSink, ExportArtifact, MemorySink, artifact_file_name};
pub use swatch::SwatchSurface;
pub use webm::{UnsupportedVideoBackend, VideoBackend, VideoStream, export_webm};

/// Progress callback, called with a fraction in `[0, 1]`.
pub type ProgressCallback<'a> = Box<dyn FnMut(f32) + 'a>;

/// Options shared by both exporters.
pub struct ExportOptions<'a> {
    /// Output frame rate.
    pub fps: u32,
    /// Integer raster scale factor.
    pub scale: u32,
    /// Optional progress reporting.
    pub on_progress: Option<ProgressCallback<'a>>,
}

impl<'a> ExportOptions<'a> {
    /// GIF defaults: 5 fps, scale 1.
    pub fn gif() -> Self {
        Self {
            fps: 5,
            scale: 1,
            on_progress: None,
        }
    }

    /// WebM defaults: 10 fps, scale 1.
    pub fn webm() -> Self {
        Self {
            fps: 10,
            scale: 1,
            on_progress: None,
        }
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_progress(mut self, callback: impl FnMut(f32) + 'a) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ExportError> {
        if self.fps == 0 {
            return Err(ExportError::InvalidOptions("fps must be non-zero"));
        }
        if self.scale == 0 {
            return Err(ExportError::InvalidOptions("scale must be non-zero"));
        }
        Ok(())
    }

    pub(crate) fn report(&mut self, progress: f32) {
        if let Some(callback) = self.on_progress.as_mut() {
            callback(progress.clamp(0.0, 1.0));
        }
    }

    /// Display time of one frame, rounded to whole milliseconds.
    pub fn frame_delay_ms(&self) -> u32 {
        frame_delay_ms(self.fps)
    }
}

/// `round(1000 / fps)`.
pub fn frame_delay_ms(fps: u32) -> u32 {
    let fps = u64::from(fps.max(1));
    ((2000 + fps) / (2 * fps)) as u32
}

/// Export errors. None of them leave a partial file behind.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Video encoding is not supported on this platform")]
    EncodingUnsupported,

    #[error("No rasterizable surface found")]
    RenderTimeout,

    #[error("An export is already in progress")]
    ExportInProgress,

    #[error("Cannot export while recording")]
    RecordingActive,

    #[error("No recording loaded")]
    NoRecording,

    #[error("Visualization surface was torn down during export")]
    SurfaceDetached,

    #[error("Frame {index} rendered at {actual:?}, expected {expected:?}")]
    RasterSizeMismatch {
        index: usize,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Expected {expected} captured frames, got {actual}")]
    FrameCountMismatch { expected: usize, actual: usize },

    #[error("Raster {width}x{height} exceeds the GIF size limit")]
    RasterTooLarge { width: u32, height: u32 },

    #[error("Invalid export options: {0}")]
    InvalidOptions(&'static str),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Failed to deliver export: {0}")]
    Delivery(#[from] std::io::Error),
}

impl ExportError {
    /// True for the rejection of a concurrent export request, which callers
    /// treat as a no-op rather than a failure.
    pub fn is_benign(&self) -> bool {
        matches!(self, ExportError::ExportInProgress)
    }
}
