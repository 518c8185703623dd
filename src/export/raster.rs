//! Raster bridge: boundary between exporters and the external renderer.

use super::ExportError;
use crate::schema::Frame;

/// Fixed wait between the two render ticks of the settle window.
pub const SETTLE_DELAY_MS: u32 = 50;

/// An RGBA8 image read back from the visualization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    /// Wrap an RGBA buffer. Returns `None` if its length does not match.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        (pixels.len() == expected).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// A fully transparent black raster.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixels as `[r, g, b, a]` quads.
    pub fn pixels(&self) -> &[[u8; 4]] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn pixels_mut(&mut self) -> &mut [[u8; 4]] {
        bytemuck::cast_slice_mut(&mut self.pixels)
    }

    /// Overwrite this raster with `other`'s pixels. Sizes must match.
    pub fn copy_from(&mut self, other: &Raster) -> bool {
        if self.dimensions() != other.dimensions() {
            return false;
        }
        self.pixels.copy_from_slice(&other.pixels);
        true
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }
}

/// The live visualization, as seen by the exporters.
///
/// Implemented by the host renderer. `next_tick` resolves on the host's next
/// render frame; `sleep` resolves after the given wall time.
#[allow(async_fn_in_trait)]
pub trait RenderSurface {
    /// Show `frame`'s state in the visualization.
    fn apply(&mut self, frame: &Frame);

    /// Wait for the next render tick.
    async fn next_tick(&mut self);

    /// Wait `ms` milliseconds.
    async fn sleep(&mut self, ms: u32);

    /// Read back the current image at `scale`, or `None` if there is no
    /// rasterizable surface.
    fn capture(&mut self, scale: u32) -> Option<Raster>;

    /// Whether the visualization still exists.
    fn is_attached(&self) -> bool {
        true
    }
}

/// Renders frames through a [`RenderSurface`] and reads them back once the
/// renderer has settled.
pub struct RasterBridge<'s, S: RenderSurface> {
    surface: &'s mut S,
    scale: u32,
}

impl<'s, S: RenderSurface> RasterBridge<'s, S> {
    pub fn new(surface: &'s mut S, scale: u32) -> Self {
        Self {
            surface,
            scale: scale.max(1),
        }
    }

    /// Apply `frame`, wait out the settle window, and capture.
    pub async fn render(&mut self, frame: &Frame) -> Result<Raster, ExportError> {
        if !self.surface.is_attached() {
            return Err(ExportError::SurfaceDetached);
        }
        self.surface.apply(frame);
        self.surface.next_tick().await;
        self.surface.sleep(SETTLE_DELAY_MS).await;
        self.surface.next_tick().await;

        if !self.surface.is_attached() {
            return Err(ExportError::SurfaceDetached);
        }
        self.surface
            .capture(self.scale)
            .ok_or(ExportError::RenderTimeout)
    }

    /// Wait on the underlying surface.
    pub async fn sleep(&mut self, ms: u32) {
        self.surface.sleep(ms).await;
    }
}
