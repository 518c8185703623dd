//! Offline stand-in for the live visualization.
//!
//! Paints each frame as a flat field in the mode's color with a marker for
//! the selected token, using colors taken straight from the GIF palette.
//! Used by the command-line exporter and benchmarks where no real renderer
//! exists.

use super::gif::palette::Palette;
use super::raster::{Raster, RenderSurface};
use crate::schema::{Frame, ScanMode};

/// Palette entry used for each mode's background.
fn mode_entry(mode: ScanMode) -> usize {
    match mode {
        ScanMode::T1 => 100,
        ScanMode::T2 => 150,
        ScanMode::Fmri => 200,
        ScanMode::Dti => 180,
        ScanMode::Flair => 240,
    }
}

const BACKDROP_ENTRY: usize = 8;
const MARKER_ENTRY: usize = 255;

pub struct SwatchSurface {
    width: u32,
    height: u32,
    palette: Palette,
    state: Option<(ScanMode, u32)>,
    attached: bool,
    ticks: usize,
    slept_ms: Vec<u32>,
}

impl SwatchSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            palette: Palette::tonal(),
            state: None,
            attached: true,
            ticks: 0,
            slept_ms: Vec::new(),
        }
    }

    /// Simulate the visualization being torn down.
    pub fn detach(&mut self) {
        self.attached = false;
    }

    /// Render ticks waited on so far.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Every sleep requested so far, in order.
    pub fn slept_ms(&self) -> &[u32] {
        &self.slept_ms
    }

    fn color(&self, entry: usize) -> [u8; 4] {
        let [r, g, b] = self.palette.colors()[entry];
        [r, g, b, 255]
    }
}

impl RenderSurface for SwatchSurface {
    fn apply(&mut self, frame: &Frame) {
        self.state = Some((frame.mode, frame.selected_token_idx));
    }

    async fn next_tick(&mut self) {
        self.ticks += 1;
    }

    async fn sleep(&mut self, ms: u32) {
        self.slept_ms.push(ms);
    }

    fn capture(&mut self, scale: u32) -> Option<Raster> {
        let width = self.width.checked_mul(scale)?;
        let height = self.height.checked_mul(scale)?;
        let mut raster = Raster::blank(width, height);

        let Some((mode, token)) = self.state else {
            let backdrop = self.color(BACKDROP_ENTRY);
            raster.pixels_mut().fill(backdrop);
            return Some(raster);
        };

        let fill = self.color(mode_entry(mode));
        let backdrop = self.color(BACKDROP_ENTRY);
        let marker = self.color(MARKER_ENTRY);
        let band_top = height - height / 4;
        let marker_x = if width == 0 { 0 } else { token % width };

        for (i, px) in raster.pixels_mut().iter_mut().enumerate() {
            let x = i as u32 % width;
            let y = i as u32 / width;
            *px = if y < band_top {
                fill
            } else if x == marker_x {
                marker
            } else {
                backdrop
            };
        }
        Some(raster)
    }

    fn is_attached(&self) -> bool {
        self.attached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Payloads;

    fn frame(mode: ScanMode, token: u32) -> Frame {
        Frame {
            timestamp: 0,
            mode,
            selected_token_idx: token,
            payloads: Payloads::default(),
        }
    }

    #[test]
    fn test_capture_paints_mode_and_marker() {
        let mut surface = SwatchSurface::new(4, 4);
        surface.apply(&frame(ScanMode::Fmri, 6));
        let raster = surface.capture(1).unwrap();
        let palette = Palette::tonal();

        let indices = palette.quantize(raster.pixels());
        assert!(indices[..12].iter().all(|&i| i == 200));
        // Bottom row: marker at column 6 % 4 = 2.
        assert_eq!(&indices[12..], &[8, 8, 255, 8]);
    }

    #[test]
    fn test_capture_scales() {
        let mut surface = SwatchSurface::new(5, 3);
        surface.apply(&frame(ScanMode::T1, 0));
        assert_eq!(surface.capture(2).unwrap().dimensions(), (10, 6));
    }

    #[test]
    fn test_records_waits() {
        let mut surface = SwatchSurface::new(1, 1);
        pollster::block_on(async {
            surface.next_tick().await;
            surface.sleep(50).await;
        });
        assert_eq!(surface.ticks(), 1);
        assert_eq!(surface.slept_ms(), &[50]);
    }
}
