//! Animated GIF export.
//!
//! Frames are captured through the raster bridge, mapped onto a fixed
//! 256-color palette, LZW-compressed one frame at a time and framed as a
//! looping GIF89a stream. Nothing is produced unless every frame encodes.

#[cfg(test)]
pub(crate) mod decode;
pub mod lzw;
pub mod palette;
mod writer;

pub use writer::{GifWriter, MIN_CODE_SIZE, delay_centiseconds};

use chrono::Utc;
#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

use super::raster::{Raster, RasterBridge, RenderSurface};
use super::sink::{ExportArtifact, artifact_file_name};
use super::{ExportError, ExportOptions};
use crate::schema::Recording;
use palette::Palette;

pub const GIF_MIME: &str = "image/gif";

/// Share of the progress range spent capturing frames.
const CAPTURE_SHARE: f32 = 0.8;

fn gif_dimensions(raster: &Raster) -> Result<(u16, u16), ExportError> {
    let (width, height) = raster.dimensions();
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(ExportError::RasterTooLarge { width, height }),
    }
}

fn quantize_and_compress(palette: &Palette, raster: &Raster) -> Vec<u8> {
    let indices = palette.quantize(raster.pixels());
    lzw::encode(&indices, MIN_CODE_SIZE)
}

/// Encode already-captured rasters into a GIF, each shown for `delay_ms`.
///
/// All rasters must share the first one's dimensions.
pub fn encode_gif(rasters: &[Raster], delay_ms: u32, palette: &Palette) -> Result<Vec<u8>, ExportError> {
    let first = rasters
        .first()
        .ok_or_else(|| ExportError::Encoding("no frames to encode".into()))?;
    let (width, height) = gif_dimensions(first)?;
    if let Some((index, raster)) = rasters
        .iter()
        .enumerate()
        .find(|(_, r)| r.dimensions() != first.dimensions())
    {
        return Err(ExportError::RasterSizeMismatch {
            index,
            expected: first.dimensions(),
            actual: raster.dimensions(),
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    let compressed: Vec<Vec<u8>> = rasters
        .par_iter()
        .map(|r| quantize_and_compress(palette, r))
        .collect();
    #[cfg(target_arch = "wasm32")]
    let compressed: Vec<Vec<u8>> = rasters
        .iter()
        .map(|r| quantize_and_compress(palette, r))
        .collect();

    let framing = |e: std::io::Error| ExportError::Encoding(e.to_string());
    let delay_cs = delay_centiseconds(delay_ms);
    let mut writer = GifWriter::new(Vec::new(), width, height, palette).map_err(framing)?;
    for data in &compressed {
        writer.write_encoded_frame(data, delay_cs).map_err(framing)?;
    }
    writer.finish().map_err(framing)
}

/// Render every frame of `recording` on `surface` and encode the result.
///
/// Progress runs to 0.8 while frames are captured and reaches 1.0 once the
/// artifact is complete.
pub async fn export_gif<S: RenderSurface>(
    recording: &Recording,
    surface: &mut S,
    options: &mut ExportOptions<'_>,
) -> Result<ExportArtifact, ExportError> {
    options.validate()?;
    let total = recording.len();
    log::info!(
        "Exporting {} frames as GIF at {} fps (scale {})",
        total,
        options.fps,
        options.scale
    );

    let mut bridge = RasterBridge::new(surface, options.scale);
    let mut rasters: Vec<Raster> = Vec::with_capacity(total);
    for (index, frame) in recording.frames().iter().enumerate() {
        let raster = bridge.render(frame).await?;
        match rasters.first() {
            None => {
                gif_dimensions(&raster)?;
            }
            Some(first) if first.dimensions() != raster.dimensions() => {
                return Err(ExportError::RasterSizeMismatch {
                    index,
                    expected: first.dimensions(),
                    actual: raster.dimensions(),
                });
            }
            Some(_) => {}
        }
        log::debug!("Captured frame {}/{}", index + 1, total);
        rasters.push(raster);
        options.report((index + 1) as f32 / total as f32 * CAPTURE_SHARE);
    }

    let artifact = encode_captured(recording, &rasters, options.frame_delay_ms())?;
    options.report(1.0);
    Ok(artifact)
}

/// Encode rasters captured by the host, one per frame of `recording`.
pub fn encode_captured(
    recording: &Recording,
    rasters: &[Raster],
    delay_ms: u32,
) -> Result<ExportArtifact, ExportError> {
    if rasters.len() != recording.len() {
        return Err(ExportError::FrameCountMismatch {
            expected: recording.len(),
            actual: rasters.len(),
        });
    }
    let bytes = encode_gif(rasters, delay_ms, &Palette::tonal())?;
    log::info!("GIF export complete ({} bytes)", bytes.len());

    Ok(ExportArtifact {
        file_name: artifact_file_name(recording.model_id(), Utc::now(), "gif"),
        mime_type: GIF_MIME.to_string(),
        bytes,
    })
}
