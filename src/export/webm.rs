//! WebM export through a host video encoder.
//!
//! The encoder itself belongs to the platform. This module only drives it:
//! one persistent raster is bound to a manually advanced stream, each frame
//! is copied into it and explicitly committed, and the finished chunks are
//! assembled and checked before anything is handed out.

use chrono::Utc;

use super::raster::{Raster, RasterBridge, RenderSurface};
use super::sink::{ExportArtifact, artifact_file_name};
use super::{ExportError, ExportOptions};
use crate::schema::{Recording, VideoConfig};

/// Every WebM file starts with the EBML header magic.
pub const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// MIME type of the delivered file.
pub const WEBM_MIME: &str = "video/webm";

/// Parameters for opening an encoding stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    pub mime_type: String,
    pub bitrate: u32,
    pub width: u32,
    pub height: u32,
}

/// A platform video encoder.
pub trait VideoBackend {
    type Stream: VideoStream;

    /// Whether the encoder can produce `mime_type`.
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Open a stream that advances only on [`VideoStream::request_frame`].
    fn open_stream(&mut self, config: &StreamConfig) -> Result<Self::Stream, ExportError>;
}

/// A manually driven encoding stream.
#[allow(async_fn_in_trait)]
pub trait VideoStream {
    fn start(&mut self) -> Result<(), ExportError>;

    /// Commit `raster` as the next frame.
    fn request_frame(&mut self, raster: &Raster) -> Result<(), ExportError>;

    /// Stop encoding and return the produced chunks in order.
    async fn finish(self) -> Result<Vec<Vec<u8>>, ExportError>;
}

/// Backend for platforms without video encoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedVideoBackend;

/// Stream type of [`UnsupportedVideoBackend`]; never constructed.
#[derive(Debug)]
pub enum NoStream {}

impl VideoStream for NoStream {
    fn start(&mut self) -> Result<(), ExportError> {
        match *self {}
    }

    fn request_frame(&mut self, _raster: &Raster) -> Result<(), ExportError> {
        match *self {}
    }

    async fn finish(self) -> Result<Vec<Vec<u8>>, ExportError> {
        match self {}
    }
}

impl VideoBackend for UnsupportedVideoBackend {
    type Stream = NoStream;

    fn is_type_supported(&self, _mime_type: &str) -> bool {
        false
    }

    fn open_stream(&mut self, _config: &StreamConfig) -> Result<NoStream, ExportError> {
        Err(ExportError::EncodingUnsupported)
    }
}

/// Pick the preferred MIME type, falling back to plain WebM.
pub fn choose_mime_type<B: VideoBackend>(backend: &B, video: &VideoConfig) -> Option<String> {
    [&video.preferred_mime, &video.fallback_mime]
        .into_iter()
        .find(|mime| backend.is_type_supported(mime))
        .cloned()
}

/// Render every frame of `recording` into a WebM video.
///
/// Fails with [`ExportError::EncodingUnsupported`] before rendering anything
/// when the backend supports neither configured type.
pub async fn export_webm<S: RenderSurface, B: VideoBackend>(
    recording: &Recording,
    surface: &mut S,
    backend: &mut B,
    video: &VideoConfig,
    options: &mut ExportOptions<'_>,
) -> Result<ExportArtifact, ExportError> {
    options.validate()?;
    let mime_type = choose_mime_type(backend, video).ok_or(ExportError::EncodingUnsupported)?;
    let total = recording.len();
    let delay_ms = options.frame_delay_ms();
    log::info!(
        "Exporting {} frames as {} at {} fps (scale {})",
        total,
        mime_type,
        options.fps,
        options.scale
    );

    let mut bridge = RasterBridge::new(surface, options.scale);
    let first = recording.frame(0).ok_or(ExportError::NoRecording)?;
    let probe = bridge.render(first).await?;
    let (width, height) = probe.dimensions();
    let mut canvas = Raster::blank(width, height);

    let mut stream = backend.open_stream(&StreamConfig {
        mime_type,
        bitrate: video.bitrate,
        width,
        height,
    })?;
    stream.start()?;

    for (index, frame) in recording.frames().iter().enumerate() {
        let raster = bridge.render(frame).await?;
        if !canvas.copy_from(&raster) {
            return Err(ExportError::RasterSizeMismatch {
                index,
                expected: (width, height),
                actual: raster.dimensions(),
            });
        }
        stream.request_frame(&canvas)?;
        bridge.sleep(delay_ms).await;
        log::debug!("Streamed frame {}/{}", index + 1, total);
        options.report(index as f32 / total as f32);
    }

    let bytes: Vec<u8> = stream.finish().await?.concat();
    if !bytes.starts_with(&EBML_MAGIC) {
        return Err(ExportError::Encoding(
            "encoder output is not a WebM container".into(),
        ));
    }
    options.report(1.0);
    log::info!("WebM export complete ({} bytes)", bytes.len());

    Ok(ExportArtifact {
        file_name: artifact_file_name(recording.model_id(), Utc::now(), "webm"),
        mime_type: WEBM_MIME.to_string(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::SwatchSurface;
    use crate::schema::{Frame, Payloads, ScanMode};

    struct FakeBackend {
        supported: Vec<&'static str>,
        opened: Vec<StreamConfig>,
        emit_magic: bool,
    }

    impl FakeBackend {
        fn supporting(supported: &[&'static str]) -> Self {
            Self {
                supported: supported.to_vec(),
                opened: Vec::new(),
                emit_magic: true,
            }
        }
    }

    struct FakeStream {
        started: bool,
        chunks: Vec<Vec<u8>>,
    }

    impl VideoStream for FakeStream {
        fn start(&mut self) -> Result<(), ExportError> {
            self.started = true;
            Ok(())
        }

        fn request_frame(&mut self, raster: &Raster) -> Result<(), ExportError> {
            if !self.started {
                return Err(ExportError::Encoding("not started".into()));
            }
            // One chunk per frame holding the red channel of the first pixel.
            self.chunks.push(vec![raster.as_bytes()[0]]);
            Ok(())
        }

        async fn finish(self) -> Result<Vec<Vec<u8>>, ExportError> {
            Ok(self.chunks)
        }
    }

    impl VideoBackend for FakeBackend {
        type Stream = FakeStream;

        fn is_type_supported(&self, mime_type: &str) -> bool {
            self.supported.iter().any(|s| *s == mime_type)
        }

        fn open_stream(&mut self, config: &StreamConfig) -> Result<FakeStream, ExportError> {
            self.opened.push(config.clone());
            let header = if self.emit_magic {
                EBML_MAGIC.to_vec()
            } else {
                b"RIFF".to_vec()
            };
            Ok(FakeStream {
                started: false,
                chunks: vec![header],
            })
        }
    }

    fn recording() -> Recording {
        let frames = [ScanMode::T1, ScanMode::Flair, ScanMode::T2]
            .into_iter()
            .enumerate()
            .map(|(i, mode)| Frame {
                timestamp: i as u32 * 100,
                mode,
                selected_token_idx: 0,
                payloads: Payloads::default(),
            })
            .collect();
        Recording::new("gpt2", "", "2026-01-01T00:00:00.000Z", 200, frames).unwrap()
    }

    #[test]
    fn test_streams_every_frame() {
        let rec = recording();
        let mut surface = SwatchSurface::new(6, 4);
        let mut backend = FakeBackend::supporting(&["video/webm;codecs=vp9", "video/webm"]);
        let mut options = ExportOptions::webm().with_scale(2);

        let artifact = pollster::block_on(export_webm(
            &rec,
            &mut surface,
            &mut backend,
            &VideoConfig::default(),
            &mut options,
        ))
        .unwrap();

        assert_eq!(
            backend.opened,
            vec![StreamConfig {
                mime_type: "video/webm;codecs=vp9".into(),
                bitrate: 2_000_000,
                width: 12,
                height: 8,
            }]
        );
        assert_eq!(&artifact.bytes[..4], &EBML_MAGIC);
        assert_eq!(artifact.bytes.len(), 4 + 3);
        assert_eq!(artifact.mime_type, "video/webm");
        assert!(artifact.file_name.ends_with(".webm"));

        // Probe render, then settle and frame delay for each frame.
        assert_eq!(surface.slept_ms(), &[50, 50, 100, 50, 100, 50, 100]);
    }

    #[test]
    fn test_falls_back_to_plain_webm() {
        let backend = FakeBackend::supporting(&["video/webm"]);
        assert_eq!(
            choose_mime_type(&backend, &VideoConfig::default()).as_deref(),
            Some("video/webm")
        );
    }

    #[test]
    fn test_unsupported_fails_before_rendering() {
        let rec = recording();
        let mut surface = SwatchSurface::new(2, 2);
        let result = pollster::block_on(export_webm(
            &rec,
            &mut surface,
            &mut UnsupportedVideoBackend,
            &VideoConfig::default(),
            &mut ExportOptions::webm(),
        ));
        assert!(matches!(result, Err(ExportError::EncodingUnsupported)));
        assert_eq!(surface.ticks(), 0);
    }

    #[test]
    fn test_non_webm_output_rejected() {
        let rec = recording();
        let mut surface = SwatchSurface::new(2, 2);
        let mut backend = FakeBackend::supporting(&["video/webm"]);
        backend.emit_magic = false;
        let result = pollster::block_on(export_webm(
            &rec,
            &mut surface,
            &mut backend,
            &VideoConfig::default(),
            &mut ExportOptions::webm(),
        ));
        assert!(matches!(result, Err(ExportError::Encoding(_))));
    }

    #[test]
    fn test_progress_reports_frame_fraction() {
        let rec = recording();
        let mut surface = SwatchSurface::new(2, 2);
        let mut backend = FakeBackend::supporting(&["video/webm"]);
        let mut seen = Vec::new();
        {
            let mut options = ExportOptions::webm().with_progress(|p| seen.push(p));
            pollster::block_on(export_webm(
                &rec,
                &mut surface,
                &mut backend,
                &VideoConfig::default(),
                &mut options,
            ))
            .unwrap();
        }
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], 0.0);
        assert!((seen[2] - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(seen[3], 1.0);
    }
}
