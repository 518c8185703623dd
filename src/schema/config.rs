//! Configuration for export and the offline preview renderer.

use serde::{Deserialize, Serialize};

fn default_gif_fps() -> u32 {
    5
}

fn default_webm_fps() -> u32 {
    10
}

fn default_scale() -> u32 {
    1
}

/// Top-level replay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Frames per second for GIF export.
    #[serde(default = "default_gif_fps")]
    pub gif_fps: u32,
    /// Frames per second for WebM export.
    #[serde(default = "default_webm_fps")]
    pub webm_fps: u32,
    /// Integer raster scale factor applied on capture.
    #[serde(default = "default_scale")]
    pub scale: u32,
    /// Video encoder settings.
    #[serde(default)]
    pub video: VideoConfig,
    /// Size of the offline preview surface used by the CLI.
    #[serde(default)]
    pub preview: PreviewConfig,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            gif_fps: default_gif_fps(),
            webm_fps: default_webm_fps(),
            scale: default_scale(),
            video: VideoConfig::default(),
            preview: PreviewConfig::default(),
        }
    }
}

/// WebM stream parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Container/codec requested first.
    pub preferred_mime: String,
    /// Container requested when the preferred codec is unavailable.
    pub fallback_mime: String,
    /// Target bitrate in bits per second.
    pub bitrate: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            preferred_mime: "video/webm;codecs=vp9".to_string(),
            fallback_mime: "video/webm".to_string(),
            bitrate: 2_000_000,
        }
    }
}

/// Preview surface dimensions, before scaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: 560,
            height: 620,
        }
    }
}

impl ReplayConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gif_fps == 0 || self.webm_fps == 0 {
            return Err(ConfigError::InvalidFrameRate);
        }
        if self.scale == 0 {
            return Err(ConfigError::InvalidScale);
        }
        if self.preview.width == 0 || self.preview.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.video.bitrate == 0 {
            return Err(ConfigError::InvalidBitrate);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Frame rate must be non-zero")]
    InvalidFrameRate,
    #[error("Scale must be non-zero")]
    InvalidScale,
    #[error("Preview dimensions (width, height) must be non-zero")]
    InvalidDimensions,
    #[error("Video bitrate must be non-zero")]
    InvalidBitrate,
}
