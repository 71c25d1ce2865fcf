//! Capture configuration - the device and encoder settings for each session.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Settings handed to the capture/encode subprocess.
///
/// Everything here ends up on the encoder command line, so `validate` is run
/// at load time rather than when the first session starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Encoder binary, resolved through PATH when relative.
    /// Default: ffmpeg
    #[serde(default = "CaptureConfig::default_program")]
    pub program: PathBuf,

    /// V4L2 capture device.
    /// Default: /dev/video0
    #[serde(default = "CaptureConfig::default_device")]
    pub device: String,

    /// Capture resolution as `WIDTHxHEIGHT`.
    /// Default: 1280x720
    #[serde(default = "CaptureConfig::default_video_size")]
    pub video_size: String,

    /// Default: 30
    #[serde(default = "CaptureConfig::default_framerate")]
    pub framerate: u32,

    /// x264 preset. Default: veryfast
    #[serde(default = "CaptureConfig::default_preset")]
    pub preset: String,

    /// Group-of-pictures size in frames. Default: 30 (one keyframe per second)
    #[serde(default = "CaptureConfig::default_gop")]
    pub gop: u32,

    /// Target HLS segment duration. Default: 2
    #[serde(default = "CaptureConfig::default_segment_seconds")]
    pub segment_seconds: u32,

    /// How long a stop waits for the encoder to exit before killing it.
    /// Default: 2000
    #[serde(default = "CaptureConfig::default_grace_period_ms")]
    pub grace_period_ms: u64,
}

impl CaptureConfig {
    fn default_program() -> PathBuf {
        PathBuf::from("ffmpeg")
    }

    fn default_device() -> String {
        "/dev/video0".to_string()
    }

    fn default_video_size() -> String {
        "1280x720".to_string()
    }

    fn default_framerate() -> u32 {
        30
    }

    fn default_preset() -> String {
        "veryfast".to_string()
    }

    fn default_gop() -> u32 {
        30
    }

    fn default_segment_seconds() -> u32 {
        2
    }

    fn default_grace_period_ms() -> u64 {
        2_000
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Parse `video_size` into width and height.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let (w, h) = self.video_size.split_once('x')?;
        let width: u32 = w.parse().ok()?;
        let height: u32 = h.parse().ok()?;
        (width > 0 && height > 0).then_some((width, height))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.program.as_os_str().is_empty() {
            return Err(invalid("capture.program", "must not be empty"));
        }
        if self.device.trim().is_empty() {
            return Err(invalid("capture.device", "must not be empty"));
        }
        if self.dimensions().is_none() {
            return Err(invalid(
                "capture.video_size",
                format!("expected WIDTHxHEIGHT, got {:?}", self.video_size),
            ));
        }
        if self.framerate == 0 {
            return Err(invalid("capture.framerate", "must be positive"));
        }
        if self.gop == 0 {
            return Err(invalid("capture.gop", "must be positive"));
        }
        if self.segment_seconds == 0 {
            return Err(invalid("capture.segment_seconds", "must be positive"));
        }
        if self.preset.is_empty() || self.preset.starts_with('-') {
            return Err(invalid(
                "capture.preset",
                format!("not a preset name: {:?}", self.preset),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            program: Self::default_program(),
            device: Self::default_device(),
            video_size: Self::default_video_size(),
            framerate: Self::default_framerate(),
            preset: Self::default_preset(),
            gop: Self::default_gop(),
            segment_seconds: Self::default_segment_seconds(),
            grace_period_ms: Self::default_grace_period_ms(),
        }
    }
}
