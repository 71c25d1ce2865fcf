//! Infrastructure configuration - paths, bind address, telemetry.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Filesystem paths for session artifacts and encoder diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory the encoder writes the manifest and segments into.
    /// Purged of artifacts before every session.
    /// Default: ./hls
    #[serde(default = "PathsConfig::default_workspace_dir")]
    pub workspace_dir: PathBuf,

    /// Encoder stdout/stderr for the most recent session.
    /// Default: ./ffmpeg.log
    #[serde(default = "PathsConfig::default_encoder_log")]
    pub encoder_log: PathBuf,
}

impl PathsConfig {
    fn default_workspace_dir() -> PathBuf {
        PathBuf::from("hls")
    }

    fn default_encoder_log() -> PathBuf {
        PathBuf::from("ffmpeg.log")
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            workspace_dir: Self::default_workspace_dir(),
            encoder_log: Self::default_encoder_log(),
        }
    }
}

/// Network bind address for the HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindConfig {
    /// Default: 0.0.0.0
    #[serde(default = "BindConfig::default_host")]
    pub host: String,

    /// Default: 5000
    #[serde(default = "BindConfig::default_http_port")]
    pub http_port: u16,
}

impl BindConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_http_port() -> u16 {
        5000
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            http_port: Self::default_http_port(),
        }
    }
}

/// Telemetry and observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// OTLP gRPC endpoint for OpenTelemetry. Unset means console logging only.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Log level or filter directive (trace, debug, info, warn, error).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            log_level: Self::default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_defaults() {
        let paths = PathsConfig::default();
        assert_eq!(paths.workspace_dir, PathBuf::from("hls"));
        assert_eq!(paths.encoder_log, PathBuf::from("ffmpeg.log"));
    }

    #[test]
    fn test_bind_defaults() {
        let bind = BindConfig::default();
        assert_eq!(bind.http_port, 5000);
        assert_eq!(bind.addr(), "0.0.0.0:5000");
    }

    #[test]
    fn test_telemetry_defaults() {
        let telemetry = TelemetryConfig::default();
        assert!(telemetry.otlp_endpoint.is_none());
        assert_eq!(telemetry.log_level, "info");
    }
}
