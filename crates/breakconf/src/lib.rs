//! Minimal configuration loading for Breakshot.
//!
//! Configuration is split by concern:
//!
//! - **Infrastructure** (`PathsConfig`, `BindConfig`, `TelemetryConfig`):
//!   where artifacts land, where the HTTP server listens, where telemetry goes.
//!
//! - **Capture** (`CaptureConfig`): the device and encoder settings handed to
//!   the capture subprocess on every session start.
//!
//! # Usage
//!
//! ```rust,no_run
//! use breakconf::BreakConfig;
//!
//! let config = BreakConfig::load().expect("Failed to load config");
//!
//! println!("Workspace: {}", config.paths.workspace_dir.display());
//! println!("HTTP port: {}", config.bind.http_port);
//! println!("Device: {}", config.capture.device);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/breakshot/config.toml` (system)
//! 2. `~/.config/breakshot/config.toml` (user)
//! 3. `./breakshot.toml` (local override, or the `--config` path)
//! 4. Environment variables (`BREAKSHOT_*`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! workspace_dir = "~/breakshot/hls"
//! encoder_log = "~/breakshot/ffmpeg.log"
//!
//! [bind]
//! http_port = 5000
//!
//! [telemetry]
//! otlp_endpoint = "127.0.0.1:4317"
//! log_level = "info"
//!
//! [capture]
//! device = "/dev/video2"
//! video_size = "1920x1080"
//! framerate = 30
//! ```

pub mod capture;
pub mod infra;
pub mod loader;

pub use capture::CaptureConfig;
pub use infra::{BindConfig, PathsConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Complete Breakshot configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BreakConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub bind: BindConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Capture device and encoder settings.
    #[serde(default)]
    pub capture: CaptureConfig,
}

impl BreakConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/breakshot/config.toml`
    /// 3. `~/.config/breakshot/config.toml`
    /// 4. `./breakshot.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply env overrides.
    ///
    /// If `config_path` is provided, it takes precedence over the local
    /// `./breakshot.toml` override. System and user configs still load first.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in loader::discover_config_files_with_override(config_path) {
            let table = loader::load_table(&path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path);
        }

        let mut config = loader::from_table(merged, sources.files.last())?;
        loader::apply_env_overrides(&mut config, &mut sources);
        config.validate()?;

        Ok((config, sources))
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paths.workspace_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "paths.workspace_dir",
                reason: "must not be empty".to_string(),
            });
        }
        self.capture.validate()
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# Breakshot Configuration\n\n");

        output.push_str("[paths]\n");
        output.push_str(&format!(
            "workspace_dir = \"{}\"\n",
            self.paths.workspace_dir.display()
        ));
        output.push_str(&format!(
            "encoder_log = \"{}\"\n",
            self.paths.encoder_log.display()
        ));

        output.push_str("\n[bind]\n");
        output.push_str(&format!("host = \"{}\"\n", self.bind.host));
        output.push_str(&format!("http_port = {}\n", self.bind.http_port));

        output.push_str("\n[telemetry]\n");
        match &self.telemetry.otlp_endpoint {
            Some(endpoint) => output.push_str(&format!("otlp_endpoint = \"{}\"\n", endpoint)),
            None => output.push_str("# otlp_endpoint = \"127.0.0.1:4317\"\n"),
        }
        output.push_str(&format!("log_level = \"{}\"\n", self.telemetry.log_level));

        output.push_str("\n[capture]\n");
        output.push_str(&format!("program = \"{}\"\n", self.capture.program.display()));
        output.push_str(&format!("device = \"{}\"\n", self.capture.device));
        output.push_str(&format!("video_size = \"{}\"\n", self.capture.video_size));
        output.push_str(&format!("framerate = {}\n", self.capture.framerate));
        output.push_str(&format!("preset = \"{}\"\n", self.capture.preset));
        output.push_str(&format!("gop = {}\n", self.capture.gop));
        output.push_str(&format!("segment_seconds = {}\n", self.capture.segment_seconds));
        output.push_str(&format!("grace_period_ms = {}\n", self.capture.grace_period_ms));

        output
    }
}
