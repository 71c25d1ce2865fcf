//! Config file discovery, loading, and environment variable overlay.

use crate::{BreakConfig, ConfigError};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/breakshot/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("breakshot/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("breakshot.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file into a raw table.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    // Catch type errors against the file that caused them, not the merged result.
    from_table(table.clone(), Some(&path.to_path_buf()))?;
    Ok(table)
}

/// Deep-merge `overlay` into `base`. Nested tables merge key by key,
/// everything else is replaced.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.remove(&key), value) {
            (Some(toml::Value::Table(mut existing)), toml::Value::Table(incoming)) => {
                merge_tables(&mut existing, incoming);
                base.insert(key, toml::Value::Table(existing));
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Deserialize a (merged) table, expanding `~` and `$VAR` in paths.
pub fn from_table(table: toml::Table, origin: Option<&PathBuf>) -> Result<BreakConfig, ConfigError> {
    let mut config: BreakConfig =
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                path: origin.cloned().unwrap_or_else(|| PathBuf::from("<defaults>")),
                message: e.to_string(),
            })?;

    config.paths.workspace_dir = expand_path(&config.paths.workspace_dir.to_string_lossy());
    config.paths.encoder_log = expand_path(&config.paths.encoder_log.to_string_lossy());
    Ok(config)
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut BreakConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Apply overrides from an arbitrary variable lookup.
pub fn apply_overrides_from(
    config: &mut BreakConfig,
    sources: &mut ConfigSources,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let mut take = |key: &str| {
        let value = lookup(key)?;
        sources.env_overrides.push(key.to_string());
        Some(value)
    };

    // Paths
    if let Some(v) = take("BREAKSHOT_WORKSPACE_DIR") {
        config.paths.workspace_dir = expand_path(&v);
    }
    if let Some(v) = take("BREAKSHOT_ENCODER_LOG") {
        config.paths.encoder_log = expand_path(&v);
    }

    // Bind address
    if let Some(v) = take("BREAKSHOT_HOST") {
        config.bind.host = v;
    }
    if let Some(v) = take("BREAKSHOT_HTTP_PORT") {
        if let Ok(port) = v.parse() {
            config.bind.http_port = port;
        }
    }

    // Telemetry
    if let Some(v) = take("BREAKSHOT_OTLP_ENDPOINT") {
        config.telemetry.otlp_endpoint = Some(v);
    }
    // Also support standard OTEL env var
    if let Some(v) = take("OTEL_EXPORTER_OTLP_ENDPOINT") {
        config.telemetry.otlp_endpoint = Some(v);
    }
    if let Some(v) = take("BREAKSHOT_LOG_LEVEL") {
        config.telemetry.log_level = v;
    }
    if let Some(v) = take("RUST_LOG") {
        config.telemetry.log_level = v;
    }

    // Capture
    if let Some(v) = take("BREAKSHOT_CAPTURE_PROGRAM") {
        config.capture.program = expand_path(&v);
    }
    if let Some(v) = take("BREAKSHOT_CAPTURE_DEVICE") {
        config.capture.device = v;
    }
    if let Some(v) = take("BREAKSHOT_VIDEO_SIZE") {
        config.capture.video_size = v;
    }
    if let Some(v) = take("BREAKSHOT_FRAMERATE") {
        if let Ok(fps) = v.parse() {
            config.capture.framerate = fps;
        }
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}
