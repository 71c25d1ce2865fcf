//! Session lifecycle errors.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to callers of `start`.
///
/// Stop has no error type: it always ends with the session idle.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A session is already running. Nothing was changed.
    #[error("a recording session is already running")]
    AlreadyRunning,

    /// The capture subprocess could not be started. The session stays idle.
    #[error("failed to launch {program}: {source}")]
    LaunchFailed {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One artifact the purge could not remove. Logged and skipped.
#[derive(Debug, Error)]
#[error("failed to remove {path}: {source}")]
pub struct PurgeFileError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// The encoder ignored the graceful stop request for the whole grace period.
/// Never returned; the supervisor escalates to a kill.
#[derive(Debug, Error)]
#[error("capture process {pid:?} did not exit within {grace:?}")]
pub struct TerminationTimeout {
    pub pid: Option<u32>,
    pub grace: Duration,
}
