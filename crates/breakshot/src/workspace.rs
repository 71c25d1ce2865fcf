//! Session workspace - the directory the encoder writes HLS artifacts into.
//!
//! Artifacts survive a stop so the last session can still be scrubbed; they
//! are only removed by the purge that precedes the next start.

use crate::error::PurgeFileError;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Manifest written by the encoder.
pub const MANIFEST_NAME: &str = "stream.m3u8";

/// Segment filename template, expanded by the encoder (`segment_000.ts`, ...).
pub const SEGMENT_TEMPLATE: &str = "segment_%03d.ts";

/// Kinds of file the encoder produces in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Manifest,
    Segment,
}

impl ArtifactKind {
    /// Classify a file by extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "m3u8" => Some(Self::Manifest),
            "ts" => Some(Self::Segment),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Manifest => "application/vnd.apple.mpegurl",
            Self::Segment => "video/mp2t",
        }
    }

    /// The manifest changes every segment; segments never change once written.
    pub fn cache_control(self) -> &'static str {
        match self {
            Self::Manifest => "no-cache, no-store, must-revalidate",
            Self::Segment => "max-age=60",
        }
    }
}

/// Outcome of a purge. Failures are informational only.
#[derive(Debug, Default)]
pub struct PurgeReport {
    pub removed: usize,
    pub failures: Vec<PurgeFileError>,
}

/// Directory owned by the current session's artifacts.
#[derive(Debug, Clone)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_NAME)
    }

    pub fn segment_template(&self) -> PathBuf {
        self.dir.join(SEGMENT_TEMPLATE)
    }

    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    /// Delete every manifest and segment file, leaving anything else alone.
    ///
    /// Best effort: a file that cannot be removed is logged and skipped, and
    /// the purge carries on with the rest.
    pub fn purge(&self) -> PurgeReport {
        let mut report = PurgeReport::default();

        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Err(e) = self.ensure() {
                    warn!("Failed to create workspace {}: {}", self.dir.display(), e);
                }
                return report;
            }
            Err(e) => {
                warn!("Failed to list workspace {}: {}", self.dir.display(), e);
                report.failures.push(PurgeFileError {
                    path: self.dir.clone(),
                    source: e,
                });
                return report;
            }
        };

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!("Skipping unreadable workspace entry: {}", e);
                    continue;
                }
            };

            if ArtifactKind::from_path(&path).is_none() {
                continue;
            }

            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!("removed {}", path.display());
                    report.removed += 1;
                }
                Err(source) => {
                    let failure = PurgeFileError { path, source };
                    warn!("{}", failure);
                    report.failures.push(failure);
                }
            }
        }

        info!(
            removed = report.removed,
            failed = report.failures.len(),
            "purged workspace {}",
            self.dir.display()
        );
        report
    }

    /// Resolve a requested artifact name to a path inside the workspace.
    ///
    /// Only bare manifest/segment file names resolve; anything that could
    /// escape the directory does not.
    pub fn artifact_path(&self, name: &str) -> Option<(PathBuf, ArtifactKind)> {
        if name.is_empty()
            || name.starts_with('.')
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
        {
            return None;
        }
        let path = self.dir.join(name);
        let kind = ArtifactKind::from_path(&path)?;
        Some((path, kind))
    }
}
