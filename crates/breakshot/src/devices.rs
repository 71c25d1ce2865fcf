//! V4L2 camera probe for `breakshot devices`.

use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceStatus {
    Missing,
    Readable,
    /// The node exists but could not be opened (permissions, busy).
    Unreadable(String),
}

#[derive(Debug, Clone)]
pub struct DeviceProbe {
    pub path: PathBuf,
    pub status: DeviceStatus,
}

impl DeviceProbe {
    pub fn probe(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let status = if !path.exists() {
            DeviceStatus::Missing
        } else {
            match File::open(&path) {
                Ok(_) => DeviceStatus::Readable,
                Err(e) => DeviceStatus::Unreadable(e.to_string()),
            }
        };
        Self { path, status }
    }

    pub fn is_usable(&self) -> bool {
        self.status == DeviceStatus::Readable
    }
}

/// `/dev/video0` through `/dev/video{count-1}`.
pub fn default_candidates(count: u32) -> Vec<PathBuf> {
    (0..count)
        .map(|i| PathBuf::from(format!("/dev/video{}", i)))
        .collect()
}

pub fn probe_paths<P: AsRef<Path>>(paths: &[P]) -> Vec<DeviceProbe> {
    paths
        .iter()
        .map(|p| DeviceProbe::probe(p.as_ref()))
        .collect()
}

/// First device that can actually be opened.
pub fn recommend(probes: &[DeviceProbe]) -> Option<&DeviceProbe> {
    probes.iter().find(|p| p.is_usable())
}
