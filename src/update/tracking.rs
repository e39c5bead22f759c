//! Tracking files: when a remote resource was last checked, and how that
//! check went.
//!
//! Artifacts keep a `<file>.lastUpdated` file next to the artifact, keyed by
//! repository URL. Metadata share one `resolver-status.json` per directory,
//! keyed by `<file name>/<repository URL>`.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ARTIFACT_TRACKING_SUFFIX: &str = ".lastUpdated";
pub const METADATA_TRACKING_FILE: &str = "resolver-status.json";

/// Outcome of the last remote check against one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEntry {
    pub last_updated: DateTime<Utc>,
    /// `None` after success, empty after not-found, the message otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingFile {
    #[serde(default)]
    pub entries: BTreeMap<String, TrackingEntry>,
}

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl TrackingFile {
    /// Load a tracking file; a missing file reads as empty.
    pub fn read(path: &Path) -> Result<Self, TrackingError> {
        match fs::read_to_string(path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write atomically (write-then-rename).
    pub fn write(&self, path: &Path) -> Result<(), TrackingError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let mut temp_path = path.as_os_str().to_owned();
        temp_path.push(".tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&TrackingEntry> {
        self.entries.get(key)
    }

    pub fn record(&mut self, key: impl Into<String>, entry: TrackingEntry) {
        self.entries.insert(key.into(), entry);
    }
}

/// `<artifact file>.lastUpdated`
pub fn artifact_tracking_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(ARTIFACT_TRACKING_SUFFIX);
    PathBuf::from(name)
}

/// `resolver-status.json` next to the metadata file.
pub fn metadata_tracking_path(file: &Path) -> PathBuf {
    file.parent()
        .map(|dir| dir.join(METADATA_TRACKING_FILE))
        .unwrap_or_else(|| PathBuf::from(METADATA_TRACKING_FILE))
}
