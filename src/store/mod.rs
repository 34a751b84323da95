//! Durable run state
//!
//! The relay keeps all of its state on disk: the request of the current run,
//! the runner's result tree, an append-only archive of reports and a "latest"
//! copy. Access goes through [`ReportStore`] and [`ArtifactSource`] so the
//! pipeline can run against [`MemoryStore`] in tests.

pub mod fs;
pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::report::types::{RunReport, RunRequest};
use crate::utils::iso_timestamp;

pub use fs::FileStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive entry {0} already exists")]
    Exists(String),

    #[error("invalid JSON in {name}: {source}")]
    Json {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(name: impl Into<String>, source: serde_json::Error) -> Self {
        StoreError::Json {
            name: name.into(),
            source,
        }
    }
}

/// Archive listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub filename: String,
    pub size: u64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Run requests, archived reports and the latest report
pub trait ReportStore: Send + Sync {
    /// Overwrite the working file with the incoming request
    fn save_request(&self, request: &RunRequest) -> Result<(), StoreError>;

    /// Write a new archive entry, creating the archive if needed. Existing
    /// entries are never replaced: a taken name is [`StoreError::Exists`].
    fn archive(&self, filename: &str, report: &RunReport) -> Result<(), StoreError>;

    /// Overwrite the latest report
    fn write_latest(&self, report: &RunReport) -> Result<(), StoreError>;

    /// Latest report, `None` before the first completed run
    fn latest(&self) -> Result<Option<serde_json::Value>, StoreError>;

    /// Archived report by plain file name, `None` if it does not exist
    fn archived(&self, filename: &str) -> Result<Option<serde_json::Value>, StoreError>;

    /// Archive listing, newest first. `None` when no archive exists yet.
    fn list_archive(&self) -> Result<Option<Vec<ArchiveEntry>>, StoreError>;
}

/// Files produced by the runner
pub trait ArtifactSource: Send + Sync {
    /// Raw result tree JSON, `None` when the runner produced nothing
    fn read_results(&self) -> Result<Option<String>, StoreError>;

    /// Attachment bytes, `None` when the file does not exist
    fn read_attachment(&self, path: &Path) -> Result<Option<Vec<u8>>, StoreError>;
}

/// `results-<timestamp>.json` with `:` and `.` of the ISO timestamp replaced by `-`
pub fn archive_filename(at: DateTime<Utc>) -> String {
    format!("results-{}.json", iso_timestamp(at).replace([':', '.'], "-"))
}

/// Archive lookups accept bare file names only
pub fn is_plain_filename(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

pub(crate) fn sort_newest_first(entries: &mut [ArchiveEntry]) {
    entries.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.filename.cmp(&a.filename))
    });
}
