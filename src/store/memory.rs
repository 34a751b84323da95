use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{is_plain_filename, sort_newest_first, ArchiveEntry, ArtifactSource, ReportStore, StoreError};
use crate::report::json;
use crate::report::types::{RunReport, RunRequest};

/// In-process store holding the same documents [`super::FileStore`] writes
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    request: Option<String>,
    results: Option<String>,
    attachments: HashMap<PathBuf, Vec<u8>>,
    archive: Option<BTreeMap<String, (String, DateTime<Utc>)>>,
    latest: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Place a result tree as if the runner had written it
    pub fn set_results(&self, raw: impl Into<String>) {
        self.lock().results = Some(raw.into());
    }

    pub fn clear_results(&self) {
        self.lock().results = None;
    }

    pub fn insert_attachment(&self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.lock().attachments.insert(path.into(), bytes);
    }

    /// Last saved request document
    pub fn saved_request(&self) -> Option<String> {
        self.lock().request.clone()
    }

    /// Raw archived document
    pub fn archived_raw(&self, filename: &str) -> Option<String> {
        self.lock()
            .archive
            .as_ref()
            .and_then(|a| a.get(filename).map(|(raw, _)| raw.clone()))
    }
}

fn parse(name: &str, raw: &str) -> Result<serde_json::Value, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::json(name, e))
}

impl ReportStore for MemoryStore {
    fn save_request(&self, request: &RunRequest) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(request)
            .map_err(|e| StoreError::json("run request", e))?;
        self.lock().request = Some(json);
        Ok(())
    }

    fn archive(&self, filename: &str, report: &RunReport) -> Result<(), StoreError> {
        let json = json::to_pretty(report).map_err(|e| StoreError::json(filename, e))?;
        let mut inner = self.lock();
        let archive = inner.archive.get_or_insert_with(BTreeMap::new);
        if archive.contains_key(filename) {
            return Err(StoreError::Exists(filename.to_string()));
        }
        archive.insert(filename.to_string(), (json, Utc::now()));
        Ok(())
    }

    fn write_latest(&self, report: &RunReport) -> Result<(), StoreError> {
        let json = json::to_pretty(report).map_err(|e| StoreError::json("latest report", e))?;
        self.lock().latest = Some(json);
        Ok(())
    }

    fn latest(&self) -> Result<Option<serde_json::Value>, StoreError> {
        self.lock()
            .latest
            .as_deref()
            .map(|raw| parse("latest report", raw))
            .transpose()
    }

    fn archived(&self, filename: &str) -> Result<Option<serde_json::Value>, StoreError> {
        if !is_plain_filename(filename) {
            return Ok(None);
        }
        self.archived_raw(filename)
            .map(|raw| parse(filename, &raw))
            .transpose()
    }

    fn list_archive(&self) -> Result<Option<Vec<ArchiveEntry>>, StoreError> {
        let inner = self.lock();
        let Some(archive) = inner.archive.as_ref() else {
            return Ok(None);
        };
        let mut entries: Vec<ArchiveEntry> = archive
            .iter()
            .map(|(name, (raw, at))| ArchiveEntry {
                filename: name.clone(),
                size: raw.len() as u64,
                created: *at,
                modified: *at,
            })
            .collect();
        sort_newest_first(&mut entries);
        Ok(Some(entries))
    }
}

impl ArtifactSource for MemoryStore {
    fn read_results(&self) -> Result<Option<String>, StoreError> {
        Ok(self.lock().results.clone())
    }

    fn read_attachment(&self, path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock().attachments.get(path).cloned())
    }
}
