use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::{is_plain_filename, sort_newest_first, ArchiveEntry, ArtifactSource, ReportStore, StoreError};
use crate::report::json;
use crate::report::types::{RunReport, RunRequest};
use crate::utils::Config;

/// File-backed store rooted at the configured working directory
#[derive(Debug, Clone)]
pub struct FileStore {
    workdir: PathBuf,
    request_path: PathBuf,
    results_path: PathBuf,
    archive_dir: PathBuf,
    latest_path: PathBuf,
}

impl FileStore {
    pub fn new(config: &Config) -> Self {
        Self {
            workdir: config.workdir.clone(),
            request_path: config.request_path(),
            results_path: config.results_path(),
            archive_dir: config.archive_path(),
            latest_path: config.latest_path(),
        }
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), StoreError> {
        std::fs::write(path, contents).map_err(|e| StoreError::io(path, e))
    }

    fn read_json(&self, path: &Path) -> Result<Option<serde_json::Value>, StoreError> {
        let Some(bytes) = read_optional(path)? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::json(path.display().to_string(), e))
    }
}

impl ReportStore for FileStore {
    fn save_request(&self, request: &RunRequest) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(request)
            .map_err(|e| StoreError::json("run request", e))?;
        self.write(&self.request_path, &json)
    }

    fn archive(&self, filename: &str, report: &RunReport) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.archive_dir)
            .map_err(|e| StoreError::io(&self.archive_dir, e))?;
        let json = json::to_pretty(report).map_err(|e| StoreError::json(filename, e))?;

        let path = self.archive_dir.join(filename);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::Exists(filename.to_string()))
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        file.write_all(json.as_bytes())
            .map_err(|e| StoreError::io(&path, e))
    }

    fn write_latest(&self, report: &RunReport) -> Result<(), StoreError> {
        let json = json::to_pretty(report).map_err(|e| StoreError::json("latest report", e))?;
        self.write(&self.latest_path, &json)
    }

    fn latest(&self) -> Result<Option<serde_json::Value>, StoreError> {
        self.read_json(&self.latest_path)
    }

    fn archived(&self, filename: &str) -> Result<Option<serde_json::Value>, StoreError> {
        if !is_plain_filename(filename) {
            return Ok(None);
        }
        self.read_json(&self.archive_dir.join(filename))
    }

    fn list_archive(&self) -> Result<Option<Vec<ArchiveEntry>>, StoreError> {
        let dir = &self.archive_dir;
        let read_dir = match std::fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(dir, e)),
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| StoreError::io(dir, e))?;
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let meta = entry.metadata().map_err(|e| StoreError::io(&path, e))?;
            if !meta.is_file() {
                continue;
            }
            let modified: DateTime<Utc> = meta
                .modified()
                .map_err(|e| StoreError::io(&path, e))?
                .into();
            // Birth time is not available on every filesystem
            let created = meta.created().map(DateTime::<Utc>::from).unwrap_or(modified);

            entries.push(ArchiveEntry {
                filename: entry.file_name().to_string_lossy().to_string(),
                size: meta.len(),
                created,
                modified,
            });
        }

        sort_newest_first(&mut entries);
        Ok(Some(entries))
    }
}

impl ArtifactSource for FileStore {
    fn read_results(&self) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(&self.results_path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&self.results_path, e)),
        }
    }

    fn read_attachment(&self, path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(path)
        };
        read_optional(&path)
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}
