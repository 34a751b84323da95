//! Test-case fixtures for the UI scripts
//!
//! Fixtures come from the run request written by the relay (dynamic) when one
//! exists, otherwise from the static fixture file. Both are keyed by test-case
//! id (`TC13`, `EDGE2`, ...).

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::utils::Config;

#[derive(Debug, Error)]
pub enum TestDataError {
    #[error("Failed to load test data from {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse test data in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Test data in {0} is not an object")]
    NotAnObject(PathBuf),

    #[error("Test data not found for ID: {id} (available: {available})")]
    NotFound { id: String, available: String },

    #[error("Failed to save test data to {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Which file the fixtures were loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Dynamic,
    Static,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDataInfo {
    pub static_data_exists: bool,
    pub dynamic_data_exists: bool,
    pub total_test_cases: usize,
    pub test_case_ids: Vec<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

pub struct TestDataStore {
    static_path: PathBuf,
    dynamic_path: PathBuf,
    source: DataSource,
    cases: Map<String, Value>,
}

impl TestDataStore {
    /// Load from the request working file, falling back to the static fixtures
    pub fn load(static_path: &Path, dynamic_path: &Path) -> Result<Self, TestDataError> {
        let mut store = Self {
            static_path: static_path.to_path_buf(),
            dynamic_path: dynamic_path.to_path_buf(),
            source: DataSource::Static,
            cases: Map::new(),
        };
        store.reload()?;
        Ok(store)
    }

    pub fn from_config(config: &Config) -> Result<Self, TestDataError> {
        Self::load(&config.static_data_path(), &config.request_path())
    }

    pub fn reload(&mut self) -> Result<(), TestDataError> {
        if self.dynamic_path.exists() {
            info!("Loading dynamic test data from {}", self.dynamic_path.display());
            let data = read_json(&self.dynamic_path)?;
            self.cases = from_dynamic(data, &self.dynamic_path)?;
            self.source = DataSource::Dynamic;
        } else {
            info!("Loading static test data from {}", self.static_path.display());
            let data = read_json(&self.static_path)?;
            self.cases = match data {
                Value::Object(map) => map,
                _ => return Err(TestDataError::NotAnObject(self.static_path.clone())),
            };
            self.source = DataSource::Static;
        }
        debug!("Loaded {} test cases", self.cases.len());
        Ok(())
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    /// Fixture for one test case; surrounding whitespace in `id` is ignored
    pub fn get(&self, id: &str) -> Result<&Value, TestDataError> {
        let id = id.trim();
        self.cases.get(id).ok_or_else(|| TestDataError::NotFound {
            id: id.to_string(),
            available: self.ids().join(", "),
        })
    }

    pub fn ids(&self) -> Vec<&str> {
        self.cases.keys().map(String::as_str).collect()
    }

    /// Ids containing `pattern`, e.g. `TC` or `EDGE`
    pub fn filter_by_pattern(&self, pattern: &str) -> Vec<&str> {
        self.ids().into_iter().filter(|id| id.contains(pattern)).collect()
    }

    /// Fixtures for several ids; fails on the first unknown id
    pub fn get_many(&self, ids: &[&str]) -> Result<Map<String, Value>, TestDataError> {
        ids.iter()
            .map(|id| -> Result<(String, Value), TestDataError> {
                Ok((id.trim().to_string(), self.get(id)?.clone()))
            })
            .collect()
    }

    /// Write `data` as pretty JSON to `path`, or to the dynamic file
    pub fn save(&self, data: &Value, path: Option<&Path>) -> Result<PathBuf, TestDataError> {
        let target = path.unwrap_or(&self.dynamic_path).to_path_buf();
        let json = serde_json::to_string_pretty(data).map_err(|e| TestDataError::Parse {
            path: target.clone(),
            source: e,
        })?;
        std::fs::write(&target, json).map_err(|e| TestDataError::Save {
            path: target.clone(),
            source: e,
        })?;
        info!("Test data saved to {}", target.display());
        Ok(target)
    }

    pub fn info(&self) -> TestDataInfo {
        let last_modified = std::fs::metadata(&self.dynamic_path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        TestDataInfo {
            static_data_exists: self.static_path.exists(),
            dynamic_data_exists: self.dynamic_path.exists(),
            total_test_cases: self.cases.len(),
            test_case_ids: self.ids().into_iter().map(str::to_string).collect(),
            last_modified,
        }
    }
}

/// Check a fixture document has a recognised shape
pub fn validate(data: &Value) -> Result<(), &'static str> {
    let Value::Object(map) = data else {
        return Err("Test data must be an object");
    };
    let has_cases = map
        .keys()
        .any(|k| k.starts_with("TC") || k.starts_with("EDGE"));
    if has_cases || map.contains_key("testData") || map.contains_key("tests") {
        Ok(())
    } else {
        Err("Invalid test data format. Expected test cases (TC*) or testData/tests properties")
    }
}

fn read_json(path: &Path) -> Result<Value, TestDataError> {
    let raw = std::fs::read_to_string(path).map_err(|e| TestDataError::Load {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&raw).map_err(|e| TestDataError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Dynamic documents are `{ testData: {..} }`, `{ tests: [..] }` or a bare id map
fn from_dynamic(data: Value, path: &Path) -> Result<Map<String, Value>, TestDataError> {
    let Value::Object(mut map) = data else {
        return Err(TestDataError::NotAnObject(path.to_path_buf()));
    };
    match (map.remove("testData"), map.remove("tests")) {
        (Some(Value::Object(cases)), _) => Ok(cases),
        (_, Some(Value::Array(tests))) => Ok(tests_to_map(tests)),
        (test_data, tests) => {
            // not one of the wrapped shapes, put things back
            if let Some(v) = test_data {
                map.insert("testData".to_string(), v);
            }
            if let Some(v) = tests {
                map.insert("tests".to_string(), v);
            }
            Ok(map)
        }
    }
}

/// Key each descriptor by `testId`, then `id`, then its 1-based position.
/// Empty strings and zero do not count as an id.
fn tests_to_map(tests: Vec<Value>) -> Map<String, Value> {
    tests
        .into_iter()
        .enumerate()
        .map(|(index, test)| {
            let id = ["testId", "id"]
                .iter()
                .find_map(|key| match test.get(key) {
                    Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                    Some(Value::Number(n)) if n.as_f64() != Some(0.0) => Some(n.to_string()),
                    _ => None,
                })
                .unwrap_or_else(|| format!("TC{}", index + 1));
            (id, test)
        })
        .collect()
}
