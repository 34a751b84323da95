//! Flattens the runner's result tree into one record per executed test.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, info, warn};
use std::path::PathBuf;
use thiserror::Error;

use super::types::{Attempt, ResultTree, Spec, TestEntry};
use crate::report::types::{ErrorDetail, ResultRecord, RunReport, TestStatus};
use crate::store::{ArtifactSource, StoreError};

/// Directory name as misspelled in some reporter configurations
const RESULTS_DIR_TYPO: &str = "test-resultts";
const RESULTS_DIR: &str = "test-results";
const SCREENSHOT_ATTACHMENT: &str = "screenshot";
const TRUNCATION_MARKER: &str = "...";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("result tree not found")]
    Missing,

    #[error("could not read result tree: {0}")]
    Read(#[from] StoreError),

    #[error("invalid result tree: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("test '{0}' has no recorded attempts")]
    NoAttempts(String),
}

/// First whitespace-delimited token of a spec title
pub fn test_case_id(title: &str) -> &str {
    title.split_whitespace().next().unwrap_or("")
}

/// Keep at most `limit` characters, marking the cut
pub fn truncate_screenshot(mut encoded: String, limit: usize) -> String {
    // base64 output is ASCII, any byte index is a char boundary
    if encoded.len() > limit {
        encoded.truncate(limit);
        encoded.push_str(TRUNCATION_MARKER);
    }
    encoded
}

/// Attachment path with the results directory typo corrected
pub fn attachment_path(raw: &str) -> PathBuf {
    PathBuf::from(raw.replacen(RESULTS_DIR_TYPO, RESULTS_DIR, 1))
}

/// Read the result tree from `artifacts` and flatten it
pub fn parse_results(
    artifacts: &dyn ArtifactSource,
    project_id: &str,
    screenshot_limit: usize,
) -> Result<RunReport, ExtractError> {
    info!("Parsing result tree");
    let raw = artifacts.read_results()?.ok_or(ExtractError::Missing)?;
    extract_json(&raw, project_id, artifacts, screenshot_limit)
}

pub fn extract_json(
    raw: &str,
    project_id: &str,
    artifacts: &dyn ArtifactSource,
    screenshot_limit: usize,
) -> Result<RunReport, ExtractError> {
    let tree: ResultTree = serde_json::from_str(raw)?;
    extract(&tree, project_id, artifacts, screenshot_limit)
}

/// Flatten `tree` in walk order, see [`super::types::Walk`]
pub fn extract(
    tree: &ResultTree,
    project_id: &str,
    artifacts: &dyn ArtifactSource,
    screenshot_limit: usize,
) -> Result<RunReport, ExtractError> {
    let tests = tree
        .walk()
        .map(|(spec, test)| to_record(spec, test, artifacts, screenshot_limit))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RunReport {
        project_id: project_id.to_string(),
        tests,
    })
}

fn to_record(
    spec: &Spec,
    test: &TestEntry,
    artifacts: &dyn ArtifactSource,
    screenshot_limit: usize,
) -> Result<ResultRecord, ExtractError> {
    // Only the final attempt counts, earlier ones are retries
    let last = test
        .results
        .last()
        .ok_or_else(|| ExtractError::NoAttempts(spec.title.clone()))?;

    let mut record = ResultRecord {
        test_case_id: test_case_id(&spec.title).to_string(),
        status: last.status,
        error: None,
        screenshot: None,
    };

    if last.status == TestStatus::Failed {
        record.error = Some(last.error.as_ref().map(|e| ErrorDetail {
            message: e.message.clone(),
            stack: e.stack.clone(),
        }));
        record.screenshot = screenshot(last, artifacts, screenshot_limit);
    }

    Ok(record)
}

fn screenshot(
    attempt: &Attempt,
    artifacts: &dyn ArtifactSource,
    screenshot_limit: usize,
) -> Option<String> {
    let raw = attempt
        .attachments
        .iter()
        .find(|a| a.name == SCREENSHOT_ATTACHMENT)?
        .path
        .as_deref()?;
    let path = attachment_path(raw);

    match artifacts.read_attachment(&path) {
        Ok(Some(bytes)) => Some(truncate_screenshot(STANDARD.encode(bytes), screenshot_limit)),
        Ok(None) => {
            debug!("Screenshot {} not found, skipping", path.display());
            None
        }
        Err(e) => {
            warn!("Could not read screenshot {}: {}", path.display(), e);
            None
        }
    }
}
