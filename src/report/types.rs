use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Outcome of a single test attempt as reported by the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TestStatus {
    Passed,
    Failed,
    TimedOut,
    Skipped,
    Interrupted,
    #[serde(other)]
    Unknown,
}

/// Incoming trigger request, persisted verbatim before a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    #[serde(default)]
    pub project_id: String,

    /// Test-case descriptors. Persisted for the UI scripts, never used to scope the run.
    #[serde(default)]
    pub tests: Vec<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// Error captured on a failed attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// One flattened test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub test_case_id: String,
    pub status: TestStatus,

    /// `None`: not failed. `Some(None)`: failed without a captured error (`null` on the wire).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub error: Option<Option<ErrorDetail>>,

    /// Base64 excerpt of the failure screenshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

/// Flattened results of one run, the unit that is archived and delivered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub project_id: String,
    pub tests: Vec<ResultRecord>,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total: self.tests.len(),
            ..RunSummary::default()
        };
        for record in &self.tests {
            match record.status {
                TestStatus::Passed => summary.passed += 1,
                TestStatus::Failed => summary.failed += 1,
                TestStatus::TimedOut => summary.timed_out += 1,
                TestStatus::Skipped => summary.skipped += 1,
                TestStatus::Interrupted | TestStatus::Unknown => summary.other += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub skipped: usize,
    pub other: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tests: {} passed, {} failed, {} timed out, {} skipped",
            self.total, self.passed, self.failed, self.timed_out, self.skipped
        )?;
        if self.other > 0 {
            write!(f, ", {} other", self.other)?;
        }
        Ok(())
    }
}

/// Keeps an explicit `null` distinct from a missing field
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<ErrorDetail>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<ErrorDetail>::deserialize(deserializer).map(Some)
}
