pub mod orchestrator;
pub mod process;

use anyhow::Result;
use async_trait::async_trait;

pub use orchestrator::{Orchestrator, PipelineError, RunOutcome};
pub use process::ProcessRunner;

/// Runner exit information. Logged, never used to judge the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCompletion {
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

/// External test runner
///
/// Runs every configured test and leaves its result tree where the
/// [`crate::store::ArtifactSource`] can find it.
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn execute(&self) -> Result<RunCompletion>;
}
