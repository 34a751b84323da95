use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinError;

use super::TestRunner;
use crate::notify::{self, DeliveryOutcome, Notifier};
use crate::parser::results::{self, ExtractError};
use crate::report::types::{RunReport, RunRequest};
use crate::store::{self, ArtifactSource, ReportStore, StoreError};
use crate::utils::config::SCREENSHOT_LIMIT;

/// Ways a triggered run can end without a report
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to save test data")]
    SaveRequest(#[source] StoreError),

    #[error("Test results file not generated")]
    ResultsMissing,

    #[error("Failed to parse test results")]
    Extract(#[source] ExtractError),

    #[error("Error processing test results")]
    Archive(#[source] StoreError),

    /// The run task panicked or was cancelled by runtime shutdown
    #[error("Error processing test results")]
    Aborted(#[source] JoinError),
}

impl PipelineError {
    /// Underlying cause, if any
    pub fn detail(&self) -> Option<String> {
        match self {
            PipelineError::SaveRequest(e) | PipelineError::Archive(e) => Some(e.to_string()),
            PipelineError::Extract(e) => Some(e.to_string()),
            PipelineError::Aborted(e) => Some(e.to_string()),
            PipelineError::ResultsMissing => None,
        }
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: RunReport,
    /// Archive file name of this run's report
    pub results_file: String,
    pub delivery: DeliveryOutcome,
}

/// Drives one run: persist request, run tests, extract, archive, notify.
pub struct Orchestrator {
    store: Arc<dyn ReportStore>,
    artifacts: Arc<dyn ArtifactSource>,
    runner: Arc<dyn TestRunner>,
    notifier: Arc<dyn Notifier>,
    screenshot_limit: usize,
    /// Runs share the working file and the runner output, one at a time
    trigger_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ReportStore>,
        artifacts: Arc<dyn ArtifactSource>,
        runner: Arc<dyn TestRunner>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            artifacts,
            runner,
            notifier,
            screenshot_limit: SCREENSHOT_LIMIT,
            trigger_lock: Mutex::new(()),
        }
    }

    pub fn with_screenshot_limit(mut self, limit: usize) -> Self {
        self.screenshot_limit = limit;
        self
    }

    /// Read side used by the query endpoints
    pub fn store(&self) -> &dyn ReportStore {
        self.store.as_ref()
    }

    /// Run the whole pipeline for `request`.
    ///
    /// Returns once the callback attempt (if any) has finished. Callback
    /// failures are logged and do not turn into errors.
    ///
    /// The pipeline runs on its own task: dropping the returned future (a
    /// caller that hung up) detaches from the run but does not cancel it, so
    /// the report is still archived and delivered.
    pub async fn trigger(
        self: &Arc<Self>,
        request: RunRequest,
    ) -> Result<RunOutcome, PipelineError> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run(request).await })
            .await
            .map_err(|e| {
                error!("Run task ended abnormally: {}", e);
                PipelineError::Aborted(e)
            })?
    }

    async fn run(&self, request: RunRequest) -> Result<RunOutcome, PipelineError> {
        let _guard = self.trigger_lock.lock().await;
        info!("Received run request for project {}", request.project_id);

        self.store.save_request(&request).map_err(|e| {
            error!("Error saving run request: {}", e);
            PipelineError::SaveRequest(e)
        })?;
        info!("Run request saved");

        match self.runner.execute().await {
            Ok(done) => info!(
                "Test runner finished in {} ms (exit code {:?})",
                done.duration_ms, done.exit_code
            ),
            // still look for output: a runner can fail after writing results
            Err(e) => warn!("Test runner did not complete cleanly: {:#}", e),
        }

        let raw = match self.artifacts.read_results() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                error!("Result tree not found after test execution");
                return Err(PipelineError::ResultsMissing);
            }
            Err(e) => {
                error!("Could not read result tree: {}", e);
                return Err(PipelineError::Extract(ExtractError::Read(e)));
            }
        };

        let report = results::extract_json(
            &raw,
            &request.project_id,
            self.artifacts.as_ref(),
            self.screenshot_limit,
        )
        .map_err(|e| {
            error!("Failed to parse test results: {}", e);
            PipelineError::Extract(e)
        })?;
        info!("Parsed {}", report.summary());

        let results_file = self.publish(&report, Utc::now())?;
        let delivery =
            notify::relay(self.notifier.as_ref(), request.callback_url.as_deref(), &report).await;

        Ok(RunOutcome {
            report,
            results_file,
            delivery,
        })
    }

    /// Archive under a timestamped name, then replace the latest report
    fn publish(&self, report: &RunReport, at: DateTime<Utc>) -> Result<String, PipelineError> {
        let filename = store::archive_filename(at);
        self.store.archive(&filename, report).map_err(|e| {
            error!("Error archiving results: {}", e);
            PipelineError::Archive(e)
        })?;
        info!("Results saved to {}", filename);

        self.store.write_latest(report).map_err(|e| {
            error!("Error updating latest results: {}", e);
            PipelineError::Archive(e)
        })?;
        info!("Latest results updated");

        Ok(filename)
    }
}
