//! Test doubles for the runner and callback transport

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::notify::{Notifier, NotifyError};
use crate::report::types::RunReport;
use crate::runner::{RunCompletion, TestRunner};
use crate::store::MemoryStore;

/// Three tests across nested suites, the middle one failed
pub fn sample_tree() -> serde_json::Value {
    json!({
        "config": { "version": "1.44.0" },
        "suites": [{
            "title": "auth/login.spec.js",
            "specs": [{
                "title": "TC13 - Valid login with registered credentials",
                "tests": [{ "projectName": "chromium", "results": [{ "status": "passed" }] }]
            }],
            "suites": [{
                "title": "Login Tests - Comprehensive Suite",
                "specs": [
                    {
                        "title": "TC14 - Invalid login with unregistered email",
                        "tests": [{
                            "projectName": "chromium",
                            "results": [{
                                "status": "failed",
                                "error": { "message": "Timeout 15000ms exceeded", "stack": "at LoginPage.validLogin" },
                                "attachments": [{
                                    "name": "screenshot",
                                    "contentType": "image/png",
                                    "path": "test-results/login-TC14/test-failed-1.png"
                                }]
                            }]
                        }]
                    },
                    {
                        "title": "TC15 - Forgot password",
                        "tests": [{ "projectName": "chromium", "results": [{ "status": "skipped" }] }]
                    }
                ]
            }]
        }],
        "errors": []
    })
}

/// Runner that optionally drops a result tree into a [`MemoryStore`]
#[derive(Default)]
pub struct FakeRunner {
    store: Option<Arc<MemoryStore>>,
    output: Option<String>,
    crash: bool,
    delay_ms: u64,
    runs: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeRunner {
    pub fn writing(store: Arc<MemoryStore>, tree: serde_json::Value) -> Self {
        Self {
            store: Some(store),
            output: Some(tree.to_string()),
            ..Self::default()
        }
    }

    /// Exits without producing anything
    pub fn silent() -> Self {
        Self::default()
    }

    /// Fails as if the runner binary could not be spawned
    pub fn crashing() -> Self {
        Self {
            crash: true,
            ..Self::default()
        }
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TestRunner for FakeRunner {
    async fn execute(&self) -> Result<RunCompletion> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.crash {
            anyhow::bail!("spawn failed: npx not found");
        }
        if let (Some(store), Some(output)) = (&self.store, &self.output) {
            store.set_results(output.clone());
        }
        Ok(RunCompletion {
            exit_code: Some(1),
            duration_ms: self.delay_ms,
        })
    }
}

/// Notifier that records every POST and answers with a fixed result
pub struct RecordingNotifier {
    response: Result<u16, String>,
    calls: Mutex<Vec<(String, RunReport)>>,
}

impl RecordingNotifier {
    pub fn responding(status: u16) -> Self {
        Self {
            response: Ok(status),
            calls: Mutex::default(),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            response: Err(reason.to_string()),
            calls: Mutex::default(),
        }
    }

    pub fn calls(&self) -> Vec<(String, RunReport)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn post(&self, url: &str, report: &RunReport) -> Result<u16, NotifyError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), report.clone()));
        self.response.clone().map_err(NotifyError::Transport)
    }
}
