//! Callback delivery
//!
//! Reports are POSTed once to the subscriber's callback URL. Delivery is best
//! effort: a rejected or failed POST is logged, never retried and never fails
//! the run.

use async_trait::async_trait;
use log::{error, info};
use thiserror::Error;

use crate::report::types::RunReport;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Transport(String),
}

/// What happened to a callback attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { status: u16 },
    Rejected { status: u16 },
    Failed { reason: String },
    /// No callback URL on the request, or an empty one
    Skipped,
}

/// Transport for callback POSTs
#[async_trait]
pub trait Notifier: Send + Sync {
    /// POST `report` as JSON to `url`, returning the response status code
    async fn post(&self, url: &str, report: &RunReport) -> Result<u16, NotifyError>;
}

/// reqwest-backed notifier using the client's default timeouts
#[derive(Debug, Clone, Default)]
pub struct HttpNotifier {
    client: reqwest::Client,
}

impl HttpNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn post(&self, url: &str, report: &RunReport) -> Result<u16, NotifyError> {
        let response = self.client.post(url).json(report).send().await?;
        Ok(response.status().as_u16())
    }
}

/// Deliver `report` to `callback_url` if one was given. An empty URL counts
/// as none.
pub async fn relay(
    notifier: &dyn Notifier,
    callback_url: Option<&str>,
    report: &RunReport,
) -> DeliveryOutcome {
    let Some(url) = callback_url.filter(|url| !url.is_empty()) else {
        return DeliveryOutcome::Skipped;
    };

    match notifier.post(url, report).await {
        Ok(status) if (200..300).contains(&status) => {
            info!("Results sent to callback {} ({})", url, status);
            DeliveryOutcome::Delivered { status }
        }
        Ok(status) => {
            error!("Callback {} rejected results with status {}", url, status);
            DeliveryOutcome::Rejected { status }
        }
        Err(e) => {
            error!("Error sending results to callback {}: {}", url, e);
            DeliveryOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}
