use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use crate::config::ApiConfig;
use crate::utils::retry::{retry_async_with_config, RetryConfig};

/// Completion/XP report sent to the backend after every non-study answer.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionReport {
    pub challenge_id: String,
    pub is_correct: bool,
    pub time_spent_seconds: f64,
}

#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn send(&self, report: &CompletionReport) -> Result<()>;
}

pub struct HttpProgressReporter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProgressReporter {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(api.request_timeout_seconds))
            .build()
            .context("Failed to build reporting HTTP client")?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ProgressReporter for HttpProgressReporter {
    async fn send(&self, report: &CompletionReport) -> Result<()> {
        let url = format!("{}/v1/progress", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(report)
            .send()
            .await
            .context("Failed to call progress endpoint")?;

        if !response.status().is_success() {
            anyhow::bail!("Progress endpoint returned status: {}", response.status());
        }

        Ok(())
    }
}

/// Fire-and-forget dispatch. The engine never waits on a report and a
/// failed delivery never reaches the user; the background task retries
/// with backoff and logs terminal failures.
pub struct ReportService {
    reporter: Option<Arc<dyn ProgressReporter>>,
}

impl ReportService {
    pub fn new(reporter: Option<Arc<dyn ProgressReporter>>) -> Self {
        Self { reporter }
    }

    pub fn report(&self, report: CompletionReport) {
        let Some(reporter) = self.reporter.clone() else {
            return;
        };

        tokio::spawn(async move {
            let challenge_id = report.challenge_id.clone();
            let res = retry_async_with_config(RetryConfig::aggressive(), || async {
                reporter.send(&report).await
            })
            .await;

            match res {
                Ok(()) => tracing::debug!("Progress reported for challenge {}", challenge_id),
                Err(e) => tracing::error!(
                    "Background progress report failed for challenge {}: {:#}",
                    challenge_id,
                    e
                ),
            }
        });
    }
}
