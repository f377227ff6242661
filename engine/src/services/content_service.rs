use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::errors::ContentError;
use crate::models::{Challenge, ChallengeType, SessionSource};

/// Content backend contract. A fetch failure surfaces as a typed error,
/// never as an empty session.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn fetch_challenges(
        &self,
        language: &str,
        level: &str,
        challenge_type: ChallengeType,
        count: u32,
        source: SessionSource,
    ) -> Result<Vec<Challenge>, ContentError>;
}

#[derive(Debug, Serialize)]
struct FetchChallengesRequest<'a> {
    language: &'a str,
    cefr_level: &'a str,
    challenge_type: ChallengeType,
    count: u32,
    source: SessionSource,
}

#[derive(Debug, Deserialize)]
struct FetchChallengesResponse {
    challenges: Vec<Challenge>,
}

pub struct HttpContentProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContentProvider {
    pub fn new(api: &ApiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(api.request_timeout_seconds))
            .build()
            .context("Failed to build content HTTP client")?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ContentProvider for HttpContentProvider {
    async fn fetch_challenges(
        &self,
        language: &str,
        level: &str,
        challenge_type: ChallengeType,
        count: u32,
        source: SessionSource,
    ) -> Result<Vec<Challenge>, ContentError> {
        let url = format!("{}/v1/challenges", self.base_url);

        tracing::debug!(
            "Fetching challenges: url={}, language={}, level={}, type={}, count={}",
            url,
            language,
            level,
            challenge_type,
            count
        );

        let response = self
            .client
            .post(&url)
            .json(&FetchChallengesRequest {
                language,
                cefr_level: level,
                challenge_type,
                count,
                source,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ContentError::Backend { status, message });
        }

        let body: FetchChallengesResponse = response
            .json()
            .await
            .map_err(|e| ContentError::Malformed(e.to_string()))?;

        tracing::info!(
            "Fetched {} challenges for language={}, type={}",
            body.challenges.len(),
            language,
            challenge_type
        );

        Ok(body.challenges)
    }
}
