use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::{ApiConfig, HeartsConfig, RefillPolicy};
use crate::metrics::{HEARTS_CONSUMED_TOTAL, HEARTS_EXHAUSTED_TOTAL};
use crate::models::{ChallengeType, HeartGrant, HeartPool, HeartResponse, RefillInfo};

/// Remote ground truth for heart balances. The endpoint performs the
/// decrement server-side and returns the new balance; it must stay
/// callable after it has already reported an empty pool (idempotent
/// read-through).
#[async_trait]
pub trait HeartAuthority: Send + Sync {
    async fn consume(&self, user_id: &str, challenge_type: ChallengeType) -> Result<HeartGrant>;
}

#[derive(Debug, Serialize)]
struct ConsumeHeartRequest<'a> {
    user_id: &'a str,
    challenge_type: ChallengeType,
}

pub struct HttpHeartAuthority {
    client: reqwest::Client,
    base_url: String,
}

impl HttpHeartAuthority {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(api.request_timeout_seconds))
            .build()
            .context("Failed to build hearts HTTP client")?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl HeartAuthority for HttpHeartAuthority {
    async fn consume(&self, user_id: &str, challenge_type: ChallengeType) -> Result<HeartGrant> {
        let url = format!("{}/v1/hearts/consume", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ConsumeHeartRequest {
                user_id,
                challenge_type,
            })
            .send()
            .await
            .context("Failed to call hearts endpoint")?;

        if !response.status().is_success() {
            anyhow::bail!("Hearts endpoint returned status: {}", response.status());
        }

        let grant: HeartGrant = response
            .json()
            .await
            .context("Failed to parse hearts response")?;

        Ok(grant)
    }
}

/// Tracks one pool per challenge type. Pools are owned here, not by the
/// session, so exhausting hearts in one session is visible to the next
/// one; there is no cross-type borrowing.
///
/// `consume` never fails: when the remote authority is unreachable the
/// local cached pool is authoritative and reconciliation happens on the
/// next successful contact.
pub struct HeartAccountant {
    config: HeartsConfig,
    authority: Option<Arc<dyn HeartAuthority>>,
    pools: HashMap<ChallengeType, HeartPool>,
}

impl HeartAccountant {
    pub fn new(config: HeartsConfig, authority: Option<Arc<dyn HeartAuthority>>) -> Self {
        Self {
            config,
            authority,
            pools: HashMap::new(),
        }
    }

    pub async fn consume(&mut self, user_id: &str, challenge_type: ChallengeType) -> HeartResponse {
        self.consume_at(user_id, challenge_type, Utc::now()).await
    }

    pub async fn consume_at(
        &mut self,
        user_id: &str,
        challenge_type: ChallengeType,
        now: DateTime<Utc>,
    ) -> HeartResponse {
        let capacity = self.config.capacity;
        let policy = self.config.refill_policy;
        let interval = Duration::seconds(self.config.refill_interval_seconds);

        let pool = self
            .pools
            .entry(challenge_type)
            .or_insert_with(|| HeartPool::full(capacity));

        apply_refills(pool, policy, interval, now);

        match &self.authority {
            Some(authority) => match authority.consume(user_id, challenge_type).await {
                Ok(grant) => {
                    // Server performed the decrement; its balance wins.
                    pool.remaining = grant.hearts_remaining.min(pool.capacity);
                    pool.next_refill_at = grant.next_refill_at;
                }
                Err(e) => {
                    tracing::warn!(
                        "Hearts endpoint unreachable, falling back to local pool: {}",
                        e
                    );
                    decrement_local(pool);
                }
            },
            None => decrement_local(pool),
        }

        // Per-heart regeneration starts as soon as a heart is missing;
        // a full reset counts from the moment the pool empties.
        let should_arm = match policy {
            RefillPolicy::PerHeartInterval => pool.remaining < pool.capacity,
            RefillPolicy::FullReset => pool.is_exhausted(),
        };
        if should_arm && pool.next_refill_at.is_none() {
            pool.next_refill_at = Some(now + interval);
        }

        HEARTS_CONSUMED_TOTAL
            .with_label_values(&[challenge_type.as_str()])
            .inc();

        let out_of_hearts = pool.is_exhausted();
        let refill_info = if out_of_hearts {
            HEARTS_EXHAUSTED_TOTAL
                .with_label_values(&[challenge_type.as_str()])
                .inc();
            pool.next_refill_at.map(|next_refill_at| RefillInfo {
                next_refill_at,
                wait_seconds: (next_refill_at - now).num_seconds().max(0),
            })
        } else {
            None
        };

        tracing::debug!(
            "Heart consumed: type={}, remaining={}, out_of_hearts={}",
            challenge_type,
            pool.remaining,
            out_of_hearts
        );

        HeartResponse {
            out_of_hearts,
            hearts_remaining: pool.remaining,
            refill_info,
        }
    }

    /// External grant (purchase, reward). Clamped to capacity.
    pub fn grant(&mut self, challenge_type: ChallengeType, count: u32) {
        let capacity = self.config.capacity;
        let pool = self
            .pools
            .entry(challenge_type)
            .or_insert_with(|| HeartPool::full(capacity));

        pool.remaining = (pool.remaining + count).min(pool.capacity);
        if pool.remaining == pool.capacity {
            pool.next_refill_at = None;
        }

        tracing::info!(
            "Hearts granted: type={}, count={}, remaining={}",
            challenge_type,
            count,
            pool.remaining
        );
    }

    /// Current pool state with pending refills applied.
    pub fn pool_at(&mut self, challenge_type: ChallengeType, now: DateTime<Utc>) -> HeartPool {
        let capacity = self.config.capacity;
        let policy = self.config.refill_policy;
        let interval = Duration::seconds(self.config.refill_interval_seconds);

        let pool = self
            .pools
            .entry(challenge_type)
            .or_insert_with(|| HeartPool::full(capacity));
        apply_refills(pool, policy, interval, now);
        pool.clone()
    }

    pub fn pool(&mut self, challenge_type: ChallengeType) -> HeartPool {
        self.pool_at(challenge_type, Utc::now())
    }
}

fn decrement_local(pool: &mut HeartPool) {
    // Never below zero; a call against an empty pool just reports it.
    if pool.remaining > 0 {
        pool.remaining -= 1;
    }
}

fn apply_refills(
    pool: &mut HeartPool,
    policy: RefillPolicy,
    interval: Duration,
    now: DateTime<Utc>,
) {
    let Some(due) = pool.next_refill_at else {
        return;
    };
    if now < due {
        return;
    }

    match policy {
        RefillPolicy::FullReset => {
            pool.remaining = pool.capacity;
            pool.next_refill_at = None;
        }
        RefillPolicy::PerHeartInterval => {
            let interval_seconds = interval.num_seconds().max(1);
            let elapsed = (now - due).num_seconds();
            let credited = (1 + elapsed / interval_seconds) as u32;
            pool.remaining = (pool.remaining + credited).min(pool.capacity);
            pool.next_refill_at = if pool.remaining < pool.capacity {
                Some(due + Duration::seconds(credited as i64 * interval_seconds))
            } else {
                None
            };
        }
    }
}
