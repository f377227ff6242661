use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::storage::KeyValueStore;
use crate::utils::retry::{retry_async_with_config, RetryConfig};
use crate::utils::time::{day_key, today_local};

const COMPLETION_KEY_PREFIX: &str = "completed:";

/// Day-scoped idempotent set of completed challenge ids. Marking the same
/// id twice on the same day is a no-op; records for any day other than
/// today are garbage-collected at process start.
pub struct CompletionTracker {
    store: Arc<dyn KeyValueStore>,
}

impl CompletionTracker {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn mark_completed(&self, challenge_id: &str) {
        self.mark_completed_at(today_local(), challenge_id).await;
    }

    /// Best-effort: a store failure is logged and swallowed, it never
    /// blocks session progression.
    pub async fn mark_completed_at(&self, today: NaiveDate, challenge_id: &str) {
        if let Err(e) = self.try_mark_completed(today, challenge_id).await {
            tracing::warn!(
                "Failed to record completion for challenge {}: {:#}",
                challenge_id,
                e
            );
        }
    }

    async fn try_mark_completed(&self, today: NaiveDate, challenge_id: &str) -> Result<()> {
        let key = completion_key(today);
        let mut completed = self.load_set(&key).await?;

        if !completed.insert(challenge_id.to_string()) {
            tracing::debug!("Challenge {} already completed today", challenge_id);
            return Ok(());
        }

        let json = serde_json::to_string(&completed).context("Failed to serialize completions")?;
        retry_async_with_config(RetryConfig::aggressive(), || async {
            self.store.set(&key, &json).await
        })
        .await
        .context("Failed to persist completion record")?;

        Ok(())
    }

    pub async fn is_completed_today(&self, challenge_id: &str) -> bool {
        self.is_completed_today_at(today_local(), challenge_id)
            .await
    }

    pub async fn is_completed_today_at(&self, today: NaiveDate, challenge_id: &str) -> bool {
        match self.load_set(&completion_key(today)).await {
            Ok(completed) => completed.contains(challenge_id),
            Err(e) => {
                tracing::warn!("Failed to read completion record: {:#}", e);
                false
            }
        }
    }

    pub async fn completed_today(&self) -> usize {
        self.completed_today_at(today_local()).await
    }

    pub async fn completed_today_at(&self, today: NaiveDate) -> usize {
        self.load_set(&completion_key(today))
            .await
            .map(|set| set.len())
            .unwrap_or(0)
    }

    pub async fn cleanup_old_records(&self) {
        self.cleanup_old_records_at(today_local()).await;
    }

    /// Removes every completion day-record except today's. Invoked once at
    /// process start, never mid-session.
    pub async fn cleanup_old_records_at(&self, today: NaiveDate) {
        let todays_key = completion_key(today);

        let stale: Vec<String> = match self.store.list_keys(COMPLETION_KEY_PREFIX).await {
            Ok(keys) => keys.into_iter().filter(|k| *k != todays_key).collect(),
            Err(e) => {
                tracing::warn!("Failed to list completion records for cleanup: {:#}", e);
                return;
            }
        };

        if stale.is_empty() {
            return;
        }

        match self.store.remove_many(&stale).await {
            Ok(()) => tracing::info!("Removed {} stale completion records", stale.len()),
            Err(e) => tracing::warn!("Failed to remove stale completion records: {:#}", e),
        }
    }

    async fn load_set(&self, key: &str) -> Result<BTreeSet<String>> {
        let raw = self.store.get(key).await.context("Completion read failed")?;
        match raw {
            Some(json) => {
                serde_json::from_str(&json).context("Corrupt completion record")
            }
            None => Ok(BTreeSet::new()),
        }
    }
}

fn completion_key(day: NaiveDate) -> String {
    format!("{}{}", COMPLETION_KEY_PREFIX, day_key(day))
}
