use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::config::StreakConfig;
use crate::models::{CategoryKey, CategoryStats, DailyStats, StreakInfo};
use crate::storage::KeyValueStore;
use crate::utils::retry::{retry_async_with_config, RetryConfig};
use crate::utils::time::{day_key, today_local};

const DAILY_KEY_PREFIX: &str = "stats:daily:";
const CATEGORY_KEY_PREFIX: &str = "stats:category:";
const STREAK_KEY: &str = "stats:streak";

/// Running day-keyed and category-keyed counters. All writes are
/// best-effort: a transiently unavailable store is logged and retried,
/// never allowed to abort an in-progress session. Accuracy is derived at
/// read time, never cached.
pub struct StatsService {
    store: Arc<dyn KeyValueStore>,
    streak_config: StreakConfig,
}

impl StatsService {
    pub fn new(store: Arc<dyn KeyValueStore>, streak_config: StreakConfig) -> Self {
        Self {
            store,
            streak_config,
        }
    }

    pub async fn record_answer(&self, is_correct: bool, xp: u32) {
        self.record_answer_at(today_local(), is_correct, xp).await;
    }

    /// The day key comes from the date the answer actually lands on, not
    /// from session start time; a session spanning midnight splits its
    /// answers across both days.
    pub async fn record_answer_at(&self, today: NaiveDate, is_correct: bool, xp: u32) {
        if let Err(e) = self.try_record_answer(today, is_correct, xp).await {
            tracing::warn!("Failed to record daily stats: {:#}", e);
        }
        if let Err(e) = self.try_update_streak(today).await {
            tracing::warn!("Failed to update streak: {:#}", e);
        }
    }

    async fn try_record_answer(&self, today: NaiveDate, is_correct: bool, xp: u32) -> Result<()> {
        let key = format!("{}{}", DAILY_KEY_PREFIX, day_key(today));

        let mut stats: DailyStats = self.load_json(&key).await?.unwrap_or_default();
        stats.total_challenges += 1;
        if is_correct {
            stats.correct_challenges += 1;
        }
        stats.total_xp += xp;

        self.store_json(&key, &stats).await
    }

    async fn try_update_streak(&self, today: NaiveDate) -> Result<()> {
        let mut streak: StreakInfo = self.load_json(STREAK_KEY).await?.unwrap_or_default();

        match streak.last_active_day {
            // already counted for today
            Some(last) if last == today => return Ok(()),
            // clock moved backwards (travel, manual change): leave the
            // streak alone rather than punishing the user
            Some(last) if last > today => return Ok(()),
            Some(last) => {
                let gap = (today - last).num_days();
                if gap <= 1 + self.streak_config.grace_days as i64 {
                    streak.current += 1;
                } else {
                    // a broken streak restarts at 1, not 0 - today counts
                    streak.current = 1;
                }
            }
            None => streak.current = 1,
        }

        streak.longest = streak.longest.max(streak.current);
        streak.last_active_day = Some(today);

        self.store_json(STREAK_KEY, &streak).await
    }

    pub async fn record_category_answer(
        &self,
        key: CategoryKey<'_>,
        is_correct: bool,
        total_in_category: u32,
    ) {
        if let Err(e) = self
            .try_record_category_answer(key, is_correct, total_in_category)
            .await
        {
            tracing::warn!("Failed to record category stats: {:#}", e);
        }
    }

    async fn try_record_category_answer(
        &self,
        key: CategoryKey<'_>,
        is_correct: bool,
        total_in_category: u32,
    ) -> Result<()> {
        let storage_key = category_storage_key(&key);

        let mut stats: CategoryStats = self.load_json(&storage_key).await?.unwrap_or_default();
        stats.attempts += 1;
        if is_correct {
            stats.correct += 1;
            stats.completed += 1;
        }
        stats.total = total_in_category;

        self.store_json(&storage_key, &stats).await
    }

    pub async fn daily_stats(&self, day: NaiveDate) -> Result<DailyStats> {
        let key = format!("{}{}", DAILY_KEY_PREFIX, day_key(day));
        Ok(self.load_json(&key).await?.unwrap_or_default())
    }

    pub async fn category_stats(&self, key: CategoryKey<'_>) -> Result<CategoryStats> {
        Ok(self
            .load_json(&category_storage_key(&key))
            .await?
            .unwrap_or_default())
    }

    pub async fn streak(&self) -> Result<StreakInfo> {
        Ok(self.load_json(STREAK_KEY).await?.unwrap_or_default())
    }

    /// Explicit data reset. The only path that deletes statistics.
    pub async fn reset(&self) -> Result<()> {
        let mut keys = self.store.list_keys(DAILY_KEY_PREFIX).await?;
        keys.extend(self.store.list_keys(CATEGORY_KEY_PREFIX).await?);
        keys.push(STREAK_KEY.to_string());
        self.store.remove_many(&keys).await?;
        tracing::info!("Statistics reset ({} keys removed)", keys.len());
        Ok(())
    }

    async fn load_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key).await.context("Stats read failed")? {
            Some(json) => Ok(Some(
                serde_json::from_str(&json).context("Corrupt stats record")?,
            )),
            None => Ok(None),
        }
    }

    async fn store_json<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).context("Failed to serialize stats")?;
        retry_async_with_config(RetryConfig::default(), || async {
            self.store.set(key, &json).await
        })
        .await
        .context("Stats write failed")
    }
}

fn category_storage_key(key: &CategoryKey<'_>) -> String {
    format!(
        "{}{}:{}:{}",
        CATEGORY_KEY_PREFIX, key.language, key.level, key.challenge_type
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChallengeType;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;

    fn service() -> StatsService {
        StatsService::new(Arc::new(MemoryStore::new()), StreakConfig::default())
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[tokio::test]
    async fn daily_counters_accumulate() {
        let stats = service();
        stats.record_answer_at(day(1), true, 15).await;
        stats.record_answer_at(day(1), false, 0).await;
        stats.record_answer_at(day(1), true, 10).await;

        let daily = stats.daily_stats(day(1)).await.unwrap();
        assert_eq!(daily.total_challenges, 3);
        assert_eq!(daily.correct_challenges, 2);
        assert_eq!(daily.total_xp, 25);
        assert!((daily.accuracy() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn answers_after_midnight_land_on_the_new_day() {
        let stats = service();
        stats.record_answer_at(day(1), true, 10).await;
        stats.record_answer_at(day(2), true, 10).await;

        assert_eq!(stats.daily_stats(day(1)).await.unwrap().total_challenges, 1);
        assert_eq!(stats.daily_stats(day(2)).await.unwrap().total_challenges, 1);
    }

    #[tokio::test]
    async fn streak_counts_once_per_day() {
        let stats = service();
        stats.record_answer_at(day(1), true, 10).await;
        stats.record_answer_at(day(1), true, 10).await;

        let streak = stats.streak().await.unwrap();
        assert_eq!(streak.current, 1);
        assert_eq!(streak.longest, 1);
    }

    #[tokio::test]
    async fn streak_grows_on_consecutive_days_and_resets_to_one() {
        let stats = service();
        stats.record_answer_at(day(1), true, 10).await;
        stats.record_answer_at(day(2), true, 10).await;
        stats.record_answer_at(day(3), false, 0).await;

        let streak = stats.streak().await.unwrap();
        assert_eq!(streak.current, 3);
        assert_eq!(streak.longest, 3);

        // two missed days with no grace: restart at 1, not 0
        stats.record_answer_at(day(6), true, 10).await;
        let streak = stats.streak().await.unwrap();
        assert_eq!(streak.current, 1);
        assert_eq!(streak.longest, 3);
    }

    #[tokio::test]
    async fn grace_day_bridges_a_single_missed_day() {
        let stats = StatsService::new(
            Arc::new(MemoryStore::new()),
            StreakConfig { grace_days: 1 },
        );
        stats.record_answer_at(day(1), true, 10).await;
        stats.record_answer_at(day(3), true, 10).await;

        let streak = stats.streak().await.unwrap();
        assert_eq!(streak.current, 2);
    }

    #[tokio::test]
    async fn clock_moving_backwards_leaves_streak_alone() {
        let stats = service();
        stats.record_answer_at(day(5), true, 10).await;
        stats.record_answer_at(day(3), true, 10).await;

        let streak = stats.streak().await.unwrap();
        assert_eq!(streak.current, 1);
        assert_eq!(streak.last_active_day, Some(day(5)));
    }

    #[tokio::test]
    async fn category_counters_accumulate() {
        let stats = service();
        let key = CategoryKey {
            language: "es",
            level: "B1",
            challenge_type: ChallengeType::MicroQuiz,
        };
        stats.record_category_answer(key, true, 40).await;
        stats.record_category_answer(key, false, 40).await;

        let cat = stats.category_stats(key).await.unwrap();
        assert_eq!(cat.attempts, 2);
        assert_eq!(cat.correct, 1);
        assert_eq!(cat.completed, 1);
        assert_eq!(cat.total, 40);
        assert!((cat.accuracy() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn reset_removes_all_stats_keys() {
        let store = Arc::new(MemoryStore::new());
        let stats = StatsService::new(store.clone(), StreakConfig::default());
        stats.record_answer_at(day(1), true, 10).await;
        stats
            .record_category_answer(
                CategoryKey {
                    language: "es",
                    level: "B1",
                    challenge_type: ChallengeType::MicroQuiz,
                },
                true,
                10,
            )
            .await;

        stats.reset().await.unwrap();
        assert!(store.is_empty());
    }

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _: &str) -> Result<Option<String>> {
            anyhow::bail!("store unavailable")
        }
        async fn set(&self, _: &str, _: &str) -> Result<()> {
            anyhow::bail!("store unavailable")
        }
        async fn remove_many(&self, _: &[String]) -> Result<()> {
            anyhow::bail!("store unavailable")
        }
        async fn list_keys(&self, _: &str) -> Result<Vec<String>> {
            anyhow::bail!("store unavailable")
        }
    }

    #[tokio::test]
    async fn write_failures_are_swallowed() {
        let stats = StatsService::new(Arc::new(BrokenStore), StreakConfig::default());
        // must not panic or propagate
        stats.record_answer_at(day(1), true, 10).await;
        stats
            .record_category_answer(
                CategoryKey {
                    language: "es",
                    level: "B1",
                    challenge_type: ChallengeType::MicroQuiz,
                },
                true,
                10,
            )
            .await;
    }
}
