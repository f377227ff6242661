use serde::Deserialize;
use std::env;

/// Engine tunables. Everything gameplay-balancing (score tiers, heart
/// capacity, refill policy, streak policy) is configuration, not code, so
/// product can retune without a client release.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub hearts: HeartsConfig,
    pub streak: StreakConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub base_xp: u32,
    /// Ascending by `min_combo`; the highest tier at or below the current
    /// combo wins. The last tier is the cap.
    pub combo_tiers: Vec<ComboTier>,
    /// Ascending by `max_seconds`; the first tier the elapsed time beats
    /// wins. No bonus above the slowest threshold.
    pub speed_tiers: Vec<SpeedTier>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComboTier {
    pub min_combo: u32,
    pub multiplier_pct: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeedTier {
    pub max_seconds: f64,
    pub bonus: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_xp: 10,
            combo_tiers: vec![
                ComboTier {
                    min_combo: 3,
                    multiplier_pct: 150,
                },
                ComboTier {
                    min_combo: 5,
                    multiplier_pct: 200,
                },
                ComboTier {
                    min_combo: 10,
                    multiplier_pct: 300,
                },
            ],
            speed_tiers: vec![
                SpeedTier {
                    max_seconds: 3.0,
                    bonus: 5,
                },
                SpeedTier {
                    max_seconds: 5.0,
                    bonus: 3,
                },
                SpeedTier {
                    max_seconds: 10.0,
                    bonus: 1,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeartsConfig {
    pub capacity: u32,
    pub refill_policy: RefillPolicy,
    pub refill_interval_seconds: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefillPolicy {
    /// One heart back every `refill_interval_seconds`.
    PerHeartInterval,
    /// Pool returns to full capacity after `refill_interval_seconds`.
    FullReset,
}

impl Default for HeartsConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            refill_policy: RefillPolicy::PerHeartInterval,
            refill_interval_seconds: 1800,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreakConfig {
    /// Days of inactivity tolerated before the streak breaks. 0 means
    /// strict consecutive calendar days.
    pub grace_days: u32,
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self { grace_days: 0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            request_timeout_seconds: 5,
        }
    }
}

impl EngineConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to defaults
            )
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
