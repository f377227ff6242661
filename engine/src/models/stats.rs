use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::challenge::ChallengeType;

/// One record per calendar day, created lazily on first activity.
/// Accuracy is always derived from the counters at read time; storing it
/// redundantly would drift on partial writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyStats {
    pub total_challenges: u32,
    pub correct_challenges: u32,
    pub total_xp: u32,
}

impl DailyStats {
    pub fn accuracy(&self) -> f64 {
        if self.total_challenges == 0 {
            0.0
        } else {
            self.correct_challenges as f64 / self.total_challenges as f64
        }
    }
}

/// Running counters keyed by (language, level, challenge type). Updated
/// incrementally, never recomputed from history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryStats {
    pub completed: u32,
    pub total: u32,
    pub attempts: u32,
    pub correct: u32,
}

impl CategoryStats {
    pub fn accuracy(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.correct as f64 / self.attempts as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CategoryKey<'a> {
    pub language: &'a str,
    pub level: &'a str,
    pub challenge_type: ChallengeType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreakInfo {
    pub current: u32,
    pub longest: u32,
    pub last_active_day: Option<NaiveDate>,
}
