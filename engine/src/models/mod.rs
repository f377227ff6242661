use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod challenge;
pub mod heart;
pub mod stats;

pub use challenge::{Challenge, ChallengeType};
pub use heart::{HeartGrant, HeartPool, HeartResponse, RefillInfo};
pub use stats::{CategoryKey, CategoryStats, DailyStats, StreakInfo};

/// The central mutable aggregate. Owned exclusively by the session engine;
/// presentation code reads it through the engine and never mutates fields
/// directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeSession {
    pub id: String,
    pub user_id: String,
    pub language: String,
    pub level: String,
    pub challenge_type: ChallengeType,
    pub source: SessionSource,
    pub challenges: Vec<Challenge>,
    pub current_index: usize,
    pub completed_challenges: usize,
    pub current_combo: u32,
    pub incorrect_challenges: Vec<Challenge>,
    pub heart_pool: Option<HeartPool>,
    pub last_heart_response: Option<HeartResponse>,
    pub is_study_mode: bool,
    pub ended_early: bool,
    pub is_active: bool,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub total_xp: u32,
}

impl ChallengeSession {
    pub fn current_challenge(&self) -> Option<&Challenge> {
        self.challenges.get(self.current_index)
    }

    pub fn correct_challenges(&self) -> usize {
        self.completed_challenges
            .saturating_sub(self.incorrect_challenges.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    ExhaustedEarly,
    Completing,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    Reference,
    LearningPlan,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartSessionParams {
    pub user_id: String,
    pub language: String,
    pub level: String,
    pub challenge_type: ChallengeType,
    pub source: SessionSource,
    pub count: u32,
    /// Review mode: exactly this list, in this order, no reshuffling.
    pub specific_challenges: Option<Vec<Challenge>>,
    pub study_mode: bool,
}

/// What `answer()` resolves to once every dependent side effect (scoring,
/// heart consumption, statistics) has been applied.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub score: ScoreBreakdown,
    pub current_combo: u32,
    pub hearts: Option<HeartResponse>,
    pub session_complete: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base_xp: u32,
    pub speed_bonus: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.base_xp + self.speed_bonus
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub user_id: String,
    pub language: String,
    pub level: String,
    pub challenge_type: ChallengeType,
    pub source: SessionSource,
    pub total_challenges: usize,
    pub completed_challenges: usize,
    pub correct_challenges: usize,
    pub total_xp: u32,
    pub accuracy: f64,
    pub incorrect_challenges: Vec<Challenge>,
    pub ended_early: bool,
    pub study_mode: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SessionSummary {
    pub fn has_mistakes(&self) -> bool {
        !self.incorrect_challenges.is_empty()
    }
}
