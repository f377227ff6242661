use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-challenge-type consumable pool. `remaining` never goes negative;
/// a pool at 0 is exhausted until `next_refill_at` elapses or an external
/// grant replenishes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartPool {
    pub remaining: u32,
    pub capacity: u32,
    pub next_refill_at: Option<DateTime<Utc>>,
}

impl HeartPool {
    pub fn full(capacity: u32) -> Self {
        Self {
            remaining: capacity,
            capacity,
            next_refill_at: None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Result of a single heart consumption. `out_of_hearts` is true exactly
/// when `hearts_remaining` is 0 after the triggering decrement, so the
/// session stops before the next challenge is shown, not after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartResponse {
    pub out_of_hearts: bool,
    pub hearts_remaining: u32,
    pub refill_info: Option<RefillInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefillInfo {
    pub next_refill_at: DateTime<Utc>,
    pub wait_seconds: i64,
}

/// Balance reported by the remote heart authority after a server-side
/// decrement.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartGrant {
    pub hearts_remaining: u32,
    pub next_refill_at: Option<DateTime<Utc>>,
}
