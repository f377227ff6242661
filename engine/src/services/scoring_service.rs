use crate::config::ScoringConfig;
use crate::models::ScoreBreakdown;

/// Pure scoring function. Deterministic and side-effect free; given the
/// same config and inputs it reproduces the same output bit for bit.
///
/// Rules:
/// - incorrect answers earn nothing
/// - base XP is a fixed constant scaled by the combo multiplier tier,
///   capped at the top tier
/// - speed bonus is a flat amount per tier, only below the slowest
///   threshold
pub fn compute_score(
    cfg: &ScoringConfig,
    is_correct: bool,
    elapsed_seconds: f64,
    combo: u32,
) -> ScoreBreakdown {
    if !is_correct {
        return ScoreBreakdown::default();
    }

    let multiplier_pct = combo_multiplier_pct(cfg, combo);
    let base_xp = cfg.base_xp * multiplier_pct / 100;
    let speed_bonus = speed_bonus(cfg, elapsed_seconds);

    ScoreBreakdown {
        base_xp,
        speed_bonus,
    }
}

fn combo_multiplier_pct(cfg: &ScoringConfig, combo: u32) -> u32 {
    cfg.combo_tiers
        .iter()
        .rev()
        .find(|tier| combo >= tier.min_combo)
        .map(|tier| tier.multiplier_pct)
        .unwrap_or(100)
}

fn speed_bonus(cfg: &ScoringConfig, elapsed_seconds: f64) -> u32 {
    cfg.speed_tiers
        .iter()
        .find(|tier| elapsed_seconds < tier.max_seconds)
        .map(|tier| tier.bonus)
        .unwrap_or(0)
}
