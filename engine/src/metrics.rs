use lazy_static::lazy_static;
use prometheus::{
    register_int_counter_vec, register_int_gauge, IntCounterVec, IntGauge,
};

lazy_static! {
    // Business Metrics
    pub static ref SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "sessions_total",
        "Total number of challenge sessions",
        &["status"]
    )
    .unwrap();

    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "sessions_active",
        "Number of currently active sessions"
    )
    .unwrap();

    pub static ref ANSWERS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "answers_submitted_total",
        "Total number of answers submitted",
        &["correct"]
    )
    .unwrap();

    pub static ref HEARTS_CONSUMED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "hearts_consumed_total",
        "Total number of hearts consumed",
        &["challenge_type"]
    )
    .unwrap();

    pub static ref HEARTS_EXHAUSTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "hearts_exhausted_total",
        "Sessions ended early because the heart pool ran out",
        &["challenge_type"]
    )
    .unwrap();
}

pub fn record_answer_metric(is_correct: bool) {
    let label = if is_correct { "true" } else { "false" };
    ANSWERS_SUBMITTED_TOTAL.with_label_values(&[label]).inc();
}
