use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::metrics::{record_answer_metric, SESSIONS_ACTIVE, SESSIONS_TOTAL};
use crate::models::{
    AnswerOutcome, CategoryKey, ChallengeSession, ScoreBreakdown, SessionStatus, SessionSummary,
    StartSessionParams,
};
use crate::services::completion_service::CompletionTracker;
use crate::services::content_service::ContentProvider;
use crate::services::heart_service::{HeartAccountant, HeartAuthority};
use crate::services::report_service::{CompletionReport, ProgressReporter, ReportService};
use crate::services::scoring_service::compute_score;
use crate::services::stats_service::StatsService;
use crate::storage::KeyValueStore;
use crate::utils::time::today_local;

enum FinalizeReason {
    Ended,
    Quit,
}

/// The orchestrator. Owns the session aggregate for its whole lifetime;
/// every mutation funnels through these operations, so `answer()` has
/// fully resolved (hearts, scoring, statistics) before any subsequent
/// `advance()` or `end()` can observe its effects - there is no
/// next-tick window.
///
/// Heart pools live in the accountant, not the session: exhausting a
/// challenge type carries over into the next session of that type.
pub struct SessionEngine {
    config: EngineConfig,
    hearts: HeartAccountant,
    stats: StatsService,
    completion: CompletionTracker,
    content: Arc<dyn ContentProvider>,
    reporter: ReportService,
    session: Option<ChallengeSession>,
    last_summary: Option<SessionSummary>,
    generation: u64,
}

impl SessionEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn KeyValueStore>,
        content: Arc<dyn ContentProvider>,
        heart_authority: Option<Arc<dyn HeartAuthority>>,
        progress_reporter: Option<Arc<dyn ProgressReporter>>,
    ) -> Self {
        Self {
            hearts: HeartAccountant::new(config.hearts.clone(), heart_authority),
            stats: StatsService::new(store.clone(), config.streak.clone()),
            completion: CompletionTracker::new(store),
            content,
            reporter: ReportService::new(progress_reporter),
            config,
            session: None,
            last_summary: None,
            generation: 0,
        }
    }

    /// Once-per-process-start maintenance: garbage-collects completion
    /// records for every day except today. Never called mid-session.
    pub async fn bootstrap(&self) {
        self.completion.cleanup_old_records().await;
    }

    pub fn session(&self) -> Option<&ChallengeSession> {
        self.session.as_ref()
    }

    pub fn last_summary(&self) -> Option<&SessionSummary> {
        self.last_summary.as_ref()
    }

    pub fn hearts(&mut self) -> &mut HeartAccountant {
        &mut self.hearts
    }

    pub fn stats(&self) -> &StatsService {
        &self.stats
    }

    pub fn completion(&self) -> &CompletionTracker {
        &self.completion
    }

    /// Idle -> Active. The queue is either the caller-supplied list
    /// (review mode: exact list, exact order) or fetched from the content
    /// provider. An empty queue is a caller bug, not a session.
    pub async fn start(
        &mut self,
        params: StartSessionParams,
    ) -> Result<&ChallengeSession, EngineError> {
        if self.session.as_ref().is_some_and(|s| s.is_active) {
            return Err(EngineError::invalid("a session is already active"));
        }

        let challenges = match params.specific_challenges {
            Some(list) => list,
            None => {
                self.content
                    .fetch_challenges(
                        &params.language,
                        &params.level,
                        params.challenge_type,
                        params.count,
                        params.source,
                    )
                    .await?
            }
        };

        if challenges.is_empty() {
            return Err(EngineError::invalid("challenge queue is empty"));
        }

        let now = Utc::now();
        // Study sessions never touch the accountant, not even for a
        // snapshot; the exhaustion path cannot trigger.
        let heart_pool = if params.study_mode {
            None
        } else {
            Some(self.hearts.pool_at(params.challenge_type, now))
        };

        self.generation += 1;
        let session = ChallengeSession {
            id: Uuid::new_v4().to_string(),
            user_id: params.user_id,
            language: params.language,
            level: params.level,
            challenge_type: params.challenge_type,
            source: params.source,
            challenges,
            current_index: 0,
            completed_challenges: 0,
            current_combo: 0,
            incorrect_challenges: Vec::new(),
            heart_pool,
            last_heart_response: None,
            is_study_mode: params.study_mode,
            ended_early: false,
            is_active: true,
            status: SessionStatus::Active,
            started_at: now,
            total_xp: 0,
        };

        SESSIONS_TOTAL.with_label_values(&["started"]).inc();
        SESSIONS_ACTIVE.inc();

        tracing::info!(
            "Session started: id={}, user={}, type={}, challenges={}, study={}, generation={}",
            session.id,
            session.user_id,
            session.challenge_type,
            session.challenges.len(),
            session.is_study_mode,
            self.generation
        );

        Ok(self.session.insert(session))
    }

    /// Records the answer for the challenge under the cursor. Resolves
    /// only after scoring, heart consumption and statistics writes have
    /// been applied; callers await this instead of racing a delay.
    ///
    /// A `challenge_id` that does not match the cursor is a stale call
    /// from an out-of-order completion and is rejected, never silently
    /// applied.
    pub async fn answer(
        &mut self,
        challenge_id: &str,
        is_correct: bool,
        elapsed_seconds: f64,
    ) -> Result<AnswerOutcome, EngineError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| EngineError::invalid("no active session"))?;

        if !session.is_active {
            return Err(EngineError::invalid("session already finalized"));
        }
        if session.status != SessionStatus::Active {
            return Err(EngineError::invalid(
                "session is not accepting answers in its current state",
            ));
        }

        let current = session
            .current_challenge()
            .ok_or_else(|| EngineError::invalid("cursor past end of queue"))?
            .clone();

        if current.id != challenge_id {
            return Err(EngineError::StaleAnswer {
                expected: current.id,
                got: challenge_id.to_string(),
            });
        }

        session.completed_challenges += 1;

        if session.is_study_mode {
            // Pure review: no hearts, no XP, no statistics. Progression
            // counts regardless of actual recall.
            if session.completed_challenges == session.challenges.len() {
                session.status = SessionStatus::Completing;
            }
            return Ok(AnswerOutcome {
                is_correct,
                score: ScoreBreakdown::default(),
                current_combo: session.current_combo,
                hearts: None,
                session_complete: session.status == SessionStatus::Completing,
            });
        }

        // Combo only ever changes here.
        if is_correct {
            session.current_combo += 1;
        } else {
            session.current_combo = 0;
            session.incorrect_challenges.push(current.clone());
        }

        let score = compute_score(
            &self.config.scoring,
            is_correct,
            elapsed_seconds,
            session.current_combo,
        );
        session.total_xp += score.total();

        let hearts = self
            .hearts
            .consume(&session.user_id, session.challenge_type)
            .await;
        session.heart_pool = Some(self.hearts.pool(session.challenge_type));
        session.last_heart_response = Some(hearts.clone());

        record_answer_metric(is_correct);

        // Best-effort persistence: day-keyed at the moment of the answer,
        // failures degrade to logs.
        let today = today_local();
        self.stats
            .record_answer_at(today, is_correct, score.total())
            .await;
        self.stats
            .record_category_answer(
                CategoryKey {
                    language: &session.language,
                    level: &session.level,
                    challenge_type: session.challenge_type,
                },
                is_correct,
                session.challenges.len() as u32,
            )
            .await;
        self.completion.mark_completed_at(today, challenge_id).await;

        self.reporter.report(CompletionReport {
            challenge_id: challenge_id.to_string(),
            is_correct,
            time_spent_seconds: elapsed_seconds,
        });

        if session.completed_challenges == session.challenges.len() {
            // Draining the pool on the final answer still counts as
            // completion; ExhaustedEarly is for sessions cut off with
            // challenges remaining.
            session.status = SessionStatus::Completing;
        } else if hearts.out_of_hearts {
            // The pool ran dry on this very answer: stop before the next
            // challenge is shown, no auto-advance.
            session.ended_early = true;
            session.status = SessionStatus::ExhaustedEarly;
            tracing::info!(
                "Session {} out of hearts after {} answers",
                session.id,
                session.completed_challenges
            );
        }

        tracing::debug!(
            "Answer recorded: session={}, challenge={}, correct={}, combo={}, xp={}",
            session.id,
            challenge_id,
            is_correct,
            session.current_combo,
            score.total()
        );

        Ok(AnswerOutcome {
            is_correct,
            score,
            current_combo: session.current_combo,
            hearts: Some(hearts),
            session_complete: session.status == SessionStatus::Completing,
        })
    }

    /// Moves the cursor to the next challenge. Never called implicitly:
    /// challenge types with an undo window (`native_check`) invoke this
    /// once the window expires, everything else right after `answer()`
    /// resolves.
    pub fn advance(&mut self) -> Result<usize, EngineError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| EngineError::invalid("no active session"))?;

        if !session.is_active || session.status != SessionStatus::Active {
            return Err(EngineError::invalid("session cannot advance in its current state"));
        }
        if session.completed_challenges <= session.current_index {
            return Err(EngineError::invalid("current challenge has not been answered"));
        }
        if session.current_index + 1 >= session.challenges.len() {
            return Err(EngineError::invalid("already on the last challenge"));
        }

        session.current_index += 1;
        tracing::debug!(
            "Session {} advanced to challenge {}",
            session.id,
            session.current_index
        );
        Ok(session.current_index)
    }

    /// Finalizes the session and returns its summary. Idempotent: calling
    /// it again returns the same summary without touching statistics
    /// (those were attributed per answer).
    pub fn end(&mut self) -> Result<SessionSummary, EngineError> {
        self.finalize(FinalizeReason::Ended)
    }

    /// User-initiated termination. Identical finalization to `end()`;
    /// hearts already spent are not refunded. Safe at any point after
    /// `start()` - anything still in flight resolves against a finalized
    /// session and is discarded.
    pub fn quit(&mut self) -> Result<SessionSummary, EngineError> {
        self.finalize(FinalizeReason::Quit)
    }

    fn finalize(&mut self, reason: FinalizeReason) -> Result<SessionSummary, EngineError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| EngineError::invalid("no session to finalize"))?;

        if !session.is_active {
            // Second end()/quit() on a finalized session: hand back the
            // summary computed the first time.
            return self
                .last_summary
                .clone()
                .ok_or_else(|| EngineError::invalid("session already finalized"));
        }

        session.is_active = false;
        session.status = SessionStatus::Finalized;
        self.generation += 1;

        let correct = session.correct_challenges();
        let accuracy = if session.completed_challenges == 0 {
            0.0
        } else {
            correct as f64 / session.completed_challenges as f64
        };

        let summary = SessionSummary {
            session_id: session.id.clone(),
            user_id: session.user_id.clone(),
            language: session.language.clone(),
            level: session.level.clone(),
            challenge_type: session.challenge_type,
            source: session.source,
            total_challenges: session.challenges.len(),
            completed_challenges: session.completed_challenges,
            correct_challenges: correct,
            total_xp: session.total_xp,
            accuracy,
            incorrect_challenges: session.incorrect_challenges.clone(),
            ended_early: session.ended_early,
            study_mode: session.is_study_mode,
            started_at: session.started_at,
            finished_at: Utc::now(),
        };

        let status_label = match reason {
            FinalizeReason::Quit => "quit",
            FinalizeReason::Ended if summary.ended_early => "exhausted",
            FinalizeReason::Ended => "completed",
        };
        SESSIONS_TOTAL.with_label_values(&[status_label]).inc();
        SESSIONS_ACTIVE.dec();

        tracing::info!(
            "Session finalized: id={}, reason={}, completed={}/{}, xp={}",
            summary.session_id,
            status_label,
            summary.completed_challenges,
            summary.total_challenges,
            summary.total_xp
        );

        self.last_summary = Some(summary.clone());
        Ok(summary)
    }

    /// Starts a fresh study-mode session over the mistakes of a finished
    /// one. Reinforcement, not re-scoring: no hearts, no XP.
    pub async fn review_mistakes(
        &mut self,
        summary: &SessionSummary,
    ) -> Result<&ChallengeSession, EngineError> {
        if !summary.has_mistakes() {
            return Err(EngineError::invalid("summary has no mistakes to review"));
        }

        let params = StartSessionParams {
            user_id: summary.user_id.clone(),
            language: summary.language.clone(),
            level: summary.level.clone(),
            challenge_type: summary.challenge_type,
            source: summary.source,
            count: summary.incorrect_challenges.len() as u32,
            specific_challenges: Some(summary.incorrect_challenges.clone()),
            study_mode: true,
        };

        self.start(params).await
    }
}
