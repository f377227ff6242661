use std::sync::Arc;

use async_trait::async_trait;
use linguadash_engine::config::EngineConfig;
use linguadash_engine::errors::ContentError;
use linguadash_engine::models::{Challenge, ChallengeType, SessionSource, StartSessionParams};
use linguadash_engine::services::{ContentProvider, SessionEngine};
use linguadash_engine::storage::MemoryStore;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn challenge(id: &str, challenge_type: ChallengeType) -> Challenge {
    Challenge {
        id: id.to_string(),
        challenge_type,
        language: "es".to_string(),
        cefr_level: "B1".to_string(),
        payload: serde_json::json!({ "prompt": "¿?" }),
    }
}

pub fn quiz_challenges(count: usize) -> Vec<Challenge> {
    (1..=count)
        .map(|i| challenge(&format!("c-{}", i), ChallengeType::MicroQuiz))
        .collect()
}

pub struct StaticContentProvider {
    pub challenges: Vec<Challenge>,
}

#[async_trait]
impl ContentProvider for StaticContentProvider {
    async fn fetch_challenges(
        &self,
        _language: &str,
        _level: &str,
        _challenge_type: ChallengeType,
        _count: u32,
        _source: SessionSource,
    ) -> Result<Vec<Challenge>, ContentError> {
        Ok(self.challenges.clone())
    }
}

pub struct FailingContentProvider;

#[async_trait]
impl ContentProvider for FailingContentProvider {
    async fn fetch_challenges(
        &self,
        _language: &str,
        _level: &str,
        _challenge_type: ChallengeType,
        _count: u32,
        _source: SessionSource,
    ) -> Result<Vec<Challenge>, ContentError> {
        Err(ContentError::Backend {
            status: 503,
            message: "content backend down".to_string(),
        })
    }
}

pub fn build_engine(
    config: EngineConfig,
    challenges: Vec<Challenge>,
) -> (SessionEngine, Arc<MemoryStore>) {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let engine = SessionEngine::new(
        config,
        store.clone(),
        Arc::new(StaticContentProvider { challenges }),
        None,
        None,
    );
    (engine, store)
}

pub fn start_params(count: usize) -> StartSessionParams {
    StartSessionParams {
        user_id: "user-1".to_string(),
        language: "es".to_string(),
        level: "B1".to_string(),
        challenge_type: ChallengeType::MicroQuiz,
        source: SessionSource::Reference,
        count: count as u32,
        specific_challenges: None,
        study_mode: false,
    }
}
