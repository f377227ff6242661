use thiserror::Error;

/// Engine-state violations are caller bugs and are raised synchronously.
/// Persistence and network failures never surface here; they are handled
/// inside the services (logged, retried, degraded to local state).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid session: {0}")]
    InvalidSession(String),

    #[error("stale answer: expected challenge {expected}, got {got}")]
    StaleAnswer { expected: String, got: String },

    #[error(transparent)]
    Content(#[from] ContentError),
}

/// Content-fetch failures surface as typed errors, never as an empty session.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("content backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("malformed content payload: {0}")]
    Malformed(String),
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidSession(msg.into())
    }
}
