use std::fmt;

use thiserror::Error;

/// Pipeline stage that an upstream call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transcription,
    Completion,
    Synthesis,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Transcription => write!(f, "transcription"),
            Stage::Completion => write!(f, "completion"),
            Stage::Synthesis => write!(f, "synthesis"),
        }
    }
}

#[derive(Debug, Error)]
pub enum VoicechainError {
    #[error("Config error: {0}")]
    Config(String),

    /// Empty or over-ceiling payload, rejected before any upstream call.
    #[error("audio payload of {size} bytes not accepted (limit {limit} bytes)")]
    PayloadTooLarge { size: usize, limit: usize },

    /// An upstream provider call failed; `detail` embeds the upstream body.
    /// Not retried automatically.
    #[error("{stage} stage failed: {detail}")]
    Upstream { stage: Stage, detail: String },

    #[error("Session not found")]
    SessionNotFound(String),

    /// Persistence failures are logged and swallowed by callers on the
    /// turn path; they never fail a user-visible request.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VoicechainError {
    pub fn upstream(stage: Stage, detail: impl Into<String>) -> Self {
        Self::Upstream {
            stage,
            detail: detail.into(),
        }
    }

    /// Stage tag if this is an upstream failure.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Upstream { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, VoicechainError>;
