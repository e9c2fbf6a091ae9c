//! Error types for the sync engine.

use crate::types::ResourceId;
use thiserror::Error;

/// Main error type for sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Fetch failed for {resource}: {message}")]
    Fetch {
        resource: ResourceId,
        message: String,
    },

    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("Channel refused resume cursor {0:?}")]
    ResumeRejected(crate::types::Sequence),

    #[error("No active session")]
    NoSession,

    #[error("Session worker is gone")]
    WorkerGone,
}

impl SyncError {
    /// Convenience constructor for transport-level failures.
    pub fn transport(message: impl Into<String>) -> Self {
        SyncError::Transport(message.into())
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
