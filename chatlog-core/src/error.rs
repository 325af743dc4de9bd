use thiserror::Error;

/// Failures reported by a [`crate::Transport`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Chat not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Rate limit: the same request may be retried after `seconds`.
    #[error("Flood wait: retry after {seconds}s")]
    FloodWait { seconds: u64 },

    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    #[error("Transport error: {0}")]
    Other(String),
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;
