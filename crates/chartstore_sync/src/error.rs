//! Error types for the sync pipelines.

use chartstore_core::CoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// Record store error during sync.
    #[error("store error: {0}")]
    Store(#[from] CoreError),

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The remote rejected one uploaded change.
    #[error("upload rejected: {message}")]
    Upload {
        /// Error message reported by the remote.
        message: String,
    },

    /// `next()` was called on an exhausted local-change fetcher.
    #[error("local-change fetcher exhausted")]
    FetcherExhausted,

    /// Sync was cancelled.
    #[error("sync cancelled")]
    Cancelled,
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates an upload rejection error.
    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload {
            message: message.into(),
        }
    }

    /// Returns true if a new run could plausibly succeed.
    ///
    /// The pipelines never retry internally; this is advisory for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Upload { .. } => true,
            SyncError::Cancelled => false,
            SyncError::FetcherExhausted => false,
            SyncError::Store(_) => false,
        }
    }
}
