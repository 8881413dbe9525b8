//! Error types for chartstore core.

use crate::resource::ResourceType;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core store operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Record identity is absent from the store.
    #[error("resource not found: {resource_type}/{id}")]
    NotFound {
        /// The resource type searched.
        resource_type: ResourceType,
        /// The logical id that was not found.
        id: String,
    },

    /// A storage transaction failed to commit.
    #[error("transaction failed: {message}")]
    TransactionFailure {
        /// Description of the failure.
        message: String,
    },

    /// The journal no longer matches what an operation expected.
    #[error("journal inconsistency: {message}")]
    JournalInconsistency {
        /// Description of the inconsistency.
        message: String,
    },

    /// A resource payload is structurally invalid.
    #[error("invalid resource: {message}")]
    InvalidResource {
        /// Description of what is invalid.
        message: String,
    },

    /// Purge refused because un-synced local changes exist.
    #[error("purge blocked by pending local changes: {resource_type}/{id}")]
    PurgeBlocked {
        /// The resource type.
        resource_type: ResourceType,
        /// The logical id with pending changes.
        id: String,
    },
}

impl CoreError {
    /// Creates a not-found error.
    pub fn not_found(resource_type: ResourceType, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    /// Creates a transaction failure error.
    pub fn transaction_failure(message: impl Into<String>) -> Self {
        Self::TransactionFailure {
            message: message.into(),
        }
    }

    /// Creates a journal inconsistency error.
    pub fn journal_inconsistency(message: impl Into<String>) -> Self {
        Self::JournalInconsistency {
            message: message.into(),
        }
    }

    /// Creates an invalid-resource error.
    pub fn invalid_resource(message: impl Into<String>) -> Self {
        Self::InvalidResource {
            message: message.into(),
        }
    }
}
