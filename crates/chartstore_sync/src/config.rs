//! Configuration for the sync engine.

use crate::fetcher::FetchMode;
use crate::resolver::ConflictPolicy;

/// Configuration for sync runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncConfig {
    /// Batching mode for upload runs.
    pub fetch_mode: FetchMode,
    /// Built-in conflict policy for download runs.
    ///
    /// A custom resolver set on the engine takes precedence.
    pub conflict_policy: ConflictPolicy,
}

impl SyncConfig {
    /// Creates a configuration with default mode and policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the upload batching mode.
    pub fn with_fetch_mode(mut self, mode: FetchMode) -> Self {
        self.fetch_mode = mode;
        self
    }

    /// Sets the conflict policy.
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }
}
