//! Upload progress reporting.

use crate::error::SyncError;

/// A progress emission from one upload run.
///
/// `remaining` is non-increasing across successive emissions within a run;
/// `initial_total` is fixed for the run, snapshotted from the fetcher at
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncUploadProgress {
    /// Journal entries not yet consumed by the fetcher.
    pub remaining: u64,
    /// Journal entries pending when the run started.
    pub initial_total: u64,
    /// The error that stopped the run, if any.
    pub upload_error: Option<SyncError>,
}

impl SyncUploadProgress {
    /// Creates the initial emission for a run of `total` pending entries.
    pub fn initial(total: u64) -> Self {
        Self {
            remaining: total,
            initial_total: total,
            upload_error: None,
        }
    }

    /// Annotates this progress with the error that stopped the run.
    pub fn with_error(mut self, error: SyncError) -> Self {
        self.upload_error = Some(error);
        self
    }

    /// Returns true if this emission carries an error.
    pub fn is_failed(&self) -> bool {
        self.upload_error.is_some()
    }

    /// Journal entries the run has exhausted so far.
    pub fn consumed(&self) -> u64 {
        self.initial_total.saturating_sub(self.remaining)
    }
}
