//! Sync engine facade.
//!
//! Bundles a store, a conflict resolver, and a configuration behind one
//! handle with cancellation and accumulated run statistics. Download and
//! upload runs must not be interleaved against overlapping identities; the
//! engine assumes the caller serializes them per store instance.

use crate::config::SyncConfig;
use crate::download::{run_download, DownloadSummary};
use crate::error::SyncResult;
use crate::resolver::ConflictResolver;
use crate::transport::{DownloadSource, UploadTransport};
use crate::upload::{sync_upload, UploadProgressIter};
use chartstore_core::RecordStore;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Statistics accumulated across sync runs.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Download runs completed successfully.
    pub download_runs: u64,
    /// Upload runs started.
    pub upload_runs: u64,
    /// Records ingested by download runs.
    pub records_downloaded: u64,
    /// Conflicts decided by the resolver.
    pub conflicts_resolved: u64,
    /// Changes consolidated after successful upload.
    pub changes_uploaded: u64,
    /// Last error message, cleared by the next clean run.
    pub last_error: Option<String>,
}

/// The sync engine orchestrates download and upload runs against one store.
pub struct SyncEngine<S: RecordStore> {
    store: Arc<S>,
    config: SyncConfig,
    resolver: Box<dyn ConflictResolver>,
    stats: Arc<RwLock<SyncStats>>,
    cancelled: Arc<AtomicBool>,
}

impl<S: RecordStore> SyncEngine<S> {
    /// Creates a new engine with the configured built-in conflict policy.
    pub fn new(store: Arc<S>, config: SyncConfig) -> Self {
        let resolver = config.conflict_policy.resolver();
        Self {
            store,
            config,
            resolver,
            stats: Arc::new(RwLock::new(SyncStats::default())),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replaces the conflict resolver with a custom policy.
    pub fn with_resolver(mut self, resolver: Box<dyn ConflictResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// The store this engine syncs.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// A snapshot of the accumulated statistics.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Requests cancellation of the ongoing run.
    ///
    /// The run aborts at its next suspension point; the transaction in
    /// progress, if any, still commits or rolls back whole.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Resets the cancellation flag.
    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Runs a download-merge over every batch the source yields.
    pub fn download<D>(&self, source: &mut D) -> SyncResult<DownloadSummary>
    where
        D: DownloadSource + ?Sized,
    {
        self.reset_cancel();

        match run_download(
            self.store.as_ref(),
            self.resolver.as_ref(),
            source,
            Some(&self.cancelled),
        ) {
            Ok(summary) => {
                let mut stats = self.stats.write();
                stats.download_runs += 1;
                stats.records_downloaded += summary.records;
                stats.conflicts_resolved += summary.resolved;
                stats.last_error = None;
                Ok(summary)
            }
            Err(e) => {
                self.stats.write().last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Starts an upload run and returns its lazy progress sequence.
    pub fn upload<T>(&self, transport: T) -> SyncResult<UploadProgressIter<S, T>>
    where
        T: UploadTransport,
    {
        self.reset_cancel();
        self.stats.write().upload_runs += 1;

        let run = sync_upload(Arc::clone(&self.store), self.config.fetch_mode, transport)?
            .with_cancel(Arc::clone(&self.cancelled))
            .with_stats(Arc::clone(&self.stats));
        Ok(run)
    }
}
