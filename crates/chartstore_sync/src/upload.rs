//! Upload-progress pipeline.
//!
//! Drains the local-edit journal in batches, sends each batch to the upload
//! transport, consolidates per-change outcomes back into the store, and
//! emits progress after every consolidated result. The emission sequence is
//! lazy: the next batch is not fetched until the previous batch's results
//! have been drained, so back-pressure falls out naturally.

use crate::consolidate::consolidate;
use crate::engine::SyncStats;
use crate::error::{SyncError, SyncResult};
use crate::fetcher::{create_fetcher, FetchMode, LocalChangeFetcher};
use crate::progress::SyncUploadProgress;
use crate::transport::{UploadResultStream, UploadTransport};
use chartstore_core::RecordStore;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Starts an upload run and returns its lazy progress sequence.
///
/// The first emission reports `remaining == initial_total` before any
/// transport activity. The run ends when the fetcher is exhausted or at the
/// first failure; a failed run's last emission carries the error, and the
/// journal entries for failed and unfetched changes stay in place. Each call
/// restarts from the current journal; runs are not resumable.
pub fn sync_upload<S, T>(
    store: Arc<S>,
    mode: FetchMode,
    transport: T,
) -> SyncResult<UploadProgressIter<S, T>>
where
    S: RecordStore,
    T: UploadTransport,
{
    let fetcher = create_fetcher(store.as_ref(), mode)?;
    info!(total = fetcher.total(), ?mode, "starting upload run");

    Ok(UploadProgressIter {
        store,
        fetcher,
        transport,
        current: None,
        emitted_initial: false,
        done: false,
        consolidated: 0,
        cancel: None,
        stats: None,
    })
}

/// The lazy progress sequence of one upload run.
pub struct UploadProgressIter<S: RecordStore, T: UploadTransport> {
    store: Arc<S>,
    fetcher: Box<dyn LocalChangeFetcher>,
    transport: T,
    current: Option<UploadResultStream>,
    emitted_initial: bool,
    done: bool,
    consolidated: u64,
    cancel: Option<Arc<AtomicBool>>,
    stats: Option<Arc<RwLock<SyncStats>>>,
}

impl<S: RecordStore, T: UploadTransport> UploadProgressIter<S, T> {
    pub(crate) fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub(crate) fn with_stats(mut self, stats: Arc<RwLock<SyncStats>>) -> Self {
        self.stats = Some(stats);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Ends the run, recording its outcome once.
    fn finish(&mut self, error: Option<&SyncError>) {
        if self.done {
            return;
        }
        self.done = true;
        self.current = None;

        if let Some(stats) = &self.stats {
            let mut stats = stats.write();
            stats.changes_uploaded += self.consolidated;
            stats.last_error = error.map(|e| e.to_string());
        }

        match error {
            Some(error) => warn!(%error, consolidated = self.consolidated, "upload run stopped"),
            None => info!(consolidated = self.consolidated, "upload run complete"),
        }
    }

    /// Emits an error-annotated progress and ends the run.
    fn fail(&mut self, error: SyncError) -> Option<SyncUploadProgress> {
        let progress = self.fetcher.progress().with_error(error.clone());
        self.finish(Some(&error));
        Some(progress)
    }
}

impl<S: RecordStore, T: UploadTransport> Iterator for UploadProgressIter<S, T> {
    type Item = SyncUploadProgress;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.emitted_initial {
            self.emitted_initial = true;
            // True starting size, before any network activity.
            return Some(SyncUploadProgress::initial(self.fetcher.total()));
        }

        if self.done {
            return None;
        }

        loop {
            if self.cancelled() {
                return self.fail(SyncError::Cancelled);
            }

            if let Some(stream) = self.current.as_mut() {
                match stream.next() {
                    Some(result) => {
                        let failure = result.error().cloned();
                        if let Err(e) = consolidate(self.store.as_ref(), result) {
                            return self.fail(e);
                        }
                        if failure.is_none() {
                            self.consolidated += 1;
                        }
                        let progress = self.fetcher.progress();
                        return match failure {
                            // First failure: stop pulling this stream and
                            // fetch no further batches this run.
                            Some(error) => {
                                let progress = progress.with_error(error.clone());
                                self.finish(Some(&error));
                                Some(progress)
                            }
                            None => Some(progress),
                        };
                    }
                    None => {
                        self.current = None;
                        continue;
                    }
                }
            }

            if !self.fetcher.has_next() {
                self.finish(None);
                return None;
            }

            let batch = match self.fetcher.next() {
                Ok(batch) => batch,
                Err(e) => return self.fail(e),
            };

            match self.transport.upload(batch) {
                Ok(stream) => self.current = Some(stream),
                Err(e) => return self.fail(e),
            }
        }
    }
}
