//! Transport abstractions for sync operations.
//!
//! The wire layer itself is out of scope; these traits are the narrow
//! contracts the pipelines consume, with mock implementations for testing.

use crate::error::{SyncError, SyncResult};
use chartstore_core::{LocalChange, Resource};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// The per-change outcome of an upload attempt. Consumed exactly once.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadRequestResult {
    /// The remote accepted the change.
    Success {
        /// The submitted change.
        change: LocalChange,
        /// Updated remote representation (e.g. a new version token), if the
        /// transport returned one.
        outcome: Option<Resource>,
    },
    /// The remote rejected the change.
    Failure {
        /// The submitted change.
        change: LocalChange,
        /// The per-change error.
        error: SyncError,
    },
}

impl UploadRequestResult {
    /// The submitted change this result belongs to.
    pub fn change(&self) -> &LocalChange {
        match self {
            UploadRequestResult::Success { change, .. } => change,
            UploadRequestResult::Failure { change, .. } => change,
        }
    }

    /// The error, for failures.
    pub fn error(&self) -> Option<&SyncError> {
        match self {
            UploadRequestResult::Success { .. } => None,
            UploadRequestResult::Failure { error, .. } => Some(error),
        }
    }
}

/// A lazily pulled stream of per-change upload results.
///
/// One result per submitted change, in submission order. The pipeline stops
/// pulling at the first failure, so later results are never observed.
pub type UploadResultStream = Box<dyn Iterator<Item = UploadRequestResult> + Send>;

/// An upload transport sends batches of local changes to the remote store.
pub trait UploadTransport: Send + Sync {
    /// Uploads one batch and returns its result stream.
    fn upload(&self, batch: Vec<LocalChange>) -> SyncResult<UploadResultStream>;
}

impl<T: UploadTransport + ?Sized> UploadTransport for Arc<T> {
    fn upload(&self, batch: Vec<LocalChange>) -> SyncResult<UploadResultStream> {
        (**self).upload(batch)
    }
}

/// A cancellable, pull-based producer of remote record batches.
///
/// The download pipeline never issues a second pull before fully processing
/// the previous batch; `Ok(None)` means the sequence is exhausted.
pub trait DownloadSource {
    /// Pulls the next batch, suspending as needed between batches.
    fn next_batch(&mut self) -> SyncResult<Option<Vec<Resource>>>;
}

/// A download source over pre-built batches, for tests.
#[derive(Debug, Default)]
pub struct VecDownloadSource {
    batches: VecDeque<Vec<Resource>>,
    failure: Option<SyncError>,
}

impl VecDownloadSource {
    /// Creates a source yielding the given batches in order.
    pub fn new(batches: Vec<Vec<Resource>>) -> Self {
        Self {
            batches: batches.into(),
            failure: None,
        }
    }

    /// Makes the source fail with `error` once its batches are drained,
    /// instead of ending cleanly.
    pub fn then_fail(mut self, error: SyncError) -> Self {
        self.failure = Some(error);
        self
    }
}

impl DownloadSource for VecDownloadSource {
    fn next_batch(&mut self) -> SyncResult<Option<Vec<Resource>>> {
        if let Some(batch) = self.batches.pop_front() {
            return Ok(Some(batch));
        }
        match self.failure.take() {
            Some(error) => Err(error),
            None => Ok(None),
        }
    }
}

/// Scripted per-change outcome for [`MockTransport`].
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// Accept the change.
    Succeed,
    /// Accept the change and return an updated remote representation.
    SucceedWith(Resource),
    /// Reject the change with an upload error.
    Fail(String),
}

/// A mock upload transport for testing.
///
/// Outcomes are scripted per batch; unscripted changes succeed. The mock
/// records every uploaded batch and counts how many results were actually
/// pulled from its streams, so tests can verify fail-fast behavior.
#[derive(Debug, Default)]
pub struct MockTransport {
    scripts: Mutex<VecDeque<Vec<ScriptedOutcome>>>,
    uploads: Mutex<Vec<Vec<LocalChange>>>,
    calls: AtomicU64,
    observed_results: Arc<AtomicU64>,
}

impl MockTransport {
    /// Creates a new mock transport where every change succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the outcomes for the next uploaded batch.
    pub fn enqueue_batch_script(&self, outcomes: Vec<ScriptedOutcome>) {
        self.scripts.lock().unwrap().push_back(outcomes);
    }

    /// Returns every batch uploaded so far.
    pub fn uploads(&self) -> Vec<Vec<LocalChange>> {
        self.uploads.lock().unwrap().clone()
    }

    /// Number of upload calls made.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of results pulled from this transport's streams so far.
    pub fn observed_results(&self) -> u64 {
        self.observed_results.load(Ordering::SeqCst)
    }
}

struct ObservedStream {
    items: VecDeque<UploadRequestResult>,
    observed: Arc<AtomicU64>,
}

impl Iterator for ObservedStream {
    type Item = UploadRequestResult;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.items.pop_front()?;
        self.observed.fetch_add(1, Ordering::SeqCst);
        Some(item)
    }
}

impl UploadTransport for MockTransport {
    fn upload(&self, batch: Vec<LocalChange>) -> SyncResult<UploadResultStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.uploads.lock().unwrap().push(batch.clone());

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();

        let items: VecDeque<UploadRequestResult> = batch
            .into_iter()
            .enumerate()
            .map(|(i, change)| match script.get(i) {
                Some(ScriptedOutcome::Fail(message)) => UploadRequestResult::Failure {
                    change,
                    error: SyncError::upload(message.clone()),
                },
                Some(ScriptedOutcome::SucceedWith(resource)) => UploadRequestResult::Success {
                    change,
                    outcome: Some(resource.clone()),
                },
                Some(ScriptedOutcome::Succeed) | None => UploadRequestResult::Success {
                    change,
                    outcome: None,
                },
            })
            .collect();

        Ok(Box::new(ObservedStream {
            items,
            observed: Arc::clone(&self.observed_results),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartstore_core::{LocalChangeKind, ResourceType};
    use serde_json::json;

    fn change(id: &str) -> LocalChange {
        LocalChange {
            resource_type: ResourceType::Patient,
            resource_id: id.into(),
            kind: LocalChangeKind::Create,
            payload: Some(json!({})),
            sequence: 1,
        }
    }

    #[test]
    fn vec_source_yields_batches_then_ends() {
        let mut source = VecDownloadSource::new(vec![vec![], vec![]]);
        assert!(source.next_batch().unwrap().is_some());
        assert!(source.next_batch().unwrap().is_some());
        assert!(source.next_batch().unwrap().is_none());
    }

    #[test]
    fn vec_source_then_fail() {
        let mut source = VecDownloadSource::new(vec![vec![]])
            .then_fail(SyncError::transport_retryable("link down"));
        assert!(source.next_batch().unwrap().is_some());
        assert!(source.next_batch().is_err());
    }

    #[test]
    fn mock_transport_default_outcomes_succeed() {
        let transport = MockTransport::new();
        let results: Vec<_> = transport
            .upload(vec![change("p1"), change("p2")])
            .unwrap()
            .collect();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.error().is_none()));
        assert_eq!(transport.calls(), 1);
        assert_eq!(transport.observed_results(), 2);
    }

    #[test]
    fn mock_transport_scripted_failure() {
        let transport = MockTransport::new();
        transport.enqueue_batch_script(vec![
            ScriptedOutcome::Succeed,
            ScriptedOutcome::Fail("conflict".into()),
        ]);

        let mut stream = transport.upload(vec![change("p1"), change("p2")]).unwrap();
        assert!(stream.next().unwrap().error().is_none());
        assert!(stream.next().unwrap().error().is_some());
    }

    #[test]
    fn mock_transport_counts_only_pulled_results() {
        let transport = MockTransport::new();
        let mut stream = transport
            .upload(vec![change("p1"), change("p2"), change("p3")])
            .unwrap();

        stream.next();
        drop(stream);
        assert_eq!(transport.observed_results(), 1);
    }
}
