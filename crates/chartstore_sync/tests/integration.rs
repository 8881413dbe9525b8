//! End-to-end tests for the sync pipelines against the in-memory store.

use chartstore_core::{
    CoreError, CoreResult, ForwardIncludeRow, IncludeSpec, LocalChange, MemoryRecordStore,
    MemoryTransaction, RecordStore, Resource, ResourceKey, ResourceType, RevIncludeSpec,
    ReverseIncludeRow, SearchQuery,
};
use chartstore_sync::{
    sync_download, sync_upload, ConflictPolicy, FetchMode, MockTransport, RemoteWins,
    ScriptedOutcome, SyncConfig, SyncEngine, VecDownloadSource,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn patient(id: &str, name: &str) -> Resource {
    Resource::new(ResourceType::Patient, id, json!({ "name": name }))
}

fn observation(id: &str, subject: &str) -> Resource {
    Resource::new(
        ResourceType::Observation,
        id,
        json!({ "subject": { "reference": subject } }),
    )
}

#[test]
fn download_then_upload_round_trip() {
    init_tracing();
    let store = Arc::new(MemoryRecordStore::new());
    let engine = SyncEngine::new(Arc::clone(&store), SyncConfig::new());

    // Ingest a remote baseline.
    let mut source = VecDownloadSource::new(vec![vec![
        patient("p1", "remote-one"),
        patient("p2", "remote-two"),
    ]]);
    let summary = engine.download(&mut source).unwrap();
    assert_eq!(summary.records, 2);

    // Edit locally while "offline".
    store.update(vec![patient("p1", "edited")]).unwrap();
    store.delete(ResourceType::Patient, "p2").unwrap();

    // Drain the journal to the remote.
    let transport = MockTransport::new();
    let emissions: Vec<_> = engine.upload(transport).unwrap().collect();

    assert_eq!(emissions.first().unwrap().initial_total, 2);
    assert_eq!(emissions.last().unwrap().remaining, 0);
    assert!(store.get_all_local_changes().unwrap().is_empty());
}

#[test]
fn conflicting_download_respects_policy() {
    init_tracing();
    let store = Arc::new(MemoryRecordStore::new());
    store.insert(vec![patient("p1", "mine")]).unwrap();

    let engine = SyncEngine::new(
        Arc::clone(&store),
        SyncConfig::new().with_conflict_policy(ConflictPolicy::LocalWins),
    );

    let mut source = VecDownloadSource::new(vec![vec![patient("p1", "theirs")]]);
    let summary = engine.download(&mut source).unwrap();

    assert_eq!(summary.resolved, 1);
    assert_eq!(
        store.get(ResourceType::Patient, "p1").unwrap().content["name"],
        "mine"
    );
    // Resolution supersedes the pending edit.
    assert!(store.get_all_local_changes().unwrap().is_empty());
    assert_eq!(engine.stats().conflicts_resolved, 1);
}

#[test]
fn first_failure_stops_fetching_and_observing() {
    init_tracing();
    let store = Arc::new(MemoryRecordStore::new());
    store
        .insert(vec![
            patient("p1", "a"),
            patient("p2", "b"),
            patient("p3", "c"),
        ])
        .unwrap();

    let transport = MockTransport::new();
    // One batch with everything; the second change in it fails.
    transport.enqueue_batch_script(vec![
        ScriptedOutcome::Succeed,
        ScriptedOutcome::Fail("version conflict".into()),
        ScriptedOutcome::Succeed,
    ]);

    let run = sync_upload(Arc::clone(&store), FetchMode::AllChanges, transport).unwrap();
    let emissions: Vec<_> = run.collect();

    let last = emissions.last().unwrap();
    assert!(last.is_failed());
    // remaining never increases across the run.
    for window in emissions.windows(2) {
        assert!(window[1].remaining <= window[0].remaining);
    }

    // p1 consolidated; p2 and p3 still pending: the result that would have
    // arrived after the failure was never observed or consolidated.
    let pending: Vec<String> = store
        .get_all_local_changes()
        .unwrap()
        .iter()
        .map(|c| c.resource_id.clone())
        .collect();
    assert_eq!(pending, vec!["p2".to_string(), "p3".to_string()]);
}

#[test]
fn failing_batch_does_not_refetch() {
    init_tracing();
    let store = Arc::new(MemoryRecordStore::new());
    store
        .insert(vec![patient("p1", "a"), patient("p2", "b")])
        .unwrap();

    let transport = Arc::new(MockTransport::new());
    transport.enqueue_batch_script(vec![ScriptedOutcome::Fail("rejected".into())]);

    let emissions: Vec<_> = sync_upload(
        Arc::clone(&store),
        FetchMode::PerResource,
        Arc::clone(&transport),
    )
    .unwrap()
    .collect();

    assert!(emissions.last().unwrap().is_failed());
    // Exactly one upload call: after the failing batch the fetcher is never
    // asked for the second identity.
    assert_eq!(transport.calls(), 1);
    assert_eq!(store.get_all_local_changes().unwrap().len(), 2);
}

#[test]
fn observed_results_stop_at_first_failure() {
    init_tracing();
    let store = Arc::new(MemoryRecordStore::new());
    store
        .insert(vec![
            patient("p1", "a"),
            patient("p2", "b"),
            patient("p3", "c"),
        ])
        .unwrap();

    let transport = Arc::new(MockTransport::new());
    transport.enqueue_batch_script(vec![
        ScriptedOutcome::Fail("boom".into()),
        ScriptedOutcome::Succeed,
        ScriptedOutcome::Succeed,
    ]);

    sync_upload(Arc::clone(&store), FetchMode::AllChanges, Arc::clone(&transport))
        .unwrap()
        .for_each(drop);

    // Only the failing first result was pulled from the stream.
    assert_eq!(transport.observed_results(), 1);
    assert_eq!(transport.calls(), 1);
}

/// A store wrapper that injects a commit failure after the transaction block
/// has run, leaving the inner store rolled back.
struct FaultyStore {
    inner: MemoryRecordStore,
    fail_commits: AtomicBool,
}

impl FaultyStore {
    fn new() -> Self {
        Self {
            inner: MemoryRecordStore::new(),
            fail_commits: AtomicBool::new(false),
        }
    }
}

impl RecordStore for FaultyStore {
    type Txn = MemoryTransaction;

    fn insert(&self, resources: Vec<Resource>) -> CoreResult<Vec<String>> {
        self.inner.insert(resources)
    }

    fn get(&self, resource_type: ResourceType, id: &str) -> CoreResult<Resource> {
        self.inner.get(resource_type, id)
    }

    fn update(&self, resources: Vec<Resource>) -> CoreResult<()> {
        self.inner.update(resources)
    }

    fn delete(&self, resource_type: ResourceType, id: &str) -> CoreResult<()> {
        self.inner.delete(resource_type, id)
    }

    fn search(&self, query: &SearchQuery) -> CoreResult<Vec<Resource>> {
        self.inner.search(query)
    }

    fn search_forward_includes(
        &self,
        bases: &[ResourceKey],
        includes: &[IncludeSpec],
    ) -> CoreResult<Vec<ForwardIncludeRow>> {
        self.inner.search_forward_includes(bases, includes)
    }

    fn search_reverse_includes(
        &self,
        bases: &[ResourceKey],
        rev_includes: &[RevIncludeSpec],
    ) -> CoreResult<Vec<ReverseIncludeRow>> {
        self.inner.search_reverse_includes(bases, rev_includes)
    }

    fn with_transaction<T, F>(&self, block: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Self::Txn) -> CoreResult<T>,
    {
        let fail = self.fail_commits.load(Ordering::SeqCst);
        self.inner.with_transaction(|txn| {
            let value = block(txn)?;
            if fail {
                Err(CoreError::transaction_failure("injected commit failure"))
            } else {
                Ok(value)
            }
        })
    }

    fn insert_synced_baseline(&self, resources: Vec<Resource>) -> CoreResult<()> {
        self.inner.insert_synced_baseline(resources)
    }

    fn get_local_changes(
        &self,
        resource_type: ResourceType,
        id: &str,
    ) -> CoreResult<Vec<LocalChange>> {
        self.inner.get_local_changes(resource_type, id)
    }

    fn get_all_local_changes(&self) -> CoreResult<Vec<LocalChange>> {
        self.inner.get_all_local_changes()
    }

    fn delete_journal_entries_for(&self, keys: &[ResourceKey]) -> CoreResult<()> {
        self.inner.delete_journal_entries_for(keys)
    }

    fn delete_local_changes_up_to(&self, key: &ResourceKey, sequence: u64) -> CoreResult<()> {
        self.inner.delete_local_changes_up_to(key, sequence)
    }

    fn purge(&self, resource_type: ResourceType, ids: &[String], force: bool) -> CoreResult<()> {
        self.inner.purge(resource_type, ids, force)
    }

    fn clear(&self) -> CoreResult<()> {
        self.inner.clear()
    }
}

#[test]
fn batch_commit_failure_leaves_store_unchanged() {
    init_tracing();
    let store = FaultyStore::new();
    store.insert(vec![patient("p1", "local")]).unwrap();

    // First batch commits cleanly.
    let mut first = VecDownloadSource::new(vec![vec![patient("p0", "zero")]]);
    sync_download(&store, &RemoteWins, &mut first).unwrap();

    let record_before = store.get(ResourceType::Patient, "p1").unwrap();
    let journal_before = store.get_all_local_changes().unwrap();

    // Second batch fails at commit, after the baseline insert and the
    // conflict correction have both been applied to the transaction.
    store.fail_commits.store(true, Ordering::SeqCst);
    let mut second = VecDownloadSource::new(vec![vec![patient("p1", "remote")]]);
    let result = sync_download(&store, &RemoteWins, &mut second);

    assert!(matches!(
        result,
        Err(chartstore_sync::SyncError::Store(
            CoreError::TransactionFailure { .. }
        ))
    ));
    // No half-applied state from the failed batch.
    assert_eq!(store.get(ResourceType::Patient, "p1").unwrap(), record_before);
    assert_eq!(store.get_all_local_changes().unwrap(), journal_before);
    // The batch committed before the failure stands.
    assert!(store.get(ResourceType::Patient, "p0").is_ok());
}

#[test]
fn search_composition_groups_rev_includes_per_base() {
    init_tracing();
    // Base set = [PatientA, PatientB]; one observation owned by PatientA.
    let store = MemoryRecordStore::new();
    store
        .insert_synced_baseline(vec![
            patient("pa", "A"),
            patient("pb", "B"),
            observation("ox", "Patient/pa"),
        ])
        .unwrap();

    let spec = chartstore_core::SearchSpec::new(SearchQuery::for_type(ResourceType::Patient))
        .with_rev_include(RevIncludeSpec::new(ResourceType::Observation, "subject"));

    let results = chartstore_core::execute_search(&store, &spec).unwrap();
    assert_eq!(results.len(), 2);

    let pa = results.iter().find(|r| r.resource.logical_id == "pa").unwrap();
    let group = pa
        .rev_included
        .get(&(ResourceType::Observation, "subject".into()))
        .unwrap();
    assert_eq!(group.len(), 1);
    assert_eq!(group[0].logical_id, "ox");

    let pb = results.iter().find(|r| r.resource.logical_id == "pb").unwrap();
    assert!(pb.rev_included.is_empty());

    // One bulk fetch shared across both base records.
    assert_eq!(store.include_fetches(), 1);
}
