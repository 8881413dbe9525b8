//! Local-change fetchers.
//!
//! A fetcher snapshots the pending journal at construction and yields
//! successive batches of squashed local changes under a selectable batching
//! mode. `total` is the snapshot's raw entry count and is never recomputed
//! mid-run, even if new local edits land concurrently.

use crate::error::{SyncError, SyncResult};
use crate::progress::SyncUploadProgress;
use chartstore_core::{LocalChange, RecordStore, ResourceKey};
use std::collections::VecDeque;

/// Batching mode for draining the local-edit journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// One batch covering every changed identity, one squashed change each.
    #[default]
    AllChanges,
    /// One squashed per-identity batch per `next()`, for granular progress.
    PerResource,
}

/// A stateful iterator over batches of pending local changes.
///
/// `has_next` / `next` are meant to be called alternately; `next` errors with
/// [`SyncError::FetcherExhausted`] once `has_next` has returned false.
/// `progress` reflects entries consumed so far, independent of whether their
/// upload succeeded.
pub trait LocalChangeFetcher: Send {
    /// Raw pending-entry count snapshotted at construction.
    fn total(&self) -> u64;

    /// Returns true if another batch is available.
    fn has_next(&self) -> bool;

    /// Returns the next batch of squashed local changes.
    fn next(&mut self) -> SyncResult<Vec<LocalChange>>;

    /// Returns the running progress for this fetcher's run.
    fn progress(&self) -> SyncUploadProgress;
}

/// One queued batch plus the number of raw journal entries it covers.
#[derive(Debug)]
struct Batch {
    changes: Vec<LocalChange>,
    covered: u64,
}

#[derive(Debug)]
struct FetcherState {
    total: u64,
    consumed: u64,
    queue: VecDeque<Batch>,
}

impl FetcherState {
    fn has_next(&self) -> bool {
        !self.queue.is_empty()
    }

    fn next(&mut self) -> SyncResult<Vec<LocalChange>> {
        let batch = self.queue.pop_front().ok_or(SyncError::FetcherExhausted)?;
        self.consumed += batch.covered;
        Ok(batch.changes)
    }

    fn progress(&self) -> SyncUploadProgress {
        SyncUploadProgress {
            remaining: self.total - self.consumed,
            initial_total: self.total,
            upload_error: None,
        }
    }
}

/// Fetcher for [`FetchMode::AllChanges`]: everything in one batch.
struct AllChangesFetcher {
    state: FetcherState,
}

/// Fetcher for [`FetchMode::PerResource`]: one identity per batch.
struct PerResourceFetcher {
    state: FetcherState,
}

impl LocalChangeFetcher for AllChangesFetcher {
    fn total(&self) -> u64 {
        self.state.total
    }

    fn has_next(&self) -> bool {
        self.state.has_next()
    }

    fn next(&mut self) -> SyncResult<Vec<LocalChange>> {
        self.state.next()
    }

    fn progress(&self) -> SyncUploadProgress {
        self.state.progress()
    }
}

impl LocalChangeFetcher for PerResourceFetcher {
    fn total(&self) -> u64 {
        self.state.total
    }

    fn has_next(&self) -> bool {
        self.state.has_next()
    }

    fn next(&mut self) -> SyncResult<Vec<LocalChange>> {
        self.state.next()
    }

    fn progress(&self) -> SyncUploadProgress {
        self.state.progress()
    }
}

/// Groups a sequence-ordered journal into per-identity runs, preserving
/// first-seen identity order.
fn group_runs(journal: Vec<LocalChange>) -> Vec<Vec<LocalChange>> {
    let mut order: Vec<ResourceKey> = Vec::new();
    let mut runs: std::collections::HashMap<ResourceKey, Vec<LocalChange>> =
        std::collections::HashMap::new();

    for change in journal {
        let key = change.key();
        if !runs.contains_key(&key) {
            order.push(key.clone());
        }
        runs.entry(key).or_default().push(change);
    }

    order.into_iter().filter_map(|key| runs.remove(&key)).collect()
}

/// Constructs the fetcher for a batching mode.
///
/// Snapshots the journal once, here; the fetcher never reads the store again.
pub fn create_fetcher<S: RecordStore>(
    store: &S,
    mode: FetchMode,
) -> SyncResult<Box<dyn LocalChangeFetcher>> {
    let journal = store.get_all_local_changes()?;
    let total = journal.len() as u64;

    let per_identity: Vec<Batch> = group_runs(journal)
        .into_iter()
        .filter_map(|run| {
            let covered = run.len() as u64;
            LocalChange::squash(&run).map(|change| Batch {
                changes: vec![change],
                covered,
            })
        })
        .collect();

    match mode {
        FetchMode::AllChanges => {
            let mut queue = VecDeque::new();
            if !per_identity.is_empty() {
                let covered = per_identity.iter().map(|b| b.covered).sum();
                let changes = per_identity
                    .into_iter()
                    .flat_map(|b| b.changes)
                    .collect();
                queue.push_back(Batch { changes, covered });
            }
            Ok(Box::new(AllChangesFetcher {
                state: FetcherState {
                    total,
                    consumed: 0,
                    queue,
                },
            }))
        }
        FetchMode::PerResource => Ok(Box::new(PerResourceFetcher {
            state: FetcherState {
                total,
                consumed: 0,
                queue: per_identity.into(),
            },
        })),
    }
}
