//! Download-merge pipeline.
//!
//! Consumes a pull-based sequence of remote record batches; per batch,
//! detects identities that collide with un-synced local edits, resolves them
//! through the configured policy, and commits the remote baseline plus the
//! resolved corrections as one atomic unit.

use crate::error::{SyncError, SyncResult};
use crate::resolver::{ConflictResolution, ConflictResolver};
use crate::transport::DownloadSource;
use chartstore_core::{LocalChange, RecordStore, RecordTransaction, Resource, ResourceKey};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Counters for one download run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Batches committed.
    pub batches: u64,
    /// Records ingested across all batches.
    pub records: u64,
    /// Conflicts the resolver decided.
    pub resolved: u64,
    /// Conflicts left undecided (local state kept).
    pub unresolved: u64,
}

/// Runs a download-merge over every batch the source yields.
///
/// Each batch commits atomically: the remote records become the new synced
/// baseline, resolved conflicts overwrite it with the decided value and
/// clear their journal entries, and unresolved conflicts keep the prior
/// local value. A failing batch aborts with no partial effect; batches
/// committed before the failure stand.
pub fn sync_download<S, D>(
    store: &S,
    resolver: &dyn ConflictResolver,
    source: &mut D,
) -> SyncResult<DownloadSummary>
where
    S: RecordStore,
    D: DownloadSource + ?Sized,
{
    run_download(store, resolver, source, None)
}

pub(crate) fn run_download<S, D>(
    store: &S,
    resolver: &dyn ConflictResolver,
    source: &mut D,
    cancel: Option<&AtomicBool>,
) -> SyncResult<DownloadSummary>
where
    S: RecordStore,
    D: DownloadSource + ?Sized,
{
    let mut summary = DownloadSummary::default();

    loop {
        if let Some(flag) = cancel {
            if flag.load(Ordering::SeqCst) {
                return Err(SyncError::Cancelled);
            }
        }

        let batch = match source.next_batch()? {
            Some(batch) => batch,
            None => break,
        };

        summary.batches += 1;
        summary.records += batch.len() as u64;
        if batch.is_empty() {
            continue;
        }

        // Full journal scan per batch; callers with large journals should
        // batch downloads to amortize this.
        let changed: HashSet<ResourceKey> = store
            .get_all_local_changes()?
            .iter()
            .map(LocalChange::key)
            .collect();

        let mut resolved: Vec<Resource> = Vec::new();
        let mut kept_locals: Vec<Resource> = Vec::new();

        for remote in batch.iter().filter(|r| changed.contains(&r.key())) {
            let local = store.get(remote.resource_type, &remote.logical_id)?;
            match resolver.resolve(&local, remote) {
                ConflictResolution::Resolved(record) => resolved.push(record),
                ConflictResolution::Unresolved => {
                    // Local wins by inaction: the baseline insert below gets
                    // overwritten back with the prior local value.
                    kept_locals.push(local);
                    summary.unresolved += 1;
                }
            }
        }
        summary.resolved += resolved.len() as u64;

        debug!(
            batch = summary.batches,
            records = batch.len(),
            resolved = resolved.len(),
            unresolved = kept_locals.len(),
            "committing download batch"
        );

        store.with_transaction(move |txn| {
            for record in batch {
                txn.put_synced(record)?;
            }
            for record in resolved {
                txn.delete_journal_entries_for(&record.key())?;
                txn.put_current(record)?;
            }
            for record in kept_locals {
                txn.put_current(record)?;
            }
            Ok(())
        })?;
    }

    info!(
        batches = summary.batches,
        records = summary.records,
        resolved = summary.resolved,
        unresolved = summary.unresolved,
        "download run complete"
    );

    Ok(summary)
}
