//! The durable record-store contract.
//!
//! The sync pipelines and the search composer are written against this
//! contract. The physical storage engine behind it is assumed correct; this
//! crate ships [`crate::MemoryRecordStore`] as the reference implementation.

use crate::error::CoreResult;
use crate::local_change::LocalChange;
use crate::resource::{Resource, ResourceKey, ResourceType};
use crate::search::{IncludeSpec, RevIncludeSpec, SearchQuery};

/// One forward-include match from a bulk include fetch.
///
/// `base` is the identity of the originating base record; `relation` is the
/// include relation that produced the match.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardIncludeRow {
    /// Identity of the base record this match belongs to.
    pub base: ResourceKey,
    /// The include relation.
    pub relation: String,
    /// The included resource.
    pub resource: Resource,
}

/// One reverse-include match from a bulk include fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ReverseIncludeRow {
    /// Identity of the base record this match points at.
    pub base: ResourceKey,
    /// The include relation on the referencing resource.
    pub relation: String,
    /// The referencing resource.
    pub resource: Resource,
}

/// Scoped handle for mutations inside one atomic transaction.
///
/// All writes made through a handle commit together or not at all.
pub trait RecordTransaction {
    /// Inserts or overwrites a record as the synced baseline, without
    /// journaling.
    fn put_synced(&mut self, resource: Resource) -> CoreResult<()>;

    /// Inserts or overwrites the current value of a record, without
    /// journaling.
    fn put_current(&mut self, resource: Resource) -> CoreResult<()>;

    /// Deletes every pending journal entry for an identity.
    fn delete_journal_entries_for(&mut self, key: &ResourceKey) -> CoreResult<()>;

    /// Deletes pending journal entries for an identity with sequence at or
    /// below `sequence`. A no-op when nothing matches.
    fn delete_local_changes_up_to(&mut self, key: &ResourceKey, sequence: u64) -> CoreResult<()>;

    /// Removes a record, without journaling.
    fn delete_record(&mut self, key: &ResourceKey) -> CoreResult<()>;
}

/// A durable store of versioned records plus their local-edit journal.
///
/// The store exclusively owns durable record and journal state; callers hold
/// only transient, request-scoped views. Every local CRUD call journals a
/// [`LocalChange`]; sync operations write through [`RecordTransaction`]
/// handles and never journal.
pub trait RecordStore: Send + Sync {
    /// The transaction handle type for this store.
    type Txn: RecordTransaction;

    /// Inserts records, assigning a logical id to any record without one.
    ///
    /// Journals one `Create` per record. Returns the logical ids in input
    /// order.
    fn insert(&self, resources: Vec<Resource>) -> CoreResult<Vec<String>>;

    /// Gets the current local version of an identity.
    fn get(&self, resource_type: ResourceType, id: &str) -> CoreResult<Resource>;

    /// Updates existing records. Journals one `Update` per record.
    fn update(&self, resources: Vec<Resource>) -> CoreResult<()>;

    /// Deletes a record. Journals a `Delete`.
    fn delete(&self, resource_type: ResourceType, id: &str) -> CoreResult<()>;

    /// Executes a compiled base query.
    fn search(&self, query: &SearchQuery) -> CoreResult<Vec<Resource>>;

    /// Bulk-fetches forward-include matches for a set of base identities.
    ///
    /// One call covers every base record; rows are keyed by originating base
    /// identity and preserve the store's ordering within each group.
    fn search_forward_includes(
        &self,
        bases: &[ResourceKey],
        includes: &[IncludeSpec],
    ) -> CoreResult<Vec<ForwardIncludeRow>>;

    /// Bulk-fetches reverse-include matches for a set of base identities,
    /// keyed by the base record's `(type, logical id)` composite.
    fn search_reverse_includes(
        &self,
        bases: &[ResourceKey],
        rev_includes: &[RevIncludeSpec],
    ) -> CoreResult<Vec<ReverseIncludeRow>>;

    /// Runs `block` inside one atomic transaction.
    ///
    /// If the block returns an error the transaction rolls back completely
    /// and the error propagates.
    fn with_transaction<T, F>(&self, block: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Self::Txn) -> CoreResult<T>;

    /// Bulk-inserts/overwrites records as the synced baseline, without
    /// journaling.
    fn insert_synced_baseline(&self, resources: Vec<Resource>) -> CoreResult<()>;

    /// Returns the pending journal entries for one identity, in sequence
    /// order.
    fn get_local_changes(&self, resource_type: ResourceType, id: &str)
        -> CoreResult<Vec<LocalChange>>;

    /// Returns every pending journal entry, in sequence order.
    fn get_all_local_changes(&self) -> CoreResult<Vec<LocalChange>>;

    /// Deletes every pending journal entry for the given identities.
    fn delete_journal_entries_for(&self, keys: &[ResourceKey]) -> CoreResult<()>;

    /// Deletes pending journal entries for an identity with sequence at or
    /// below `sequence`. A no-op when nothing matches.
    fn delete_local_changes_up_to(&self, key: &ResourceKey, sequence: u64) -> CoreResult<()>;

    /// Removes local copies of records.
    ///
    /// Refuses identities with pending journal entries unless `force`, in
    /// which case the journal entries are dropped too.
    fn purge(&self, resource_type: ResourceType, ids: &[String], force: bool) -> CoreResult<()>;

    /// Removes all records and journal entries.
    fn clear(&self) -> CoreResult<()>;
}
