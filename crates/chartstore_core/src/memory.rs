//! In-memory record store.
//!
//! The reference implementation of [`RecordStore`]: thread-safe, with
//! snapshot transactions. Suitable for unit tests, integration tests, and
//! ephemeral stores that don't need persistence.

use crate::error::{CoreError, CoreResult};
use crate::local_change::{LocalChange, LocalChangeKind};
use crate::resource::{Resource, ResourceKey, ResourceType};
use crate::search::{IncludeSpec, RevIncludeSpec, SearchQuery};
use crate::store::{ForwardIncludeRow, RecordStore, RecordTransaction, ReverseIncludeRow};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct StoreState {
    records: BTreeMap<ResourceKey, Resource>,
    journal: Vec<LocalChange>,
    next_sequence: u64,
}

impl StoreState {
    fn journal_change(
        &mut self,
        resource_type: ResourceType,
        resource_id: &str,
        kind: LocalChangeKind,
        payload: Option<serde_json::Value>,
    ) {
        self.next_sequence += 1;
        self.journal.push(LocalChange {
            resource_type,
            resource_id: resource_id.to_owned(),
            kind,
            payload,
            sequence: self.next_sequence,
        });
    }
}

/// A thread-safe in-memory record store with snapshot transactions.
///
/// A transaction clones the current state, applies the block to the clone,
/// and swaps it in on success; any error discards the clone, so a failed
/// block has no observable effect.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    state: RwLock<StoreState>,
    include_fetches: AtomicU64,
}

impl MemoryRecordStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bulk include fetches executed so far.
    ///
    /// Test hook for verifying that search composition performs one bulk
    /// fetch per include direction.
    pub fn include_fetches(&self) -> u64 {
        self.include_fetches.load(Ordering::SeqCst)
    }
}

/// Transaction handle for [`MemoryRecordStore`].
#[derive(Debug)]
pub struct MemoryTransaction {
    state: StoreState,
}

impl RecordTransaction for MemoryTransaction {
    fn put_synced(&mut self, resource: Resource) -> CoreResult<()> {
        self.state.records.insert(resource.key(), resource);
        Ok(())
    }

    fn put_current(&mut self, resource: Resource) -> CoreResult<()> {
        self.state.records.insert(resource.key(), resource);
        Ok(())
    }

    fn delete_journal_entries_for(&mut self, key: &ResourceKey) -> CoreResult<()> {
        self.state.journal.retain(|c| &c.key() != key);
        Ok(())
    }

    fn delete_local_changes_up_to(&mut self, key: &ResourceKey, sequence: u64) -> CoreResult<()> {
        self.state
            .journal
            .retain(|c| !(&c.key() == key && c.sequence <= sequence));
        Ok(())
    }

    fn delete_record(&mut self, key: &ResourceKey) -> CoreResult<()> {
        self.state.records.remove(key);
        Ok(())
    }
}

impl RecordStore for MemoryRecordStore {
    type Txn = MemoryTransaction;

    fn insert(&self, resources: Vec<Resource>) -> CoreResult<Vec<String>> {
        let mut state = self.state.write();
        let mut ids = Vec::with_capacity(resources.len());

        for mut resource in resources {
            if resource.logical_id.is_empty() {
                resource.logical_id = Uuid::new_v4().to_string();
            }
            state.journal_change(
                resource.resource_type,
                &resource.logical_id,
                LocalChangeKind::Create,
                Some(resource.content.clone()),
            );
            ids.push(resource.logical_id.clone());
            state.records.insert(resource.key(), resource);
        }

        Ok(ids)
    }

    fn get(&self, resource_type: ResourceType, id: &str) -> CoreResult<Resource> {
        self.state
            .read()
            .records
            .get(&ResourceKey::new(resource_type, id))
            .cloned()
            .ok_or_else(|| CoreError::not_found(resource_type, id))
    }

    fn update(&self, resources: Vec<Resource>) -> CoreResult<()> {
        let mut state = self.state.write();

        for resource in resources {
            let key = resource.key();
            if !state.records.contains_key(&key) {
                return Err(CoreError::not_found(
                    resource.resource_type,
                    resource.logical_id,
                ));
            }
            state.journal_change(
                resource.resource_type,
                &resource.logical_id,
                LocalChangeKind::Update,
                Some(resource.content.clone()),
            );
            state.records.insert(key, resource);
        }

        Ok(())
    }

    fn delete(&self, resource_type: ResourceType, id: &str) -> CoreResult<()> {
        let mut state = self.state.write();
        let key = ResourceKey::new(resource_type, id);

        if state.records.remove(&key).is_none() {
            return Err(CoreError::not_found(resource_type, id));
        }
        state.journal_change(resource_type, id, LocalChangeKind::Delete, None);

        Ok(())
    }

    fn search(&self, query: &SearchQuery) -> CoreResult<Vec<Resource>> {
        let state = self.state.read();

        let results = state
            .records
            .values()
            .filter(|r| query.resource_type.map_or(true, |t| r.resource_type == t))
            .filter(|r| {
                query
                    .ids
                    .as_ref()
                    .map_or(true, |ids| ids.iter().any(|id| id == &r.logical_id))
            })
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(results)
    }

    fn search_forward_includes(
        &self,
        bases: &[ResourceKey],
        includes: &[IncludeSpec],
    ) -> CoreResult<Vec<ForwardIncludeRow>> {
        self.include_fetches.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read();
        let mut rows = Vec::new();

        for base in bases {
            let record = match state.records.get(base) {
                Some(r) => r,
                None => continue,
            };
            for include in includes {
                for target in record.reference_targets(&include.relation) {
                    if let Some(resource) = state.records.get(&target) {
                        rows.push(ForwardIncludeRow {
                            base: base.clone(),
                            relation: include.relation.clone(),
                            resource: resource.clone(),
                        });
                    }
                }
            }
        }

        Ok(rows)
    }

    fn search_reverse_includes(
        &self,
        bases: &[ResourceKey],
        rev_includes: &[RevIncludeSpec],
    ) -> CoreResult<Vec<ReverseIncludeRow>> {
        self.include_fetches.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read();
        let base_set: HashSet<&ResourceKey> = bases.iter().collect();
        let mut rows = Vec::new();

        for spec in rev_includes {
            for candidate in state
                .records
                .values()
                .filter(|r| r.resource_type == spec.resource_type)
            {
                for target in candidate.reference_targets(&spec.relation) {
                    if base_set.contains(&target) {
                        rows.push(ReverseIncludeRow {
                            base: target,
                            relation: spec.relation.clone(),
                            resource: candidate.clone(),
                        });
                    }
                }
            }
        }

        Ok(rows)
    }

    fn with_transaction<T, F>(&self, block: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Self::Txn) -> CoreResult<T>,
    {
        let mut state = self.state.write();
        let mut txn = MemoryTransaction {
            state: state.clone(),
        };

        match block(&mut txn) {
            Ok(value) => {
                *state = txn.state;
                Ok(value)
            }
            // Roll back by discarding the snapshot.
            Err(e) => Err(e),
        }
    }

    fn insert_synced_baseline(&self, resources: Vec<Resource>) -> CoreResult<()> {
        let mut state = self.state.write();
        for resource in resources {
            state.records.insert(resource.key(), resource);
        }
        Ok(())
    }

    fn get_local_changes(
        &self,
        resource_type: ResourceType,
        id: &str,
    ) -> CoreResult<Vec<LocalChange>> {
        let key = ResourceKey::new(resource_type, id);
        Ok(self
            .state
            .read()
            .journal
            .iter()
            .filter(|c| c.key() == key)
            .cloned()
            .collect())
    }

    fn get_all_local_changes(&self) -> CoreResult<Vec<LocalChange>> {
        Ok(self.state.read().journal.clone())
    }

    fn delete_journal_entries_for(&self, keys: &[ResourceKey]) -> CoreResult<()> {
        let key_set: HashSet<&ResourceKey> = keys.iter().collect();
        self.state
            .write()
            .journal
            .retain(|c| !key_set.contains(&c.key()));
        Ok(())
    }

    fn delete_local_changes_up_to(&self, key: &ResourceKey, sequence: u64) -> CoreResult<()> {
        self.state
            .write()
            .journal
            .retain(|c| !(&c.key() == key && c.sequence <= sequence));
        Ok(())
    }

    fn purge(&self, resource_type: ResourceType, ids: &[String], force: bool) -> CoreResult<()> {
        let mut state = self.state.write();

        for id in ids {
            let key = ResourceKey::new(resource_type, id);
            let has_pending = state.journal.iter().any(|c| c.key() == key);

            if has_pending && !force {
                return Err(CoreError::PurgeBlocked {
                    resource_type,
                    id: id.clone(),
                });
            }

            state.records.remove(&key);
            if has_pending {
                state.journal.retain(|c| c.key() != key);
            }
        }

        Ok(())
    }

    fn clear(&self) -> CoreResult<()> {
        *self.state.write() = StoreState::default();
        Ok(())
    }
}
