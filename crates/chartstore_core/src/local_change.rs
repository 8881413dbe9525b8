//! The journal of pending local mutations.

use crate::resource::{ResourceKey, ResourceType};
use serde::{Deserialize, Serialize};

/// The kind of a pending local mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalChangeKind {
    /// The record was created locally.
    Create,
    /// The record was updated locally.
    Update,
    /// The record was deleted locally.
    Delete,
}

/// An immutable journal entry describing one pending local mutation.
///
/// Entries carry a store-wide, strictly increasing `sequence`. The entries
/// for a given identity, applied in sequence order, reconstruct the current
/// local divergence from the last-synced baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalChange {
    /// The resource type.
    pub resource_type: ResourceType,
    /// The logical id of the mutated record.
    pub resource_id: String,
    /// The kind of mutation.
    pub kind: LocalChangeKind,
    /// The full content after the mutation; `None` for deletes.
    pub payload: Option<serde_json::Value>,
    /// Store-wide, strictly increasing sequence number.
    pub sequence: u64,
}

impl LocalChange {
    /// Returns the identity this change applies to.
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.resource_type, self.resource_id.clone())
    }

    /// Collapses a sequence-ordered run of changes to one identity into a
    /// single logical change.
    ///
    /// Rules:
    /// - a run ending in `Delete` squashes to a `Delete`
    /// - a run starting with `Create` squashes to a `Create` with the final
    ///   payload
    /// - anything else squashes to an `Update` with the final payload
    ///
    /// The squashed `sequence` is the run's maximum, so consolidation can
    /// clear every covered journal entry. Returns `None` for an empty run.
    pub fn squash(run: &[LocalChange]) -> Option<LocalChange> {
        let first = run.first()?;
        let last = run.last()?;

        let kind = if last.kind == LocalChangeKind::Delete {
            LocalChangeKind::Delete
        } else if first.kind == LocalChangeKind::Create {
            LocalChangeKind::Create
        } else {
            LocalChangeKind::Update
        };

        let payload = if kind == LocalChangeKind::Delete {
            None
        } else {
            last.payload.clone()
        };

        let sequence = run.iter().map(|c| c.sequence).max().unwrap_or(last.sequence);

        Some(LocalChange {
            resource_type: first.resource_type,
            resource_id: first.resource_id.clone(),
            kind,
            payload,
            sequence,
        })
    }
}
