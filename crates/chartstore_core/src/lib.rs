//! # Chartstore Core
//!
//! Record model and store contract for chartstore, an offline-first store of
//! versioned clinical resources.
//!
//! This crate provides:
//! - Typed, identified, versioned records (`Resource`, `ResourceKey`)
//! - A journal of pending local mutations (`LocalChange`)
//! - The durable record-store contract (`RecordStore`, `RecordTransaction`)
//! - An in-memory reference store with snapshot transactions
//! - Search composition: base results joined with include / reverse-include
//!   sets keyed by composite identity
//!
//! ## Key Invariants
//!
//! - Identity is `(resource type, logical id)`; only one version of an
//!   identity is current locally
//! - Journal entries for an identity, applied in sequence order, reconstruct
//!   the divergence from the last-synced baseline
//! - Every transaction commits as a single atomic unit or not at all

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod local_change;
mod memory;
mod resource;
mod search;
mod store;

pub use error::{CoreError, CoreResult};
pub use local_change::{LocalChange, LocalChangeKind};
pub use memory::{MemoryRecordStore, MemoryTransaction};
pub use resource::{Resource, ResourceKey, ResourceType};
pub use search::{
    execute_search, IncludeSpec, RevIncludeSpec, SearchQuery, SearchResult, SearchSpec,
};
pub use store::{ForwardIncludeRow, RecordStore, RecordTransaction, ReverseIncludeRow};
