//! # Chartstore Sync
//!
//! Synchronization core for chartstore.
//!
//! This crate provides:
//! - Download-merge pipeline with pluggable conflict resolution
//! - Upload-progress pipeline over the local-edit journal
//! - Local-change fetchers with selectable batching modes
//! - Upload transport and download source abstractions (plus mocks)
//! - A sync engine facade with configuration, cancellation, and stats
//!
//! ## Architecture
//!
//! Both pipelines run against the same [`chartstore_core::RecordStore`] and
//! are independent: a download run merges remote batches into the local
//! baseline, an upload run drains the local-edit journal to the remote.
//! Callers serialize the two per store instance; neither pipeline takes
//! internal locks across suspension points.
//!
//! ## Key Invariants
//!
//! - Each download batch commits as one atomic unit; committed batches stand
//!   even if a later batch fails
//! - Upload progress is monotonically non-increasing in `remaining` within a
//!   run, with `initial_total` fixed at fetcher construction
//! - The first upload failure ends the run; journal entries for failed and
//!   unfetched changes are left in place for a later retry
//! - There is no internal retry; retry is the caller's decision

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod consolidate;
mod download;
mod engine;
mod error;
mod fetcher;
mod progress;
mod resolver;
mod transport;
mod upload;

pub use config::SyncConfig;
pub use consolidate::consolidate;
pub use download::{sync_download, DownloadSummary};
pub use engine::{SyncEngine, SyncStats};
pub use error::{SyncError, SyncResult};
pub use fetcher::{create_fetcher, FetchMode, LocalChangeFetcher};
pub use progress::SyncUploadProgress;
pub use resolver::{ConflictPolicy, ConflictResolution, ConflictResolver, LocalWins, RemoteWins};
pub use transport::{
    DownloadSource, MockTransport, ScriptedOutcome, UploadRequestResult, UploadResultStream,
    UploadTransport, VecDownloadSource,
};
pub use upload::{sync_upload, UploadProgressIter};
