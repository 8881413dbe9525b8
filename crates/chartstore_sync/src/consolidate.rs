//! Resource consolidation.
//!
//! Applies the outcome of an upload attempt back onto the journal and store.

use crate::error::SyncResult;
use crate::transport::UploadRequestResult;
use chartstore_core::{RecordStore, RecordTransaction};
use tracing::{debug, warn};

/// Consolidates one upload result into the store.
///
/// On success: the journal entries covered by the change (everything for its
/// identity up to its squashed sequence) are removed, and if the transport
/// returned an updated remote representation it replaces the stored record.
/// Both happen inside one transaction. A change whose journal entries are
/// already gone consolidates as a no-op.
///
/// On failure: the journal is left untouched so a future run can retry; the
/// error itself is surfaced by the upload pipeline's progress annotation.
///
/// Must be called at most once per result; journal entries are not
/// guaranteed unique-deletable across repeated calls.
pub fn consolidate<S: RecordStore>(store: &S, result: UploadRequestResult) -> SyncResult<()> {
    match result {
        UploadRequestResult::Success { change, outcome } => {
            let key = change.key();
            let sequence = change.sequence;
            debug!(%key, sequence, "consolidating uploaded change");

            store.with_transaction(move |txn| {
                txn.delete_local_changes_up_to(&key, sequence)?;
                if let Some(resource) = outcome {
                    txn.put_current(resource)?;
                }
                Ok(())
            })?;
            Ok(())
        }
        UploadRequestResult::Failure { change, error } => {
            warn!(key = %change.key(), %error, "upload failed; journal entry kept for retry");
            Ok(())
        }
    }
}
