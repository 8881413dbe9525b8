//! Conflict detection and resolution policies.

use chartstore_core::Resource;

/// The outcome of resolving one conflicting identity.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictResolution {
    /// A final record was decided; it supersedes the pending local edits.
    Resolved(Resource),
    /// No decision; local state is left untouched for this identity.
    Unresolved,
}

/// A pluggable conflict-resolution policy.
///
/// Invoked only for identities present both in a remote batch and in the
/// local journal's changed-identity set. Returning
/// [`ConflictResolution::Unresolved`] leaves the local value and journal
/// untouched; local state wins by inaction.
pub trait ConflictResolver: Send + Sync {
    /// Decides between a local and a remote version of one record.
    fn resolve(&self, local: &Resource, remote: &Resource) -> ConflictResolution;
}

/// Resolves every conflict in favor of the remote version.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteWins;

impl ConflictResolver for RemoteWins {
    fn resolve(&self, _local: &Resource, remote: &Resource) -> ConflictResolution {
        ConflictResolution::Resolved(remote.clone())
    }
}

/// Resolves every conflict in favor of the current local version.
///
/// The local value becomes the new baseline and the pending journal entries
/// for the identity are cleared. Policies that want to keep the journal (so
/// the local edits still upload later) should return `Unresolved` instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalWins;

impl ConflictResolver for LocalWins {
    fn resolve(&self, local: &Resource, _remote: &Resource) -> ConflictResolution {
        ConflictResolution::Resolved(local.clone())
    }
}

/// Policy selector for the built-in resolvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Remote version always wins.
    #[default]
    RemoteWins,
    /// Current local version always wins.
    LocalWins,
}

impl ConflictPolicy {
    /// Constructs the resolver for this policy.
    pub fn resolver(&self) -> Box<dyn ConflictResolver> {
        match self {
            ConflictPolicy::RemoteWins => Box::new(RemoteWins),
            ConflictPolicy::LocalWins => Box::new(LocalWins),
        }
    }
}
