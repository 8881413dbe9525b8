//! Search-result composition.
//!
//! Joins a base result set with forward- and reverse-include sets into
//! nested [`SearchResult`]s. One bulk fetch per include direction is shared
//! across all base records and sliced per record afterwards, so include work
//! never grows with the number of base records.

use crate::error::CoreResult;
use crate::resource::{Resource, ResourceKey, ResourceType};
use crate::store::RecordStore;
use std::collections::HashMap;

/// A compiled base query.
///
/// The query-specification language itself is out of scope; this is the
/// executable form the store consumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    /// The resource type to search.
    pub resource_type: Option<ResourceType>,
    /// Restrict to these logical ids, when set.
    pub ids: Option<Vec<String>>,
    /// Maximum number of base records to return.
    pub limit: Option<usize>,
}

impl SearchQuery {
    /// Creates a query over one resource type.
    pub fn for_type(resource_type: ResourceType) -> Self {
        Self {
            resource_type: Some(resource_type),
            ids: None,
            limit: None,
        }
    }

    /// Restricts the query to the given logical ids.
    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Caps the number of base records returned.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A forward-include specification: follow `relation` references out of the
/// base records.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeSpec {
    /// The reference field on the base record to follow.
    pub relation: String,
}

impl IncludeSpec {
    /// Creates a forward-include specification.
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
        }
    }
}

/// A reverse-include specification: find `resource_type` records whose
/// `relation` field references a base record.
#[derive(Debug, Clone, PartialEq)]
pub struct RevIncludeSpec {
    /// The type of the referencing resources to pull in.
    pub resource_type: ResourceType,
    /// The reference field on the referencing resource.
    pub relation: String,
}

impl RevIncludeSpec {
    /// Creates a reverse-include specification.
    pub fn new(resource_type: ResourceType, relation: impl Into<String>) -> Self {
        Self {
            resource_type,
            relation: relation.into(),
        }
    }
}

/// A full search specification: base query plus include expansions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSpec {
    /// The base query.
    pub query: SearchQuery,
    /// Forward-include expansions.
    pub includes: Vec<IncludeSpec>,
    /// Reverse-include expansions.
    pub rev_includes: Vec<RevIncludeSpec>,
}

impl SearchSpec {
    /// Creates a specification with no include expansions.
    pub fn new(query: SearchQuery) -> Self {
        Self {
            query,
            includes: Vec::new(),
            rev_includes: Vec::new(),
        }
    }

    /// Adds a forward-include expansion.
    pub fn with_include(mut self, include: IncludeSpec) -> Self {
        self.includes.push(include);
        self
    }

    /// Adds a reverse-include expansion.
    pub fn with_rev_include(mut self, rev_include: RevIncludeSpec) -> Self {
        self.rev_includes.push(rev_include);
        self
    }
}

/// One composed search result: a base record with its matching include
/// groups. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// The base record.
    pub resource: Resource,
    /// Forward-included resources, grouped by include relation. Store order
    /// is preserved within each group.
    pub included: HashMap<String, Vec<Resource>>,
    /// Reverse-included resources, grouped by `(referencing type, relation)`.
    pub rev_included: HashMap<(ResourceType, String), Vec<Resource>>,
}

/// Executes a search specification against a store and composes the results.
///
/// An empty base set short-circuits: no include fetch happens at all. Each
/// include direction is fetched with exactly one bulk store call, then sliced
/// per base record; groups that match no base record are discarded.
pub fn execute_search<S: RecordStore>(store: &S, spec: &SearchSpec) -> CoreResult<Vec<SearchResult>> {
    let base = store.search(&spec.query)?;
    if base.is_empty() {
        return Ok(Vec::new());
    }

    let keys: Vec<ResourceKey> = base.iter().map(Resource::key).collect();

    let mut forward: HashMap<ResourceKey, HashMap<String, Vec<Resource>>> = HashMap::new();
    if !spec.includes.is_empty() {
        for row in store.search_forward_includes(&keys, &spec.includes)? {
            forward
                .entry(row.base)
                .or_default()
                .entry(row.relation)
                .or_default()
                .push(row.resource);
        }
    }

    let mut reverse: HashMap<ResourceKey, HashMap<(ResourceType, String), Vec<Resource>>> =
        HashMap::new();
    if !spec.rev_includes.is_empty() {
        for row in store.search_reverse_includes(&keys, &spec.rev_includes)? {
            let group = (row.resource.resource_type, row.relation);
            reverse
                .entry(row.base)
                .or_default()
                .entry(group)
                .or_default()
                .push(row.resource);
        }
    }

    Ok(base
        .into_iter()
        .map(|resource| {
            let key = resource.key();
            SearchResult {
                resource,
                included: forward.remove(&key).unwrap_or_default(),
                rev_included: reverse.remove(&key).unwrap_or_default(),
            }
        })
        .collect())
}
