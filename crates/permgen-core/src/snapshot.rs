//! # Grant Snapshot
//!
//! One consistent, read-only view of the permission store, taken once per
//! generation run. Every decision for one document is computed against the
//! same snapshot; it is never refreshed mid-run.
//!
//! Loading validates the resource graph (see [`ResourceTree`]) and joins each
//! grant with its resource's root-to-leaf path, so lookups never walk parent
//! chains again.

use std::collections::HashSet;
use tracing::{debug, instrument, warn};

use crate::error::{ConfigurationError, PermGenResult};
use crate::grants::{by_priority, GrantTarget, ResolvedGrant};
use crate::index::{PathIndex, PathSegment};
use crate::resources::{Resource, ResourceSelector, ResourceTree, ResourceType};
use crate::roles::{is_public, Principals};
use crate::store::{PermissionStore, StoreSession};

/// A store row left out of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkippedRow {
    /// Resource with a type this generator does not know, or below one.
    Resource {
        /// Resource ID.
        id: i64,
        /// Raw type name.
        type_name: String,
    },
    /// Grant on a skipped resource.
    Grant {
        /// Grant ID.
        id: i64,
        /// Skipped resource ID.
        resource_id: i64,
    },
}

impl std::fmt::Display for SkippedRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkippedRow::Resource { id, type_name } => {
                write!(f, "Skipped resource {} of type '{}'", id, type_name)
            }
            SkippedRow::Grant { id, resource_id } => {
                write!(f, "Skipped grant {} on skipped resource {}", id, resource_id)
            }
        }
    }
}

/// Read-only snapshot of resources, grants and principals.
#[derive(Debug, Clone, Default)]
pub struct GrantSnapshot {
    tree: ResourceTree,
    grants: Vec<ResolvedGrant>,
    principals: Principals,
    skipped: Vec<SkippedRow>,
}

impl GrantSnapshot {
    /// Open a session on `store`, load a snapshot and release the session.
    ///
    /// The session is released on every exit path.
    pub fn capture(store: &dyn PermissionStore) -> PermGenResult<Self> {
        let session = store.open_session()?;
        Self::load(session.as_ref())
    }

    /// Load a snapshot from an open session.
    ///
    /// # Errors
    ///
    /// Store failures, malformed resource graphs and grants on resources
    /// that do not exist abort the load. Rows with unknown resource types
    /// are skipped and reported through [`GrantSnapshot::skipped_rows`].
    #[instrument(skip_all)]
    pub fn load(session: &dyn StoreSession) -> PermGenResult<Self> {
        let records = session.resources()?;
        let mut skipped = Vec::new();
        let mut skipped_ids: HashSet<i64> = HashSet::new();

        let mut typed = Vec::with_capacity(records.len());
        for record in records {
            match ResourceType::parse(&record.type_name) {
                Some(resource_type) => typed.push(Resource::new(
                    record.id,
                    resource_type,
                    record.name,
                    record.parent_id,
                )),
                None => {
                    warn!(
                        resource_id = record.id,
                        resource_type = %record.type_name,
                        "Skipping resource of unknown type"
                    );
                    skipped_ids.insert(record.id);
                    skipped.push(SkippedRow::Resource {
                        id: record.id,
                        type_name: record.type_name,
                    });
                }
            }
        }

        // descendants of skipped resources cannot be placed in the tree
        loop {
            let (orphans, kept): (Vec<Resource>, Vec<Resource>) = typed
                .into_iter()
                .partition(|r| r.parent_id.is_some_and(|p| skipped_ids.contains(&p)));
            typed = kept;
            if orphans.is_empty() {
                break;
            }
            for orphan in orphans {
                warn!(
                    resource_id = orphan.id,
                    "Skipping resource below a resource of unknown type"
                );
                skipped_ids.insert(orphan.id);
                skipped.push(SkippedRow::Resource {
                    id: orphan.id,
                    type_name: orphan.resource_type.to_string(),
                });
            }
        }

        let tree = ResourceTree::from_resources(typed)?;

        let mut grants = Vec::new();
        for grant in session.grants()? {
            if skipped_ids.contains(&grant.resource_id) {
                warn!(
                    grant_id = grant.id,
                    resource_id = grant.resource_id,
                    "Skipping grant on skipped resource"
                );
                skipped.push(SkippedRow::Grant {
                    id: grant.id,
                    resource_id: grant.resource_id,
                });
                continue;
            }
            let resource = tree
                .get(grant.resource_id)
                .ok_or(ConfigurationError::MissingResource {
                    grant_id: grant.id,
                    resource_id: grant.resource_id,
                })?;
            let mut path: Vec<PathSegment> = tree
                .ancestors(resource.id)
                .iter()
                .map(|r| PathSegment::from_name(&r.name))
                .collect();
            path.reverse();
            grants.push(ResolvedGrant {
                resource_type: resource.resource_type,
                parent_type: tree.parent(resource.id).map(|p| p.resource_type),
                target: GrantTarget::of(resource),
                path,
                grant,
            });
        }
        grants.sort_by(by_priority);

        let principals = session.principals()?;

        debug!(
            resources = tree.len(),
            grants = grants.len(),
            roles = principals.roles.len(),
            skipped = skipped.len(),
            "Loaded grant snapshot"
        );

        Ok(Self {
            tree,
            grants,
            principals,
            skipped,
        })
    }

    /// Grants selected by `selector`, optionally for one role only.
    ///
    /// Grants are ordered by descending priority, ties by ascending id.
    pub fn grants_of_type<'a>(
        &'a self,
        selector: ResourceSelector,
        role: Option<&'a str>,
    ) -> impl Iterator<Item = &'a ResolvedGrant> + 'a {
        self.grants.iter().filter(move |g| {
            g.is_selected_by(selector) && role.map_or(true, |r| g.grant.role == r)
        })
    }

    /// Grants selected by `selector`, for any role.
    pub fn all_grants_of_type(
        &self,
        selector: ResourceSelector,
    ) -> impl Iterator<Item = &ResolvedGrant> + '_ {
        self.grants_of_type(selector, None)
    }

    /// Look up a resource by id.
    pub fn resource_by_id(&self, id: i64) -> Option<&Resource> {
        self.tree.get(id)
    }

    /// Paths of resources selected by `selector` that `role` holds a grant on.
    pub fn permitted(&self, selector: ResourceSelector, role: &str) -> PathIndex {
        PathIndex::build(
            self.grants_of_type(selector, Some(role))
                .map(|g| g.path.iter().cloned()),
        )
    }

    /// Paths of resources selected by `selector` that carry a grant for some
    /// role, but none for `public`.
    pub fn non_public(&self, selector: ResourceSelector) -> PathIndex {
        let public: HashSet<i64> = self
            .all_grants_of_type(selector)
            .filter(|g| is_public(&g.grant.role))
            .map(|g| g.grant.resource_id)
            .collect();
        PathIndex::build(
            self.all_grants_of_type(selector)
                .filter(|g| !public.contains(&g.grant.resource_id))
                .map(|g| g.path.iter().cloned()),
        )
    }

    /// Users, groups and role names.
    pub fn principals(&self) -> &Principals {
        &self.principals
    }

    /// Rows left out of the snapshot.
    pub fn skipped_rows(&self) -> &[SkippedRow] {
        &self.skipped
    }

    /// The validated resource tree.
    pub fn tree(&self) -> &ResourceTree {
        &self.tree
    }

    /// Get the count of loaded grants.
    pub fn grant_count(&self) -> usize {
        self.grants.len()
    }
}
