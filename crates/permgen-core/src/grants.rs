//! # Grants
//!
//! A grant authorizes a role to access one resource, with a priority and an
//! optional write flag. Grants are resolved against the resource tree once
//! per snapshot so every lookup works on root-to-leaf paths.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::index::PathSegment;
use crate::resources::{Resource, ResourceSelector, ResourceType};

/// A stored grant row.
///
/// # Example
///
/// ```
/// use permgen_core::grants::PermissionGrant;
///
/// let grant = PermissionGrant::new(1, "admin", 4, 0, true);
/// assert_eq!(grant.role, "admin");
/// assert!(grant.write);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PermissionGrant {
    /// Grant ID.
    pub id: i64,
    /// Role name.
    pub role: String,
    /// Granted resource.
    pub resource_id: i64,
    /// Higher priorities win single-valued decisions.
    #[serde(default)]
    pub priority: i32,
    /// Write access (only meaningful for datasets).
    #[serde(default)]
    pub write: bool,
}

impl PermissionGrant {
    /// Create a new grant.
    pub fn new(
        id: i64,
        role: impl Into<String>,
        resource_id: i64,
        priority: i32,
        write: bool,
    ) -> Self {
        Self {
            id,
            role: role.into(),
            resource_id,
            priority,
            write,
        }
    }
}

/// What a grant applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GrantTarget {
    /// A single named resource.
    Named(String),
    /// Every resource of the type below the grant's parent.
    AllOf(ResourceType),
}

impl GrantTarget {
    /// Interpret a granted resource.
    pub fn of(resource: &Resource) -> Self {
        match PathSegment::from_name(&resource.name) {
            PathSegment::All => GrantTarget::AllOf(resource.resource_type),
            PathSegment::Name(name) => GrantTarget::Named(name),
        }
    }

    /// Check whether this target covers every resource of its type.
    pub fn is_all(&self) -> bool {
        matches!(self, GrantTarget::AllOf(_))
    }
}

/// A grant joined with its resource and the resource's ancestor path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGrant {
    /// The stored grant.
    pub grant: PermissionGrant,
    /// Type of the granted resource.
    pub resource_type: ResourceType,
    /// Type of the granted resource's parent.
    pub parent_type: Option<ResourceType>,
    /// What the grant applies to.
    pub target: GrantTarget,
    /// Root-to-leaf path, ending with the granted resource.
    pub path: Vec<PathSegment>,
}

impl ResolvedGrant {
    /// Check whether the grant is selected by `selector`.
    pub fn is_selected_by(&self, selector: ResourceSelector) -> bool {
        selector.matches(self.resource_type, self.parent_type)
    }

    /// Name of the granted resource's parent, if it has one.
    pub fn parent_name(&self) -> Option<&str> {
        self.path
            .len()
            .checked_sub(2)
            .and_then(|idx| self.path[idx].name())
    }

    /// Name of the granted resource (`None` for wildcard grants).
    pub fn leaf_name(&self) -> Option<&str> {
        match &self.target {
            GrantTarget::Named(name) => Some(name),
            GrantTarget::AllOf(_) => None,
        }
    }
}

/// Order grants for single-valued decisions.
///
/// Highest priority first; equal priorities fall back to the lowest grant
/// id, so the order never depends on how the store returned the rows.
pub fn by_priority(a: &ResolvedGrant, b: &ResolvedGrant) -> Ordering {
    b.grant
        .priority
        .cmp(&a.grant.priority)
        .then_with(|| a.grant.id.cmp(&b.grant.id))
}
