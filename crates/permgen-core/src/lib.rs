//! # Permgen Core
//!
//! Resource and grant model of the permission generator, shared by the
//! resolvers of every map viewer service.
//!
//! ## Overview
//!
//! The permgen-core crate handles:
//! - **Resources**: Typed, optionally parented resources (maps, layers,
//!   attributes, datasets, viewer tasks, ...) and the validated resource tree
//! - **Grants**: Role grants on resources, with priority and write flag
//! - **Roles**: The reserved `public` role, users and groups
//! - **Path Index**: Ancestor-path keyed lookup of granted resources
//! - **Store**: The read-only permission store capability
//! - **Snapshot**: One consistent view of the store per generation run
//!
//! ## Architecture
//!
//! ```text
//! PermissionStore ──open_session──▶ StoreSession
//!                                        │
//!                              GrantSnapshot::load
//!                                        │
//!          ResourceTree + ResolvedGrant(path) + Principals
//!                                        │
//!                     permitted(selector, role) / non_public(selector)
//!                                        │
//!                                    PathIndex
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use permgen_core::{GrantSnapshot, MemoryStore, ResourceSelector, ResourceType};
//!
//! let store = MemoryStore::default()
//!     .with_role("admin")
//!     .with_resource(1, "map", "qwc_demo", None)
//!     .with_resource(2, "layer", "edit_lines", Some(1))
//!     .with_resource(3, "attribute", "Name", Some(2))
//!     .with_grant(1, "admin", 3, 0, false);
//!
//! let snapshot = GrantSnapshot::capture(&store).unwrap();
//!
//! // Attribute is restricted for the public role...
//! let restricted = snapshot.non_public(ResourceSelector::LAYER_ATTRIBUTES);
//! assert!(restricted.contains(&["qwc_demo", "edit_lines", "Name"]));
//!
//! // ...and permitted for admin
//! let permitted = snapshot.permitted(ResourceSelector::LAYER_ATTRIBUTES, "admin");
//! assert!(permitted.contains(&["qwc_demo", "edit_lines", "Name"]));
//!
//! assert!(snapshot.permitted(ResourceType::Layer.into(), "admin").is_empty());
//! ```
//!
//! ## Wildcards
//!
//! A resource named `*` stands for every sibling of its type. Grants on it
//! are resolved as [`GrantTarget::AllOf`] and matched by
//! [`PathIndex::permits`].

pub mod error;
pub mod grants;
pub mod index;
pub mod resources;
pub mod roles;
pub mod snapshot;
pub mod store;

// Re-export main types for convenience
pub use error::{
    ConfigResult, ConfigurationError, PermGenError, PermGenResult, StoreError, StoreResult,
};
pub use grants::{GrantTarget, PermissionGrant, ResolvedGrant};
pub use index::{PathIndex, PathSegment};
pub use resources::{Resource, ResourceRecord, ResourceSelector, ResourceTree, ResourceType};
pub use roles::{GroupRecord, Principals, UserRecord, PUBLIC_ROLE};
pub use snapshot::{GrantSnapshot, SkippedRow};
pub use store::{MemoryStore, PermissionStore, StoreDump, StoreSession};
