//! # Access Lookup
//!
//! Visibility decisions for one resource selector and one role.
//!
//! ```text
//! default allow:    restricted_for_public(r) = some grant on r, none for public
//! default restrict: restricted_for_public(r) = no public grant on r
//!
//! visible(r, public) = !restricted_for_public(r)
//! visible(r, role)   = !restricted_for_public(r) || permitted_for_role(r, role)
//! ```
//!
//! All paths are root-to-leaf resource names, e.g. `["qwc_demo", "edit_lines"]`.

use permgen_core::{roles::is_public, GrantSnapshot, PathIndex, ResourceSelector};

/// Lookup of grants of one resource selector, as seen by one role.
#[derive(Debug, Clone)]
pub struct AccessLookup {
    permitted: PathIndex,
    public: PathIndex,
    restricted: PathIndex,
    default_allow: bool,
    public_role: bool,
}

impl AccessLookup {
    /// Build the lookup from a snapshot.
    ///
    /// # Arguments
    ///
    /// * `snapshot` - Grant snapshot of the run
    /// * `selector` - Resources the lookup covers
    /// * `role` - Role the decisions are made for
    /// * `default_allow` - Open-by-default policy
    pub fn new(
        snapshot: &GrantSnapshot,
        selector: ResourceSelector,
        role: &str,
        default_allow: bool,
    ) -> Self {
        let public = snapshot.permitted(selector, permgen_core::PUBLIC_ROLE);
        let permitted = if is_public(role) {
            public.clone()
        } else {
            snapshot.permitted(selector, role)
        };
        Self {
            permitted,
            public,
            restricted: snapshot.non_public(selector),
            default_allow,
            public_role: is_public(role),
        }
    }

    /// Check whether the resource is hidden from the public role.
    pub fn restricted_for_public(&self, path: &[&str]) -> bool {
        if self.default_allow {
            self.restricted.contains(path)
        } else {
            !self.public.permits(path)
        }
    }

    /// Check whether the resource carries a grant for some role but none
    /// for public, regardless of policy.
    pub fn explicitly_restricted(&self, path: &[&str]) -> bool {
        self.restricted.contains(path)
    }

    /// Check whether the role holds a grant on the resource, directly or
    /// through a wildcard sibling.
    pub fn permitted_for_role(&self, path: &[&str]) -> bool {
        self.permitted.permits(path)
    }

    /// Check whether the public role holds a grant on the resource.
    pub fn permitted_for_public(&self, path: &[&str]) -> bool {
        self.public.permits(path)
    }

    /// Check whether the role holds a grant on `name` directly below
    /// `path`, or a wildcard grant at that level.
    pub fn permits_name(&self, path: &[&str], name: &str) -> bool {
        self.permitted.permits(&child_path(path, name))
    }

    /// Check whether public holds a grant on `name` directly below `path`,
    /// or a wildcard grant at that level.
    pub fn public_permits_name(&self, path: &[&str], name: &str) -> bool {
        self.public.permits(&child_path(path, name))
    }

    /// Check whether the role may see the resource.
    pub fn visible(&self, path: &[&str]) -> bool {
        let restricted = self.restricted_for_public(path);
        if self.public_role {
            !restricted
        } else {
            !restricted || self.permitted_for_role(path)
        }
    }

    /// Names explicitly restricted directly below `path`, sorted.
    pub fn restricted_names(&self, path: &[&str]) -> Vec<&str> {
        self.restricted.names_under(path)
    }

    /// Check whether the lookup was built for the public role.
    pub fn is_public_role(&self) -> bool {
        self.public_role
    }

    /// Check whether the lookup uses the open-by-default policy.
    pub fn default_allow(&self) -> bool {
        self.default_allow
    }
}

fn child_path<'p>(path: &[&'p str], name: &'p str) -> Vec<&'p str> {
    let mut full = Vec::with_capacity(path.len() + 1);
    full.extend_from_slice(path);
    full.push(name);
    full
}
