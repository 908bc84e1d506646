//! # Permission Resolvers
//!
//! One resolver per subsystem. Each resolver turns the grant snapshot and
//! the subsystem's catalog into permission fragments for one role:
//!
//! | Resolver            | Categories                                          |
//! |---------------------|-----------------------------------------------------|
//! | [`OgcResolver`]     | `wms_services`, `wfs_services`, `print_templates`   |
//! | [`InfoResolver`]    | `wms_services` (feature info)                       |
//! | [`DataResolver`]    | `data_datasets`                                     |
//! | [`ViewerResolver`]  | `background_layers`, `viewer_tasks`, `theme_info_links`, `plugin_data` |
//! | [`ListingResolver`] | `solr_facets`, `dataproducts`, `document_templates`, `external_links`, custom types |
//! | [`MapinfoResolver`] | `mapinfo_query`                                     |
//!
//! Resolvers perform no I/O; all store access happened when the snapshot
//! was captured.

pub mod data;
pub mod info;
pub mod listing;
pub mod mapinfo;
pub mod ogc;
pub mod viewer;

pub use data::DataResolver;
pub use info::InfoResolver;
pub use listing::ListingResolver;
pub use mapinfo::MapinfoResolver;
pub use ogc::OgcResolver;
pub use viewer::ViewerResolver;

use permgen_core::{roles::is_public, GrantSnapshot, ResourceSelector};
use tracing::debug;

use crate::catalog::Catalog;
use crate::config::GeneratorConfig;
use crate::fragment::PermissionFragment;
use crate::lookup::AccessLookup;

/// Inputs of one resolution for one role.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Snapshot of the run
    pub snapshot: &'a GrantSnapshot,
    /// Policy switches
    pub config: &'a GeneratorConfig,
    /// Candidate resources
    pub catalog: &'a Catalog,
    /// Role being resolved
    pub role: &'a str,
}

impl<'a> ResolveContext<'a> {
    /// Create a context.
    pub fn new(
        snapshot: &'a GrantSnapshot,
        config: &'a GeneratorConfig,
        catalog: &'a Catalog,
        role: &'a str,
    ) -> Self {
        Self {
            snapshot,
            config,
            catalog,
            role,
        }
    }

    /// Build the access lookup for a selector under the configured policy.
    pub fn lookup(&self, selector: impl Into<ResourceSelector>) -> AccessLookup {
        AccessLookup::new(
            self.snapshot,
            selector.into(),
            self.role,
            self.config.permissions_default_allow,
        )
    }

    /// Check whether the role being resolved is `public`.
    pub fn is_public_role(&self) -> bool {
        is_public(self.role)
    }

    /// Check whether unrestricted info visibility follows base visibility.
    pub fn info_follows_base(&self) -> bool {
        self.config.permissions_default_allow || self.config.inherit_info_permissions
    }
}

/// A subsystem computing permission fragments.
pub trait Resolver: Send + Sync {
    /// Subsystem name used in logs.
    fn name(&self) -> &'static str;

    /// Compute the fragments of one role.
    fn resolve(&self, ctx: &ResolveContext<'_>) -> Vec<PermissionFragment>;
}

/// All resolvers in merge order.
///
/// The order decides which value is kept when fragments conflict.
pub fn resolvers() -> Vec<Box<dyn Resolver>> {
    vec![
        Box::new(OgcResolver),
        Box::new(InfoResolver),
        Box::new(DataResolver),
        Box::new(ViewerResolver),
        Box::new(ListingResolver),
        Box::new(MapinfoResolver),
    ]
}

/// Run every resolver for the role in `ctx`.
pub fn resolve_role(ctx: &ResolveContext<'_>) -> Vec<PermissionFragment> {
    let mut fragments = Vec::new();
    for resolver in resolvers() {
        for fragment in resolver.resolve(ctx) {
            debug!(
                resolver = resolver.name(),
                role = ctx.role,
                category = %fragment.category(),
                entries = fragment.len(),
                "Resolved fragment"
            );
            fragments.push(fragment);
        }
    }
    fragments
}

/// Keep `items` in catalog order, removing those in `excluded`.
pub(crate) fn without<'s>(
    items: impl IntoIterator<Item = &'s String>,
    excluded: &[&str],
) -> Vec<String> {
    items
        .into_iter()
        .filter(|item| !excluded.contains(&item.as_str()))
        .cloned()
        .collect()
}

/// Leaf attribute policy shared by WMS, WFS and datasets.
///
/// Attributes are visible unless explicitly restricted.
///
/// - public: all attributes except restricted ones
/// - below a restricted resource: all attributes except those restricted
///   and not granted to the role
/// - otherwise: only the attributes granted to the role, on top of what
///   public already sees
///
/// A `*` attribute grant counts for every attribute of the leaf. Only exact
/// grants restrict.
pub(crate) fn leaf_attributes(
    attributes: &[String],
    lookup: &AccessLookup,
    path: &[&str],
    restricted_chain: bool,
) -> Vec<String> {
    let restricted = lookup.restricted_names(path);

    if lookup.is_public_role() {
        without(attributes, &restricted)
    } else if restricted_chain {
        let hidden: Vec<&str> = restricted
            .into_iter()
            .filter(|name| !lookup.permits_name(path, name))
            .collect();
        without(attributes, &hidden)
    } else {
        attributes
            .iter()
            .filter(|attr| lookup.permits_name(path, attr))
            .cloned()
            .collect()
    }
}

/// Sorted names of root resources of a type granted to the role.
pub(crate) fn permitted_root_names(
    ctx: &ResolveContext<'_>,
    selector: ResourceSelector,
) -> Vec<String> {
    let permitted = ctx.snapshot.permitted(selector, ctx.role);
    permitted.names().map(str::to_string).collect()
}
