//! Map info query permissions.
//!
//! Non-public roles only list the queries restricted for public that they
//! hold a grant on.

use permgen_core::ResourceType;
use tracing::instrument;

use super::{ResolveContext, Resolver};
use crate::fragment::PermissionFragment;

/// Resolver of the map info service.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapinfoResolver;

impl Resolver for MapinfoResolver {
    fn name(&self) -> &'static str {
        "mapinfo"
    }

    #[instrument(skip_all, fields(role = ctx.role))]
    fn resolve(&self, ctx: &ResolveContext<'_>) -> Vec<PermissionFragment> {
        let lookup = ctx.lookup(ResourceType::MapinfoQuery);
        let public = ctx.is_public_role();

        let queries = ctx
            .catalog
            .mapinfo_queries
            .iter()
            .filter(|id| {
                let path = [id.as_str()];
                let restricted = lookup.restricted_for_public(&path);
                (public && !restricted) || (restricted && lookup.permitted_for_role(&path))
            })
            .cloned()
            .collect();

        vec![PermissionFragment::MapinfoQuery(queries)]
    }
}
