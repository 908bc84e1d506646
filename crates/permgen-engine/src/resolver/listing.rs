//! Name-list permissions: search facets, dataproducts, document templates,
//! external links and the configured custom resource types.
//!
//! Each category is the sorted list of resource names granted to the role.

use permgen_core::ResourceType;
use tracing::instrument;

use super::{permitted_root_names, ResolveContext, Resolver};
use crate::fragment::PermissionFragment;

/// Resolver of the search, dataproduct, document and external link
/// services.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingResolver;

impl Resolver for ListingResolver {
    fn name(&self) -> &'static str {
        "listing"
    }

    #[instrument(skip_all, fields(role = ctx.role))]
    fn resolve(&self, ctx: &ResolveContext<'_>) -> Vec<PermissionFragment> {
        let names = |resource_type: ResourceType| permitted_root_names(ctx, resource_type.into());

        let mut fragments = vec![
            PermissionFragment::SolrFacets(names(ResourceType::SolrFacet)),
            PermissionFragment::Dataproducts(names(ResourceType::Dataproduct)),
            PermissionFragment::DocumentTemplates(names(ResourceType::DocumentTemplates)),
            PermissionFragment::ExternalLinks(names(ResourceType::ExternalLinks)),
        ];
        fragments.extend(ctx.config.custom_resource_types.iter().map(|resource_type| {
            PermissionFragment::Custom {
                resource_type: *resource_type,
                names: names(*resource_type),
            }
        }));
        fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::GeneratorConfig;
    use permgen_core::{GrantSnapshot, MemoryStore};

    #[test]
    fn test_sorted_permitted_names() {
        let store = MemoryStore::default()
            .with_resource(1, "solr_facet", "parcels", None)
            .with_resource(2, "solr_facet", "addresses", None)
            .with_resource(3, "dataproduct", "ortho", None)
            .with_resource(4, "tileset3d", "buildings", None)
            .with_grant(1, "admin", 1, 0, false)
            .with_grant(2, "admin", 2, 0, false)
            .with_grant(3, "public", 3, 0, false)
            .with_grant(4, "admin", 4, 0, false);
        let snapshot = GrantSnapshot::capture(&store).unwrap();
        let config = GeneratorConfig::default().with_custom_resource_type(ResourceType::Tileset3d);
        let catalog = Catalog::new();

        let resolve = |role: &str| {
            ListingResolver.resolve(&ResolveContext::new(&snapshot, &config, &catalog, role))
        };

        let admin = resolve("admin");
        assert_eq!(
            admin[0],
            PermissionFragment::SolrFacets(vec!["addresses".into(), "parcels".into()])
        );
        assert!(admin[1].is_empty());
        assert_eq!(
            admin[4],
            PermissionFragment::Custom {
                resource_type: ResourceType::Tileset3d,
                names: vec!["buildings".into()],
            }
        );

        let public = resolve("public");
        assert!(public[0].is_empty());
        assert_eq!(public[1], PermissionFragment::Dataproducts(vec!["ortho".into()]));
        assert!(public[4].is_empty());
    }

    #[test]
    fn test_no_custom_types_by_default() {
        let snapshot = GrantSnapshot::default();
        let config = GeneratorConfig::default();
        let catalog = Catalog::new();
        let ctx = ResolveContext::new(&snapshot, &config, &catalog, "public");
        let fragments = ListingResolver.resolve(&ctx);
        assert_eq!(fragments.len(), 4);
    }
}
