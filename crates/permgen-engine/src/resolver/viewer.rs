//! Map viewer permissions: background layers, viewer tasks, theme info
//! links and plugin data.
//!
//! Everything except background layers requires an explicit grant.

use permgen_core::ResourceType;
use tracing::instrument;

use super::{permitted_root_names, ResolveContext, Resolver};
use crate::fragment::{PermissionFragment, PluginDataPermission};

/// Resolver of the map viewer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewerResolver;

impl Resolver for ViewerResolver {
    fn name(&self) -> &'static str {
        "map_viewer"
    }

    #[instrument(skip_all, fields(role = ctx.role))]
    fn resolve(&self, ctx: &ResolveContext<'_>) -> Vec<PermissionFragment> {
        // background layers are not access controlled, public sees them all
        let background_layers = if ctx.is_public_role() {
            ctx.catalog.background_layers.clone()
        } else {
            Vec::new()
        };

        vec![
            PermissionFragment::BackgroundLayers(background_layers),
            PermissionFragment::ViewerTasks(permitted_root_names(
                ctx,
                ResourceType::ViewerTask.into(),
            )),
            PermissionFragment::ThemeInfoLinks(permitted_root_names(
                ctx,
                ResourceType::ThemeInfoLink.into(),
            )),
            PermissionFragment::PluginData(plugin_data(ctx)),
        ]
    }
}

/// Granted plugin data resources grouped by plugin, sorted by plugin name.
///
/// Grants on the plugin itself are ignored.
fn plugin_data(ctx: &ResolveContext<'_>) -> Vec<PluginDataPermission> {
    let permitted = ctx
        .snapshot
        .permitted(ResourceType::PluginData.into(), ctx.role);
    permitted
        .entries()
        .map(|(plugin, resources)| PluginDataPermission {
            name: plugin.to_string(),
            resources: resources.names().map(str::to_string).collect(),
        })
        .filter(|plugin| !plugin.resources.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::GeneratorConfig;
    use permgen_core::{GrantSnapshot, MemoryStore};

    fn store() -> MemoryStore {
        MemoryStore::default()
            .with_resource(1, "viewer_task", "measure", None)
            .with_resource(2, "viewer_task", "print", None)
            .with_resource(3, "theme_info_link", "about", None)
            .with_resource(4, "plugin", "elevation", None)
            .with_resource(5, "plugin_data", "dem", Some(4))
            .with_resource(6, "plugin_data", "dsm", Some(4))
            .with_resource(7, "plugin", "routing", None)
            .with_grant(1, "admin", 2, 0, false)
            .with_grant(2, "admin", 1, 0, false)
            .with_grant(3, "public", 3, 0, false)
            .with_grant(4, "admin", 6, 0, false)
            .with_grant(5, "admin", 5, 0, false)
            .with_grant(6, "admin", 7, 0, false)
    }

    fn resolve(role: &str) -> Vec<PermissionFragment> {
        let snapshot = GrantSnapshot::capture(&store()).unwrap();
        let config = GeneratorConfig::default();
        let catalog = Catalog::new().with_background_layer("mapnik");
        let ctx = ResolveContext::new(&snapshot, &config, &catalog, role);
        ViewerResolver.resolve(&ctx)
    }

    #[test]
    fn test_public_viewer_permissions() {
        let fragments = resolve("public");
        assert_eq!(
            fragments[0],
            PermissionFragment::BackgroundLayers(vec!["mapnik".into()])
        );
        assert_eq!(fragments[1], PermissionFragment::ViewerTasks(vec![]));
        assert_eq!(
            fragments[2],
            PermissionFragment::ThemeInfoLinks(vec!["about".into()])
        );
    }

    #[test]
    fn test_role_viewer_permissions() {
        let fragments = resolve("admin");
        assert!(fragments[0].is_empty());
        assert_eq!(
            fragments[1],
            PermissionFragment::ViewerTasks(vec!["measure".into(), "print".into()])
        );
        assert_eq!(
            fragments[3],
            PermissionFragment::PluginData(vec![PluginDataPermission {
                name: "elevation".into(),
                resources: vec!["dem".into(), "dsm".into()],
            }])
        );
    }
}
