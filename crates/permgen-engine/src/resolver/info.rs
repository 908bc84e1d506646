//! # Feature Info Permissions
//!
//! Query status and info attributes of the queryable WMS layers, from the
//! `feature_info_service`, `feature_info_layer` and info `attribute` grants.
//!
//! With the open-by-default policy or inherited info permissions, a role
//! holding a grant on the map (or layer, or layer attribute) may also query
//! it, unless an explicit info restriction exists for that exact resource.

use permgen_core::{ResourceSelector, ResourceType};
use tracing::instrument;

use super::{ResolveContext, Resolver};
use crate::catalog::WmsCapability;
use crate::fragment::{PermissionFragment, WmsLayerPermission, WmsServicePermission};
use crate::lookup::AccessLookup;

/// Resolver of the feature info service.
#[derive(Debug, Clone, Copy, Default)]
pub struct InfoResolver;

impl Resolver for InfoResolver {
    fn name(&self) -> &'static str {
        "feature_info"
    }

    #[instrument(skip_all, fields(role = ctx.role))]
    fn resolve(&self, ctx: &ResolveContext<'_>) -> Vec<PermissionFragment> {
        let lookups = InfoLookups {
            maps: ctx.lookup(ResourceType::Map),
            layers: ctx.lookup(ResourceType::Layer),
            attributes: ctx.lookup(ResourceSelector::LAYER_ATTRIBUTES),
            info_services: ctx.lookup(ResourceType::FeatureInfoService),
            info_layers: ctx.lookup(ResourceType::FeatureInfoLayer),
            info_attributes: ctx.lookup(ResourceSelector::INFO_ATTRIBUTES),
        };

        let services = ctx
            .catalog
            .wms_services
            .iter()
            .filter_map(|cap| info_service(ctx, &lookups, cap))
            .collect();
        vec![PermissionFragment::WmsServices(services)]
    }
}

struct InfoLookups {
    maps: AccessLookup,
    layers: AccessLookup,
    attributes: AccessLookup,
    info_services: AccessLookup,
    info_layers: AccessLookup,
    info_attributes: AccessLookup,
}

fn info_service(
    ctx: &ResolveContext<'_>,
    lookups: &InfoLookups,
    cap: &WmsCapability,
) -> Option<WmsServicePermission> {
    let service = cap.name.as_str();
    let path = [service];

    let map_restricted = lookups.maps.restricted_for_public(&path);
    let map_permitted = lookups.maps.permitted_for_role(&path);
    if map_restricted && !map_permitted {
        return None;
    }

    let service_restricted = lookups.info_services.restricted_for_public(&path);
    let service_permitted = lookups.info_services.permitted_for_role(&path)
        || (ctx.info_follows_base()
            && !lookups.info_services.explicitly_restricted(&path)
            && map_permitted);

    let public = ctx.is_public_role();
    let mut layers = Vec::new();
    for (layer, attributes) in cap.root_layer.queryable_leaves() {
        let path = [service, layer];
        if lookups.layers.restricted_for_public(&path) && !lookups.layers.permitted_for_role(&path)
        {
            continue;
        }

        let info_layer_restricted = lookups.info_layers.restricted_for_public(&path);
        let queryable = if service_restricted && !service_permitted {
            false
        } else {
            let info_layer_permitted = lookups.info_layers.permitted_for_role(&path)
                || (ctx.info_follows_base()
                    && !lookups.info_layers.explicitly_restricted(&path)
                    && lookups.layers.permitted_for_role(&path));
            !info_layer_restricted || info_layer_permitted
        };

        let mut info_attributes = Vec::new();
        let mut has_restricted_attributes = false;
        if queryable {
            for attribute in attributes {
                let path = [service, layer, attribute.as_str()];
                let restricted = info_attribute_restricted(ctx, lookups, &path);
                let permitted = lookups.info_attributes.permitted_for_role(&path)
                    || (ctx.info_follows_base()
                        && !lookups.info_attributes.explicitly_restricted(&path)
                        && lookups.attributes.permitted_for_role(&path));

                let visible = if public {
                    !restricted
                } else {
                    (permitted && restricted)
                        || (!restricted && (service_restricted || info_layer_restricted))
                };
                if visible {
                    info_attributes.push(attribute.clone());
                }
                has_restricted_attributes |= restricted;
            }
        }

        if public || service_restricted || info_layer_restricted || has_restricted_attributes {
            layers.push(WmsLayerPermission {
                name: layer.to_string(),
                queryable: Some(queryable),
                info_template: Some(queryable),
                attributes: None,
                info_attributes: Some(info_attributes),
            });
        }
    }

    if layers.is_empty() {
        return None;
    }
    Some(WmsServicePermission {
        name: service.to_string(),
        layers,
        print_templates: None,
    })
}

/// Info attributes are hidden from public by both info attribute and layer
/// attribute restrictions.
fn info_attribute_restricted(
    ctx: &ResolveContext<'_>,
    lookups: &InfoLookups,
    path: &[&str],
) -> bool {
    if ctx.config.permissions_default_allow {
        lookups.info_attributes.explicitly_restricted(path)
            || lookups.attributes.explicitly_restricted(path)
    } else {
        !lookups.info_attributes.permitted_for_public(path)
            && !lookups.attributes.permitted_for_public(path)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::config::GeneratorConfig;
    use permgen_core::MemoryStore;

    fn resolve(
        store: &MemoryStore,
        config: &GeneratorConfig,
        role: &str,
    ) -> Vec<WmsServicePermission> {
        let snapshot = snapshot(store);
        let catalog = demo_catalog();
        let ctx = ResolveContext::new(&snapshot, config, &catalog, role);
        match InfoResolver.resolve(&ctx).pop() {
            Some(PermissionFragment::WmsServices(services)) => services,
            other => panic!("unexpected fragment {:?}", other),
        }
    }

    fn layer<'a>(
        services: &'a [WmsServicePermission],
        name: &str,
    ) -> Option<&'a WmsLayerPermission> {
        services.first()?.layers.iter().find(|l| l.name == name)
    }

    #[test]
    fn test_public_info_without_grants() {
        let services = resolve(&demo_store(), &GeneratorConfig::default(), "public");
        let edit_lines = layer(&services, "edit_lines").unwrap();
        assert!(edit_lines.is_queryable());
        assert_eq!(
            edit_lines.info_attributes.as_deref().unwrap(),
            &["id", "Name", "Description"]
        );
        assert_eq!(services[0].layers.len(), 4);
    }

    #[test]
    fn test_layer_attribute_restriction_hides_info_attribute() {
        let store = demo_store().with_grant(1, "admin", 5, 0, false);
        let config = GeneratorConfig::default();

        let public = resolve(&store, &config, "public");
        assert_eq!(
            layer(&public, "edit_lines").unwrap().info_attributes.as_deref().unwrap(),
            &["id", "Description"]
        );

        // the layer attribute grant is inherited as info attribute grant
        let admin = resolve(&store, &config, "admin");
        assert_eq!(
            layer(&admin, "edit_lines").unwrap().info_attributes.as_deref().unwrap(),
            &["Name"]
        );
        assert!(layer(&admin, "edit_points").is_none());
    }

    #[test]
    fn test_info_service_restriction() {
        let store = demo_store()
            .with_resource(10, "feature_info_service", "qwc_demo", None)
            .with_grant(1, "admin", 10, 0, false);
        let config = GeneratorConfig::default().with_inherit_info_permissions(true);

        let public = resolve(&store, &config, "public");
        let edit_points = layer(&public, "edit_points").unwrap();
        assert!(!edit_points.is_queryable());
        assert_eq!(edit_points.info_template, Some(false));
        assert!(edit_points.info_attributes.as_deref().unwrap().is_empty());

        let admin = resolve(&store, &config, "admin");
        let edit_points = layer(&admin, "edit_points").unwrap();
        assert!(edit_points.is_queryable());
        assert_eq!(
            edit_points.info_attributes.as_deref().unwrap(),
            &["id", "Name", "Description"]
        );
    }

    #[test]
    fn test_info_layer_grant_in_default_restrict_mode() {
        let store = demo_store()
            .with_resource(10, "feature_info_service", "qwc_demo", None)
            .with_resource(11, "feature_info_layer", "edit_polygons", Some(10))
            .with_grant(1, "public", 1, 0, false)
            .with_grant(2, "public", 4, 0, false)
            .with_grant(3, "public", 10, 0, false)
            .with_grant(4, "admin", 11, 0, false);
        let config = GeneratorConfig::default().with_default_allow(false);

        let public = resolve(&store, &config, "public");
        let edit_polygons = layer(&public, "edit_polygons").unwrap();
        assert!(!edit_polygons.is_queryable());
        assert!(layer(&public, "edit_points").is_none());

        let admin = resolve(&store, &config, "admin");
        assert!(layer(&admin, "edit_polygons").unwrap().is_queryable());
    }
}
