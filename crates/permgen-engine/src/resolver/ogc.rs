//! # OGC Service Permissions
//!
//! WMS and WFS permissions per map, computed from the capabilities in the
//! catalog and the `map`, `layer`, layer `attribute`, `feature_info_service`,
//! `feature_info_layer` and `print_template` grants.
//!
//! WMS layers are emitted as a flat list, group layers before their
//! sublayers. A restriction on a group applies to its whole subtree.

use permgen_core::{ResourceSelector, ResourceType};
use tracing::instrument;

use super::{leaf_attributes, ResolveContext, Resolver};
use crate::catalog::{LayerNode, WfsCapability, WmsCapability};
use crate::fragment::{
    PermissionFragment, WfsLayerPermission, WfsServicePermission, WmsLayerPermission,
    WmsServicePermission,
};
use crate::lookup::AccessLookup;

/// Resolver of the OGC service.
#[derive(Debug, Clone, Copy, Default)]
pub struct OgcResolver;

impl Resolver for OgcResolver {
    fn name(&self) -> &'static str {
        "ogc"
    }

    #[instrument(skip_all, fields(role = ctx.role))]
    fn resolve(&self, ctx: &ResolveContext<'_>) -> Vec<PermissionFragment> {
        let lookups = OgcLookups::new(ctx);

        let wms_services: Vec<WmsServicePermission> = ctx
            .catalog
            .wms_services
            .iter()
            .filter_map(|cap| wms_service(ctx, &lookups, cap))
            .collect();

        let mut print_templates: Vec<String> = Vec::new();
        for name in wms_services
            .iter()
            .filter_map(|s| s.print_templates.as_ref())
            .flatten()
        {
            if !print_templates.contains(name) {
                print_templates.push(name.clone());
            }
        }

        let wfs_services = ctx
            .catalog
            .wfs_services
            .iter()
            .filter_map(|cap| wfs_service(ctx, &lookups, cap))
            .collect();

        vec![
            PermissionFragment::WmsServices(wms_services),
            PermissionFragment::WfsServices(wfs_services),
            PermissionFragment::PrintTemplates(print_templates),
        ]
    }
}

struct OgcLookups {
    maps: AccessLookup,
    layers: AccessLookup,
    attributes: AccessLookup,
    info_services: AccessLookup,
    info_layers: AccessLookup,
    print_templates: AccessLookup,
}

impl OgcLookups {
    fn new(ctx: &ResolveContext<'_>) -> Self {
        Self {
            maps: ctx.lookup(ResourceType::Map),
            layers: ctx.lookup(ResourceType::Layer),
            attributes: ctx.lookup(ResourceSelector::LAYER_ATTRIBUTES),
            info_services: ctx.lookup(ResourceType::FeatureInfoService),
            info_layers: ctx.lookup(ResourceType::FeatureInfoLayer),
            print_templates: ctx.lookup(ResourceType::PrintTemplate),
        }
    }
}

/// Per-service state threaded through the layer tree.
struct WmsWalk<'a> {
    ctx: &'a ResolveContext<'a>,
    lookups: &'a OgcLookups,
    service: &'a str,
    info_service_restricted: bool,
    info_service_permitted: bool,
}

fn wms_service(
    ctx: &ResolveContext<'_>,
    lookups: &OgcLookups,
    cap: &WmsCapability,
) -> Option<WmsServicePermission> {
    let path = [cap.name.as_str()];
    let map_restricted = lookups.maps.restricted_for_public(&path);
    let map_permitted = lookups.maps.permitted_for_role(&path);
    if map_restricted && !map_permitted {
        return None;
    }

    let info_service_restricted =
        map_restricted || lookups.info_services.restricted_for_public(&path);
    let info_service_permitted = lookups.info_services.permitted_for_role(&path)
        || (ctx.info_follows_base()
            && (!map_restricted || map_permitted)
            && !lookups.info_services.explicitly_restricted(&path));

    let walk = WmsWalk {
        ctx,
        lookups,
        service: &cap.name,
        info_service_restricted,
        info_service_permitted,
    };
    let mut layers = Vec::new();
    walk.collect(&cap.root_layer, map_restricted, &mut layers);
    layers.extend(print_layers(ctx, &lookups.layers, cap, map_restricted));

    let templates = print_templates(ctx, &lookups.print_templates, cap, map_restricted);
    let template_names: Vec<String> = templates
        .iter()
        .map(|t| t.name.clone())
        .chain(templates.iter().filter_map(|t| t.legend_layout.clone()))
        .collect();

    if layers.is_empty() && template_names.is_empty() {
        return None;
    }
    Some(WmsServicePermission {
        name: cap.name.clone(),
        layers,
        print_templates: (!template_names.is_empty()).then_some(template_names),
    })
}

impl WmsWalk<'_> {
    fn collect(
        &self,
        node: &LayerNode,
        parent_restricted: bool,
        out: &mut Vec<WmsLayerPermission>,
    ) {
        let lookups = self.lookups;
        let path = [self.service, node.name()];

        let layer_restricted = lookups.layers.restricted_for_public(&path);
        let layer_permitted = lookups.layers.permitted_for_role(&path);
        if layer_restricted && !layer_permitted {
            return;
        }
        let restricted_chain = layer_restricted || parent_restricted;

        let info_layer_restricted =
            layer_restricted || lookups.info_layers.restricted_for_public(&path);
        let info_layer_permitted = lookups.info_layers.permitted_for_role(&path)
            || (self.ctx.info_follows_base()
                && (!layer_restricted || layer_permitted)
                && !lookups.info_layers.explicitly_restricted(&path));

        let queryable = (!self.info_service_restricted || self.info_service_permitted)
            && (!info_layer_restricted || info_layer_permitted);

        let mut entry = WmsLayerPermission::named(node.name());
        entry.queryable = Some(queryable);
        entry.info_template = Some(queryable);

        let public = self.ctx.is_public_role();
        match node {
            LayerNode::Group { layers, .. } => {
                let mut sublayers = Vec::new();
                for sublayer in layers {
                    self.collect(sublayer, restricted_chain, &mut sublayers);
                }
                if !sublayers.is_empty() {
                    if public || restricted_chain {
                        out.push(entry);
                    }
                    out.extend(sublayers);
                }
            }
            LayerNode::Leaf { attributes, .. } => {
                let permitted =
                    leaf_attributes(attributes, &lookups.attributes, &path, restricted_chain);
                if public || !permitted.is_empty() {
                    entry.attributes = Some(permitted);
                }

                let has_attributes = entry.attributes.as_ref().is_some_and(|a| !a.is_empty());
                let restricted_query =
                    (self.info_service_restricted || info_layer_restricted) && queryable;
                if public || restricted_chain || has_attributes || restricted_query {
                    out.push(entry);
                }
            }
        }
    }
}

/// Names of `candidates` visible to the role.
///
/// Role and public grants match exactly or through a `*` grant, while
/// restrictions only come from exact names.
///
/// Non-public roles only get names on top of what public already sees,
/// unless the whole map is restricted.
fn additive_names<'c>(
    ctx: &ResolveContext<'_>,
    lookup: &AccessLookup,
    service: &str,
    candidates: impl Iterator<Item = &'c str>,
    map_restricted: bool,
) -> Vec<&'c str> {
    let path = [service];
    let restricted = lookup.restricted_names(&path);
    let default_allow = ctx.config.permissions_default_allow;

    candidates
        .filter(|name| {
            let in_role = lookup.permits_name(&path, name);
            let in_public = lookup.public_permits_name(&path, name);
            let in_restricted = restricted.contains(name);
            match (ctx.is_public_role(), default_allow) {
                (true, true) => !in_restricted,
                (true, false) => in_public,
                (false, true) if map_restricted => in_role || !in_restricted,
                (false, true) => in_role && in_restricted,
                (false, false) => in_role && !in_public,
            }
        })
        .collect()
}

fn print_layers(
    ctx: &ResolveContext<'_>,
    layers: &AccessLookup,
    cap: &WmsCapability,
    map_restricted: bool,
) -> Vec<WmsLayerPermission> {
    additive_names(
        ctx,
        layers,
        &cap.name,
        cap.internal_print_layers.iter().map(String::as_str),
        map_restricted,
    )
    .into_iter()
    .map(WmsLayerPermission::named)
    .collect()
}

fn print_templates<'c>(
    ctx: &ResolveContext<'_>,
    templates: &AccessLookup,
    cap: &'c WmsCapability,
    map_restricted: bool,
) -> Vec<&'c crate::catalog::PrintTemplate> {
    let visible = additive_names(
        ctx,
        templates,
        &cap.name,
        cap.print_templates.iter().map(|t| t.name.as_str()),
        map_restricted,
    );
    cap.print_templates
        .iter()
        .filter(|t| visible.contains(&t.name.as_str()))
        .collect()
}

fn wfs_service(
    ctx: &ResolveContext<'_>,
    lookups: &OgcLookups,
    cap: &WfsCapability,
) -> Option<WfsServicePermission> {
    let service = cap.name.as_str();
    let map_restricted = lookups.maps.restricted_for_public(&[service]);
    if map_restricted && !lookups.maps.permitted_for_role(&[service]) {
        return None;
    }

    let public = ctx.is_public_role();
    let mut layers = Vec::new();
    for layer in &cap.wfs_layers {
        let path = [service, layer.name.as_str()];
        let restricted = lookups.layers.restricted_for_public(&path);
        if restricted && !lookups.layers.permitted_for_role(&path) {
            continue;
        }
        let restricted_chain = restricted || map_restricted;

        let attributes =
            leaf_attributes(&layer.attributes, &lookups.attributes, &path, restricted_chain);
        if public || restricted_chain || !attributes.is_empty() {
            layers.push(WfsLayerPermission {
                name: layer.name.clone(),
                attributes: (public || !attributes.is_empty()).then_some(attributes),
            });
        }
    }

    if layers.is_empty() {
        return None;
    }
    Some(WfsServicePermission {
        name: cap.name.clone(),
        layers,
    })
}
