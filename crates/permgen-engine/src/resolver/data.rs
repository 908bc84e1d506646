//! # Dataset Permissions
//!
//! Editable datasets with attributes and CRUD flags.
//!
//! Datasets are closed by default: a dataset is only listed if some role
//! (or `public`) holds a `data`, `data_create`, `data_update` or
//! `data_delete` grant on it. Attributes stay open by default.

use permgen_core::{PathSegment, ResourceSelector, ResourceType};
use tracing::instrument;

use super::{leaf_attributes, ResolveContext, Resolver};
use crate::fragment::{DatasetPermission, PermissionFragment};
use crate::lookup::AccessLookup;

const DATA_FAMILY: [ResourceType; 4] = [
    ResourceType::Data,
    ResourceType::DataCreate,
    ResourceType::DataUpdate,
    ResourceType::DataDelete,
];

/// Resolver of the data service.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataResolver;

impl Resolver for DataResolver {
    fn name(&self) -> &'static str {
        "data"
    }

    #[instrument(skip_all, fields(role = ctx.role))]
    fn resolve(&self, ctx: &ResolveContext<'_>) -> Vec<PermissionFragment> {
        let lookups = DataLookups {
            maps: ctx.lookup(ResourceType::Map),
            data: ctx.lookup(ResourceType::Data),
            create: ctx.lookup(ResourceType::DataCreate),
            update: ctx.lookup(ResourceType::DataUpdate),
            delete: ctx.lookup(ResourceType::DataDelete),
            attributes: ctx.lookup(ResourceSelector::DATA_ATTRIBUTES),
        };

        let mut datasets = Vec::new();
        for (map, names) in available_datasets(ctx) {
            let map_path = [map.as_str()];
            if lookups.maps.restricted_for_public(&map_path)
                && !lookups.maps.permitted_for_role(&map_path)
            {
                continue;
            }
            for name in names {
                if let Some(dataset) = dataset_permission(ctx, &lookups, &map, &name) {
                    datasets.push(dataset);
                }
            }
        }

        vec![PermissionFragment::DataDatasets(datasets)]
    }
}

struct DataLookups {
    maps: AccessLookup,
    data: AccessLookup,
    create: AccessLookup,
    update: AccessLookup,
    delete: AccessLookup,
    attributes: AccessLookup,
}

impl DataLookups {
    fn family(&self) -> [&AccessLookup; 4] {
        [&self.data, &self.create, &self.update, &self.delete]
    }
}

/// CRUD flags of one dataset for one role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Crud {
    writable: bool,
    creatable: bool,
    readable: bool,
    updatable: bool,
    deletable: bool,
}

impl Crud {
    fn any_access(&self) -> bool {
        self.creatable || self.readable || self.updatable || self.deletable
    }
}

/// Datasets per map that exist both as data resources and in the catalog.
///
/// A `*` data resource stands for every catalog dataset of its map.
///
/// Maps and datasets are sorted by name.
fn available_datasets(ctx: &ResolveContext<'_>) -> Vec<(String, Vec<String>)> {
    let tree = ctx.snapshot.tree();
    let mut maps: Vec<_> = tree
        .roots()
        .filter(|r| r.resource_type == ResourceType::Map)
        .collect();
    maps.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

    let mut available = Vec::new();
    for map in maps {
        let Some(catalog) = ctx.catalog.map_datasets(&map.name) else {
            continue;
        };
        let resources: Vec<_> = tree
            .children(map.id)
            .filter(|r| DATA_FAMILY.contains(&r.resource_type))
            .collect();
        let wildcard = resources.iter().any(|r| r.name == PathSegment::WILDCARD);
        let mut names: Vec<String> = if wildcard {
            catalog.datasets.iter().map(|d| d.name.clone()).collect()
        } else {
            resources
                .iter()
                .filter(|r| catalog.dataset(&r.name).is_some())
                .map(|r| r.name.clone())
                .collect()
        };
        names.sort();
        names.dedup();
        available.push((map.name.clone(), names));
    }
    available
}

/// Write flag of the highest priority `data` grant of the role on the
/// dataset, or on all datasets of the map.
fn writable(ctx: &ResolveContext<'_>, map: &str, dataset: &str) -> bool {
    if ctx.config.force_readonly_datasets {
        return false;
    }
    ctx.snapshot
        .grants_of_type(ResourceType::Data.into(), Some(ctx.role))
        .find(|g| {
            g.parent_name() == Some(map) && (g.target.is_all() || g.leaf_name() == Some(dataset))
        })
        .is_some_and(|g| g.grant.write)
}

fn crud(ctx: &ResolveContext<'_>, lookups: &DataLookups, map: &str, dataset: &str) -> Crud {
    let path = [map, dataset];
    let mut crud = Crud::default();

    if lookups.data.permitted_for_role(&path) {
        let writable = writable(ctx, map, dataset);
        crud = Crud {
            writable,
            creatable: writable,
            readable: true,
            updatable: writable,
            deletable: writable,
        };
    }

    let create = lookups.create.permitted_for_role(&path);
    let update = lookups.update.permitted_for_role(&path);
    let delete = lookups.delete.permitted_for_role(&path);
    if !ctx.config.force_readonly_datasets {
        crud.creatable |= create;
        crud.updatable |= update;
        crud.deletable |= delete;
    }
    crud.readable |= create || update || delete;
    crud.writable |= crud.creatable && crud.readable && crud.updatable && crud.deletable;
    crud
}

fn dataset_permission(
    ctx: &ResolveContext<'_>,
    lookups: &DataLookups,
    map: &str,
    name: &str,
) -> Option<DatasetPermission> {
    let path = [map, name];
    let restricted = !lookups
        .family()
        .iter()
        .any(|lookup| lookup.permitted_for_public(&path));
    let permitted = lookups
        .family()
        .iter()
        .any(|lookup| lookup.permitted_for_role(&path));
    if restricted && !permitted {
        return None;
    }

    let fields = ctx
        .catalog
        .map_datasets(map)
        .and_then(|m| m.dataset(name))
        .map(|d| d.fields.as_slice())
        .unwrap_or_default();
    let attributes = leaf_attributes(fields, &lookups.attributes, &path, restricted);

    let crud = crud(ctx, lookups, map, name);
    let public = ctx.is_public_role();
    let all_flags = public || restricted;
    let flag = |value: bool| (all_flags || value).then_some(value);

    if !(all_flags || !attributes.is_empty() || crud.any_access()) {
        return None;
    }
    Some(DatasetPermission {
        name: format!("{}.{}", map, name),
        attributes,
        writable: flag(crud.writable),
        creatable: flag(crud.creatable),
        readable: flag(crud.readable),
        updatable: flag(crud.updatable),
        deletable: flag(crud.deletable),
    })
}
