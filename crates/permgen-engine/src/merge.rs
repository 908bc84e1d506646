//! # Fragment Merge Engine
//!
//! Deep-merges permission fragments of independent subsystems into one
//! role's permissions.
//!
//! - Lists of named items are matched by name. Matched items are merged
//!   field by field, unmatched items are appended.
//! - Lists of plain names are unioned, keeping first-occurrence order.
//! - An empty target list takes the source list as is.
//! - Conflicting scalar values keep the first value. The conflict is logged
//!   and returned as a [`MergeConflict`], it never aborts the merge.
//!
//! Merging a fragment twice yields the same content as merging it once.

use std::collections::HashMap;
use std::fmt;
use tracing::warn;

use crate::document::RolePermissions;
use crate::fragment::{
    Category, DatasetPermission, PermissionFragment, PluginDataPermission, WfsLayerPermission,
    WfsServicePermission, WmsLayerPermission, WmsServicePermission,
};

/// Items matched by name when merging lists.
pub trait Named {
    /// Get the matching key.
    fn name(&self) -> &str;
}

/// Field-by-field merge of a matched item.
pub trait Merge {
    /// Merge `source` into `self`.
    fn merge_from(&mut self, source: Self, ctx: &mut MergeContext);
}

/// Two fragments disagreeing on a scalar value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConflict {
    /// Role being merged.
    pub role: String,
    /// Category of the conflicting fragments.
    pub category: Category,
    /// Names leading to the conflicting item, e.g. `qwc_demo/edit_points`.
    pub item: String,
    /// Conflicting field.
    pub field: &'static str,
    /// Value kept.
    pub kept: String,
    /// Value discarded.
    pub rejected: String,
}

impl fmt::Display for MergeConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Values for '{}' of {}/{} differ for role '{}': {} != {}",
            self.field, self.category, self.item, self.role, self.kept, self.rejected
        )
    }
}

/// State of one merge: where we are and what conflicted so far.
#[derive(Debug)]
pub struct MergeContext {
    role: String,
    category: Category,
    path: Vec<String>,
    conflicts: Vec<MergeConflict>,
}

impl MergeContext {
    /// Create a context for merging fragments of `role`.
    pub fn new(role: &str) -> Self {
        Self {
            role: role.to_string(),
            category: Category::WmsServices,
            path: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    /// Run `f` one level below the item `name`.
    pub fn within<R>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.path.push(name.to_string());
        let result = f(self);
        self.path.pop();
        result
    }

    /// Merge a single-valued field. The first value wins.
    pub fn scalar<T>(&mut self, field: &'static str, target: &mut Option<T>, source: Option<T>)
    where
        T: PartialEq + fmt::Debug,
    {
        let Some(rejected) = source else {
            return;
        };
        let Some(kept) = target.as_ref() else {
            *target = Some(rejected);
            return;
        };
        if *kept == rejected {
            return;
        }

        let conflict = MergeConflict {
            role: self.role.clone(),
            category: self.category,
            item: self.path.join("/"),
            field,
            kept: format!("{:?}", kept),
            rejected: format!("{:?}", rejected),
        };
        warn!(
            role = %conflict.role,
            category = %conflict.category,
            item = %conflict.item,
            field,
            "{}",
            conflict
        );
        self.conflicts.push(conflict);
    }

    /// Get the conflicts recorded so far.
    pub fn conflicts(&self) -> &[MergeConflict] {
        &self.conflicts
    }

    /// Consume the context and return its conflicts.
    pub fn into_conflicts(self) -> Vec<MergeConflict> {
        self.conflicts
    }
}

/// Merge a list of named items.
pub fn merge_named<T>(target: &mut Vec<T>, source: Vec<T>, ctx: &mut MergeContext)
where
    T: Named + Merge,
{
    if target.is_empty() {
        *target = source;
        return;
    }

    let mut lookup: HashMap<String, usize> = HashMap::with_capacity(target.len());
    for (idx, item) in target.iter().enumerate() {
        lookup.entry(item.name().to_string()).or_insert(idx);
    }

    for item in source {
        match lookup.get(item.name()) {
            Some(&idx) => {
                let name = item.name().to_string();
                ctx.within(&name, |ctx| target[idx].merge_from(item, ctx));
            }
            None => {
                lookup.insert(item.name().to_string(), target.len());
                target.push(item);
            }
        }
    }
}

/// Union a list of plain names, keeping first-occurrence order.
pub fn merge_names(target: &mut Vec<String>, source: Vec<String>) {
    if target.is_empty() {
        *target = source;
        return;
    }
    for name in source {
        if !target.contains(&name) {
            target.push(name);
        }
    }
}

fn merge_optional_names(target: &mut Option<Vec<String>>, source: Option<Vec<String>>) {
    let Some(source) = source else {
        return;
    };
    match target {
        Some(names) => merge_names(names, source),
        None => *target = Some(source),
    }
}

/// Merge a fragment into a role's permissions.
pub fn merge_fragment(
    target: &mut RolePermissions,
    fragment: PermissionFragment,
    ctx: &mut MergeContext,
) {
    ctx.category = fragment.category();
    match fragment {
        PermissionFragment::WmsServices(items) => merge_named(&mut target.wms_services, items, ctx),
        PermissionFragment::WfsServices(items) => merge_named(&mut target.wfs_services, items, ctx),
        PermissionFragment::DataDatasets(items) => {
            merge_named(&mut target.data_datasets, items, ctx)
        }
        PermissionFragment::PluginData(items) => merge_named(&mut target.plugin_data, items, ctx),
        PermissionFragment::BackgroundLayers(names) => {
            merge_names(&mut target.background_layers, names)
        }
        PermissionFragment::ViewerTasks(names) => merge_names(&mut target.viewer_tasks, names),
        PermissionFragment::ThemeInfoLinks(names) => {
            merge_names(&mut target.theme_info_links, names)
        }
        PermissionFragment::Dataproducts(names) => merge_names(&mut target.dataproducts, names),
        PermissionFragment::DocumentTemplates(names) => {
            merge_names(&mut target.document_templates, names)
        }
        PermissionFragment::PrintTemplates(names) => {
            merge_names(&mut target.print_templates, names)
        }
        PermissionFragment::SolrFacets(names) => merge_names(&mut target.solr_facets, names),
        PermissionFragment::ExternalLinks(names) => merge_names(&mut target.external_links, names),
        PermissionFragment::MapinfoQuery(names) => merge_names(&mut target.mapinfo_query, names),
        PermissionFragment::Custom {
            resource_type,
            names,
        } => merge_names(
            target
                .custom
                .entry(resource_type.as_str().to_string())
                .or_default(),
            names,
        ),
    }
}

impl Named for WmsServicePermission {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Merge for WmsServicePermission {
    fn merge_from(&mut self, source: Self, ctx: &mut MergeContext) {
        merge_named(&mut self.layers, source.layers, ctx);
        merge_optional_names(&mut self.print_templates, source.print_templates);
    }
}

impl Named for WmsLayerPermission {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Merge for WmsLayerPermission {
    fn merge_from(&mut self, source: Self, ctx: &mut MergeContext) {
        ctx.scalar("queryable", &mut self.queryable, source.queryable);
        ctx.scalar("info_template", &mut self.info_template, source.info_template);
        merge_optional_names(&mut self.attributes, source.attributes);
        merge_optional_names(&mut self.info_attributes, source.info_attributes);
    }
}

impl Named for WfsServicePermission {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Merge for WfsServicePermission {
    fn merge_from(&mut self, source: Self, ctx: &mut MergeContext) {
        merge_named(&mut self.layers, source.layers, ctx);
    }
}

impl Named for WfsLayerPermission {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Merge for WfsLayerPermission {
    fn merge_from(&mut self, source: Self, _ctx: &mut MergeContext) {
        merge_optional_names(&mut self.attributes, source.attributes);
    }
}

impl Named for DatasetPermission {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Merge for DatasetPermission {
    fn merge_from(&mut self, source: Self, ctx: &mut MergeContext) {
        merge_names(&mut self.attributes, source.attributes);
        ctx.scalar("writable", &mut self.writable, source.writable);
        ctx.scalar("creatable", &mut self.creatable, source.creatable);
        ctx.scalar("readable", &mut self.readable, source.readable);
        ctx.scalar("updatable", &mut self.updatable, source.updatable);
        ctx.scalar("deletable", &mut self.deletable, source.deletable);
    }
}

impl Named for PluginDataPermission {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Merge for PluginDataPermission {
    fn merge_from(&mut self, source: Self, _ctx: &mut MergeContext) {
        merge_names(&mut self.resources, source.resources);
    }
}
