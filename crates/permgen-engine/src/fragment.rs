//! # Permission Fragments
//!
//! A fragment is one subsystem's slice of a role's permissions. Each
//! fragment belongs to exactly one category of the permissions document;
//! fragments of the same category from different subsystems are merged by
//! [`crate::merge`].

use permgen_core::ResourceType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of the permissions document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    /// WMS services with layers, attributes and print templates.
    WmsServices,
    /// WFS services with layers and attributes.
    WfsServices,
    /// Background layer names.
    BackgroundLayers,
    /// Editable datasets with CRUD flags.
    DataDatasets,
    /// Viewer task names.
    ViewerTasks,
    /// Theme info link names.
    ThemeInfoLinks,
    /// Plugin data resources grouped by plugin.
    PluginData,
    /// Dataproduct names.
    Dataproducts,
    /// Document template names.
    DocumentTemplates,
    /// Print template names.
    PrintTemplates,
    /// Search facet names.
    SolrFacets,
    /// External link names.
    ExternalLinks,
    /// Map info query ids.
    MapinfoQuery,
    /// Names of a configured custom resource type.
    Custom(ResourceType),
}

impl Category {
    /// Fixed categories in document order.
    pub fn fixed() -> &'static [Category] {
        &[
            Category::WmsServices,
            Category::WfsServices,
            Category::BackgroundLayers,
            Category::DataDatasets,
            Category::ViewerTasks,
            Category::ThemeInfoLinks,
            Category::PluginData,
            Category::Dataproducts,
            Category::DocumentTemplates,
            Category::PrintTemplates,
            Category::SolrFacets,
            Category::ExternalLinks,
            Category::MapinfoQuery,
        ]
    }

    /// Get the document key of the category.
    pub fn key(&self) -> &'static str {
        match self {
            Category::WmsServices => "wms_services",
            Category::WfsServices => "wfs_services",
            Category::BackgroundLayers => "background_layers",
            Category::DataDatasets => "data_datasets",
            Category::ViewerTasks => "viewer_tasks",
            Category::ThemeInfoLinks => "theme_info_links",
            Category::PluginData => "plugin_data",
            Category::Dataproducts => "dataproducts",
            Category::DocumentTemplates => "document_templates",
            Category::PrintTemplates => "print_templates",
            Category::SolrFacets => "solr_facets",
            Category::ExternalLinks => "external_links",
            Category::MapinfoQuery => "mapinfo_query",
            Category::Custom(resource_type) => resource_type.as_str(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Permissions of a WMS service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WmsServicePermission {
    /// Service (map) name
    pub name: String,

    /// Permitted layers, groups before their sublayers
    #[serde(default)]
    pub layers: Vec<WmsLayerPermission>,

    /// Permitted print templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_templates: Option<Vec<String>>,
}

/// Permissions of a WMS layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WmsLayerPermission {
    /// Layer name
    pub name: String,

    /// Feature info requests allowed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queryable: Option<bool>,

    /// Feature info template allowed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_template: Option<bool>,

    /// Permitted attributes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<String>>,

    /// Permitted feature info attributes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_attributes: Option<Vec<String>>,
}

impl WmsLayerPermission {
    /// Create a layer entry with only a name.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Check whether feature info requests are allowed.
    pub fn is_queryable(&self) -> bool {
        self.queryable.unwrap_or(false)
    }
}

/// Permissions of a WFS service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WfsServicePermission {
    /// Service (map) name
    pub name: String,

    /// Permitted feature types
    #[serde(default)]
    pub layers: Vec<WfsLayerPermission>,
}

/// Permissions of a WFS feature type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WfsLayerPermission {
    /// Feature type name
    pub name: String,

    /// Permitted attributes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<String>>,
}

/// Permissions of an editable dataset.
///
/// CRUD flags that are `None` are absent from the document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetPermission {
    /// `<map>.<dataset>`
    pub name: String,

    /// Permitted attributes
    #[serde(default)]
    pub attributes: Vec<String>,

    /// Write access
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writable: Option<bool>,

    /// Create access
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creatable: Option<bool>,

    /// Read access
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readable: Option<bool>,

    /// Update access
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updatable: Option<bool>,

    /// Delete access
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletable: Option<bool>,
}

impl DatasetPermission {
    /// Check write access.
    pub fn is_writable(&self) -> bool {
        self.writable.unwrap_or(false)
    }

    /// Check create access.
    pub fn is_creatable(&self) -> bool {
        self.creatable.unwrap_or(false)
    }

    /// Check read access.
    pub fn is_readable(&self) -> bool {
        self.readable.unwrap_or(false)
    }

    /// Check update access.
    pub fn is_updatable(&self) -> bool {
        self.updatable.unwrap_or(false)
    }

    /// Check delete access.
    pub fn is_deletable(&self) -> bool {
        self.deletable.unwrap_or(false)
    }
}

/// Permitted data resources of a viewer plugin.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginDataPermission {
    /// Plugin name
    pub name: String,

    /// Resource names, sorted
    #[serde(default)]
    pub resources: Vec<String>,
}

/// One subsystem's permissions of one category for one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionFragment {
    /// WMS services.
    WmsServices(Vec<WmsServicePermission>),
    /// WFS services.
    WfsServices(Vec<WfsServicePermission>),
    /// Background layers.
    BackgroundLayers(Vec<String>),
    /// Editable datasets.
    DataDatasets(Vec<DatasetPermission>),
    /// Viewer tasks.
    ViewerTasks(Vec<String>),
    /// Theme info links.
    ThemeInfoLinks(Vec<String>),
    /// Plugin data.
    PluginData(Vec<PluginDataPermission>),
    /// Dataproducts.
    Dataproducts(Vec<String>),
    /// Document templates.
    DocumentTemplates(Vec<String>),
    /// Print templates.
    PrintTemplates(Vec<String>),
    /// Search facets.
    SolrFacets(Vec<String>),
    /// External links.
    ExternalLinks(Vec<String>),
    /// Map info queries.
    MapinfoQuery(Vec<String>),
    /// Custom resource type.
    Custom {
        /// Resource type the names belong to.
        resource_type: ResourceType,
        /// Permitted names, sorted.
        names: Vec<String>,
    },
}

impl PermissionFragment {
    /// Get the category of the fragment.
    pub fn category(&self) -> Category {
        match self {
            PermissionFragment::WmsServices(_) => Category::WmsServices,
            PermissionFragment::WfsServices(_) => Category::WfsServices,
            PermissionFragment::BackgroundLayers(_) => Category::BackgroundLayers,
            PermissionFragment::DataDatasets(_) => Category::DataDatasets,
            PermissionFragment::ViewerTasks(_) => Category::ViewerTasks,
            PermissionFragment::ThemeInfoLinks(_) => Category::ThemeInfoLinks,
            PermissionFragment::PluginData(_) => Category::PluginData,
            PermissionFragment::Dataproducts(_) => Category::Dataproducts,
            PermissionFragment::DocumentTemplates(_) => Category::DocumentTemplates,
            PermissionFragment::PrintTemplates(_) => Category::PrintTemplates,
            PermissionFragment::SolrFacets(_) => Category::SolrFacets,
            PermissionFragment::ExternalLinks(_) => Category::ExternalLinks,
            PermissionFragment::MapinfoQuery(_) => Category::MapinfoQuery,
            PermissionFragment::Custom { resource_type, .. } => Category::Custom(*resource_type),
        }
    }

    /// Get the number of top-level entries.
    pub fn len(&self) -> usize {
        match self {
            PermissionFragment::WmsServices(items) => items.len(),
            PermissionFragment::WfsServices(items) => items.len(),
            PermissionFragment::DataDatasets(items) => items.len(),
            PermissionFragment::PluginData(items) => items.len(),
            PermissionFragment::BackgroundLayers(names)
            | PermissionFragment::ViewerTasks(names)
            | PermissionFragment::ThemeInfoLinks(names)
            | PermissionFragment::Dataproducts(names)
            | PermissionFragment::DocumentTemplates(names)
            | PermissionFragment::PrintTemplates(names)
            | PermissionFragment::SolrFacets(names)
            | PermissionFragment::ExternalLinks(names)
            | PermissionFragment::MapinfoQuery(names)
            | PermissionFragment::Custom { names, .. } => names.len(),
        }
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
