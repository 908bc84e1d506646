//! # Resources
//!
//! Defines all resource types known to the permission store and the
//! resource tree built from the store's resource rows.
//! Resources are named, typed and optionally parented; the tree is an arena
//! indexed by id with children indexed by parent id.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{ConfigResult, ConfigurationError};

/// Resource types that can have permissions assigned.
///
/// Resource types are grouped by the service that consumes them:
/// - **OGC**: Map, Layer, Attribute, PrintTemplate, WfsLayer
/// - **Feature info**: FeatureInfoService, FeatureInfoLayer
/// - **Data**: Data, DataCreate, DataUpdate, DataDelete
/// - **Viewer**: ViewerTask, ThemeInfoLink, Plugin, PluginData, ViewerAsset
/// - **Catalogs**: DocumentTemplates, SolrFacet, Dataproduct, ExternalLinks,
///   MapinfoQuery, Tileset3d, ObliqueImageDataset
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    // OGC
    /// Map (WMS/WFS service).
    Map,
    /// Layer of a map.
    Layer,
    /// Attribute of a layer, dataset, info layer or WFS layer.
    Attribute,
    /// Print template of a map.
    PrintTemplate,
    /// WFS layer of a map.
    WfsLayer,

    // Feature info
    /// Feature info service.
    FeatureInfoService,
    /// Feature info layer of an info service.
    FeatureInfoLayer,

    // Data
    /// Editable dataset (read, optional write).
    Data,
    /// Create permission on a dataset.
    DataCreate,
    /// Update permission on a dataset.
    DataUpdate,
    /// Delete permission on a dataset.
    DataDelete,

    // Viewer
    /// Viewer task (menu entry).
    ViewerTask,
    /// Theme info link.
    ThemeInfoLink,
    /// Viewer plugin.
    Plugin,
    /// Data resource of a viewer plugin.
    PluginData,
    /// Viewer asset.
    ViewerAsset,

    // Catalogs
    /// Document template.
    #[serde(rename = "document_templates")]
    DocumentTemplates,
    /// Search facet.
    SolrFacet,
    /// Dataproduct.
    Dataproduct,
    /// External link.
    #[serde(rename = "external_links")]
    ExternalLinks,
    /// Map info query.
    MapinfoQuery,
    /// 3D tileset.
    #[serde(rename = "tileset3d")]
    Tileset3d,
    /// Oblique image dataset.
    ObliqueImageDataset,
}

impl ResourceType {
    /// Get the string representation of the resource type.
    pub fn as_str(&self) -> &'static str {
        match self {
            // OGC
            ResourceType::Map => "map",
            ResourceType::Layer => "layer",
            ResourceType::Attribute => "attribute",
            ResourceType::PrintTemplate => "print_template",
            ResourceType::WfsLayer => "wfs_layer",
            // Feature info
            ResourceType::FeatureInfoService => "feature_info_service",
            ResourceType::FeatureInfoLayer => "feature_info_layer",
            // Data
            ResourceType::Data => "data",
            ResourceType::DataCreate => "data_create",
            ResourceType::DataUpdate => "data_update",
            ResourceType::DataDelete => "data_delete",
            // Viewer
            ResourceType::ViewerTask => "viewer_task",
            ResourceType::ThemeInfoLink => "theme_info_link",
            ResourceType::Plugin => "plugin",
            ResourceType::PluginData => "plugin_data",
            ResourceType::ViewerAsset => "viewer_asset",
            // Catalogs
            ResourceType::DocumentTemplates => "document_templates",
            ResourceType::SolrFacet => "solr_facet",
            ResourceType::Dataproduct => "dataproduct",
            ResourceType::ExternalLinks => "external_links",
            ResourceType::MapinfoQuery => "mapinfo_query",
            ResourceType::Tileset3d => "tileset3d",
            ResourceType::ObliqueImageDataset => "oblique_image_dataset",
        }
    }

    /// Parse resource type from string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive, accepts the plural spellings
    ///   found in older stores)
    ///
    /// # Returns
    ///
    /// `Some(ResourceType)` if valid, `None` otherwise
    ///
    /// # Example
    ///
    /// ```
    /// use permgen_core::resources::ResourceType;
    ///
    /// assert_eq!(ResourceType::parse("layer"), Some(ResourceType::Layer));
    /// assert_eq!(ResourceType::parse("dataproducts"), Some(ResourceType::Dataproduct));
    /// assert_eq!(ResourceType::parse("feature_info_layer"), Some(ResourceType::FeatureInfoLayer));
    /// assert_eq!(ResourceType::parse("invalid"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            // OGC
            "map" | "maps" => Some(ResourceType::Map),
            "layer" | "layers" => Some(ResourceType::Layer),
            "attribute" | "attributes" => Some(ResourceType::Attribute),
            "print_template" | "print_templates" => Some(ResourceType::PrintTemplate),
            "wfs_layer" | "wfs_layers" => Some(ResourceType::WfsLayer),
            // Feature info
            "feature_info_service" | "feature_info_services" => {
                Some(ResourceType::FeatureInfoService)
            }
            "feature_info_layer" | "feature_info_layers" => Some(ResourceType::FeatureInfoLayer),
            // Data
            "data" => Some(ResourceType::Data),
            "data_create" => Some(ResourceType::DataCreate),
            "data_update" => Some(ResourceType::DataUpdate),
            "data_delete" => Some(ResourceType::DataDelete),
            // Viewer
            "viewer_task" | "viewer_tasks" => Some(ResourceType::ViewerTask),
            "theme_info_link" | "theme_info_links" => Some(ResourceType::ThemeInfoLink),
            "plugin" | "plugins" => Some(ResourceType::Plugin),
            "plugin_data" => Some(ResourceType::PluginData),
            "viewer_asset" | "viewer_assets" => Some(ResourceType::ViewerAsset),
            // Catalogs
            "document_templates" | "document_template" => Some(ResourceType::DocumentTemplates),
            "solr_facet" | "solr_facets" => Some(ResourceType::SolrFacet),
            "dataproduct" | "dataproducts" => Some(ResourceType::Dataproduct),
            "external_links" | "external_link" => Some(ResourceType::ExternalLinks),
            "mapinfo_query" | "mapinfo_queries" => Some(ResourceType::MapinfoQuery),
            "tileset3d" | "tileset3ds" => Some(ResourceType::Tileset3d),
            "oblique_image_dataset" | "oblique_image_datasets" => {
                Some(ResourceType::ObliqueImageDataset)
            }
            _ => None,
        }
    }

    /// Resource types a resource of this type may be parented by.
    ///
    /// An empty slice means the type is a root type and must not have a parent.
    ///
    /// # Example
    ///
    /// ```
    /// use permgen_core::resources::ResourceType;
    ///
    /// assert!(ResourceType::Attribute.valid_parents().contains(&ResourceType::Layer));
    /// assert!(ResourceType::Map.valid_parents().is_empty());
    /// ```
    pub fn valid_parents(&self) -> &'static [ResourceType] {
        match self {
            ResourceType::Layer
            | ResourceType::PrintTemplate
            | ResourceType::WfsLayer
            | ResourceType::Data
            | ResourceType::DataCreate
            | ResourceType::DataUpdate
            | ResourceType::DataDelete => &[ResourceType::Map],
            ResourceType::Attribute => &[
                ResourceType::Layer,
                ResourceType::Data,
                ResourceType::FeatureInfoLayer,
                ResourceType::WfsLayer,
            ],
            ResourceType::FeatureInfoLayer => &[ResourceType::FeatureInfoService],
            ResourceType::PluginData => &[ResourceType::Plugin],
            ResourceType::Map
            | ResourceType::FeatureInfoService
            | ResourceType::ViewerTask
            | ResourceType::ThemeInfoLink
            | ResourceType::Plugin
            | ResourceType::ViewerAsset
            | ResourceType::DocumentTemplates
            | ResourceType::SolrFacet
            | ResourceType::Dataproduct
            | ResourceType::ExternalLinks
            | ResourceType::MapinfoQuery
            | ResourceType::Tileset3d
            | ResourceType::ObliqueImageDataset => &[],
        }
    }

    /// Check whether `parent` is a valid parent type for this type.
    pub fn accepts_parent(&self, parent: ResourceType) -> bool {
        self.valid_parents().contains(&parent)
    }

    /// Get all resource types.
    pub fn all() -> Vec<Self> {
        vec![
            ResourceType::Map,
            ResourceType::Layer,
            ResourceType::Attribute,
            ResourceType::PrintTemplate,
            ResourceType::WfsLayer,
            ResourceType::FeatureInfoService,
            ResourceType::FeatureInfoLayer,
            ResourceType::Data,
            ResourceType::DataCreate,
            ResourceType::DataUpdate,
            ResourceType::DataDelete,
            ResourceType::ViewerTask,
            ResourceType::ThemeInfoLink,
            ResourceType::Plugin,
            ResourceType::PluginData,
            ResourceType::ViewerAsset,
            ResourceType::DocumentTemplates,
            ResourceType::SolrFacet,
            ResourceType::Dataproduct,
            ResourceType::ExternalLinks,
            ResourceType::MapinfoQuery,
            ResourceType::Tileset3d,
            ResourceType::ObliqueImageDataset,
        ]
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selects the grant rows a lookup is built from.
///
/// Attributes are shared by several parent types in the store, so attribute
/// lookups are narrowed by the type of the attribute's parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceSelector {
    /// All resources of a type.
    Type(ResourceType),
    /// Attributes whose parent has the given type.
    Attributes {
        /// Type of the attribute's parent resource.
        parent: ResourceType,
    },
}

impl ResourceSelector {
    /// Attributes of map layers.
    pub const LAYER_ATTRIBUTES: Self = ResourceSelector::Attributes {
        parent: ResourceType::Layer,
    };
    /// Attributes of editable datasets.
    pub const DATA_ATTRIBUTES: Self = ResourceSelector::Attributes {
        parent: ResourceType::Data,
    };
    /// Attributes of feature info layers.
    pub const INFO_ATTRIBUTES: Self = ResourceSelector::Attributes {
        parent: ResourceType::FeatureInfoLayer,
    };

    /// Check whether a resource of `resource_type` with a parent of
    /// `parent_type` is selected.
    pub fn matches(&self, resource_type: ResourceType, parent_type: Option<ResourceType>) -> bool {
        match self {
            ResourceSelector::Type(t) => *t == resource_type,
            ResourceSelector::Attributes { parent } => {
                resource_type == ResourceType::Attribute && parent_type == Some(*parent)
            }
        }
    }
}

impl From<ResourceType> for ResourceSelector {
    fn from(resource_type: ResourceType) -> Self {
        ResourceSelector::Type(resource_type)
    }
}

impl fmt::Display for ResourceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceSelector::Type(t) => write!(f, "{}", t),
            ResourceSelector::Attributes { parent } => write!(f, "{}/attribute", parent),
        }
    }
}

/// A resource row as stored, before its type is validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceRecord {
    /// Resource ID.
    pub id: i64,
    /// Raw resource type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Resource name.
    pub name: String,
    /// Parent resource ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
}

impl ResourceRecord {
    /// Create a new resource record.
    pub fn new(
        id: i64,
        type_name: impl Into<String>,
        name: impl Into<String>,
        parent_id: Option<i64>,
    ) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            name: name.into(),
            parent_id,
        }
    }
}

/// A typed resource permissions can be attached to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Resource {
    /// Resource ID.
    pub id: i64,
    /// Resource type.
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Resource name (`*` selects every sibling of this type).
    pub name: String,
    /// Parent resource ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
}

impl Resource {
    /// Create a new resource.
    pub fn new(
        id: i64,
        resource_type: ResourceType,
        name: impl Into<String>,
        parent_id: Option<i64>,
    ) -> Self {
        Self {
            id,
            resource_type,
            name: name.into(),
            parent_id,
        }
    }
}

/// Arena of resources indexed by id, with children indexed by parent.
///
/// Construction validates the whole graph: every parent must exist, must
/// have a type accepted by the child, and parent chains must be acyclic.
/// Once built the tree is read-only.
///
/// # Example
///
/// ```
/// use permgen_core::resources::{Resource, ResourceTree, ResourceType};
///
/// let tree = ResourceTree::from_resources(vec![
///     Resource::new(1, ResourceType::Map, "qwc_demo", None),
///     Resource::new(2, ResourceType::Layer, "edit_lines", Some(1)),
///     Resource::new(3, ResourceType::Attribute, "Name", Some(2)),
/// ]).unwrap();
///
/// assert_eq!(tree.path(3).unwrap(), vec!["qwc_demo", "edit_lines", "Name"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResourceTree {
    nodes: Vec<Resource>,
    by_id: HashMap<i64, usize>,
    children: HashMap<i64, Vec<usize>>,
}

impl ResourceTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and validate a tree from resources.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] for duplicate ids, dangling parents,
    /// parent types the child does not accept, and parent cycles.
    pub fn from_resources(resources: Vec<Resource>) -> ConfigResult<Self> {
        let mut by_id = HashMap::with_capacity(resources.len());
        for (idx, resource) in resources.iter().enumerate() {
            if by_id.insert(resource.id, idx).is_some() {
                return Err(ConfigurationError::DuplicateResource(resource.id));
            }
        }

        let mut children: HashMap<i64, Vec<usize>> = HashMap::new();
        for (idx, resource) in resources.iter().enumerate() {
            let Some(parent_id) = resource.parent_id else {
                continue;
            };
            let parent = by_id
                .get(&parent_id)
                .map(|&p| &resources[p])
                .ok_or(ConfigurationError::DanglingParent {
                    id: resource.id,
                    parent_id,
                })?;
            if !resource.resource_type.accepts_parent(parent.resource_type) {
                return Err(ConfigurationError::InvalidParent {
                    id: resource.id,
                    child: resource.resource_type,
                    parent: parent.resource_type,
                });
            }
            children.entry(parent_id).or_default().push(idx);
        }

        let tree = Self {
            nodes: resources,
            by_id,
            children,
        };
        tree.check_acyclic()?;
        Ok(tree)
    }

    fn check_acyclic(&self) -> ConfigResult<()> {
        // nodes already proven to reach a root
        let mut rooted: HashSet<i64> = HashSet::new();
        for resource in &self.nodes {
            let mut seen = HashSet::new();
            let mut current = resource;
            loop {
                if rooted.contains(&current.id) {
                    break;
                }
                if !seen.insert(current.id) {
                    return Err(ConfigurationError::Cycle { id: current.id });
                }
                match current.parent_id.and_then(|p| self.get(p)) {
                    Some(parent) => current = parent,
                    None => break,
                }
            }
            rooted.extend(seen);
        }
        Ok(())
    }

    /// Look up a resource by id.
    pub fn get(&self, id: i64) -> Option<&Resource> {
        self.by_id.get(&id).map(|&idx| &self.nodes[idx])
    }

    /// Get the parent of a resource.
    pub fn parent(&self, id: i64) -> Option<&Resource> {
        self.get(id)
            .and_then(|r| r.parent_id)
            .and_then(|p| self.get(p))
    }

    /// Get the direct children of a resource, in insertion order.
    pub fn children(&self, id: i64) -> impl Iterator<Item = &Resource> {
        self.children
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.nodes[idx])
    }

    /// Get all root resources.
    pub fn roots(&self) -> impl Iterator<Item = &Resource> {
        self.nodes.iter().filter(|r| r.parent_id.is_none())
    }

    /// Get the ancestor chain of a resource, leaf first.
    ///
    /// The chain includes the resource itself.
    pub fn ancestors(&self, id: i64) -> Vec<&Resource> {
        let mut chain = Vec::new();
        let mut current = self.get(id);
        while let Some(resource) = current {
            chain.push(resource);
            current = resource.parent_id.and_then(|p| self.get(p));
        }
        chain
    }

    /// Get the root-to-leaf names of a resource.
    ///
    /// # Returns
    ///
    /// `None` if the resource does not exist.
    pub fn path(&self, id: i64) -> Option<Vec<&str>> {
        let mut chain = self.ancestors(id);
        if chain.is_empty() {
            return None;
        }
        chain.reverse();
        Some(chain.into_iter().map(|r| r.name.as_str()).collect())
    }

    /// Iterate over all resources.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.nodes.iter()
    }

    /// Get the count of resources.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
