//! # Resource Catalog
//!
//! Candidate resources supplied by the resource-producing subsystems:
//! WMS/WFS capabilities, editable dataset metadata, background layers and
//! map info queries. The resolvers only ever emit names found here; the
//! permission store decides which of them a role may see.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Everything the subsystems know about one tenant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Catalog {
    /// WMS capabilities, one per map.
    pub wms_services: Vec<WmsCapability>,
    /// WFS capabilities, one per map.
    pub wfs_services: Vec<WfsCapability>,
    /// Editable datasets grouped by map.
    pub datasets: Vec<MapDatasets>,
    /// Background layer names.
    pub background_layers: Vec<String>,
    /// Map info query ids.
    pub mapinfo_queries: Vec<String>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add WMS capabilities.
    pub fn with_wms(mut self, capability: WmsCapability) -> Self {
        self.wms_services.push(capability);
        self
    }

    /// Add WFS capabilities.
    pub fn with_wfs(mut self, capability: WfsCapability) -> Self {
        self.wfs_services.push(capability);
        self
    }

    /// Add editable datasets of a map.
    pub fn with_datasets(mut self, datasets: MapDatasets) -> Self {
        self.datasets.push(datasets);
        self
    }

    /// Add a background layer.
    pub fn with_background_layer(mut self, name: &str) -> Self {
        self.background_layers.push(name.to_string());
        self
    }

    /// Add a map info query id.
    pub fn with_mapinfo_query(mut self, id: &str) -> Self {
        self.mapinfo_queries.push(id.to_string());
        self
    }

    /// Look up the editable datasets of a map.
    pub fn map_datasets(&self, map: &str) -> Option<&MapDatasets> {
        self.datasets.iter().find(|d| d.map == map)
    }

    /// Describe entries listed more than once.
    ///
    /// Only the first of duplicate entries is ever looked up, later ones
    /// would silently be merged into it.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut report = |kind: &str, names: Vec<&str>| {
            let mut seen = HashSet::new();
            for name in names {
                if !seen.insert(name) {
                    issues.push(format!("Duplicate {} '{}' in catalog", kind, name));
                }
            }
        };
        report(
            "WMS service",
            self.wms_services.iter().map(|s| s.name.as_str()).collect(),
        );
        report(
            "WFS service",
            self.wfs_services.iter().map(|s| s.name.as_str()).collect(),
        );
        report(
            "dataset map",
            self.datasets.iter().map(|d| d.map.as_str()).collect(),
        );
        issues
    }
}

/// WMS capabilities of one map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WmsCapability {
    /// Service (map) name.
    pub name: String,
    /// Root of the layer tree.
    pub root_layer: LayerNode,
    /// Layers only used when printing.
    #[serde(default)]
    pub internal_print_layers: Vec<String>,
    /// Print layouts of the map.
    #[serde(default)]
    pub print_templates: Vec<PrintTemplate>,
}

/// A layer or layer group of a WMS.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum LayerNode {
    /// Group of sublayers.
    Group {
        /// Group name.
        name: String,
        /// Sublayers, in drawing order.
        layers: Vec<LayerNode>,
    },
    /// Data layer.
    Leaf {
        /// Layer name.
        name: String,
        /// Supports feature info requests.
        #[serde(default)]
        queryable: bool,
        /// Attribute names.
        #[serde(default)]
        attributes: Vec<String>,
    },
}

impl LayerNode {
    /// Create a group.
    pub fn group(name: &str, layers: Vec<LayerNode>) -> Self {
        LayerNode::Group {
            name: name.to_string(),
            layers,
        }
    }

    /// Create a queryable leaf layer.
    pub fn leaf(name: &str, attributes: &[&str]) -> Self {
        LayerNode::Leaf {
            name: name.to_string(),
            queryable: true,
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Get the layer name.
    pub fn name(&self) -> &str {
        match self {
            LayerNode::Group { name, .. } | LayerNode::Leaf { name, .. } => name,
        }
    }

    /// Collect queryable leaves with their attributes, depth first.
    pub fn queryable_leaves(&self) -> Vec<(&str, &[String])> {
        let mut leaves = Vec::new();
        self.collect_queryable(&mut leaves);
        leaves
    }

    fn collect_queryable<'a>(&'a self, leaves: &mut Vec<(&'a str, &'a [String])>) {
        match self {
            LayerNode::Group { layers, .. } => {
                for layer in layers {
                    layer.collect_queryable(leaves);
                }
            }
            LayerNode::Leaf {
                name,
                queryable: true,
                attributes,
            } => leaves.push((name, attributes)),
            LayerNode::Leaf { .. } => {}
        }
    }
}

/// A print layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrintTemplate {
    /// Layout name.
    pub name: String,
    /// Companion legend layout.
    #[serde(
        default,
        rename = "legendLayout",
        skip_serializing_if = "Option::is_none"
    )]
    pub legend_layout: Option<String>,
}

impl PrintTemplate {
    /// Create a print template without legend layout.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            legend_layout: None,
        }
    }

    /// Attach a legend layout.
    pub fn with_legend(mut self, legend_layout: &str) -> Self {
        self.legend_layout = Some(legend_layout.to_string());
        self
    }
}

/// WFS capabilities of one map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WfsCapability {
    /// Service (map) name.
    pub name: String,
    /// Feature types.
    #[serde(default)]
    pub wfs_layers: Vec<WfsLayer>,
}

/// A WFS feature type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WfsLayer {
    /// Feature type name.
    pub name: String,
    /// Attribute names.
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl WfsLayer {
    /// Create a feature type.
    pub fn new(name: &str, attributes: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Editable datasets of one map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MapDatasets {
    /// Map name.
    pub map: String,
    /// Editable datasets.
    #[serde(default)]
    pub datasets: Vec<DatasetEntry>,
}

impl MapDatasets {
    /// Create an empty dataset list for a map.
    pub fn new(map: &str) -> Self {
        Self {
            map: map.to_string(),
            datasets: Vec::new(),
        }
    }

    /// Add a dataset.
    pub fn with_dataset(mut self, name: &str, fields: &[&str]) -> Self {
        self.datasets.push(DatasetEntry {
            name: name.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        });
        self
    }

    /// Look up a dataset by name.
    pub fn dataset(&self, name: &str) -> Option<&DatasetEntry> {
        self.datasets.iter().find(|d| d.name == name)
    }
}

/// An editable dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetEntry {
    /// Dataset (layer) name.
    pub name: String,
    /// Field names.
    #[serde(default)]
    pub fields: Vec<String>,
}
