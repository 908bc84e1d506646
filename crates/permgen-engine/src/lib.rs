//! # Permgen Engine
//!
//! Permission resolution and fragment merge engine of the map viewer
//! platform.
//!
//! ## Overview
//!
//! The permgen-engine crate handles:
//! - **Resolution**: Per-role visibility, attribute and CRUD decisions for
//!   every subsystem (OGC services, feature info, datasets, viewer, listings,
//!   map info queries)
//! - **Policies**: Open-by-default and closed-by-default modes, info
//!   permission inheritance, read-only datasets
//! - **Merge**: Deep merge of subsystem fragments into one document, with
//!   first-wins conflict reporting
//! - **Generation**: All-or-nothing runs producing a deterministic document
//!
//! ## Architecture
//!
//! ```text
//! PermissionStore ──capture──▶ GrantSnapshot        Catalog
//!                                   │                  │
//!                                   └──▶ ResolveContext ◀┘   (one per role)
//!                                             │
//!               Ogc / Info / Data / Viewer / Listing / Mapinfo resolvers
//!                                             │
//!                                  Vec<PermissionFragment>
//!                                             │
//!                                      merge_fragment
//!                                             │
//!                                   PermissionDocument
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use permgen_core::MemoryStore;
//! use permgen_engine::{
//!     Catalog, GeneratorConfig, LayerNode, PermissionGenerator, WmsCapability,
//! };
//!
//! let catalog = Catalog::new().with_wms(WmsCapability {
//!     name: "qwc_demo".into(),
//!     root_layer: LayerNode::group(
//!         "qwc_demo",
//!         vec![LayerNode::leaf("edit_lines", &["id", "Name"])],
//!     ),
//!     internal_print_layers: vec![],
//!     print_templates: vec![],
//! });
//!
//! // Restrict the `Name` attribute to admin
//! let store = MemoryStore::default()
//!     .with_role("admin")
//!     .with_resource(1, "map", "qwc_demo", None)
//!     .with_resource(2, "layer", "edit_lines", Some(1))
//!     .with_resource(3, "attribute", "Name", Some(2))
//!     .with_grant(1, "admin", 3, 0, false);
//!
//! let generator = PermissionGenerator::new(GeneratorConfig::default(), catalog);
//! let run = generator.run(&store).unwrap();
//!
//! let public = run.document.role("public").unwrap();
//! let layer = &public.wms_services[0].layers[1];
//! assert_eq!(layer.attributes.as_deref().unwrap(), &["id"]);
//!
//! let admin = run.document.role("admin").unwrap();
//! let layer = &admin.wms_services[0].layers[0];
//! assert_eq!(layer.attributes.as_deref().unwrap(), &["Name"]);
//! ```

pub mod catalog;
pub mod config;
pub mod document;
pub mod fragment;
pub mod generator;
pub mod lookup;
pub mod merge;
pub mod resolver;

// Re-export main types for convenience
pub use catalog::{
    Catalog, DatasetEntry, LayerNode, MapDatasets, PrintTemplate, WfsCapability, WfsLayer,
    WmsCapability,
};
pub use config::GeneratorConfig;
pub use document::{PermissionDocument, RoleEntry, RolePermissions};
pub use fragment::{
    Category, DatasetPermission, PermissionFragment, PluginDataPermission, WfsLayerPermission,
    WfsServicePermission, WmsLayerPermission, WmsServicePermission,
};
pub use generator::{
    write_atomic, GenerationRun, LogLevel, PermissionGenerator, RunLog, RunReport,
};
pub use lookup::AccessLookup;
pub use merge::{
    merge_fragment, merge_named, merge_names, Merge, MergeConflict, MergeContext, Named,
};
pub use resolver::{resolve_role, resolvers, ResolveContext, Resolver};
