//! # Permission Document
//!
//! The final artifact of a generation run:
//!
//! ```json
//! {
//!   "users": [{"name": "...", "groups": [...], "roles": [...]}],
//!   "groups": [{"name": "...", "roles": [...]}],
//!   "roles": [{"role": "public", "permissions": {"wms_services": [...], ...}}]
//! }
//! ```
//!
//! Keys are serialized in declaration order. `public` is always the first
//! role and every category is present, empty or not.

use base64::Engine;
use permgen_core::{GroupRecord, PermGenResult, Principals, ResourceType, UserRecord};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::fragment::{
    DatasetPermission, PluginDataPermission, WfsServicePermission, WmsServicePermission,
};

/// Permissions of all roles, users and groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionDocument {
    /// Users, sorted by name
    pub users: Vec<UserRecord>,

    /// Groups, sorted by name
    pub groups: Vec<GroupRecord>,

    /// Roles, `public` first
    pub roles: Vec<RoleEntry>,
}

/// Permissions of one role.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleEntry {
    /// Role name
    pub role: String,

    /// Merged permissions
    pub permissions: RolePermissions,
}

/// Merged permissions of one role, one field per category.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RolePermissions {
    /// WMS services with permitted layers and print templates
    #[serde(default)]
    pub wms_services: Vec<WmsServicePermission>,

    /// WFS services with permitted feature types
    #[serde(default)]
    pub wfs_services: Vec<WfsServicePermission>,

    /// Background layer names
    #[serde(default)]
    pub background_layers: Vec<String>,

    /// Editable datasets with CRUD flags
    #[serde(default)]
    pub data_datasets: Vec<DatasetPermission>,

    /// Viewer task names
    #[serde(default)]
    pub viewer_tasks: Vec<String>,

    /// Theme info link names
    #[serde(default)]
    pub theme_info_links: Vec<String>,

    /// Plugin data resources, grouped by plugin
    #[serde(default)]
    pub plugin_data: Vec<PluginDataPermission>,

    /// Dataproduct names
    #[serde(default)]
    pub dataproducts: Vec<String>,

    /// Document template names
    #[serde(default)]
    pub document_templates: Vec<String>,

    /// Print template names of all maps
    #[serde(default)]
    pub print_templates: Vec<String>,

    /// Search facet names
    #[serde(default)]
    pub solr_facets: Vec<String>,

    /// External link names
    #[serde(default)]
    pub external_links: Vec<String>,

    /// Map info query ids
    #[serde(default)]
    pub mapinfo_query: Vec<String>,

    /// Custom resource types, keyed by type name
    #[serde(flatten)]
    pub custom: BTreeMap<String, Vec<String>>,
}

impl RolePermissions {
    /// Create empty permissions with every custom category declared.
    pub fn declared(custom_resource_types: &[ResourceType]) -> Self {
        Self {
            custom: custom_resource_types
                .iter()
                .map(|t| (t.as_str().to_string(), Vec::new()))
                .collect(),
            ..Default::default()
        }
    }
}

impl PermissionDocument {
    /// Create the document skeleton before any fragment is merged.
    ///
    /// # Arguments
    ///
    /// * `principals` - Users, groups and roles of the snapshot
    /// * `custom_resource_types` - Extra categories to declare for every role
    ///
    /// # Example
    ///
    /// ```
    /// use permgen_core::Principals;
    /// use permgen_engine::document::PermissionDocument;
    ///
    /// let principals = Principals {
    ///     roles: vec!["admin".into()],
    ///     ..Default::default()
    /// };
    /// let document = PermissionDocument::base(&principals, &[]);
    /// assert_eq!(document.roles[0].role, "public");
    /// assert_eq!(document.roles[1].role, "admin");
    /// ```
    pub fn base(principals: &Principals, custom_resource_types: &[ResourceType]) -> Self {
        Self {
            users: principals.sorted_users(),
            groups: principals.sorted_groups(),
            roles: principals
                .ordered_roles()
                .into_iter()
                .map(|role| RoleEntry {
                    role: role.to_string(),
                    permissions: RolePermissions::declared(custom_resource_types),
                })
                .collect(),
        }
    }

    /// Look up the permissions of a role.
    pub fn role(&self, name: &str) -> Option<&RolePermissions> {
        self.roles
            .iter()
            .find(|entry| entry.role == name)
            .map(|entry| &entry.permissions)
    }

    /// Serialize as pretty printed JSON.
    pub fn to_json_pretty(&self) -> PermGenResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// SHA-256 of the compact JSON serialization, base64 encoded.
    ///
    /// Equal documents always have equal fingerprints.
    pub fn fingerprint(&self) -> PermGenResult<String> {
        let bytes = serde_json::to_vec(self)?;
        let hash = Sha256::digest(&bytes);
        Ok(base64::engine::general_purpose::STANDARD.encode(hash))
    }
}
