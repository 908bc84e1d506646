//! Generator configuration.
//!
//! Policy switches of a generation run. Configuration is loaded from
//! environment variables or deserialized from a tenant config, with defaults
//! matching the behaviour of an unconfigured tenant.

use permgen_core::{PermGenError, PermGenResult, ResourceType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use crate::fragment::Category;

/// Settings of one generation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Resources without any grant are visible to everyone.
    ///
    /// When false, resources require an explicit grant (public or role).
    pub permissions_default_allow: bool,

    /// Feature info visibility follows map and layer visibility unless an
    /// info-specific restriction exists.
    pub inherit_info_permissions: bool,

    /// Ignore write flags and detailed create/update/delete grants on
    /// datasets.
    pub force_readonly_datasets: bool,

    /// Extra resource types emitted as sorted lists of permitted names.
    pub custom_resource_types: Vec<ResourceType>,

    /// Publish the document even if error entries were logged.
    pub ignore_errors: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            permissions_default_allow: true,
            inherit_info_permissions: false,
            force_readonly_datasets: false,
            custom_resource_types: Vec::new(),
            ignore_errors: false,
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PERMISSIONS_DEFAULT_ALLOW`: Open-by-default policy (default: true)
    /// - `INHERIT_INFO_PERMISSIONS`: Info visibility inherits layer visibility (default: false)
    /// - `FORCE_READONLY_DATASETS`: Datasets are never writable (default: false)
    /// - `CUSTOM_RESOURCE_TYPES`: Comma separated resource types (default: none)
    ///
    /// Flags accept `true`/`false`, `1`/`0`, `yes`/`no` and `on`/`off`. Invalid
    /// flag values and unknown custom resource types are ignored with a
    /// warning.
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            permissions_default_allow: env_flag("PERMISSIONS_DEFAULT_ALLOW", default.permissions_default_allow),
            inherit_info_permissions: env_flag("INHERIT_INFO_PERMISSIONS", default.inherit_info_permissions),
            force_readonly_datasets: env_flag("FORCE_READONLY_DATASETS", default.force_readonly_datasets),
            custom_resource_types: std::env::var("CUSTOM_RESOURCE_TYPES")
                .map(|s| parse_resource_types(&s))
                .unwrap_or(default.custom_resource_types),
            ignore_errors: default.ignore_errors,
        }
    }

    /// Enable or disable the open-by-default policy.
    pub fn with_default_allow(mut self, allow: bool) -> Self {
        self.permissions_default_allow = allow;
        self
    }

    /// Enable or disable info permission inheritance.
    pub fn with_inherit_info_permissions(mut self, inherit: bool) -> Self {
        self.inherit_info_permissions = inherit;
        self
    }

    /// Enable or disable read-only datasets.
    pub fn with_force_readonly_datasets(mut self, readonly: bool) -> Self {
        self.force_readonly_datasets = readonly;
        self
    }

    /// Add a custom resource type.
    pub fn with_custom_resource_type(mut self, resource_type: ResourceType) -> Self {
        self.custom_resource_types.push(resource_type);
        self
    }

    /// Check that the configuration can produce a well-formed document.
    ///
    /// Custom resource types must be unique and must not be emitted under
    /// the name of a fixed category.
    pub fn validate(&self) -> PermGenResult<()> {
        let mut seen = HashSet::new();
        for resource_type in &self.custom_resource_types {
            if !seen.insert(resource_type) {
                return Err(PermGenError::Settings(format!(
                    "custom resource type '{}' is listed twice",
                    resource_type
                )));
            }
            if Category::fixed()
                .iter()
                .any(|c| c.key() == resource_type.as_str())
            {
                return Err(PermGenError::Settings(format!(
                    "custom resource type '{}' collides with a fixed permission category",
                    resource_type
                )));
            }
        }
        Ok(())
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    let Ok(value) = std::env::var(name) else {
        return default;
    };
    parse_flag(&value).unwrap_or_else(|| {
        warn!(variable = name, value = %value, default, "Ignoring invalid boolean flag");
        default
    })
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_resource_types(value: &str) -> Vec<ResourceType> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|name| {
            let resource_type = ResourceType::parse(name);
            if resource_type.is_none() {
                warn!(resource_type = name, "Ignoring unknown custom resource type");
            }
            resource_type
        })
        .collect()
}
