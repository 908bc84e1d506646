//! Error types for permission resolution
//!
//! This module defines the errors that abort a permission generation run.
//! Recoverable conditions (unknown resource types, merge conflicts) are not
//! errors; they are reported as data alongside the result.

use thiserror::Error;

use crate::resources::ResourceType;

/// Malformed resource graph in the permission store.
///
/// These errors are fatal: no permissions document may be published from a
/// graph that cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Parent id does not reference an existing resource
    #[error("Resource {id} references missing parent {parent_id}")]
    DanglingParent {
        /// Resource ID.
        id: i64,
        /// Missing parent ID.
        parent_id: i64,
    },

    /// Parent chain loops back onto itself
    #[error("Resource {id} is part of a parent cycle")]
    Cycle {
        /// A resource on the cycle.
        id: i64,
    },

    /// Parent type is not a valid ancestor for the child type
    #[error("Resource {id} of type '{child}' cannot have a parent of type '{parent}'")]
    InvalidParent {
        /// Resource ID.
        id: i64,
        /// Type of the resource.
        child: ResourceType,
        /// Type of its parent.
        parent: ResourceType,
    },

    /// Two resources share an id
    #[error("Duplicate resource id {0}")]
    DuplicateResource(i64),

    /// Grant references a resource id that does not exist
    #[error("Grant {grant_id} references missing resource {resource_id}")]
    MissingResource {
        /// Grant ID.
        grant_id: i64,
        /// Missing resource ID.
        resource_id: i64,
    },
}

/// Permission store failures.
///
/// The store is never retried inside a run; a failed call aborts the whole
/// resolution.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store could not be reached
    #[error("Permission store unavailable: {0}")]
    Unavailable(String),

    /// Query failed
    #[error("Permission store query failed: {0}")]
    Query(String),

    /// Stored data could not be decoded
    #[error("Could not decode permission store data: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Any fatal error of a generation run.
#[derive(Debug, Error)]
pub enum PermGenError {
    /// Malformed resource graph
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid generator settings
    #[error("Invalid generator settings: {0}")]
    Settings(String),

    /// Generated document could not be written
    #[error("Could not write permissions document: {0}")]
    Io(#[from] std::io::Error),

    /// Generated document could not be serialized
    #[error("Could not serialize permissions document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for resource graph operations.
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Result type for permission store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for generation runs.
pub type PermGenResult<T> = Result<T, PermGenError>;

impl PermGenError {
    /// Check if this error was caused by the environment rather than by
    /// the stored permission data.
    ///
    /// Environment errors may succeed when the run is repeated as a new,
    /// independent invocation.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PermGenError::Store(StoreError::Unavailable(_)) | PermGenError::Io(_)
        )
    }

    /// Get error code for run reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            PermGenError::Configuration(ConfigurationError::DanglingParent { .. }) => {
                "DANGLING_PARENT"
            }
            PermGenError::Configuration(ConfigurationError::Cycle { .. }) => "PARENT_CYCLE",
            PermGenError::Configuration(ConfigurationError::InvalidParent { .. }) => {
                "INVALID_PARENT"
            }
            PermGenError::Configuration(ConfigurationError::DuplicateResource(_)) => {
                "DUPLICATE_RESOURCE"
            }
            PermGenError::Configuration(ConfigurationError::MissingResource { .. }) => {
                "MISSING_RESOURCE"
            }
            PermGenError::Store(StoreError::Unavailable(_)) => "STORE_UNAVAILABLE",
            PermGenError::Store(StoreError::Query(_)) => "STORE_QUERY_FAILED",
            PermGenError::Store(StoreError::Decode(_)) => "STORE_DECODE_FAILED",
            PermGenError::Settings(_) => "INVALID_SETTINGS",
            PermGenError::Io(_) => "IO_ERROR",
            PermGenError::Serialize(_) => "SERIALIZE_ERROR",
        }
    }
}
