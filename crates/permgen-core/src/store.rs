//! Permission store access
//!
//! The store is consumed through an explicit capability: a
//! [`PermissionStore`] hands out short-lived, read-only [`StoreSession`]s.
//! A session is released when it is dropped, so every exit path of a
//! resolution (success, error, panic unwinding) gives it back.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::grants::PermissionGrant;
use crate::resources::ResourceRecord;
use crate::roles::{GroupRecord, Principals, UserRecord};

/// Read-only permission store.
pub trait PermissionStore: Send + Sync {
    /// Open a read-only session.
    ///
    /// The session is released when the returned box is dropped.
    fn open_session(&self) -> StoreResult<Box<dyn StoreSession + '_>>;
}

/// A scoped, read-only view of the store.
pub trait StoreSession {
    /// All resource rows.
    fn resources(&self) -> StoreResult<Vec<ResourceRecord>>;

    /// All grant rows.
    fn grants(&self) -> StoreResult<Vec<PermissionGrant>>;

    /// Users, groups and role names.
    fn principals(&self) -> StoreResult<Principals>;
}

/// Serialized content of a permission store.
///
/// # Example
///
/// ```
/// use permgen_core::store::StoreDump;
///
/// let dump: StoreDump = serde_json::from_str(r#"{
///     "resources": [{"id": 1, "type": "map", "name": "qwc_demo"}],
///     "grants": [{"id": 1, "role": "admin", "resource_id": 1}],
///     "roles": ["admin"]
/// }"#).unwrap();
/// assert_eq!(dump.resources.len(), 1);
/// assert_eq!(dump.principals.roles, vec!["admin"]);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreDump {
    /// Resource rows
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,

    /// Grant rows
    #[serde(default)]
    pub grants: Vec<PermissionGrant>,

    /// Users, groups and roles
    #[serde(flatten)]
    pub principals: Principals,
}

#[derive(Debug, Clone)]
enum Failure {
    Unavailable(String),
    Query(String),
}

/// In-memory permission store.
///
/// Suitable for tests and for generating from an exported dump. Tracks how
/// many sessions are currently open so callers can check that every
/// session was released.
#[derive(Debug, Default)]
pub struct MemoryStore {
    dump: StoreDump,
    failure: Option<Failure>,
    open_sessions: AtomicUsize,
    sessions_opened: AtomicUsize,
}

impl MemoryStore {
    /// Create a store serving `dump`.
    pub fn new(dump: StoreDump) -> Self {
        Self {
            dump,
            ..Default::default()
        }
    }

    /// Create a store from a JSON dump.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Create a store that cannot be reached.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(Failure::Unavailable(reason.into())),
            ..Default::default()
        }
    }

    /// Make every query of this store's sessions fail.
    ///
    /// Sessions still open successfully.
    pub fn with_failing_queries(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(Failure::Query(reason.into()));
        self
    }

    /// Add a resource row.
    pub fn with_resource(
        mut self,
        id: i64,
        type_name: &str,
        name: &str,
        parent_id: Option<i64>,
    ) -> Self {
        self.dump
            .resources
            .push(ResourceRecord::new(id, type_name, name, parent_id));
        self
    }

    /// Add a grant row.
    pub fn with_grant(
        mut self,
        id: i64,
        role: &str,
        resource_id: i64,
        priority: i32,
        write: bool,
    ) -> Self {
        self.dump
            .grants
            .push(PermissionGrant::new(id, role, resource_id, priority, write));
        self
    }

    /// Add a role name.
    pub fn with_role(mut self, role: &str) -> Self {
        self.dump.principals.roles.push(role.to_string());
        self
    }

    /// Add a user.
    pub fn with_user(mut self, name: &str, groups: &[&str], roles: &[&str]) -> Self {
        self.dump.principals.users.push(UserRecord {
            name: name.to_string(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        });
        self
    }

    /// Add a group.
    pub fn with_group(mut self, name: &str, roles: &[&str]) -> Self {
        self.dump.principals.groups.push(GroupRecord {
            name: name.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        });
        self
    }

    /// Get the served dump.
    pub fn dump(&self) -> &StoreDump {
        &self.dump
    }

    /// Number of sessions currently open.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    /// Number of sessions opened since creation.
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    fn check_query(&self) -> StoreResult<()> {
        match &self.failure {
            Some(Failure::Query(reason)) => Err(StoreError::Query(reason.clone())),
            _ => Ok(()),
        }
    }
}

impl PermissionStore for MemoryStore {
    fn open_session(&self) -> StoreResult<Box<dyn StoreSession + '_>> {
        if let Some(Failure::Unavailable(reason)) = &self.failure {
            return Err(StoreError::Unavailable(reason.clone()));
        }
        let open = self.open_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        debug!(open_sessions = open, "Opened permission store session");
        Ok(Box::new(MemorySession { store: self }))
    }
}

/// Session on a [`MemoryStore`].
#[derive(Debug)]
pub struct MemorySession<'a> {
    store: &'a MemoryStore,
}

impl StoreSession for MemorySession<'_> {
    fn resources(&self) -> StoreResult<Vec<ResourceRecord>> {
        self.store.check_query()?;
        Ok(self.store.dump.resources.clone())
    }

    fn grants(&self) -> StoreResult<Vec<PermissionGrant>> {
        self.store.check_query()?;
        Ok(self.store.dump.grants.clone())
    }

    fn principals(&self) -> StoreResult<Principals> {
        self.store.check_query()?;
        Ok(self.store.dump.principals.clone())
    }
}

impl Drop for MemorySession<'_> {
    fn drop(&mut self) {
        let open = self.store.open_sessions.fetch_sub(1, Ordering::SeqCst) - 1;
        debug!(open_sessions = open, "Released permission store session");
    }
}
