//! Roles, users and groups
//!
//! Roles are plain names. The `public` role is reserved: it is the
//! anonymous actor, and every other role's permissions are computed
//! relative to what `public` has.

use serde::{Deserialize, Serialize};

/// Name of the reserved anonymous role.
pub const PUBLIC_ROLE: &str = "public";

/// Check whether a role name is the reserved public role.
///
/// # Examples
///
/// ```
/// use permgen_core::roles::is_public;
///
/// assert!(is_public("public"));
/// assert!(!is_public("admin"));
/// ```
pub fn is_public(role: &str) -> bool {
    role == PUBLIC_ROLE
}

/// A user with its group and role memberships.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    /// User name
    pub name: String,

    /// Group names, sorted
    #[serde(default)]
    pub groups: Vec<String>,

    /// Role names, sorted
    #[serde(default)]
    pub roles: Vec<String>,
}

/// A group with its role memberships.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupRecord {
    /// Group name
    pub name: String,

    /// Role names, sorted
    #[serde(default)]
    pub roles: Vec<String>,
}

/// All principals known to the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principals {
    /// Users
    #[serde(default)]
    pub users: Vec<UserRecord>,

    /// Groups
    #[serde(default)]
    pub groups: Vec<GroupRecord>,

    /// Role names
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Principals {
    /// Role names in document order: `public` first, the rest alphabetical.
    ///
    /// `public` is always present, even if the store does not list it.
    /// Duplicate names are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use permgen_core::roles::Principals;
    ///
    /// let principals = Principals {
    ///     roles: vec!["editor".into(), "admin".into(), "public".into()],
    ///     ..Default::default()
    /// };
    /// assert_eq!(principals.ordered_roles(), vec!["public", "admin", "editor"]);
    /// ```
    pub fn ordered_roles(&self) -> Vec<&str> {
        let mut roles: Vec<&str> = self
            .roles
            .iter()
            .map(String::as_str)
            .filter(|r| !is_public(r))
            .collect();
        roles.sort_unstable();
        roles.dedup();
        roles.insert(0, PUBLIC_ROLE);
        roles
    }

    /// Users sorted by name, each with sorted groups and roles.
    pub fn sorted_users(&self) -> Vec<UserRecord> {
        let mut users = self.users.clone();
        for user in &mut users {
            user.groups.sort();
            user.roles.sort();
        }
        users.sort_by(|a, b| a.name.cmp(&b.name));
        users
    }

    /// Groups sorted by name, each with sorted roles.
    pub fn sorted_groups(&self) -> Vec<GroupRecord> {
        let mut groups = self.groups.clone();
        for group in &mut groups {
            group.roles.sort();
        }
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_role_is_added_and_first() {
        let principals = Principals {
            roles: vec!["viewer".into(), "admin".into()],
            ..Default::default()
        };
        assert_eq!(principals.ordered_roles(), vec!["public", "admin", "viewer"]);
    }

    #[test]
    fn test_duplicate_roles_are_dropped() {
        let principals = Principals {
            roles: vec!["admin".into(), "public".into(), "admin".into(), "public".into()],
            ..Default::default()
        };
        assert_eq!(principals.ordered_roles(), vec!["public", "admin"]);
    }

    #[test]
    fn test_users_and_groups_are_sorted() {
        let principals = Principals {
            users: vec![
                UserRecord {
                    name: "zoe".into(),
                    groups: vec!["b".into(), "a".into()],
                    roles: vec!["editor".into(), "admin".into()],
                },
                UserRecord {
                    name: "adam".into(),
                    ..Default::default()
                },
            ],
            groups: vec![
                GroupRecord {
                    name: "surveyors".into(),
                    roles: vec!["viewer".into(), "editor".into()],
                },
                GroupRecord {
                    name: "admins".into(),
                    roles: vec![],
                },
            ],
            roles: vec![],
        };

        let users = principals.sorted_users();
        assert_eq!(users[0].name, "adam");
        assert_eq!(users[1].groups, vec!["a", "b"]);
        assert_eq!(users[1].roles, vec!["admin", "editor"]);

        let groups = principals.sorted_groups();
        assert_eq!(groups[0].name, "admins");
        assert_eq!(groups[1].roles, vec!["editor", "viewer"]);
    }
}
