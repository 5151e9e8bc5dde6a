pub mod constraint;
pub mod context;
pub mod engine;
pub mod errors;
pub mod loader;
pub mod policy;
pub mod types;

use std::collections::HashMap;
use std::collections::HashSet;

use types::{Permission, Role, User};

/// Fully compiled catalog state, loaded from KDL catalog files.
/// Immutable after construction; catalog changes require a reload.
#[derive(Debug)]
pub struct AuthzCatalog {
    /// permission id -> Permission
    permissions: HashMap<String, Permission>,
    /// role id -> Role
    roles: HashMap<String, Role>,
    /// lowercased email -> User (the demo directory)
    users_by_email: HashMap<String, User>,
}

impl AuthzCatalog {
    pub(crate) fn new(
        permissions: HashMap<String, Permission>,
        roles: HashMap<String, Role>,
        users_by_email: HashMap<String, User>,
    ) -> Self {
        Self {
            permissions,
            roles,
            users_by_email,
        }
    }

    /// Directory lookup used by login. Email matching is case-insensitive.
    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users_by_email.get(&email.to_lowercase())
    }

    pub fn roles_by_ids<'a, I>(&self, ids: I) -> Vec<Role>
    where
        I: IntoIterator<Item = &'a String>,
    {
        ids.into_iter()
            .filter_map(|id| self.roles.get(id).cloned())
            .collect()
    }

    pub fn permissions_by_ids<'a, I>(&self, ids: I) -> Vec<Permission>
    where
        I: IntoIterator<Item = &'a String>,
    {
        ids.into_iter()
            .filter_map(|id| self.permissions.get(id).cloned())
            .collect()
    }

    /// Roles referenced by the user's role-id list.
    pub fn resolve_roles(&self, user: &User) -> Vec<Role> {
        self.roles_by_ids(&user.role_ids)
    }

    /// Union of permissions reachable through the user's roles plus direct
    /// grants, de-duplicated by permission id (first occurrence wins).
    pub fn effective_permissions(&self, user: &User) -> Vec<Permission> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut result = Vec::new();

        let role_perm_ids = self
            .resolve_roles(user)
            .into_iter()
            .flat_map(|r| r.permission_ids)
            .collect::<Vec<_>>();

        for id in role_perm_ids.iter().chain(user.permission_ids.iter()) {
            if let Some(p) = self.permissions.get(id) {
                if seen.insert(p.id.as_str()) {
                    result.push(p.clone());
                }
            }
        }

        result
    }

    pub fn permission_count(&self) -> usize {
        self.permissions.len()
    }

    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    pub fn user_count(&self) -> usize {
        self.users_by_email.len()
    }
}
