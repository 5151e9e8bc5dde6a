//! Session state: who is logged in and what they can do.
//!
//! `SessionService` is an explicitly constructed object, not a global; it
//! owns the current state and a JSON session file that stands in for the
//! browser's local storage. Taking `&mut self` for `login`/`logout`
//! serializes state transitions by construction, so two in-flight logins
//! cannot race.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::authz::context::AccessContext;
use crate::authz::engine::{self, Subject};
use crate::authz::types::{Permission, PermissionAction, ResourceType, Role, RoleType, User};
use crate::authz::AuthzCatalog;
use crate::errors::AuthError;

/// Every demo account shares this password; there is no credential store
/// behind the mock directory.
pub const DEMO_PASSWORD: &str = "password123";

/// On-disk session layout. No schema version field: a layout change makes
/// old files malformed, which `restore` treats as logged-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    user: User,
    is_authenticated: bool,
    permissions: Vec<Permission>,
    roles: Vec<Role>,
    last_login_at: DateTime<Utc>,
}

/// Reactive snapshot the UI layer reads.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub user: Option<User>,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl SessionState {
    fn loading() -> Self {
        Self {
            is_loading: true,
            ..Default::default()
        }
    }

    fn unauthenticated() -> Self {
        Self::default()
    }
}

pub struct SessionService {
    catalog: Arc<AuthzCatalog>,
    store_path: PathBuf,
    state: SessionState,
}

impl SessionService {
    /// A fresh service starts in the Loading state; call `restore` to leave
    /// it.
    pub fn new(catalog: Arc<AuthzCatalog>, store_path: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            store_path: store_path.into(),
            state: SessionState::loading(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_user(&self) -> Option<&User> {
        self.state.user.as_ref()
    }

    /// Hydrate from the session file. Missing or malformed storage is
    /// treated as "no session"; this never fails. Always clears the
    /// loading flag.
    pub fn restore(&mut self) {
        let restored = match std::fs::read_to_string(&self.store_path) {
            Ok(raw) => match serde_json::from_str::<StoredSession>(&raw) {
                Ok(stored) if stored.is_authenticated => Some(stored),
                Ok(_) => None,
                Err(e) => {
                    warn!(
                        path = %self.store_path.display(),
                        error = %e,
                        "discarding malformed session store"
                    );
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(
                    path = %self.store_path.display(),
                    error = %e,
                    "could not read session store; treating as logged out"
                );
                None
            }
        };

        self.state = match restored {
            Some(stored) => {
                debug!(user = %stored.user.id, "restored persisted session");
                SessionState {
                    user: Some(stored.user),
                    roles: stored.roles,
                    permissions: stored.permissions,
                    is_authenticated: true,
                    is_loading: false,
                    error: None,
                    last_login_at: Some(stored.last_login_at),
                }
            }
            None => SessionState::unauthenticated(),
        };
    }

    /// Authenticate against the demo directory and persist the session,
    /// overwriting any previous one. Failures are recorded in the state's
    /// `error` field and returned to the caller.
    pub fn login(&mut self, email: &str, password: &str) -> Result<(), AuthError> {
        match self.try_login(email, password) {
            Ok(()) => {
                self.state.error = None;
                Ok(())
            }
            Err(e) => {
                self.state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn try_login(&mut self, email: &str, password: &str) -> Result<(), AuthError> {
        let user = self
            .catalog
            .user_by_email(email)
            .cloned()
            .ok_or_else(|| AuthError::NotFound(email.to_string()))?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled(user.email));
        }

        if password != DEMO_PASSWORD {
            return Err(AuthError::InvalidCredentials);
        }

        let roles = self.catalog.resolve_roles(&user);
        let permissions = self.catalog.effective_permissions(&user);
        let now = Utc::now();

        self.persist(&StoredSession {
            user: user.clone(),
            is_authenticated: true,
            permissions: permissions.clone(),
            roles: roles.clone(),
            last_login_at: now,
        })?;

        info!(user = %user.id, roles = roles.len(), permissions = permissions.len(), "login succeeded");

        self.state = SessionState {
            user: Some(user),
            roles,
            permissions,
            is_authenticated: true,
            is_loading: false,
            error: None,
            last_login_at: Some(now),
        };

        Ok(())
    }

    /// Clear the session file and reset to the unauthenticated default.
    /// Idempotent: a missing store file is not an error.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.store_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(AuthError::Store {
                    path: self.store_path.display().to_string(),
                    source,
                });
            }
        }
        self.state = SessionState::unauthenticated();
        Ok(())
    }

    fn persist(&self, stored: &StoredSession) -> Result<(), AuthError> {
        if let Some(parent) = self.store_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| AuthError::Store {
                    path: self.store_path.display().to_string(),
                    source,
                })?;
            }
        }
        let json = serde_json::to_string_pretty(stored)?;
        std::fs::write(&self.store_path, json).map_err(|source| AuthError::Store {
            path: self.store_path.display().to_string(),
            source,
        })
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    // ---------- Checks exposed to the UI layer ----------

    pub fn has_role(&self, role_type: RoleType) -> bool {
        self.state.roles.iter().any(|r| r.role_type == role_type)
    }

    /// Match by display name or role-type tag, for callers holding a
    /// string from the catalog.
    pub fn has_role_named(&self, name: &str) -> bool {
        self.state
            .roles
            .iter()
            .any(|r| r.name == name || r.role_type.as_str() == name)
    }

    /// Possession check only: does the effective set contain a permission
    /// covering this pair? Constraints are not consulted.
    pub fn has_permission(&self, resource: ResourceType, action: PermissionAction) -> bool {
        self.state.is_authenticated
            && self
                .state
                .permissions
                .iter()
                .any(|p| p.covers(resource, action))
    }

    /// Full evaluation, delegating to the engine.
    pub fn can_access(
        &self,
        resource: ResourceType,
        action: PermissionAction,
        context: Option<&AccessContext>,
    ) -> bool {
        let subject = self.subject();
        engine::check(subject.as_ref(), resource, action, context)
    }

    fn subject(&self) -> Option<Subject<'_>> {
        if !self.state.is_authenticated {
            return None;
        }
        self.state.user.as_ref().map(|user| Subject {
            user,
            roles: &self.state.roles,
            permissions: &self.state.permissions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::loader::compile_catalog;
    use crate::authz::policy::parse_kdl_document;

    fn catalog() -> Arc<AuthzCatalog> {
        let parsed = parse_kdl_document(
            r#"
permission "vehicle-read" resource="vehicle" action="read"
permission "shipment-read-own" resource="shipment" action="read" {
    constraints {
        owned-only true
    }
}
permission "everything-invoice" resource="invoice" action="manage"

role "root" name="Super Admin" type="super_admin"
role "dispatcher" name="Dispatcher" type="dispatcher" {
    permissions {
        - "vehicle-read"
        - "shipment-read-own"
    }
}

user "u-admin" username="root" email="root@fleet.test" {
    roles {
        - "root"
    }
}
user "u-alice" username="alice" email="alice@fleet.test" {
    roles {
        - "dispatcher"
    }
    permissions {
        - "everything-invoice"
    }
}
user "u-gone" username="gone" email="gone@fleet.test" active=false
"#,
        )
        .unwrap();
        Arc::new(compile_catalog(vec![parsed]).unwrap())
    }

    fn service(dir: &tempfile::TempDir) -> SessionService {
        SessionService::new(catalog(), dir.path().join("session.json"))
    }

    #[test]
    fn test_initial_state_is_loading() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        assert!(svc.state().is_loading);
        assert!(!svc.state().is_authenticated);
    }

    #[test]
    fn test_restore_without_store_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        svc.restore();
        assert!(!svc.state().is_loading);
        assert!(!svc.state().is_authenticated);
        assert!(svc.state().user.is_none());
        assert!(svc.state().error.is_none());
    }

    #[test]
    fn test_restore_with_malformed_store_self_heals() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        std::fs::write(svc.store_path(), "{ not json").unwrap();
        svc.restore();
        assert!(!svc.state().is_loading);
        assert!(!svc.state().is_authenticated);
    }

    #[test]
    fn test_login_unknown_email() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        svc.restore();
        let err = svc.login("admin@x.com", DEMO_PASSWORD).unwrap_err();
        assert!(matches!(err, AuthError::NotFound(_)));
        assert!(svc.state().error.is_some());
        assert!(!svc.state().is_authenticated);
    }

    #[test]
    fn test_login_wrong_password() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        svc.restore();
        let err = svc.login("alice@fleet.test", "letmein").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_login_disabled_account() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        svc.restore();
        let err = svc.login("gone@fleet.test", DEMO_PASSWORD).unwrap_err();
        assert!(matches!(err, AuthError::AccountDisabled(_)));
    }

    #[test]
    fn test_login_success_resolves_effective_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        svc.restore();
        svc.login("alice@fleet.test", DEMO_PASSWORD).unwrap();

        assert!(svc.state().is_authenticated);
        assert!(svc.state().error.is_none());
        assert!(svc.state().last_login_at.is_some());
        // Two role-derived plus one direct permission.
        assert_eq!(svc.state().permissions.len(), 3);
        assert!(svc.has_role(RoleType::Dispatcher));
        assert!(!svc.has_role(RoleType::SuperAdmin));
        assert!(svc.has_role_named("Dispatcher"));
        assert!(svc.has_role_named("dispatcher"));
        assert!(svc.store_path().exists());
    }

    #[test]
    fn test_login_error_clears_on_next_success() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        svc.restore();
        let _ = svc.login("alice@fleet.test", "wrong");
        assert!(svc.state().error.is_some());
        svc.login("alice@fleet.test", DEMO_PASSWORD).unwrap();
        assert!(svc.state().error.is_none());
    }

    #[test]
    fn test_has_permission_and_manage_subsumption() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        svc.restore();
        svc.login("alice@fleet.test", DEMO_PASSWORD).unwrap();

        assert!(svc.has_permission(ResourceType::Vehicle, PermissionAction::Read));
        assert!(!svc.has_permission(ResourceType::Vehicle, PermissionAction::Delete));
        // Direct manage grant covers every invoice action.
        assert!(svc.has_permission(ResourceType::Invoice, PermissionAction::Delete));
    }

    #[test]
    fn test_can_access_with_context() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        svc.restore();
        svc.login("alice@fleet.test", DEMO_PASSWORD).unwrap();

        let own = AccessContext::new().owner("u-alice");
        let other = AccessContext::new().owner("u-bob");
        assert!(svc.can_access(ResourceType::Shipment, PermissionAction::Read, Some(&own)));
        assert!(!svc.can_access(ResourceType::Shipment, PermissionAction::Read, Some(&other)));
        // No context: possession suffices.
        assert!(svc.can_access(ResourceType::Shipment, PermissionAction::Read, None));
    }

    #[test]
    fn test_super_admin_can_access_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        svc.restore();
        svc.login("root@fleet.test", DEMO_PASSWORD).unwrap();
        let ctx = AccessContext::new().owner("someone-else").value(1e9);
        assert!(svc.can_access(ResourceType::Setting, PermissionAction::Delete, Some(&ctx)));
    }

    #[test]
    fn test_logout_clears_store_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        svc.restore();
        svc.login("alice@fleet.test", DEMO_PASSWORD).unwrap();
        assert!(svc.store_path().exists());

        svc.logout().unwrap();
        assert!(!svc.store_path().exists());
        assert!(!svc.state().is_authenticated);
        assert!(svc.state().user.is_none());

        // Second logout with no store file is fine.
        svc.logout().unwrap();

        svc.restore();
        assert!(!svc.state().is_authenticated);
    }

    #[test]
    fn test_session_roundtrip_across_services() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = service(&dir);
        first.restore();
        first.login("alice@fleet.test", DEMO_PASSWORD).unwrap();
        let original = first.state().clone();

        // Fresh service over the same store, as after a process restart.
        let mut second = service(&dir);
        second.restore();

        assert!(second.state().is_authenticated);
        let restored_user = second.state().user.as_ref().unwrap();
        assert_eq!(restored_user.id, original.user.as_ref().unwrap().id);
        assert_eq!(second.state().roles, original.roles);
        assert_eq!(second.state().permissions, original.permissions);
    }

    #[test]
    fn test_login_overwrites_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(&dir);
        svc.restore();
        svc.login("alice@fleet.test", DEMO_PASSWORD).unwrap();
        svc.login("root@fleet.test", DEMO_PASSWORD).unwrap();

        let mut other = service(&dir);
        other.restore();
        assert_eq!(other.state().user.as_ref().unwrap().id, "u-admin");
    }
}
