use std::collections::HashMap;
use std::path::Path;

use crate::authz::errors::CatalogError;
use crate::authz::policy::{parse_kdl_document, ParsedCatalog};
use crate::authz::types::{Permission, Role, User};
use crate::authz::AuthzCatalog;

/// Load all `.kdl` catalog files from the given directory and compile them
/// into a single immutable `AuthzCatalog`.
pub fn load_catalog(dir: &Path) -> Result<AuthzCatalog, CatalogError> {
    if !dir.is_dir() {
        return Err(CatalogError::InvalidCatalog(format!(
            "catalog directory `{}` does not exist or is not a directory",
            dir.display()
        )));
    }

    let mut all_parsed = Vec::new();
    let mut file_count = 0;

    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "kdl")
                .unwrap_or(false)
        })
        .collect();
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();
        let contents =
            std::fs::read_to_string(&path).map_err(|source| CatalogError::CatalogLoadError {
                path: path.display().to_string(),
                source,
            })?;
        let parsed = parse_kdl_document(&contents)?;
        all_parsed.push(parsed);
        file_count += 1;
    }

    let catalog = compile_catalog(all_parsed)?;

    tracing::info!(
        files = file_count,
        permissions = catalog.permission_count(),
        roles = catalog.role_count(),
        users = catalog.user_count(),
        "Loaded authorization catalog"
    );

    Ok(catalog)
}

/// Merge and validate all parsed catalog fragments. Later files win on id
/// collisions; every cross-reference must resolve.
pub fn compile_catalog(parsed: Vec<ParsedCatalog>) -> Result<AuthzCatalog, CatalogError> {
    let mut permissions: HashMap<String, Permission> = HashMap::new();
    let mut roles: HashMap<String, Role> = HashMap::new();
    let mut users_by_email: HashMap<String, User> = HashMap::new();

    for p in parsed {
        for perm in p.permissions {
            permissions.insert(perm.id.clone(), perm);
        }
        for role in p.roles {
            roles.insert(role.id.clone(), role);
        }
        for user in p.users {
            users_by_email.insert(user.email.to_lowercase(), user);
        }
    }

    // Every role permission id must name a defined permission.
    for role in roles.values() {
        for pid in &role.permission_ids {
            if !permissions.contains_key(pid) {
                return Err(CatalogError::UndefinedPermission {
                    role: role.id.clone(),
                    permission: pid.clone(),
                });
            }
        }
    }

    // Every user role id and direct permission id must resolve.
    for user in users_by_email.values() {
        for rid in &user.role_ids {
            if !roles.contains_key(rid) {
                return Err(CatalogError::UndefinedRole {
                    user: user.id.clone(),
                    role: rid.clone(),
                });
            }
        }
        for pid in &user.permission_ids {
            if !permissions.contains_key(pid) {
                return Err(CatalogError::UndefinedDirectPermission {
                    user: user.id.clone(),
                    permission: pid.clone(),
                });
            }
        }
    }

    Ok(AuthzCatalog::new(permissions, roles, users_by_email))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::types::{PermissionAction, ResourceType, RoleType};

    fn parsed_fixture() -> ParsedCatalog {
        parse_kdl_document(
            r#"
permission "vehicle-read" resource="vehicle" action="read"
permission "shipment-manage" resource="shipment" action="manage"

role "dispatcher" name="Dispatcher" type="dispatcher" {
    permissions {
        - "vehicle-read"
        - "shipment-manage"
    }
}

user "u-1" username="alice" email="alice@fleet.test" {
    roles {
        - "dispatcher"
    }
}
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_compile_basic() {
        let catalog = compile_catalog(vec![parsed_fixture()]).unwrap();
        assert_eq!(catalog.permission_count(), 2);
        assert_eq!(catalog.role_count(), 1);
        assert_eq!(catalog.user_count(), 1);
    }

    #[test]
    fn test_role_with_undefined_permission_rejected() {
        let parsed = parse_kdl_document(
            r#"
role "dispatcher" name="Dispatcher" type="dispatcher" {
    permissions {
        - "no-such-permission"
    }
}
"#,
        )
        .unwrap();
        let err = compile_catalog(vec![parsed]).unwrap_err();
        assert!(matches!(err, CatalogError::UndefinedPermission { .. }));
    }

    #[test]
    fn test_user_with_undefined_role_rejected() {
        let parsed = parse_kdl_document(
            r#"
user "u-1" username="alice" email="alice@fleet.test" {
    roles {
        - "no-such-role"
    }
}
"#,
        )
        .unwrap();
        let err = compile_catalog(vec![parsed]).unwrap_err();
        assert!(matches!(err, CatalogError::UndefinedRole { .. }));
    }

    #[test]
    fn test_user_with_undefined_direct_permission_rejected() {
        let parsed = parse_kdl_document(
            r#"
user "u-1" username="alice" email="alice@fleet.test" {
    permissions {
        - "no-such-permission"
    }
}
"#,
        )
        .unwrap();
        let err = compile_catalog(vec![parsed]).unwrap_err();
        assert!(matches!(err, CatalogError::UndefinedDirectPermission { .. }));
    }

    #[test]
    fn test_merge_multiple_files_last_wins() {
        let p1 = parse_kdl_document(
            r#"permission "vehicle-read" resource="vehicle" action="read""#,
        )
        .unwrap();
        let p2 = parse_kdl_document(
            r#"permission "vehicle-read" resource="vehicle" action="manage""#,
        )
        .unwrap();
        let catalog = compile_catalog(vec![p1, p2]).unwrap();
        assert_eq!(catalog.permission_count(), 1);
        let perms =
            catalog.permissions_by_ids(std::iter::once(&"vehicle-read".to_string()));
        assert_eq!(perms[0].action, PermissionAction::Manage);
        assert_eq!(perms[0].resource, ResourceType::Vehicle);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();

        std::fs::write(
            dir.path().join("permissions.kdl"),
            r#"
permission "vehicle-read" resource="vehicle" action="read"
permission "invoice-read" resource="invoice" action="read"
"#,
        )
        .unwrap();

        std::fs::write(
            dir.path().join("roles.kdl"),
            r#"
role "driver" name="Driver" type="driver" {
    permissions {
        - "vehicle-read"
    }
}

user "u-1" username="dora" email="dora@fleet.test" {
    roles {
        - "driver"
    }
}
"#,
        )
        .unwrap();

        // Non-KDL files are ignored.
        std::fs::write(dir.path().join("README.md"), "not a catalog").unwrap();

        let catalog = load_catalog(dir.path()).unwrap();
        assert_eq!(catalog.permission_count(), 2);
        assert_eq!(catalog.role_count(), 1);
        let user = catalog.user_by_email("dora@fleet.test").unwrap();
        assert_eq!(
            catalog.resolve_roles(user)[0].role_type,
            RoleType::Driver
        );
    }

    #[test]
    fn test_load_nonexistent_directory() {
        let err = load_catalog(Path::new("/nonexistent/path")).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidCatalog(_)));
    }
}
