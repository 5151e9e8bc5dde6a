//! KDL catalog document parser.
//!
//! A catalog file contains `permission`, `role`, and `user` nodes. String
//! collections use dash-lists; scalar fields are node properties. Resource,
//! action, role-type, and priority values are validated against the closed
//! enums here, at the catalog boundary.

use chrono::{DateTime, Utc};
use kdl::{KdlDocument, KdlNode, KdlValue};

use crate::authz::errors::CatalogError;
use crate::authz::types::{
    Constraints, Geofence, Permission, PermissionAction, PriorityLevel, Profile, ResourceType,
    Role, RoleType, User, UserSettings, WorkingHours,
};

/// Intermediate result from parsing a single KDL file.
#[derive(Debug, Clone, Default)]
pub struct ParsedCatalog {
    pub permissions: Vec<Permission>,
    pub roles: Vec<Role>,
    pub users: Vec<User>,
}

/// Parse a KDL document string into typed catalog records.
pub fn parse_kdl_document(source: &str) -> Result<ParsedCatalog, CatalogError> {
    let doc: KdlDocument = source
        .parse()
        .map_err(|e: kdl::KdlError| CatalogError::KdlParse(e.to_string()))?;

    let mut catalog = ParsedCatalog::default();

    for node in doc.nodes() {
        match node.name().value() {
            "permission" => catalog.permissions.push(parse_permission(node)?),
            "role" => catalog.roles.push(parse_role(node)?),
            "user" => catalog.users.push(parse_user(node)?),
            other => {
                tracing::warn!("ignoring unknown top-level KDL node `{other}`");
            }
        }
    }

    Ok(catalog)
}

fn parse_permission(node: &KdlNode) -> Result<Permission, CatalogError> {
    let id = first_string_arg(node).ok_or_else(|| {
        CatalogError::InvalidCatalog(
            "permission node requires a string id (e.g. permission \"shipment-read\")".into(),
        )
    })?;

    let resource_str = require_prop_string(node, "resource", &id)?;
    let resource = ResourceType::parse(&resource_str).ok_or(CatalogError::UnknownValue {
        field: "resource type",
        value: resource_str,
    })?;

    let action_str = require_prop_string(node, "action", &id)?;
    let action = PermissionAction::parse(&action_str).ok_or(CatalogError::UnknownValue {
        field: "action",
        value: action_str,
    })?;

    let mut constraints = None;
    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "constraints" => {
                    constraints = Some(parse_constraints(child, &id)?);
                }
                other => {
                    return Err(CatalogError::InvalidCatalog(format!(
                        "unexpected child `{other}` in permission `{id}` (expected `constraints`)"
                    )));
                }
            }
        }
    }

    Ok(Permission {
        id,
        resource,
        action,
        constraints,
    })
}

fn parse_constraints(node: &KdlNode, permission: &str) -> Result<Constraints, CatalogError> {
    let mut c = Constraints::default();

    let Some(children) = node.children() else {
        return Ok(c);
    };

    for child in children.nodes() {
        let name = child.name().value();
        match name {
            "owned-only" => c.owned_only = Some(bool_arg(child, permission)?),
            "department-only" => c.department_only = Some(bool_arg(child, permission)?),
            "client-restrictions" => c.client_restrictions = Some(dash_list(child)),
            "value-limit" => c.value_limit = Some(number_arg(child, permission)?),
            "budget-limit" => c.budget_limit = Some(number_arg(child, permission)?),
            "max-weight" => c.max_weight = Some(number_arg(child, permission)?),
            "max-distance" => c.max_distance = Some(number_arg(child, permission)?),
            "max-priority-level" => {
                let s = string_arg(child, permission)?;
                let level = PriorityLevel::parse(&s).ok_or(CatalogError::UnknownValue {
                    field: "priority level",
                    value: s,
                })?;
                c.max_priority_level = Some(level);
            }
            "allowed-statuses" => c.allowed_statuses = Some(dash_list(child)),
            "working-hours" => {
                let mut hours = WorkingHours::default();
                if let Some(v) = prop_number(child, "start-hour") {
                    hours.start_hour = hour_of_day(v, "start-hour", permission)?;
                }
                if let Some(v) = prop_number(child, "end-hour") {
                    hours.end_hour = hour_of_day(v, "end-hour", permission)?;
                }
                if let Some(hour_children) = child.children() {
                    for hc in hour_children.nodes() {
                        if hc.name().value() == "days-of-week" {
                            let mut days = Vec::new();
                            for d in dash_list_numbers(hc) {
                                if !(0..=6).contains(&d) {
                                    return Err(CatalogError::InvalidConstraint {
                                        permission: permission.to_string(),
                                        message: format!(
                                            "day-of-week `{d}` is outside 0 (Sunday) to 6 (Saturday)"
                                        ),
                                    });
                                }
                                days.push(d as u8);
                            }
                            hours.days_of_week = days;
                        }
                    }
                }
                c.working_hours = Some(hours);
            }
            "geofence" => {
                let lat = require_prop_number(child, "lat", permission)?;
                let lng = require_prop_number(child, "lng", permission)?;
                let radius_km = require_prop_number(child, "radius-km", permission)?;
                c.geofence = Some(Geofence {
                    lat,
                    lng,
                    radius_km,
                });
            }
            "required-vehicle-status" => {
                c.required_vehicle_status = Some(string_arg(child, permission)?)
            }
            "temp-control-required" => {
                c.temp_control_required = Some(bool_arg(child, permission)?)
            }
            "min-approval-level" => {
                let v = number_arg(child, permission)?;
                if v.fract() != 0.0 || v < 0.0 {
                    return Err(CatalogError::InvalidConstraint {
                        permission: permission.to_string(),
                        message: format!(
                            "`min-approval-level` must be a non-negative integer, got {v}"
                        ),
                    });
                }
                c.min_approval_level = Some(v as i64);
            }
            "allowed-companies" => c.allowed_companies = Some(dash_list(child)),
            "required-documents" => c.required_documents = Some(dash_list(child)),
            "region-restriction" => c.region_restriction = Some(bool_arg(child, permission)?),
            "vehicle-type-restriction" => {
                c.vehicle_type_restriction = Some(bool_arg(child, permission)?)
            }
            "customer-restriction" => {
                c.customer_restriction = Some(bool_arg(child, permission)?)
            }
            other => {
                return Err(CatalogError::InvalidConstraint {
                    permission: permission.to_string(),
                    message: format!("unknown constraint `{other}`"),
                });
            }
        }
    }

    Ok(c)
}

fn parse_role(node: &KdlNode) -> Result<Role, CatalogError> {
    let id = first_string_arg(node).ok_or_else(|| {
        CatalogError::InvalidCatalog(
            "role node requires a string id (e.g. role \"dispatcher\")".into(),
        )
    })?;

    let name = prop_string(node, "name").unwrap_or_else(|| id.clone());

    let type_str = require_prop_string(node, "type", &id)?;
    let role_type = RoleType::parse(&type_str).ok_or(CatalogError::UnknownValue {
        field: "role type",
        value: type_str,
    })?;

    let is_active = prop_bool(node, "active").unwrap_or(true);
    let is_default = prop_bool(node, "default").unwrap_or(false);
    let created_by = prop_string(node, "created-by");
    let created_at = match prop_string(node, "created-at") {
        Some(raw) => Some(parse_timestamp(&raw, &id)?),
        None => None,
    };

    let mut permission_ids = Vec::new();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "permissions" => permission_ids = dash_list(child),
                other => {
                    return Err(CatalogError::InvalidCatalog(format!(
                        "unexpected child `{other}` in role `{id}` (expected `permissions`)"
                    )));
                }
            }
        }
    }

    Ok(Role {
        id,
        name,
        role_type,
        permission_ids,
        is_active,
        is_default,
        created_at,
        created_by,
    })
}

fn parse_user(node: &KdlNode) -> Result<User, CatalogError> {
    let id = first_string_arg(node).ok_or_else(|| {
        CatalogError::InvalidCatalog("user node requires a string id (e.g. user \"u-100\")".into())
    })?;

    let username = require_prop_string(node, "username", &id)?;
    let email = require_prop_string(node, "email", &id)?;
    let is_active = prop_bool(node, "active").unwrap_or(true);
    let is_verified = prop_bool(node, "verified").unwrap_or(false);
    let client_id = prop_string(node, "client");

    let mut role_ids = Vec::new();
    let mut permission_ids = Vec::new();
    let mut profile = Profile::default();
    let mut settings = UserSettings::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "roles" => role_ids = dash_list(child),
                "permissions" => permission_ids = dash_list(child),
                "profile" => profile = parse_profile(child),
                "settings" => {
                    if let Some(theme) = prop_string(child, "theme") {
                        settings.theme = theme;
                    }
                    if let Some(v) = prop_bool(child, "notifications") {
                        settings.notifications = v;
                    }
                    if let Some(v) = prop_bool(child, "mfa") {
                        settings.mfa_enabled = v;
                    }
                }
                other => {
                    return Err(CatalogError::InvalidCatalog(format!(
                        "unexpected child `{other}` in user `{id}` (expected `roles`, `permissions`, `profile`, or `settings`)"
                    )));
                }
            }
        }
    }

    Ok(User {
        id,
        username,
        email,
        is_active,
        is_verified,
        role_ids,
        permission_ids,
        client_id,
        profile,
        settings,
    })
}

fn parse_profile(node: &KdlNode) -> Profile {
    let mut profile = Profile {
        first_name: prop_string(node, "first-name").unwrap_or_default(),
        last_name: prop_string(node, "last-name").unwrap_or_default(),
        department: prop_string(node, "department"),
        budget_used: prop_number(node, "budget-used").unwrap_or(0.0),
        ..Default::default()
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "allowed-regions" => profile.allowed_regions = dash_list(child),
                "allowed-vehicle-types" => profile.allowed_vehicle_types = dash_list(child),
                "allowed-customers" => profile.allowed_customers = dash_list(child),
                "blocked-customers" => profile.blocked_customers = dash_list(child),
                other => {
                    tracing::warn!("ignoring unknown profile child `{other}`");
                }
            }
        }
    }

    profile
}

fn hour_of_day(v: f64, key: &str, permission: &str) -> Result<u8, CatalogError> {
    if v.fract() == 0.0 && (0.0..=23.0).contains(&v) {
        Ok(v as u8)
    } else {
        Err(CatalogError::InvalidConstraint {
            permission: permission.to_string(),
            message: format!("`{key}` must be an hour from 0 to 23, got {v}"),
        })
    }
}

fn parse_timestamp(raw: &str, owner: &str) -> Result<DateTime<Utc>, CatalogError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            CatalogError::InvalidCatalog(format!(
                "invalid created-at timestamp `{raw}` on `{owner}`: {e}"
            ))
        })
}

// ---------- KDL access helpers ----------

/// Extract the first string argument from a KDL node.
fn first_string_arg(node: &KdlNode) -> Option<String> {
    first_value_arg(node)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

fn first_value_arg(node: &KdlNode) -> Option<&KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .map(|e| e.value())
}

fn string_arg(node: &KdlNode, permission: &str) -> Result<String, CatalogError> {
    first_string_arg(node).ok_or_else(|| CatalogError::InvalidConstraint {
        permission: permission.to_string(),
        message: format!("`{}` requires a string argument", node.name().value()),
    })
}

fn bool_arg(node: &KdlNode, permission: &str) -> Result<bool, CatalogError> {
    first_value_arg(node)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| CatalogError::InvalidConstraint {
            permission: permission.to_string(),
            message: format!("`{}` requires a boolean argument", node.name().value()),
        })
}

fn number_arg(node: &KdlNode, permission: &str) -> Result<f64, CatalogError> {
    first_value_arg(node)
        .and_then(value_as_f64)
        .ok_or_else(|| CatalogError::InvalidConstraint {
            permission: permission.to_string(),
            message: format!("`{}` requires a numeric argument", node.name().value()),
        })
}

fn prop_string(node: &KdlNode, key: &str) -> Option<String> {
    node.get(key)
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn require_prop_string(node: &KdlNode, key: &str, id: &str) -> Result<String, CatalogError> {
    prop_string(node, key).ok_or_else(|| {
        CatalogError::InvalidCatalog(format!(
            "{} `{id}` missing `{key}` property",
            node.name().value()
        ))
    })
}

fn prop_bool(node: &KdlNode, key: &str) -> Option<bool> {
    node.get(key).and_then(|e| e.value().as_bool())
}

fn prop_number(node: &KdlNode, key: &str) -> Option<f64> {
    node.get(key).and_then(|e| value_as_f64(e.value()))
}

fn require_prop_number(node: &KdlNode, key: &str, permission: &str) -> Result<f64, CatalogError> {
    prop_number(node, key).ok_or_else(|| CatalogError::InvalidConstraint {
        permission: permission.to_string(),
        message: format!(
            "`{}` missing numeric `{key}` property",
            node.name().value()
        ),
    })
}

/// KDL distinguishes integer and float literals; constraints accept both.
fn value_as_f64(v: &KdlValue) -> Option<f64> {
    v.as_f64().or_else(|| v.as_i64().map(|n| n as f64))
}

/// Extract dash-list children: nodes named "-" whose first argument is a string.
/// Example KDL:
/// ```kdl
/// permissions {
///     - "shipment-read"
///     - "shipment-update"
/// }
/// ```
fn dash_list(node: &KdlNode) -> Vec<String> {
    let Some(children) = node.children() else {
        return Vec::new();
    };
    children
        .nodes()
        .iter()
        .filter(|n| n.name().value() == "-")
        .filter_map(first_string_arg)
        .collect()
}

fn dash_list_numbers(node: &KdlNode) -> Vec<i64> {
    let Some(children) = node.children() else {
        return Vec::new();
    };
    children
        .nodes()
        .iter()
        .filter(|n| n.name().value() == "-")
        .filter_map(|n| first_value_arg(n).and_then(|v| v.as_i64()))
        .collect()
}
