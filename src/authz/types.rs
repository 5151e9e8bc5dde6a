use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of object being protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Vehicle,
    Document,
    Cargo,
    Shipment,
    Route,
    User,
    Setting,
    Invoice,
    Maintenance,
    Report,
    Driver,
    Client,
}

impl ResourceType {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "vehicle" => Self::Vehicle,
            "document" => Self::Document,
            "cargo" => Self::Cargo,
            "shipment" => Self::Shipment,
            "route" => Self::Route,
            "user" => Self::User,
            "setting" => Self::Setting,
            "invoice" => Self::Invoice,
            "maintenance" => Self::Maintenance,
            "report" => Self::Report,
            "driver" => Self::Driver,
            "client" => Self::Client,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vehicle => "vehicle",
            Self::Document => "document",
            Self::Cargo => "cargo",
            Self::Shipment => "shipment",
            Self::Route => "route",
            Self::User => "user",
            Self::Setting => "setting",
            Self::Invoice => "invoice",
            Self::Maintenance => "maintenance",
            Self::Report => "report",
            Self::Driver => "driver",
            Self::Client => "client",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation attempted on a resource. `Manage` subsumes every other action
/// on the same resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    Create,
    Read,
    Update,
    Delete,
    Manage,
}

impl PermissionAction {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "create" => Self::Create,
            "read" => Self::Read,
            "update" => Self::Update,
            "delete" => Self::Delete,
            "manage" => Self::Manage,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Manage => "manage",
        }
    }
}

impl std::fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in role kinds. `SuperAdmin` bypasses all permission and constraint
/// checks in the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleType {
    SuperAdmin,
    Admin,
    Manager,
    Dispatcher,
    Driver,
    Client,
}

impl RoleType {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "super_admin" => Self::SuperAdmin,
            "admin" => Self::Admin,
            "manager" => Self::Manager,
            "dispatcher" => Self::Dispatcher,
            "driver" => Self::Driver,
            "client" => Self::Client,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Dispatcher => "dispatcher",
            Self::Driver => "driver",
            Self::Client => "client",
        }
    }
}

impl std::fmt::Display for RoleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shipment priority, ordered from least to most urgent. The derived `Ord`
/// follows declaration order, which the `max_priority_level` constraint
/// relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Standard,
    Express,
    Urgent,
    Critical,
}

impl PriorityLevel {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "standard" => Self::Standard,
            "express" => Self::Express,
            "urgent" => Self::Urgent,
            "critical" => Self::Critical,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Express => "express",
            Self::Urgent => "urgent",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------- Catalog records ----------

/// A subject from the demo user directory. Canonical shape: every nested
/// field has a default, so a sparse catalog entry deserializes into a
/// fully-populated record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub role_ids: Vec<String>,
    /// Directly-granted permission ids, merged with role-derived ones.
    #[serde(default)]
    pub permission_ids: Vec<String>,
    /// Client affiliation, matched by the `client_restrictions` literal "self".
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub settings: UserSettings,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub department: Option<String>,
    /// Allow-list consulted when a permission sets `region_restriction`.
    pub allowed_regions: Vec<String>,
    pub allowed_vehicle_types: Vec<String>,
    pub allowed_customers: Vec<String>,
    /// A match here fails `customer_restriction` immediately.
    pub blocked_customers: Vec<String>,
    /// Running counter summed with the requested cost by `budget_limit`.
    pub budget_used: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub theme: String,
    pub notifications: bool,
    pub mfa_enabled: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            notifications: true,
            mfa_enabled: false,
        }
    }
}

/// Immutable catalog role. Not created or destroyed at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
    pub role_type: RoleType,
    #[serde(default)]
    pub permission_ids: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Immutable catalog permission, optionally narrowed by constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: String,
    pub resource: ResourceType,
    pub action: PermissionAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
}

impl Permission {
    /// Whether this permission covers the requested resource/action pair.
    /// A stored `Manage` action covers every action on its resource.
    pub fn covers(&self, resource: ResourceType, action: PermissionAction) -> bool {
        self.resource == resource
            && (self.action == action || self.action == PermissionAction::Manage)
    }
}

// ---------- Constraints ----------

/// Weekly availability window. Days use 0 = Sunday .. 6 = Saturday; the
/// hour bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkingHours {
    pub days_of_week: Vec<u8>,
    pub start_hour: u8,
    pub end_hour: u8,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            days_of_week: vec![0, 1, 2, 3, 4, 5, 6],
            start_hour: 0,
            end_hour: 23,
        }
    }
}

/// Circular area around a center point, radius in kilometers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geofence {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: f64,
}

/// Named optional predicates narrowing a permission's applicability. A
/// constraint only applies when both it is configured and the corresponding
/// context field is supplied; an absent context field skips the check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Constraints {
    pub owned_only: Option<bool>,
    pub department_only: Option<bool>,
    /// Client ids, or the literal "self" to match the user's own affiliation.
    pub client_restrictions: Option<Vec<String>>,
    pub value_limit: Option<f64>,
    pub budget_limit: Option<f64>,
    pub max_weight: Option<f64>,
    pub max_distance: Option<f64>,
    pub max_priority_level: Option<PriorityLevel>,
    pub allowed_statuses: Option<Vec<String>>,
    pub working_hours: Option<WorkingHours>,
    pub geofence: Option<Geofence>,
    pub required_vehicle_status: Option<String>,
    pub temp_control_required: Option<bool>,
    pub min_approval_level: Option<i64>,
    pub allowed_companies: Option<Vec<String>>,
    pub required_documents: Option<Vec<String>>,
    /// Activates the profile `allowed_regions` allow-list.
    pub region_restriction: Option<bool>,
    /// Activates the profile `allowed_vehicle_types` allow-list.
    pub vehicle_type_restriction: Option<bool>,
    /// Activates the profile customer allow/block lists.
    pub customer_restriction: Option<bool>,
}

impl Constraints {
    /// True when no predicate is configured at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
