//! Constraint predicate evaluation.
//!
//! Each predicate applies only when it is configured on the permission AND
//! the matching context field is supplied; an absent context field skips
//! that predicate rather than failing it. Predicates are AND'd: the first
//! failure sinks the whole constraint set.

use chrono::{Datelike, Timelike};
use tracing::debug;

use crate::authz::context::AccessContext;
use crate::authz::types::{Constraints, Geofence, User, WorkingHours};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Evaluate every configured constraint against the context. Returns false
/// on the first failing predicate (short-circuit AND).
pub fn evaluate(constraints: &Constraints, user: &User, ctx: &AccessContext) -> bool {
    if constraints.owned_only == Some(true) {
        if let Some(owner_id) = &ctx.owner_id {
            if *owner_id != user.id {
                return fail("owned_only");
            }
        }
    }

    if constraints.department_only == Some(true) {
        if let Some(department_id) = &ctx.department_id {
            if user.profile.department.as_deref() != Some(department_id.as_str()) {
                return fail("department_only");
            }
        }
    }

    if let (Some(allowed), Some(client_id)) = (&constraints.client_restrictions, &ctx.client_id) {
        // The literal "self" switches to matching the user's own affiliation.
        let ok = if allowed.iter().any(|c| c == "self") {
            user.client_id.as_deref() == Some(client_id.as_str())
        } else {
            allowed.contains(client_id)
        };
        if !ok {
            return fail("client_restrictions");
        }
    }

    if let (Some(limit), Some(value)) = (constraints.value_limit, ctx.value) {
        if value > limit {
            return fail("value_limit");
        }
    }

    if let (Some(limit), Some(cost)) = (constraints.budget_limit, ctx.shipment_cost) {
        if user.profile.budget_used + cost > limit {
            return fail("budget_limit");
        }
    }

    if let (Some(limit), Some(weight)) = (constraints.max_weight, ctx.shipment_weight) {
        if weight > limit {
            return fail("max_weight");
        }
    }

    if let (Some(limit), Some(km)) = (constraints.max_distance, ctx.distance_km) {
        if km > limit {
            return fail("max_distance");
        }
    }

    if let (Some(max), Some(priority)) =
        (constraints.max_priority_level, ctx.shipment_priority)
    {
        if priority > max {
            return fail("max_priority_level");
        }
    }

    if let (Some(allowed), Some(status)) =
        (&constraints.allowed_statuses, &ctx.shipment_status)
    {
        if !allowed.contains(status) {
            return fail("allowed_statuses");
        }
    }

    if let (Some(hours), Some(ts)) = (&constraints.working_hours, ctx.timestamp) {
        if !within_working_hours(hours, ts) {
            return fail("working_hours");
        }
    }

    if let (Some(fence), Some(location)) = (&constraints.geofence, ctx.location) {
        let distance = haversine_km(location.lat, location.lng, fence.lat, fence.lng);
        if distance > fence.radius_km {
            return fail("geofence");
        }
    }

    if let (Some(required), Some(status)) =
        (&constraints.required_vehicle_status, &ctx.vehicle_status)
    {
        if required != status {
            return fail("required_vehicle_status");
        }
    }

    if constraints.temp_control_required == Some(true) {
        if let Some(has_temp) = ctx.has_temperature_control {
            if !has_temp {
                return fail("temp_control_required");
            }
        }
    }

    if let (Some(min), Some(level)) = (constraints.min_approval_level, ctx.approval_level) {
        if level < min {
            return fail("min_approval_level");
        }
    }

    if let (Some(allowed), Some(company_id)) =
        (&constraints.allowed_companies, &ctx.company_id)
    {
        if !allowed.contains(company_id) {
            return fail("allowed_companies");
        }
    }

    if let (Some(required), Some(provided)) =
        (&constraints.required_documents, &ctx.provided_documents)
    {
        if !required.iter().all(|doc| provided.contains(doc)) {
            return fail("required_documents");
        }
    }

    if constraints.region_restriction == Some(true) {
        if let Some(region) = &ctx.shipment_region {
            if !allow_list_permits(&user.profile.allowed_regions, region) {
                return fail("region_restriction");
            }
        }
    }

    if constraints.vehicle_type_restriction == Some(true) {
        if let Some(vehicle_type) = &ctx.vehicle_type {
            if !allow_list_permits(&user.profile.allowed_vehicle_types, vehicle_type) {
                return fail("vehicle_type_restriction");
            }
        }
    }

    if constraints.customer_restriction == Some(true) {
        if let Some(customer_id) = &ctx.customer_id {
            if user.profile.blocked_customers.contains(customer_id) {
                return fail("customer_restriction (blocked)");
            }
            if !allow_list_permits(&user.profile.allowed_customers, customer_id) {
                return fail("customer_restriction");
            }
        }
    }

    true
}

fn fail(constraint: &str) -> bool {
    debug!(constraint, "constraint failed");
    false
}

/// An empty allow-list means "no restriction"; a non-empty one requires
/// membership.
fn allow_list_permits(allowed: &[String], candidate: &str) -> bool {
    allowed.is_empty() || allowed.iter().any(|a| a == candidate)
}

fn within_working_hours(hours: &WorkingHours, ts: chrono::DateTime<chrono::Utc>) -> bool {
    // 0 = Sunday .. 6 = Saturday, matching the catalog convention.
    let day = ts.weekday().num_days_from_sunday() as u8;
    let hour = ts.hour() as u8;
    hours.days_of_week.contains(&day) && hour >= hours.start_hour && hour <= hours.end_hour
}

/// Great-circle distance in kilometers between two lat/lng points.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// True iff `location` lies within the fence radius.
pub fn within_geofence(fence: &Geofence, lat: f64, lng: f64) -> bool {
    haversine_km(lat, lng, fence.lat, fence.lng) <= fence.radius_km
}
