use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::authz::types::PriorityLevel;

/// A point on the globe, used by the geofence constraint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// Caller-supplied situational facts for a single authorization query.
/// Every field is optional; a constraint whose field is absent is skipped
/// by the evaluator. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessContext {
    pub owner_id: Option<String>,
    pub department_id: Option<String>,
    pub client_id: Option<String>,
    pub value: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub shipment_region: Option<String>,
    pub vehicle_type: Option<String>,
    pub customer_id: Option<String>,
    pub shipment_priority: Option<PriorityLevel>,
    pub shipment_status: Option<String>,
    pub shipment_cost: Option<f64>,
    pub shipment_weight: Option<f64>,
    pub distance_km: Option<f64>,
    pub location: Option<Location>,
    pub vehicle_status: Option<String>,
    pub has_temperature_control: Option<bool>,
    pub approval_level: Option<i64>,
    pub company_id: Option<String>,
    pub provided_documents: Option<Vec<String>>,
}

impl AccessContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn department(mut self, department_id: impl Into<String>) -> Self {
        self.department_id = Some(department_id.into());
        self
    }

    pub fn client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn shipment_region(mut self, region: impl Into<String>) -> Self {
        self.shipment_region = Some(region.into());
        self
    }

    pub fn vehicle_type(mut self, vehicle_type: impl Into<String>) -> Self {
        self.vehicle_type = Some(vehicle_type.into());
        self
    }

    pub fn customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn priority(mut self, priority: PriorityLevel) -> Self {
        self.shipment_priority = Some(priority);
        self
    }

    pub fn shipment_status(mut self, status: impl Into<String>) -> Self {
        self.shipment_status = Some(status.into());
        self
    }

    pub fn shipment_cost(mut self, cost: f64) -> Self {
        self.shipment_cost = Some(cost);
        self
    }

    pub fn shipment_weight(mut self, weight: f64) -> Self {
        self.shipment_weight = Some(weight);
        self
    }

    pub fn distance_km(mut self, km: f64) -> Self {
        self.distance_km = Some(km);
        self
    }

    pub fn location(mut self, lat: f64, lng: f64) -> Self {
        self.location = Some(Location { lat, lng });
        self
    }

    pub fn vehicle_status(mut self, status: impl Into<String>) -> Self {
        self.vehicle_status = Some(status.into());
        self
    }

    pub fn temperature_control(mut self, available: bool) -> Self {
        self.has_temperature_control = Some(available);
        self
    }

    pub fn approval_level(mut self, level: i64) -> Self {
        self.approval_level = Some(level);
        self
    }

    pub fn company(mut self, company_id: impl Into<String>) -> Self {
        self.company_id = Some(company_id.into());
        self
    }

    pub fn documents<I, S>(mut self, docs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provided_documents = Some(docs.into_iter().map(Into::into).collect());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_builder_chains() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 2, 13, 0, 0).unwrap();
        let ctx = AccessContext::new()
            .owner("u-1")
            .value(250.0)
            .at(ts)
            .location(52.52, 13.4)
            .documents(["waybill", "customs"]);

        assert_eq!(ctx.owner_id.as_deref(), Some("u-1"));
        assert_eq!(ctx.value, Some(250.0));
        assert_eq!(ctx.timestamp, Some(ts));
        assert_eq!(ctx.location.unwrap().lat, 52.52);
        assert_eq!(
            ctx.provided_documents,
            Some(vec!["waybill".to_string(), "customs".to_string()])
        );
        assert!(ctx.shipment_status.is_none());
    }

    #[test]
    fn test_deserialize_camel_case_json() {
        let ctx: AccessContext = serde_json::from_str(
            r#"{"ownerId":"u-9","shipmentCost":300.0,"shipmentPriority":"urgent"}"#,
        )
        .unwrap();
        assert_eq!(ctx.owner_id.as_deref(), Some("u-9"));
        assert_eq!(ctx.shipment_cost, Some(300.0));
        assert_eq!(ctx.shipment_priority, Some(PriorityLevel::Urgent));
        assert!(ctx.location.is_none());
    }
}
