// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Claimed print jobs and their permissive payload accessors.
//!
//! Job payloads arrive from the queue as free-form JSON. Each family keeps
//! the raw document and exposes coercing accessors instead of failing the
//! whole claim on a single malformed field.

use serde::Deserialize;
use serde_json::Value;

use crate::types::DEFAULT_DEPARTMENT;

/// A kitchen ticket job claimed from `print_claim_jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct KitchenJob {
    pub id: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub route: Option<RouteSnapshot>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl KitchenJob {
    /// Normalized department routing key.
    pub fn department_key(&self) -> String {
        self.department
            .as_deref()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DEPARTMENT.to_string())
    }
}

/// A fiscal receipt job claimed from `physical_receipt_claim_jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct FiscalJob {
    pub id: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl FiscalJob {
    /// Device route embedded in the payload.
    pub fn route(&self) -> RouteSnapshot {
        self.payload
            .get("route")
            .map(RouteSnapshot::from_value)
            .unwrap_or_default()
    }
}

/// A non-fiscal receipt job claimed from `non_fiscal_receipt_claim_jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptJob {
    pub id: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ReceiptJob {
    /// Printer route embedded in the payload.
    pub fn route(&self) -> RouteSnapshot {
        self.payload
            .get("route")
            .map(RouteSnapshot::from_value)
            .unwrap_or_default()
    }
}

/// Printer/device route snapshot carried inside a job.
///
/// Fields are coerced leniently. The port stays `None` when absent or out of
/// range so each consumer can apply its own family default (9100 for
/// printers, 8008 for fiscal devices).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteSnapshot {
    pub id: Option<String>,
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub brand: Option<String>,
    pub api_path: Option<String>,
}

impl RouteSnapshot {
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: str_field(value, "id"),
            name: str_field(value, "name"),
            host: str_field(value, "host").filter(|h| !h.is_empty()),
            port: parse_port(value.get("port")),
            brand: str_field(value, "brand").map(|b| b.to_lowercase()),
            api_path: str_field(value, "api_path"),
        }
    }
}

/// A port value kept only when it is an integer in range.
fn parse_port(value: Option<&Value>) -> Option<u16> {
    let parsed = match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    (1..=65535).contains(&parsed).then_some(parsed as u16)
}

impl<'de> Deserialize<'de> for RouteSnapshot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(RouteSnapshot::from_value(&value))
    }
}

/// Read a payload field as a trimmed string, coercing numbers.
pub fn str_field(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a payload field as a number, coercing numeric strings.
pub fn num_field(payload: &Value, key: &str) -> Option<f64> {
    match payload.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn department_key_defaults_to_cucina() {
        let job: KitchenJob = serde_json::from_value(json!({"id": "j1"})).unwrap();
        assert_eq!(job.department_key(), "cucina");

        let job: KitchenJob =
            serde_json::from_value(json!({"id": "j1", "department": "  BAR "})).unwrap();
        assert_eq!(job.department_key(), "bar");
    }

    #[test]
    fn kitchen_job_parses_snapshot_route() {
        let job: KitchenJob = serde_json::from_value(json!({
            "id": "j1",
            "department": "cucina",
            "payload": {"order_number": 42},
            "route": {"id": "p1", "host": "192.168.1.50", "port": "9100"}
        }))
        .unwrap();
        let route = job.route.unwrap();
        assert_eq!(route.id.as_deref(), Some("p1"));
        assert_eq!(route.host.as_deref(), Some("192.168.1.50"));
        assert_eq!(route.port, Some(9100));
    }

    #[test]
    fn fiscal_route_is_read_from_payload() {
        let job: FiscalJob = serde_json::from_value(json!({
            "id": "f1",
            "payload": {
                "total_amount": 12.34,
                "route": {"host": "10.0.0.10", "port": 8008, "brand": "EPSON", "api_path": "/cgi-bin/fpmate.cgi"}
            }
        }))
        .unwrap();
        let route = job.route();
        assert_eq!(route.host.as_deref(), Some("10.0.0.10"));
        assert_eq!(route.port, Some(8008));
        assert_eq!(route.brand.as_deref(), Some("epson"));
        assert_eq!(route.api_path.as_deref(), Some("/cgi-bin/fpmate.cgi"));
    }

    #[test]
    fn route_snapshot_drops_bad_port() {
        let route = RouteSnapshot::from_value(&json!({"host": "10.0.0.1", "port": "none"}));
        assert_eq!(route.port, None);
        let route = RouteSnapshot::from_value(&json!({"host": "10.0.0.1", "port": 70000}));
        assert_eq!(route.port, None);
        let route = RouteSnapshot::from_value(&json!({"host": "10.0.0.1"}));
        assert_eq!(route.port, None);
    }

    #[test]
    fn missing_route_yields_default_snapshot() {
        let job: ReceiptJob = serde_json::from_value(json!({"id": "r1", "payload": {}})).unwrap();
        assert_eq!(job.route(), RouteSnapshot::default());
        assert!(job.route().host.is_none());
    }

    #[test]
    fn field_coercions() {
        let payload = json!({"table_number": 7, "total": "12,50", "name": "  ", "flag": true});
        assert_eq!(str_field(&payload, "table_number").as_deref(), Some("7"));
        assert_eq!(num_field(&payload, "total"), Some(12.5));
        assert_eq!(str_field(&payload, "name"), None);
        assert_eq!(str_field(&payload, "flag"), None);
        assert_eq!(num_field(&payload, "missing"), None);
    }
}
