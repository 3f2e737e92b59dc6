// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the bridge workspace.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Default raw-TCP printer port.
pub const DEFAULT_PRINTER_PORT: u16 = 9100;

/// Department routing key used when a kitchen job carries none.
pub const DEFAULT_DEPARTMENT: &str = "cucina";

/// Persisted backend session tokens.
///
/// Two snapshots are the same session iff all three fields match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds; `None` when the backend did not report an expiry.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl SessionSnapshot {
    /// A snapshot is usable only when both tokens are non-empty.
    pub fn is_usable(&self) -> bool {
        !self.access_token.trim().is_empty() && !self.refresh_token.trim().is_empty()
    }
}

/// Signed-in backend user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: Option<String>,
}

/// Privilege role within a restaurant, ordered owner < admin < manager < staff.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RestaurantRole {
    Owner,
    Admin,
    Manager,
    Staff,
}

impl RestaurantRole {
    /// Rank used for scope resolution; lower is more privileged.
    pub fn rank(self) -> u8 {
        match self {
            RestaurantRole::Owner => 0,
            RestaurantRole::Admin => 1,
            RestaurantRole::Manager => 2,
            RestaurantRole::Staff => 3,
        }
    }
}

/// The restaurant the signed-in user operates under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantScope {
    pub id: String,
    pub name: String,
    pub city: Option<String>,
    pub role: RestaurantRole,
}

/// In-memory authentication state, re-resolved on every service start.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuthState {
    pub user: Option<UserInfo>,
    pub scope: Option<RestaurantScope>,
}

impl AuthState {
    pub fn clear(&mut self) {
        self.user = None;
        self.scope = None;
    }
}

/// Restaurant row as read from the backend table.
#[derive(Debug, Clone, Deserialize)]
pub struct RestaurantSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub settings: Option<Value>,
}

/// Role membership row from the backend `user_roles` table.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleMembership {
    pub restaurant_id: String,
    pub role: RestaurantRole,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A printer from the restaurant's live settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivePrinter {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub departments: Vec<String>,
}

fn default_port() -> u16 {
    DEFAULT_PRINTER_PORT
}

fn default_enabled() -> bool {
    true
}

/// Index over the live printer list, built once per tick.
#[derive(Debug, Clone, Default)]
pub struct LiveRoutes {
    pub by_id: HashMap<String, LivePrinter>,
    /// Department (lowercased) to printer id; first enabled printer wins.
    pub by_department: HashMap<String, String>,
    pub default_printer_id: Option<String>,
}

impl LiveRoutes {
    /// Build the index from the `settings.printing` object of a restaurant row.
    ///
    /// Missing or malformed settings yield an empty index; individual
    /// unparseable printers are skipped.
    pub fn from_printing_settings(settings: Option<&Value>) -> Self {
        let printing = settings
            .and_then(|s| s.get("printing"))
            .cloned()
            .unwrap_or(Value::Null);

        let default_printer_id = printing
            .get("default_printer_id")
            .and_then(json_id)
            .filter(|s| !s.is_empty());

        let mut routes = LiveRoutes {
            default_printer_id,
            ..Default::default()
        };

        let Some(entries) = printing.get("printers").and_then(Value::as_array) else {
            return routes;
        };

        for entry in entries {
            let Some(id) = entry.get("id").and_then(json_id).filter(|s| !s.is_empty()) else {
                continue;
            };
            let printer = LivePrinter {
                id: id.clone(),
                name: entry
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                host: entry
                    .get("host")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
                port: sanitize_printer_port(entry.get("port")),
                enabled: entry.get("enabled").and_then(Value::as_bool).unwrap_or(true),
                departments: entry
                    .get("departments")
                    .and_then(Value::as_array)
                    .map(|a| {
                        a.iter()
                            .filter_map(Value::as_str)
                            .map(|d| d.trim().to_lowercase())
                            .filter(|d| !d.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
            };

            if printer.enabled {
                for dept in &printer.departments {
                    routes
                        .by_department
                        .entry(dept.clone())
                        .or_insert_with(|| id.clone());
                }
            }
            routes.by_id.insert(id, printer);
        }

        routes
    }
}

/// Coerce a JSON id field (string or number) into a string.
fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Resolved delivery target for a kitchen job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrinterTarget {
    pub id: Option<String>,
    pub name: Option<String>,
    pub host: String,
    pub port: u16,
}

/// Collapse any non-integer or out-of-range port value to 9100.
pub fn sanitize_printer_port(value: Option<&Value>) -> u16 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match parsed {
        Some(p) if (1..=65535).contains(&p) => p as u16,
        _ => DEFAULT_PRINTER_PORT,
    }
}

/// Per-run counters, reset on every service start.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuntimeStats {
    pub claimed: u64,
    pub printed: u64,
    pub failed: u64,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// One-shot backend RPC availability flags.
///
/// Flipped false on a "function not found" error and never re-tested until
/// the next service run.
#[derive(Debug, Clone, Serialize)]
pub struct RpcAvailability {
    pub physical_receipt: bool,
    pub non_fiscal_receipt: bool,
}

impl Default for RpcAvailability {
    fn default() -> Self {
        Self {
            physical_receipt: true,
            non_fiscal_receipt: true,
        }
    }
}

/// Connection class of the interface a discovery target was enumerated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Ethernet,
    Wifi,
    Unknown,
}

/// Classify an interface by its name.
///
/// Wireless keywords are checked first so `wlan0` does not match the bare
/// `lan` substring.
pub fn classify_interface(name: &str) -> ConnectionType {
    let lower = name.to_lowercase();
    if ["wifi", "wi-fi", "wireless", "wlan"]
        .iter()
        .any(|k| lower.contains(k))
    {
        ConnectionType::Wifi
    } else if ["ethernet", "lan", "eth"].iter().any(|k| lower.contains(k)) {
        ConnectionType::Ethernet
    } else {
        ConnectionType::Unknown
    }
}

/// A thermal printer found by the LAN scan.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredPrinter {
    pub host: String,
    pub port: u16,
    pub connection_type: ConnectionType,
    pub interface_name: String,
    pub interface_ip: String,
    pub label: String,
}

/// A fiscal device found by the LAN scan.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredFiscalDevice {
    pub host: String,
    pub port: u16,
    pub brand: String,
    pub api_path: String,
    pub connection_type: ConnectionType,
    pub interface_name: String,
    pub interface_ip: String,
    pub source: &'static str,
    pub label: String,
}

/// Heartbeat registration sent once per tick.
#[derive(Debug, Clone)]
pub struct AgentRegistration {
    pub restaurant_id: String,
    pub agent_id: String,
    pub printer_id: Option<String>,
    pub device_name: String,
    pub app_version: String,
    pub is_active: bool,
}

/// Agent row from the server's registry.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentInfo {
    pub agent_id: String,
    #[serde(default)]
    pub printer_id: Option<String>,
}

/// Outcome reported in a job completion ack.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub success: bool,
    /// Truncated to 500 chars before leaving the process.
    pub error: Option<String>,
    pub meta: Value,
}

impl JobOutcome {
    pub fn success(meta: Value) -> Self {
        Self {
            success: true,
            error: None,
            meta,
        }
    }

    pub fn failure(error: impl Into<String>, meta: Value) -> Self {
        Self {
            success: false,
            error: Some(crate::error::truncate_error(&error.into())),
            meta,
        }
    }
}
