// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ambient settings loader using Figment for layered config merging.
//!
//! Supports the hierarchy `./bridge.toml` > `~/.config/sushiamo-bridge/bridge.toml`
//! > `/etc/sushiamo-bridge/bridge.toml` with environment variable overrides
//! via the `SUSHIAMO_` prefix. These settings cover what the shell would
//! normally inject: backend endpoint, gateway bind address, log level. The
//! operator-editable agent config lives in the persisted state store, not
//! here.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use bridge_core::BridgeError;

/// Top-level ambient settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeSettings {
    /// Cloud backend endpoint and key.
    #[serde(default)]
    pub backend: BackendSettings,

    /// Local control-surface bind address.
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            backend: BackendSettings::default(),
            gateway: GatewaySettings::default(),
            log_level: default_log_level(),
        }
    }
}

/// Backend (Supabase) endpoint settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendSettings {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    #[serde(default)]
    pub url: Option<String>,

    /// Anonymous API key sent as the `apikey` header.
    #[serde(default)]
    pub anon_key: Option<String>,
}

impl BackendSettings {
    /// Fail with a configuration error when either field is missing.
    pub fn require(&self) -> Result<(&str, &str), BridgeError> {
        match (self.url.as_deref(), self.anon_key.as_deref()) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Ok((url, key)),
            _ => Err(BridgeError::Config(
                "backend url and anon_key must be configured (backend.url / backend.anon_key)"
                    .into(),
            )),
        }
    }
}

/// Gateway bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySettings {
    #[serde(default = "default_gateway_host")]
    pub host: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    4785
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load settings from the standard hierarchy with env var overrides.
pub fn load_settings() -> Result<BridgeSettings, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BridgeSettings::default()))
        .merge(Toml::file("/etc/sushiamo-bridge/bridge.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("sushiamo-bridge/bridge.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("bridge.toml"))
        .merge(env_provider())
        .extract()
}

/// Load settings from an inline TOML string (tests and diagnostics).
pub fn load_settings_from_str(toml_content: &str) -> Result<BridgeSettings, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BridgeSettings::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load settings from a specific file path with env var overrides.
pub fn load_settings_from_path(path: &Path) -> Result<BridgeSettings, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BridgeSettings::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// `SUSHIAMO_BACKEND_ANON_KEY` must map to `backend.anon_key`, so section
/// prefixes are rewritten explicitly rather than split on every underscore.
fn env_provider() -> Env {
    Env::prefixed("SUSHIAMO_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("backend_", "backend.", 1)
            .replacen("gateway_", "gateway.", 1);
        mapped.into()
    })
}

/// The user-data directory holding the persisted state document.
pub fn user_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("sushiamo-bridge"))
        .unwrap_or_else(|| PathBuf::from("."))
}
