// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent configuration model and sanitization rules.
//!
//! Every field has an idempotent sanitizer: applying a sanitizer to its own
//! output changes nothing. The consumer id can never end up empty; it falls
//! back to `{os}-bridge-{hostname}`.

use serde::{Deserialize, Serialize};

use bridge_core::types::SessionSnapshot;

/// Maximum consumer id length.
pub const CONSUMER_ID_MAX: usize = 64;
/// Maximum device name length.
pub const DEVICE_NAME_MAX: usize = 80;
/// Poll interval bounds and default, in milliseconds.
pub const POLL_MS_MIN: u64 = 1000;
pub const POLL_MS_MAX: u64 = 10_000;
pub const POLL_MS_DEFAULT: u64 = 2500;
/// Claim batch bounds and default.
pub const CLAIM_LIMIT_MIN: u32 = 1;
pub const CLAIM_LIMIT_MAX: u32 = 20;
pub const CLAIM_LIMIT_DEFAULT: u32 = 5;

/// Persistent agent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Stable queue-consumer identity for this installation.
    #[serde(default = "fallback_consumer_id")]
    pub consumer_id: String,

    /// Human label shown in the restaurant's agent list.
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Tick interval in milliseconds.
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,

    /// Maximum jobs claimed per family per tick.
    #[serde(default = "default_claim_limit")]
    pub claim_limit: u32,

    /// Start the print service as soon as a session is synced.
    #[serde(default)]
    pub auto_start: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            consumer_id: fallback_consumer_id(),
            device_name: default_device_name(),
            poll_ms: default_poll_ms(),
            claim_limit: default_claim_limit(),
            auto_start: false,
        }
    }
}

impl AgentConfig {
    /// Apply every field sanitizer.
    pub fn sanitized(mut self) -> Self {
        self.consumer_id = sanitize_consumer_id(&self.consumer_id);
        self.device_name = sanitize_device_name(&self.device_name);
        self.poll_ms = sanitize_poll_ms(self.poll_ms as i64);
        self.claim_limit = sanitize_claim_limit(self.claim_limit as i64);
        self
    }

    /// Merge a partial update, then sanitize the result.
    pub fn merged(mut self, patch: ConfigPatch) -> Self {
        if let Some(consumer_id) = patch.consumer_id {
            self.consumer_id = consumer_id;
        }
        if let Some(device_name) = patch.device_name {
            self.device_name = device_name;
        }
        if let Some(poll_ms) = patch.poll_ms {
            self.poll_ms = sanitize_poll_ms(poll_ms);
        }
        if let Some(claim_limit) = patch.claim_limit {
            self.claim_limit = sanitize_claim_limit(claim_limit);
        }
        if let Some(auto_start) = patch.auto_start {
            self.auto_start = auto_start;
        }
        self.sanitized()
    }
}

/// Partial configuration update from the shell.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigPatch {
    #[serde(default)]
    pub consumer_id: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub poll_ms: Option<i64>,
    #[serde(default)]
    pub claim_limit: Option<i64>,
    #[serde(default)]
    pub auto_start: Option<bool>,
}

/// Lowercase, keep alphanumerics plus `._:-`, map the rest to `-`, cap the
/// length. The consumer id is never empty: an empty result falls back to
/// the machine identity.
pub fn sanitize_consumer_id(input: &str) -> String {
    let cleaned: String = input
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | ':' | '-') {
                c
            } else {
                '-'
            }
        })
        .take(CONSUMER_ID_MAX)
        .collect();
    if cleaned.is_empty() {
        fallback_consumer_id()
    } else {
        cleaned
    }
}

/// Trim and cap the device name; an empty result falls back to the default.
pub fn sanitize_device_name(input: &str) -> String {
    let cleaned: String = input.trim().chars().take(DEVICE_NAME_MAX).collect();
    if cleaned.is_empty() {
        default_device_name()
    } else {
        cleaned
    }
}

/// Clamp to [1000, 10000]; non-positive values take the default.
pub fn sanitize_poll_ms(value: i64) -> u64 {
    if value <= 0 {
        return POLL_MS_DEFAULT;
    }
    (value as u64).clamp(POLL_MS_MIN, POLL_MS_MAX)
}

/// Clamp to [1, 20]; non-positive values take the default.
pub fn sanitize_claim_limit(value: i64) -> u32 {
    if value <= 0 {
        return CLAIM_LIMIT_DEFAULT;
    }
    (value as u32).clamp(CLAIM_LIMIT_MIN, CLAIM_LIMIT_MAX)
}

/// `{os}-bridge-{hostname}`, sanitized by construction.
pub fn fallback_consumer_id() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "local".to_string());
    let raw = format!("{}-bridge-{}", std::env::consts::OS, host);
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | ':' | '-') {
                c
            } else {
                '-'
            }
        })
        .take(CONSUMER_ID_MAX)
        .collect()
}

fn default_device_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| "Sushiamo Bridge".to_string())
}

fn default_poll_ms() -> u64 {
    POLL_MS_DEFAULT
}

fn default_claim_limit() -> u32 {
    CLAIM_LIMIT_DEFAULT
}

/// The document persisted to the user-data directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub config: Option<AgentConfig>,
    #[serde(default)]
    pub session: Option<SessionSnapshot>,
}
