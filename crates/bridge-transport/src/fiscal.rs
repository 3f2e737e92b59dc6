// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP POST client for fiscal (RT) devices.
//!
//! A response counts as success only when the status is 2xx AND the body
//! carries none of the device failure keywords. On success the receipt id is
//! pulled from the body with loose `name=value` matching; callers fall back
//! to a synthetic id when nothing matches.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use bridge_core::{truncate_error, BridgeError};

use crate::retry::{request_error_text, with_retry};

/// Timeout for production receipt POSTs.
pub const FISCAL_TIMEOUT: Duration = Duration::from_secs(20);
/// Timeout for connectivity-test POSTs.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Receipt-id keys probed in order.
const RECEIPT_ID_KEYS: [&str; 3] = ["receipt_id", "document_number", "progressive_number"];

fn failure_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(error|fault|ko)\b").expect("static regex"))
}

/// Raw device response.
#[derive(Debug, Clone)]
pub struct FiscalResponse {
    pub status: u16,
    pub body: String,
}

impl FiscalResponse {
    /// 2xx AND no failure keyword in the body.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && !failure_keyword_re().is_match(&self.body)
    }

    /// First receipt id found, probing `receipt_id`, `document_number`,
    /// `progressive_number` in order against loose `name=value` patterns.
    pub fn receipt_id(&self) -> Option<String> {
        extract_receipt_id(&self.body)
    }

    /// Body excerpt for failure acks, capped at the metadata limit.
    pub fn error_excerpt(&self) -> String {
        truncate_error(&format!("HTTP {}: {}", self.status, self.body.trim()))
    }
}

/// Match `key = value`, `key: "value"`, `"key":"value"`, attribute form, etc.
pub fn extract_receipt_id(body: &str) -> Option<String> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = RES.get_or_init(|| {
        RECEIPT_ID_KEYS
            .iter()
            .map(|key| {
                Regex::new(&format!(
                    r#"(?i){key}["']?\s*[:=]\s*["']?([A-Za-z0-9_\-./]+)"#
                ))
                .expect("static regex")
            })
            .collect()
    });
    for pattern in patterns {
        if let Some(caps) = pattern.captures(body) {
            let id = caps[1].trim_matches(|c| c == '"' || c == '\'').to_string();
            if !id.is_empty() {
                return Some(id);
            }
        }
    }
    None
}

/// HTTP client for FPMate documents.
#[derive(Debug, Clone)]
pub struct FiscalClient {
    client: reqwest::Client,
}

impl FiscalClient {
    /// Per-request timeouts are passed at call sites, so the client itself
    /// carries none.
    pub fn new() -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| BridgeError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// POST one XML document. A single attempt; see [`post_with_retry`]
    /// for the retried production path.
    pub async fn post_document(
        &self,
        host: &str,
        port: u16,
        api_path: &str,
        xml: &str,
        timeout: Duration,
    ) -> Result<FiscalResponse, BridgeError> {
        let path = normalize_api_path(api_path);
        let url = format!("http://{host}:{port}{path}");

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .header("content-type", "application/xml; charset=utf-8")
            .body(xml.to_string())
            .send()
            .await
            .map_err(|e| BridgeError::Transport(request_error_text(&e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| BridgeError::Transport(request_error_text(&e)))?;
        debug!(url, status, "fiscal response received");
        Ok(FiscalResponse { status, body })
    }

    /// POST with the local retry policy applied to transport failures.
    /// Remote rejections (bad status, failure keywords) come back as an
    /// `Ok` response for the caller to classify; they are never retried.
    pub async fn post_with_retry(
        &self,
        host: &str,
        port: u16,
        api_path: &str,
        xml: &str,
        timeout: Duration,
    ) -> Result<FiscalResponse, BridgeError> {
        with_retry("fiscal-post", |_| {
            self.post_document(host, port, api_path, xml, timeout)
        })
        .await
    }
}

/// Empty paths collapse to `/`; missing leading slashes are added.
fn normalize_api_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
