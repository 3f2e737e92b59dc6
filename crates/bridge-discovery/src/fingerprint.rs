// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP fingerprinting of fiscal devices.
//!
//! A GET on `/` within the probe timeout; the first 3000 body characters
//! plus the `Server` and `X-Powered-By` headers are matched against known
//! vendor keywords. A positive match overrides the port-based brand guess.

use std::time::Duration;

use tracing::trace;

/// Body characters considered for keyword matching.
const BODY_SNIPPET_MAX: usize = 3000;

/// Epson devices answer under several product names.
const EPSON_KEYWORDS: [&str; 3] = ["epson", "fpmate", "fp90"];
/// Vendors whose keyword is the brand name itself, probed in order.
const VENDOR_KEYWORDS: [&str; 4] = ["custom", "olivetti", "axon", "rch"];

/// Match a haystack (already lowercased) against the vendor keyword table.
pub fn match_brand(haystack: &str) -> Option<&'static str> {
    if EPSON_KEYWORDS.iter().any(|k| haystack.contains(k)) {
        return Some("epson");
    }
    VENDOR_KEYWORDS
        .into_iter()
        .find(|k| haystack.contains(k))
}

/// Fingerprint a device by fetching `/` and matching vendor keywords.
/// Any failure (unreachable, non-HTTP, read error) yields `None`.
pub async fn fingerprint_brand(
    client: &reqwest::Client,
    host: &str,
    port: u16,
    timeout: Duration,
) -> Option<&'static str> {
    let url = format!("http://{host}:{port}/");
    let response = client.get(&url).timeout(timeout).send().await.ok()?;

    let server = header_value(&response, "server");
    let powered_by = header_value(&response, "x-powered-by");
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(BODY_SNIPPET_MAX).collect();

    let haystack = format!("{server} {powered_by} {snippet}").to_lowercase();
    let brand = match_brand(&haystack);
    trace!(url, ?brand, "fingerprint result");
    brand
}

fn header_value(response: &reqwest::Response, name: &str) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
