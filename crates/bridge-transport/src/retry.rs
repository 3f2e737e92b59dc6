// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local retry policy shared by the TCP and fiscal transports.
//!
//! At most two attempts per delivery; the second attempt happens only when
//! the first failure message matches the transient-network set. Remote
//! rejections are never retried locally.

use std::error::Error as _;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use bridge_core::BridgeError;

/// Maximum delivery attempts.
pub const MAX_ATTEMPTS: u32 = 2;

/// Pause between the two attempts.
pub const RETRY_PAUSE: Duration = Duration::from_millis(500);

/// Transient-network markers, matched case-insensitively.
const RETRIABLE_MARKERS: [&str; 5] = [
    "timeout",
    "econnreset",
    "ehostunreach",
    "econnrefused",
    "epipe",
];

/// Whether an error message indicates a transient network failure.
pub fn is_retriable(message: &str) -> bool {
    let lower = message.to_lowercase();
    RETRIABLE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Run `op` with the local retry policy. The closure receives the 1-based
/// attempt number.
pub async fn with_retry<T, F, Fut>(what: &str, op: F) -> Result<T, BridgeError>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T, BridgeError>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let message = err.to_string();
                if attempt < MAX_ATTEMPTS && is_retriable(&message) {
                    warn!(what, attempt, error = %message, "transient delivery error, retrying");
                    tokio::time::sleep(RETRY_PAUSE).await;
                    attempt += 1;
                    continue;
                }
                return Err(err);
            }
        }
    }
}

/// Error text for an I/O failure, prefixed with the errno-style code the
/// retry policy matches on.
pub fn io_error_text(err: &std::io::Error) -> String {
    use std::io::ErrorKind;
    let code = match err.kind() {
        ErrorKind::ConnectionReset => Some("ECONNRESET"),
        ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
        ErrorKind::ConnectionAborted => Some("ECONNRESET"),
        ErrorKind::HostUnreachable => Some("EHOSTUNREACH"),
        ErrorKind::NetworkUnreachable => Some("EHOSTUNREACH"),
        ErrorKind::BrokenPipe => Some("EPIPE"),
        ErrorKind::TimedOut => Some("timeout"),
        _ => None,
    };
    match code {
        Some(code) => format!("{code}: {err}"),
        None => err.to_string(),
    }
}

/// Error text for a reqwest failure, surfacing the underlying socket code
/// when one exists so the retry policy can match it.
pub fn request_error_text(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return format!("timeout: {err}");
    }
    let mut source: Option<&(dyn std::error::Error + 'static)> = err.source();
    while let Some(inner) = source {
        if let Some(io_err) = inner.downcast_ref::<std::io::Error>() {
            return io_error_text(io_err);
        }
        source = inner.source();
    }
    err.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn retriable_markers_match_case_insensitively() {
        assert!(is_retriable("ECONNRESET: connection reset by peer"));
        assert!(is_retriable("Timeout stampante"));
        assert!(is_retriable("socket EPIPE while writing"));
        assert!(is_retriable("EHOSTUNREACH"));
        assert!(is_retriable("econnrefused"));
        assert!(!is_retriable("printer replied with fault"));
        assert!(!is_retriable("HTTP 500"));
    }

    #[tokio::test]
    async fn transient_error_is_retried_once() {
        let attempts = AtomicU32::new(0);
        let result = with_retry("test", |_| {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(BridgeError::Transport("ECONNRESET".into()))
                } else {
                    Ok("delivered")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "delivered");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retriable_error_makes_one_attempt() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = with_retry("test", |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(BridgeError::Transport("device replied KO".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempts_are_capped_at_two() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = with_retry("test", |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(BridgeError::Transport("timeout".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn io_error_text_prefixes_code() {
        let err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(io_error_text(&err).starts_with("ECONNRESET"));
        let err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        assert!(io_error_text(&err).starts_with("EPIPE"));
        let err = std::io::Error::other("odd");
        assert_eq!(io_error_text(&err), "odd");
    }
}
