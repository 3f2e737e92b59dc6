// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Sushiamo desktop bridge.

use thiserror::Error;

/// Maximum length of an error message forwarded in ack metadata.
pub const ERROR_EXCERPT_MAX: usize = 500;

/// Session failure classification surfaced to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorCode {
    /// No saved session snapshot is available to restore from.
    Absent,
    /// The saved snapshot was rejected by the backend on refresh.
    Invalid,
}

impl SessionErrorCode {
    /// Wire-level error code string.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionErrorCode::Absent => "SESSION_ABSENT",
            SessionErrorCode::Invalid => "SESSION_INVALID",
        }
    }
}

/// The primary error type used across the bridge workspace.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration errors (missing backend URL/key, invalid settings file).
    #[error("configuration error: {0}")]
    Config(String),

    /// Session restore/refresh failures.
    #[error("session error: {}", .0.as_str())]
    Session(SessionErrorCode),

    /// Backend RPC or table-read errors.
    #[error("backend error: {message}")]
    Backend {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The backend reports a specific RPC function as missing.
    ///
    /// Flips the per-family availability flag; the family is skipped for the
    /// rest of the service run.
    #[error("backend function not available: {function}")]
    RpcMissing { function: String },

    /// Printer or fiscal-device delivery errors. The message keeps the
    /// original socket/HTTP error text so the retry policy can match it.
    #[error("{0}")]
    Transport(String),

    /// No usable printer host could be resolved for a kitchen job.
    #[error("no printer host resolved")]
    NoPrinterHost,

    /// A fiscal operation was requested without a device host.
    #[error("fiscal device host missing")]
    FiscalHostMissing,

    /// The worker is not in a state to service the request.
    #[error("print worker unavailable")]
    WorkerUnavailable,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Operational error code for shell-facing responses, when one exists.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            BridgeError::Session(code) => Some(code.as_str()),
            BridgeError::NoPrinterHost => Some("NO_PRINTER_HOST"),
            BridgeError::FiscalHostMissing => Some("PHYSICAL_RT_HOST_MISSING"),
            BridgeError::WorkerUnavailable => Some("PRINT_WORKER_UNAVAILABLE"),
            _ => None,
        }
    }
}

/// Truncate an error message to the ack-metadata limit.
pub fn truncate_error(message: &str) -> String {
    if message.len() <= ERROR_EXCERPT_MAX {
        return message.to_string();
    }
    let mut end = ERROR_EXCERPT_MAX;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operational_codes_map() {
        assert_eq!(
            BridgeError::Session(SessionErrorCode::Absent).code(),
            Some("SESSION_ABSENT")
        );
        assert_eq!(
            BridgeError::Session(SessionErrorCode::Invalid).code(),
            Some("SESSION_INVALID")
        );
        assert_eq!(BridgeError::NoPrinterHost.code(), Some("NO_PRINTER_HOST"));
        assert_eq!(
            BridgeError::FiscalHostMissing.code(),
            Some("PHYSICAL_RT_HOST_MISSING")
        );
        assert_eq!(
            BridgeError::WorkerUnavailable.code(),
            Some("PRINT_WORKER_UNAVAILABLE")
        );
        assert_eq!(BridgeError::Config("x".into()).code(), None);
    }

    #[test]
    fn transport_error_keeps_original_text() {
        let err = BridgeError::Transport("ECONNRESET by peer".into());
        assert_eq!(err.to_string(), "ECONNRESET by peer");
    }

    #[test]
    fn truncate_error_caps_at_limit() {
        let long = "x".repeat(ERROR_EXCERPT_MAX + 100);
        assert_eq!(truncate_error(&long).len(), ERROR_EXCERPT_MAX);
        assert_eq!(truncate_error("short"), "short");
    }

    #[test]
    fn truncate_error_respects_char_boundaries() {
        let mut long = "è".repeat(ERROR_EXCERPT_MAX);
        long.push_str("tail");
        let truncated = truncate_error(&long);
        assert!(truncated.len() <= ERROR_EXCERPT_MAX);
        assert!(truncated.chars().all(|c| c == 'è'));
    }
}
