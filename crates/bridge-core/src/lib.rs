// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Sushiamo desktop bridge.
//!
//! Provides the error type, the domain types shared across the workspace
//! (jobs, printers, routes, stats, discovery records), the backend adapter
//! traits, and the bounded log ring.

pub mod error;
pub mod jobs;
pub mod log;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{truncate_error, BridgeError, SessionErrorCode};
pub use traits::{PrintQueue, SessionBackend};
pub use types::{JobOutcome, LiveRoutes, PrinterTarget, SessionSnapshot};
