// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery transports for the Sushiamo desktop bridge.
//!
//! Raw TCP for thermal printers, HTTP POST for fiscal devices, both behind
//! the same two-attempt local retry policy.

pub mod fiscal;
pub mod retry;
pub mod tcp;

pub use fiscal::{FiscalClient, FiscalResponse, FISCAL_TIMEOUT, TEST_TIMEOUT};
pub use retry::{is_retriable, with_retry};
pub use tcp::{deliver, send_raw, TCP_TIMEOUT};
