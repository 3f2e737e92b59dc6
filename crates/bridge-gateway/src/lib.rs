// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shell-facing HTTP gateway for the Sushiamo desktop bridge.
//!
//! Request/response control operations plus the `printer-state` and
//! `printer-log` SSE push streams.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{router, start_server, GatewayState};
