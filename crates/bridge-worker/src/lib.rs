// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Print worker core for the Sushiamo desktop bridge.
//!
//! A single [`Worker`] per process claims jobs from the cloud queue, routes
//! and renders them, delivers over raw TCP or HTTP, acks outcomes, and
//! heartbeats the backend. The control surface exposes the operations the
//! desktop shell drives; state snapshots and log rows are pushed over the
//! broadcast channels.

pub mod heartbeat;
pub mod pump;
pub mod routes;
pub mod state;
pub mod worker;

pub use state::{Broadcast, PublicState};
pub use worker::{RtTestReport, RtTestRequest, Worker};
