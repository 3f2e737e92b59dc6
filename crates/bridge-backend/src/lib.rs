// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloud backend access for the Sushiamo desktop bridge.
//!
//! [`SupabaseClient`] implements the core `PrintQueue` and `SessionBackend`
//! traits over REST/RPC; [`SessionManager`] layers session restore and
//! restaurant-scope resolution on top.

pub mod client;
pub mod session;

pub use client::SupabaseClient;
pub use session::{EnsureOutcome, SessionManager};
