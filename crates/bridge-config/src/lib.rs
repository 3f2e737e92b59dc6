// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Sushiamo desktop bridge.
//!
//! Two layers: ambient [`BridgeSettings`] loaded through Figment (backend
//! endpoint, gateway bind, log level), and the operator-editable
//! [`AgentConfig`] persisted together with the session snapshot in a single
//! JSON document under the user-data directory.

pub mod loader;
pub mod model;
pub mod store;

pub use loader::{load_settings, user_data_dir, BridgeSettings};
pub use model::{AgentConfig, ConfigPatch, PersistedState};
pub use store::StateStore;
