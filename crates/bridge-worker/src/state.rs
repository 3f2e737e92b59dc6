// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker-owned mutable state and the broadcast channels feeding the shell.

use serde::Serialize;
use tokio::sync::broadcast;

use bridge_config::AgentConfig;
use bridge_core::log::{LogBuffer, LogRow};
use bridge_core::types::{
    AuthState, RestaurantScope, RpcAvailability, RuntimeStats, SessionSnapshot, UserInfo,
};

/// Service-run flags.
#[derive(Debug, Clone, Default)]
pub struct ServiceState {
    pub running: bool,
    /// Printer id the server assigned to this agent, if any.
    pub assigned_printer_id: Option<String>,
}

/// Everything the worker mutates, guarded by a single lock.
#[derive(Debug)]
pub struct WorkerState {
    pub config: AgentConfig,
    pub session: Option<SessionSnapshot>,
    pub stats: RuntimeStats,
    pub rpc: RpcAvailability,
    pub logs: LogBuffer,
    pub service: ServiceState,
}

impl WorkerState {
    pub fn new(config: AgentConfig, session: Option<SessionSnapshot>) -> Self {
        Self {
            config,
            session,
            stats: RuntimeStats::default(),
            rpc: RpcAvailability::default(),
            logs: LogBuffer::default(),
            service: ServiceState::default(),
        }
    }
}

/// Deep-copied snapshot handed to the shell; never aliases worker internals.
#[derive(Debug, Clone, Serialize)]
pub struct PublicState {
    pub config: AgentConfig,
    pub has_session: bool,
    pub user: Option<UserInfo>,
    pub restaurant: Option<RestaurantScope>,
    pub service_running: bool,
    pub assigned_printer_id: Option<String>,
    pub stats: RuntimeStats,
    pub physical_receipt_rpc_available: bool,
    pub non_fiscal_receipt_rpc_available: bool,
    pub app_version: String,
}

impl PublicState {
    pub fn compose(state: &WorkerState, auth: &AuthState, app_version: &str) -> Self {
        Self {
            config: state.config.clone(),
            has_session: state.session.is_some(),
            user: auth.user.clone(),
            restaurant: auth.scope.clone(),
            service_running: state.service.running,
            assigned_printer_id: state.service.assigned_printer_id.clone(),
            stats: state.stats.clone(),
            physical_receipt_rpc_available: state.rpc.physical_receipt,
            non_fiscal_receipt_rpc_available: state.rpc.non_fiscal_receipt,
            app_version: app_version.to_string(),
        }
    }
}

/// Channel capacity for the two push streams.
const BROADCAST_CAPACITY: usize = 64;

/// The `printer-state` and `printer-log` push streams.
#[derive(Debug, Clone)]
pub struct Broadcast {
    state_tx: broadcast::Sender<PublicState>,
    log_tx: broadcast::Sender<LogRow>,
}

impl Default for Broadcast {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcast {
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (log_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { state_tx, log_tx }
    }

    /// Push a state snapshot; dropped silently when nobody listens.
    pub fn publish_state(&self, state: PublicState) {
        let _ = self.state_tx.send(state);
    }

    pub fn publish_log(&self, row: LogRow) {
        let _ = self.log_tx.send(row);
    }

    pub fn subscribe_state(&self) -> broadcast::Receiver<PublicState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_log(&self) -> broadcast::Receiver<LogRow> {
        self.log_tx.subscribe()
    }
}
