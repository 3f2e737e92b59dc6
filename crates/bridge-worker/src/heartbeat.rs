// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent heartbeat and printer assignment.
//!
//! Every tick registers this agent with the backend. Before registering,
//! the server's agent registry is consulted and its printer assignment wins
//! over the locally cached one; the register reply may update it again. On
//! service stop a final inactive heartbeat goes out, best-effort.

use tracing::debug;

use bridge_config::AgentConfig;
use bridge_core::log::LogLevel;
use bridge_core::types::{AgentRegistration, RestaurantScope};

use crate::worker::Worker;

impl Worker {
    pub(crate) async fn heartbeat(
        &self,
        config: &AgentConfig,
        scope: &RestaurantScope,
        is_active: bool,
    ) {
        let cached = {
            let state = self.state.lock().await;
            state.service.assigned_printer_id.clone()
        };

        // The server's view of the assignment wins over the cache.
        let mut printer_id = cached;
        match self.queue.list_agents(&scope.id).await {
            Ok(agents) => {
                if let Some(entry) = agents
                    .iter()
                    .find(|a| a.agent_id == config.consumer_id)
                {
                    if entry.printer_id.is_some() {
                        printer_id = entry.printer_id.clone();
                    }
                }
            }
            Err(err) => {
                debug!(%err, "agent list unavailable, keeping cached assignment");
            }
        }

        let registration = AgentRegistration {
            restaurant_id: scope.id.clone(),
            agent_id: config.consumer_id.clone(),
            printer_id: printer_id.clone(),
            device_name: config.device_name.clone(),
            app_version: self.app_version.clone(),
            is_active,
        };

        match self.queue.register_agent(&registration).await {
            Ok(assigned) => {
                let new_assignment = assigned.or(printer_id);
                let changed = {
                    let mut state = self.state.lock().await;
                    if state.service.assigned_printer_id != new_assignment {
                        state.service.assigned_printer_id = new_assignment;
                        true
                    } else {
                        false
                    }
                };
                if changed {
                    self.log(LogLevel::Info, "printer assignment updated").await;
                    self.emit_state().await;
                }
            }
            Err(err) => {
                self.log(LogLevel::Warn, format!("heartbeat failed: {err}"))
                    .await;
            }
        }
    }
}
