// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The print worker and its shell-facing control surface.
//!
//! One `Worker` per process owns all mutable state. Control operations take
//! the state lock for their whole duration; every mutation of the public
//! snapshot is pushed on the `printer-state` stream, and log rows go out on
//! `printer-log` as they are appended.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use bridge_backend::SessionManager;
use bridge_config::{ConfigPatch, PersistedState, StateStore};
use bridge_core::log::LogLevel;
use bridge_core::types::{DiscoveredFiscalDevice, DiscoveredPrinter, SessionSnapshot};
use bridge_core::{truncate_error, BridgeError, PrintQueue, SessionBackend};
use bridge_print::render_test_document;
use bridge_transport::{FiscalClient, TEST_TIMEOUT};

use crate::state::{Broadcast, PublicState, WorkerState};

/// Default FPMate endpoint used when a test request does not name one.
const DEFAULT_RT_API_PATH: &str = "/cgi-bin/fpmate.cgi";
/// Default fiscal device port.
const DEFAULT_RT_PORT: u16 = 8008;

/// Running service task: cancel stops scheduling, join waits out the
/// in-flight tick.
struct ServiceTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// The long-running print worker.
pub struct Worker {
    pub(crate) queue: Arc<dyn PrintQueue>,
    pub(crate) sessions: SessionManager,
    pub(crate) store: StateStore,
    pub(crate) fiscal: FiscalClient,
    pub(crate) state: Mutex<WorkerState>,
    pub(crate) broadcast: Broadcast,
    /// Re-entry guard: at most one tick runs at a time.
    pub(crate) tick_guard: Mutex<()>,
    service_task: Mutex<Option<ServiceTask>>,
    pub(crate) app_version: String,
}

impl Worker {
    /// Build a worker from the persisted state document. A saved session is
    /// adopted into the backend client right away so the first tick can
    /// reuse it.
    pub async fn new(
        queue: Arc<dyn PrintQueue>,
        session_backend: Arc<dyn SessionBackend>,
        store: StateStore,
        app_version: impl Into<String>,
    ) -> Result<Self, BridgeError> {
        let persisted = store.load().await;
        let config = persisted.config.unwrap_or_default().sanitized();
        let session = persisted.session.filter(SessionSnapshot::is_usable);
        if let Some(snapshot) = &session {
            session_backend.adopt_session(snapshot).await;
        }

        Ok(Self {
            queue,
            sessions: SessionManager::new(session_backend),
            store,
            fiscal: FiscalClient::new()?,
            state: Mutex::new(WorkerState::new(config, session)),
            broadcast: Broadcast::new(),
            tick_guard: Mutex::new(()),
            service_task: Mutex::new(None),
            app_version: app_version.into(),
        })
    }

    pub fn broadcast(&self) -> &Broadcast {
        &self.broadcast
    }

    /// Current public snapshot.
    pub async fn public_state(&self) -> PublicState {
        let auth = self.sessions.auth_state().await;
        let state = self.state.lock().await;
        PublicState::compose(&state, &auth, &self.app_version)
    }

    /// The buffered log rows, oldest first.
    pub async fn logs(&self) -> Vec<bridge_core::log::LogRow> {
        self.state.lock().await.logs.snapshot()
    }

    /// Append a log row to the ring, mirror it to tracing, push it on the
    /// log stream.
    pub(crate) async fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => info!(target: "bridge_worker", "{message}"),
            LogLevel::Warn => warn!(target: "bridge_worker", "{message}"),
            LogLevel::Error => tracing::error!(target: "bridge_worker", "{message}"),
        }
        let row = {
            let mut state = self.state.lock().await;
            state.logs.push(level, message)
        };
        self.broadcast.publish_log(row);
    }

    pub(crate) async fn emit_state(&self) {
        self.broadcast.publish_state(self.public_state().await);
    }

    async fn persist(&self) -> Result<(), BridgeError> {
        let document = {
            let state = self.state.lock().await;
            PersistedState {
                config: Some(state.config.clone()),
                session: state.session.clone(),
            }
        };
        self.store.save(&document).await
    }

    /// Merge a partial config update, persist, broadcast.
    pub async fn save_config(&self, patch: ConfigPatch) -> Result<PublicState, BridgeError> {
        {
            let mut state = self.state.lock().await;
            state.config = state.config.clone().merged(patch);
        }
        self.persist().await?;
        self.emit_state().await;
        Ok(self.public_state().await)
    }

    /// Adopt new session tokens. Rejects empty tokens; an unchanged snapshot
    /// is a no-op with no disk write. With `auto_start` set and the service
    /// idle, a start is attempted.
    pub async fn sync_session(
        self: &Arc<Self>,
        snapshot: SessionSnapshot,
    ) -> Result<PublicState, BridgeError> {
        if !snapshot.is_usable() {
            return Err(BridgeError::Config(
                "session tokens must be non-empty".into(),
            ));
        }

        let (changed, auto_start) = {
            let mut state = self.state.lock().await;
            if state.session.as_ref() == Some(&snapshot) {
                (false, false)
            } else {
                state.session = Some(snapshot.clone());
                (true, state.config.auto_start)
            }
        };
        if !changed {
            return Ok(self.public_state().await);
        }

        self.sessions.adopt(&snapshot).await;
        self.persist().await?;
        self.log(LogLevel::Info, "session synchronized").await;
        self.emit_state().await;

        if auto_start && !self.service_running().await {
            if let Err(err) = self.start_service().await {
                self.log(
                    LogLevel::Warn,
                    format!("auto-start after session sync failed: {err}"),
                )
                .await;
            }
        }
        Ok(self.public_state().await)
    }

    /// Wipe the session and auth state, stopping the service first.
    pub async fn clear_session(&self) -> Result<PublicState, BridgeError> {
        self.stop_service().await;
        {
            let mut state = self.state.lock().await;
            state.session = None;
        }
        self.sessions.clear().await;
        self.persist().await?;
        self.log(LogLevel::Info, "session cleared").await;
        self.emit_state().await;
        Ok(self.public_state().await)
    }

    pub async fn service_running(&self) -> bool {
        self.service_task.lock().await.is_some()
    }

    /// Start the tick loop. Idempotent: a running service is left alone.
    /// Stats and RPC availability reset on every start; the restaurant
    /// scope is re-resolved by the first tick.
    pub async fn start_service(self: &Arc<Self>) -> Result<PublicState, BridgeError> {
        let mut slot = self.service_task.lock().await;
        if slot.is_some() {
            return Ok(self.public_state().await);
        }

        {
            let mut state = self.state.lock().await;
            state.stats = Default::default();
            state.rpc = Default::default();
            state.service.running = true;
        }
        self.sessions.invalidate_scope().await;

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(self).run_service_loop(cancel.clone()));
        *slot = Some(ServiceTask { cancel, handle });
        drop(slot);

        self.log(LogLevel::Info, "print service started").await;
        self.emit_state().await;
        Ok(self.public_state().await)
    }

    /// Stop the tick loop. Cancels the next-tick timer, waits for any
    /// in-flight tick, then sends one best-effort inactive heartbeat.
    /// Idempotent: stopping an idle service is a no-op.
    pub async fn stop_service(&self) -> PublicState {
        let task = self.service_task.lock().await.take();
        if let Some(task) = task {
            task.cancel.cancel();
            if let Err(err) = task.handle.await {
                warn!(%err, "service task join failed");
            }

            let config = { self.state.lock().await.config.clone() };
            if let Some(scope) = self.sessions.auth_state().await.scope {
                self.heartbeat(&config, &scope, false).await;
            }

            {
                let mut state = self.state.lock().await;
                state.service.running = false;
            }
            self.log(LogLevel::Info, "print service stopped").await;
            self.emit_state().await;
        }
        self.public_state().await
    }

    /// Scan the LAN for thermal printers.
    pub async fn discover_printers(&self, timeout_ms: Option<u64>) -> Vec<DiscoveredPrinter> {
        let found = bridge_discovery::discover_printers(timeout_ms).await;
        self.log(
            LogLevel::Info,
            format!("printer scan found {} device(s)", found.len()),
        )
        .await;
        found
    }

    /// Scan the LAN for fiscal (RT) devices.
    pub async fn discover_rt_devices(
        &self,
        timeout_ms: Option<u64>,
    ) -> Vec<DiscoveredFiscalDevice> {
        let found = bridge_discovery::discover_fiscal_devices(timeout_ms).await;
        self.log(
            LogLevel::Info,
            format!("fiscal device scan found {} device(s)", found.len()),
        )
        .await;
        found
    }

    /// Send the connectivity-test document to a fiscal device.
    pub async fn test_rt_receipt(&self, request: RtTestRequest) -> Result<RtTestReport, BridgeError> {
        if request.host.trim().is_empty() {
            return Err(BridgeError::FiscalHostMissing);
        }
        let port = request.port.unwrap_or(DEFAULT_RT_PORT);
        let api_path = request
            .api_path
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_RT_API_PATH.to_string());

        let device_name = { self.state.lock().await.config.device_name.clone() };
        let xml = render_test_document(&device_name);

        let report = match self
            .fiscal
            .post_with_retry(request.host.trim(), port, &api_path, &xml, TEST_TIMEOUT)
            .await
        {
            Ok(response) if response.is_success() => RtTestReport {
                ok: true,
                detail: format!("HTTP {}", response.status),
            },
            Ok(response) => RtTestReport {
                ok: false,
                detail: response.error_excerpt(),
            },
            Err(err) => RtTestReport {
                ok: false,
                detail: truncate_error(&err.to_string()),
            },
        };

        let level = if report.ok {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };
        self.log(
            level,
            format!(
                "RT test to {}:{port} {}",
                request.host.trim(),
                if report.ok { "ok" } else { "failed" }
            ),
        )
        .await;
        Ok(report)
    }
}

/// Request body for the fiscal connectivity test.
#[derive(Debug, Clone, Deserialize)]
pub struct RtTestRequest {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub api_path: Option<String>,
}

/// Result of the fiscal connectivity test.
#[derive(Debug, Clone, Serialize)]
pub struct RtTestReport {
    pub ok: bool,
    pub detail: String,
}
