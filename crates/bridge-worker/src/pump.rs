// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The tick loop: claim, resolve, render, deliver, ack.
//!
//! One tick at a time. Jobs within a tick run sequentially in claim order
//! and every claimed job is acked exactly once, whatever happens to the
//! rendering or the delivery. A failing ack is logged and never aborts the
//! tick.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use bridge_config::AgentConfig;
use bridge_core::jobs::{FiscalJob, KitchenJob, ReceiptJob};
use bridge_core::log::LogLevel;
use bridge_core::types::{JobOutcome, LiveRoutes, RestaurantScope};
use bridge_core::{truncate_error, BridgeError};
use bridge_print::{
    render_fiscal_receipt, render_kitchen_ticket, render_non_fiscal_receipt, FiscalReceipt,
    KitchenTicket, NonFiscalReceipt,
};
use bridge_transport::FISCAL_TIMEOUT;

use crate::routes::resolve_kitchen_target;
use crate::worker::Worker;

/// Default fiscal device port when the payload route has none.
const DEFAULT_FISCAL_PORT: u16 = 8008;
/// Default thermal printer port for receipt routes.
const DEFAULT_PRINTER_PORT: u16 = 9100;
/// Default FPMate endpoint.
const DEFAULT_FISCAL_API_PATH: &str = "/cgi-bin/fpmate.cgi";

/// Receipt job families gated by an availability flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReceiptFamily {
    Physical,
    NonFiscal,
}

impl fmt::Display for ReceiptFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiptFamily::Physical => write!(f, "fiscal receipt"),
            ReceiptFamily::NonFiscal => write!(f, "non-fiscal receipt"),
        }
    }
}

impl Worker {
    /// Cooperative tick loop; runs until the token cancels. The in-flight
    /// tick always completes before the loop exits.
    pub(crate) async fn run_service_loop(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            self.run_tick().await;
            let poll_ms = { self.state.lock().await.config.poll_ms };
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_millis(poll_ms)) => {}
            }
        }
        debug!("service loop exited");
    }

    /// One serial tick. Errors escaping the tick body land in `last_error`;
    /// the next tick is scheduled regardless. A tick already in flight makes
    /// this call a no-op.
    pub async fn run_tick(&self) {
        let Ok(_processing) = self.tick_guard.try_lock() else {
            return;
        };
        let result = self.tick_inner().await;
        {
            let mut state = self.state.lock().await;
            state.stats.last_run_at = Some(Utc::now());
            if result.is_ok() {
                state.stats.last_error = None;
            }
        }
        if let Err(err) = result {
            {
                let mut state = self.state.lock().await;
                state.stats.last_error = Some(truncate_error(&err.to_string()));
            }
            self.log(LogLevel::Error, format!("tick failed: {err}")).await;
        }
        self.emit_state().await;
    }

    async fn tick_inner(&self) -> Result<(), BridgeError> {
        let (config, session) = {
            let state = self.state.lock().await;
            (state.config.clone(), state.session.clone())
        };

        let outcome = self.sessions.ensure_signed_in(session.as_ref()).await?;
        if let Some(refreshed) = outcome.refreshed {
            {
                let mut state = self.state.lock().await;
                state.session = Some(refreshed);
            }
            if let Err(err) = self.persist_after_refresh().await {
                self.log(
                    LogLevel::Warn,
                    format!("could not persist refreshed tokens: {err}"),
                )
                .await;
            } else {
                self.log(LogLevel::Info, "session tokens refreshed").await;
            }
        }

        let Some(scope) = self.sessions.ensure_scope(&outcome.user.id).await? else {
            self.log(
                LogLevel::Warn,
                "signed-in user has no restaurant scope, skipping tick",
            )
            .await;
            return Ok(());
        };

        self.heartbeat(&config, &scope, true).await;
        self.process_kitchen_jobs(&config, &scope).await;
        self.process_fiscal_jobs(&config, &scope).await;
        self.process_receipt_jobs(&config, &scope).await;
        Ok(())
    }

    async fn persist_after_refresh(&self) -> Result<(), BridgeError> {
        let document = {
            let state = self.state.lock().await;
            bridge_config::PersistedState {
                config: Some(state.config.clone()),
                session: state.session.clone(),
            }
        };
        self.store.save(&document).await
    }

    // ---- kitchen family ----

    async fn process_kitchen_jobs(&self, config: &AgentConfig, scope: &RestaurantScope) {
        let jobs = match self
            .queue
            .claim_kitchen_jobs(&scope.id, &config.consumer_id, config.claim_limit)
            .await
        {
            Ok(jobs) => jobs,
            Err(err) => {
                self.log(LogLevel::Error, format!("kitchen claim failed: {err}"))
                    .await;
                return;
            }
        };
        if jobs.is_empty() {
            return;
        }

        self.note_claimed(jobs.len()).await;
        self.log(
            LogLevel::Info,
            format!("claimed {} kitchen job(s)", jobs.len()),
        )
        .await;

        // One live-routes fetch per tick, shared by the whole batch.
        let routes = match self.queue.live_routes(&scope.id).await {
            Ok(routes) => routes,
            Err(err) => {
                self.log(
                    LogLevel::Warn,
                    format!("live printer table unavailable: {err}"),
                )
                .await;
                LiveRoutes::default()
            }
        };

        for job in jobs {
            let outcome = self.print_kitchen_job(&job, &routes).await;
            self.note_outcome(&outcome).await;
            if let Err(err) = self
                .queue
                .complete_kitchen_job(&job.id, &config.consumer_id, &outcome)
                .await
            {
                self.log(
                    LogLevel::Warn,
                    format!("ack failed for kitchen job {}: {err}", job.id),
                )
                .await;
            }
        }
    }

    async fn print_kitchen_job(&self, job: &KitchenJob, routes: &LiveRoutes) -> JobOutcome {
        let target = match resolve_kitchen_target(job, routes) {
            Ok(target) => target,
            Err(err) => {
                self.log(
                    LogLevel::Error,
                    format!("kitchen job {}: no printer target ({err})", job.id),
                )
                .await;
                return JobOutcome::failure(err.to_string(), json!({"stage": "route"}));
            }
        };

        let ticket = KitchenTicket::from_job(job);
        let bytes = render_kitchen_ticket(&ticket);
        match bridge_transport::deliver(&target.host, target.port, &bytes).await {
            Ok(()) => {
                self.log(
                    LogLevel::Info,
                    format!(
                        "kitchen job {} printed on {}:{}",
                        job.id, target.host, target.port
                    ),
                )
                .await;
                JobOutcome::success(json!({
                    "printer_id": target.id,
                    "printer_host": target.host,
                    "printer_port": target.port,
                }))
            }
            Err(err) => {
                self.log(
                    LogLevel::Error,
                    format!("kitchen job {} delivery failed: {err}", job.id),
                )
                .await;
                JobOutcome::failure(
                    err.to_string(),
                    json!({
                        "stage": "transport",
                        "printer_host": target.host,
                        "printer_port": target.port,
                    }),
                )
            }
        }
    }

    // ---- fiscal family ----

    async fn process_fiscal_jobs(&self, config: &AgentConfig, scope: &RestaurantScope) {
        if !self.family_available(ReceiptFamily::Physical).await {
            return;
        }
        let jobs = match self
            .queue
            .claim_fiscal_jobs(&scope.id, &config.consumer_id, config.claim_limit)
            .await
        {
            Ok(jobs) => jobs,
            Err(BridgeError::RpcMissing { function }) => {
                self.disable_family(ReceiptFamily::Physical, &function).await;
                return;
            }
            Err(err) => {
                self.log(LogLevel::Error, format!("fiscal claim failed: {err}"))
                    .await;
                return;
            }
        };
        if jobs.is_empty() {
            return;
        }
        self.note_claimed(jobs.len()).await;
        self.log(
            LogLevel::Info,
            format!("claimed {} fiscal job(s)", jobs.len()),
        )
        .await;

        for job in jobs {
            let (receipt_id, outcome) = self.print_fiscal_job(&job).await;
            self.note_outcome(&outcome).await;
            match self
                .queue
                .complete_fiscal_job(
                    &job.id,
                    &config.consumer_id,
                    receipt_id.as_deref(),
                    &outcome,
                )
                .await
            {
                Ok(()) => {}
                Err(BridgeError::RpcMissing { function }) => {
                    self.disable_family(ReceiptFamily::Physical, &function).await;
                    return;
                }
                Err(err) => {
                    self.log(
                        LogLevel::Warn,
                        format!("ack failed for fiscal job {}: {err}", job.id),
                    )
                    .await;
                }
            }
        }
    }

    async fn print_fiscal_job(&self, job: &FiscalJob) -> (Option<String>, JobOutcome) {
        let route = job.route();
        let Some(host) = route.host.clone() else {
            self.log(
                LogLevel::Error,
                format!("fiscal job {}: device host missing", job.id),
            )
            .await;
            return (
                None,
                JobOutcome::failure(
                    BridgeError::FiscalHostMissing.to_string(),
                    json!({"stage": "route"}),
                ),
            );
        };
        let port = route.port.unwrap_or(DEFAULT_FISCAL_PORT);
        let api_path = route
            .api_path
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FISCAL_API_PATH.to_string());

        let receipt = FiscalReceipt::from_job(job);
        let xml = render_fiscal_receipt(&receipt);

        match self
            .fiscal
            .post_with_retry(&host, port, &api_path, &xml, FISCAL_TIMEOUT)
            .await
        {
            Ok(response) if response.is_success() => {
                let receipt_id = response
                    .receipt_id()
                    .unwrap_or_else(|| synthetic_receipt_id(&job.id));
                self.log(
                    LogLevel::Info,
                    format!("fiscal job {} printed, receipt {receipt_id}", job.id),
                )
                .await;
                (
                    Some(receipt_id.clone()),
                    JobOutcome::success(json!({
                        "receipt_id": receipt_id,
                        "device_host": host,
                        "device_port": port,
                    })),
                )
            }
            Ok(response) => {
                let excerpt = response.error_excerpt();
                self.log(
                    LogLevel::Error,
                    format!("fiscal job {} rejected by device: {excerpt}", job.id),
                )
                .await;
                (
                    None,
                    JobOutcome::failure(excerpt, json!({"stage": "device", "device_host": host})),
                )
            }
            Err(err) => {
                self.log(
                    LogLevel::Error,
                    format!("fiscal job {} delivery failed: {err}", job.id),
                )
                .await;
                (
                    None,
                    JobOutcome::failure(
                        err.to_string(),
                        json!({"stage": "transport", "device_host": host}),
                    ),
                )
            }
        }
    }

    // ---- non-fiscal receipt family ----

    async fn process_receipt_jobs(&self, config: &AgentConfig, scope: &RestaurantScope) {
        if !self.family_available(ReceiptFamily::NonFiscal).await {
            return;
        }
        let jobs = match self
            .queue
            .claim_receipt_jobs(&scope.id, &config.consumer_id, config.claim_limit)
            .await
        {
            Ok(jobs) => jobs,
            Err(BridgeError::RpcMissing { function }) => {
                self.disable_family(ReceiptFamily::NonFiscal, &function).await;
                return;
            }
            Err(err) => {
                self.log(LogLevel::Error, format!("receipt claim failed: {err}"))
                    .await;
                return;
            }
        };
        if jobs.is_empty() {
            return;
        }
        self.note_claimed(jobs.len()).await;
        self.log(
            LogLevel::Info,
            format!("claimed {} receipt job(s)", jobs.len()),
        )
        .await;

        for job in jobs {
            let outcome = self.print_receipt_job(&job).await;
            self.note_outcome(&outcome).await;
            match self
                .queue
                .complete_receipt_job(&job.id, &config.consumer_id, None, &outcome)
                .await
            {
                Ok(()) => {}
                Err(BridgeError::RpcMissing { function }) => {
                    self.disable_family(ReceiptFamily::NonFiscal, &function).await;
                    return;
                }
                Err(err) => {
                    self.log(
                        LogLevel::Warn,
                        format!("ack failed for receipt job {}: {err}", job.id),
                    )
                    .await;
                }
            }
        }
    }

    async fn print_receipt_job(&self, job: &ReceiptJob) -> JobOutcome {
        let route = job.route();
        let Some(host) = route.host.clone() else {
            self.log(
                LogLevel::Error,
                format!("receipt job {}: printer host missing", job.id),
            )
            .await;
            return JobOutcome::failure(
                BridgeError::NoPrinterHost.to_string(),
                json!({"stage": "route"}),
            );
        };
        let port = route.port.unwrap_or(DEFAULT_PRINTER_PORT);

        let receipt = NonFiscalReceipt::from_job(job);
        let bytes = render_non_fiscal_receipt(&receipt);
        match bridge_transport::deliver(&host, port, &bytes).await {
            Ok(()) => {
                self.log(
                    LogLevel::Info,
                    format!("receipt job {} printed on {host}:{port}", job.id),
                )
                .await;
                JobOutcome::success(json!({"printer_host": host, "printer_port": port}))
            }
            Err(err) => {
                self.log(
                    LogLevel::Error,
                    format!("receipt job {} delivery failed: {err}", job.id),
                )
                .await;
                JobOutcome::failure(
                    err.to_string(),
                    json!({"stage": "transport", "printer_host": host}),
                )
            }
        }
    }

    // ---- shared bookkeeping ----

    async fn note_claimed(&self, count: usize) {
        let mut state = self.state.lock().await;
        state.stats.claimed += count as u64;
    }

    async fn note_outcome(&self, outcome: &JobOutcome) {
        let mut state = self.state.lock().await;
        if outcome.success {
            state.stats.printed += 1;
        } else {
            state.stats.failed += 1;
        }
    }

    pub(crate) async fn family_available(&self, family: ReceiptFamily) -> bool {
        let state = self.state.lock().await;
        match family {
            ReceiptFamily::Physical => state.rpc.physical_receipt,
            ReceiptFamily::NonFiscal => state.rpc.non_fiscal_receipt,
        }
    }

    /// Flip a family's availability flag off, warning once per flip. The
    /// flag stays down until the next service start.
    pub(crate) async fn disable_family(&self, family: ReceiptFamily, function: &str) {
        let flipped = {
            let mut state = self.state.lock().await;
            let flag = match family {
                ReceiptFamily::Physical => &mut state.rpc.physical_receipt,
                ReceiptFamily::NonFiscal => &mut state.rpc.non_fiscal_receipt,
            };
            std::mem::replace(flag, false)
        };
        if flipped {
            self.log(
                LogLevel::Warn,
                format!(
                    "backend function {function} is not installed; {family} jobs disabled until the service restarts"
                ),
            )
            .await;
            self.emit_state().await;
        }
    }
}

/// Fallback id when the device reply carries none: `RT-<id8>-<now>`.
fn synthetic_receipt_id(job_id: &str) -> String {
    let id8: String = job_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect();
    let id8 = if id8.is_empty() { "job".to_string() } else { id8 };
    format!("RT-{id8}-{}", Utc::now().timestamp_millis())
}
