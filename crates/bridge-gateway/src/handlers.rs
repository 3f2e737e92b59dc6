// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the control surface.
//!
//! Every operation returns the public state snapshot (or the operation's own
//! result) so the shell can refresh its view from the response alone.

use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use bridge_config::ConfigPatch;
use bridge_core::types::SessionSnapshot;
use bridge_core::BridgeError;
use bridge_worker::RtTestRequest;

use crate::server::GatewayState;

/// Error body sent for failed operations.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

/// Map a bridge error to an HTTP response with its operational code.
pub fn error_response(err: BridgeError) -> Response {
    let status = match &err {
        BridgeError::Config(_) => StatusCode::BAD_REQUEST,
        BridgeError::Session(_) => StatusCode::UNAUTHORIZED,
        BridgeError::NoPrinterHost | BridgeError::FiscalHostMissing => StatusCode::BAD_REQUEST,
        BridgeError::WorkerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        BridgeError::Backend { .. } | BridgeError::RpcMissing { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: err.code(),
        }),
    )
        .into_response()
}

/// GET /v1/state
pub async fn get_state(State(state): State<GatewayState>) -> Response {
    Json(state.worker.public_state().await).into_response()
}

/// GET /v1/logs
pub async fn get_logs(State(state): State<GatewayState>) -> Response {
    Json(state.worker.logs().await).into_response()
}

/// POST /v1/config
pub async fn post_config(
    State(state): State<GatewayState>,
    Json(patch): Json<ConfigPatch>,
) -> Response {
    match state.worker.save_config(patch).await {
        Ok(public) => Json(public).into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /v1/session/sync
pub async fn post_session_sync(
    State(state): State<GatewayState>,
    Json(snapshot): Json<SessionSnapshot>,
) -> Response {
    match state.worker.sync_session(snapshot).await {
        Ok(public) => Json(public).into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /v1/session/clear
pub async fn post_session_clear(State(state): State<GatewayState>) -> Response {
    match state.worker.clear_session().await {
        Ok(public) => Json(public).into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /v1/service/start
pub async fn post_service_start(State(state): State<GatewayState>) -> Response {
    match state.worker.start_service().await {
        Ok(public) => Json(public).into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /v1/service/stop
pub async fn post_service_stop(State(state): State<GatewayState>) -> Response {
    Json(state.worker.stop_service().await).into_response()
}

/// Optional scan parameters.
#[derive(Debug, Default, Deserialize)]
pub struct DiscoveryRequest {
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// POST /v1/discovery/printers
///
/// The body is optional; a bare POST scans with the default timeout.
pub async fn post_discover_printers(
    State(state): State<GatewayState>,
    body: Result<Json<DiscoveryRequest>, JsonRejection>,
) -> Response {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    Json(state.worker.discover_printers(request.timeout_ms).await).into_response()
}

/// POST /v1/discovery/rt
pub async fn post_discover_rt(
    State(state): State<GatewayState>,
    body: Result<Json<DiscoveryRequest>, JsonRejection>,
) -> Response {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    Json(state.worker.discover_rt_devices(request.timeout_ms).await).into_response()
}

/// POST /v1/test/rt
pub async fn post_test_rt(
    State(state): State<GatewayState>,
    Json(request): Json<RtTestRequest>,
) -> Response {
    match state.worker.test_rt_receipt(request).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => error_response(err),
    }
}
