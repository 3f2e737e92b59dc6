// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Binds the shell-facing control surface on the loopback address and wires
//! the SSE push streams to the worker's broadcast channels.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use bridge_core::BridgeError;
use bridge_worker::Worker;

use crate::handlers;
use crate::sse;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub worker: Arc<Worker>,
}

/// Assemble the control-surface router.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/v1/state", get(handlers::get_state))
        .route("/v1/logs", get(handlers::get_logs))
        .route("/v1/config", post(handlers::post_config))
        .route("/v1/session/sync", post(handlers::post_session_sync))
        .route("/v1/session/clear", post(handlers::post_session_clear))
        .route("/v1/service/start", post(handlers::post_service_start))
        .route("/v1/service/stop", post(handlers::post_service_stop))
        .route(
            "/v1/discovery/printers",
            post(handlers::post_discover_printers),
        )
        .route("/v1/discovery/rt", post(handlers::post_discover_rt))
        .route("/v1/test/rt", post(handlers::post_test_rt))
        .route("/v1/events/state", get(sse::state_events))
        .route("/v1/events/log", get(sse::log_events))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve the control surface until the process exits.
pub async fn start_server(
    host: &str,
    port: u16,
    worker: Arc<Worker>,
) -> Result<(), BridgeError> {
    let app = router(GatewayState { worker });
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BridgeError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("control surface listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| BridgeError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
