// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events push streams.
//!
//! Two endpoints mirror the worker's broadcast channels:
//!
//! ```text
//! event: printer-state
//! data: {"config": ..., "stats": ...}
//!
//! event: printer-log
//! data: {"at": "...", "level": "INFO", "message": "..."}
//! ```
//!
//! A subscriber that lags simply skips the missed events; the next state
//! snapshot is always complete.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::server::GatewayState;

fn broadcast_stream<T: Serialize + Clone + Send + 'static>(
    rx: broadcast::Receiver<T>,
    event_name: &'static str,
) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(item) => {
                    let data = serde_json::to_string(&item).unwrap_or_else(|_| "{}".to_string());
                    return Some((Ok(Event::default().event(event_name).data(data)), rx));
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
}

/// GET /v1/events/state
pub async fn state_events(
    State(state): State<GatewayState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.worker.broadcast().subscribe_state();
    Sse::new(broadcast_stream(rx, "printer-state")).keep_alive(KeepAlive::default())
}

/// GET /v1/events/log
pub async fn log_events(
    State(state): State<GatewayState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.worker.broadcast().subscribe_log();
    Sse::new(broadcast_stream(rx, "printer-log")).keep_alive(KeepAlive::default())
}
