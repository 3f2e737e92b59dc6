// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process shutdown wiring.
//!
//! The bridge must never die mid-ticket: a termination request only cancels
//! the tick scheduler, and the serve loop then drains the in-flight tick and
//! emits the final inactive heartbeat before exiting. This module turns the
//! process signals into that cancellation.

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Watch for SIGINT/SIGTERM and return the token the serve loop waits on.
///
/// The watcher task lives for the rest of the process; the first signal
/// cancels the token and later signals are ignored (the drain is already
/// underway).
pub fn shutdown_token() -> CancellationToken {
    let stop = CancellationToken::new();
    let trigger = stop.clone();

    tokio::spawn(async move {
        let signal_name = wait_for_signal().await;
        info!("{signal_name} received, stopping the print service after the current tick");
        trigger.cancel();
    });

    stop
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate =
        signal(SignalKind::terminate()).expect("SIGTERM handler installation failed");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "Ctrl+C"
}
