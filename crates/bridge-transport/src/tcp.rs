// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw-TCP delivery to thermal printers.
//!
//! Opens a NoDelay connection, writes the whole document, half-closes, and
//! waits for the printer to close its side. Any socket timeout surfaces as
//! `"Timeout stampante"`.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use bridge_core::BridgeError;

use crate::retry::{io_error_text, with_retry};

/// Overall budget for connect + write + drain.
pub const TCP_TIMEOUT: Duration = Duration::from_secs(25);

/// One delivery attempt.
pub async fn send_raw(
    host: &str,
    port: u16,
    bytes: &[u8],
    timeout: Duration,
) -> Result<(), BridgeError> {
    let attempt = async {
        let mut stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| BridgeError::Transport(io_error_text(&e)))?;
        stream
            .set_nodelay(true)
            .map_err(|e| BridgeError::Transport(io_error_text(&e)))?;
        stream
            .write_all(bytes)
            .await
            .map_err(|e| BridgeError::Transport(io_error_text(&e)))?;
        // Half-close our side, then drain until the printer closes.
        stream
            .shutdown()
            .await
            .map_err(|e| BridgeError::Transport(io_error_text(&e)))?;
        let mut sink = [0u8; 256];
        loop {
            let n = stream
                .read(&mut sink)
                .await
                .map_err(|e| BridgeError::Transport(io_error_text(&e)))?;
            if n == 0 {
                break;
            }
        }
        debug!(host, port, len = bytes.len(), "raw ticket delivered");
        Ok(())
    };

    tokio::time::timeout(timeout, attempt)
        .await
        .map_err(|_| BridgeError::Transport("Timeout stampante".into()))?
}

/// Deliver with the local retry policy (≤2 attempts, transient errors only).
pub async fn deliver(host: &str, port: u16, bytes: &[u8]) -> Result<(), BridgeError> {
    with_retry("tcp-print", |_| send_raw(host, port, bytes, TCP_TIMEOUT)).await
}
