// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sushiamo desktop bridge - local print worker binary.
//!
//! Wires the persisted state store, the cloud backend client, the print
//! worker, and the shell-facing gateway together, then runs until a
//! shutdown signal arrives.

mod shutdown;

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bridge_backend::SupabaseClient;
use bridge_config::{load_settings, user_data_dir, StateStore};
use bridge_core::BridgeError;
use bridge_worker::Worker;

/// Sushiamo desktop bridge - cloud print queue to floor hardware.
#[derive(Parser, Debug)]
#[command(name = "sushiamo-bridge", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the print worker and the shell control surface.
    Serve,
    /// Print the effective settings and state file location.
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => match serve().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                error!("fatal: {err}");
                ExitCode::FAILURE
            }
        },
        Commands::Config => {
            print_config();
            ExitCode::SUCCESS
        }
    }
}

async fn serve() -> Result<(), BridgeError> {
    let settings =
        load_settings().map_err(|e| BridgeError::Config(format!("settings load failed: {e}")))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let (url, anon_key) = settings.backend.require()?;
    let backend = Arc::new(SupabaseClient::new(url, anon_key)?);

    let store = StateStore::new(user_data_dir());
    info!(state_file = %store.path().display(), "state store ready");

    let worker = Arc::new(
        Worker::new(
            backend.clone(),
            backend,
            store,
            env!("CARGO_PKG_VERSION"),
        )
        .await?,
    );

    // A saved session plus auto_start brings the service up immediately.
    {
        let state = worker.public_state().await;
        if state.has_session && state.config.auto_start {
            if let Err(err) = worker.start_service().await {
                error!("auto-start failed: {err}");
            }
        }
    }

    let cancel = shutdown::shutdown_token();
    let gateway_worker = worker.clone();
    let gateway = tokio::spawn(async move {
        bridge_gateway::start_server(
            &settings.gateway.host,
            settings.gateway.port,
            gateway_worker,
        )
        .await
    });

    tokio::select! {
        _ = cancel.cancelled() => {
            info!("shutting down");
        }
        result = gateway => {
            match result {
                Ok(Ok(())) => info!("gateway exited"),
                Ok(Err(err)) => return Err(err),
                Err(err) => return Err(BridgeError::Internal(format!("gateway task failed: {err}"))),
            }
        }
    }

    // Finish the in-flight tick and emit the final inactive heartbeat.
    worker.stop_service().await;
    Ok(())
}

fn print_config() {
    match load_settings() {
        Ok(settings) => {
            println!("backend.url      = {}", settings.backend.url.as_deref().unwrap_or("(unset)"));
            println!(
                "backend.anon_key = {}",
                if settings.backend.anon_key.is_some() { "(set)" } else { "(unset)" }
            );
            println!("gateway          = {}:{}", settings.gateway.host, settings.gateway.port);
            println!("log_level        = {}", settings.log_level);
        }
        Err(err) => println!("settings error: {err}"),
    }
    println!(
        "state file       = {}",
        StateStore::new(user_data_dir()).path().display()
    );
}
