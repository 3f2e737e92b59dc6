// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded concurrent TCP probing of enumerated targets.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use bridge_core::types::{DiscoveredFiscalDevice, DiscoveredPrinter};

use crate::fingerprint::fingerprint_brand;
use crate::targets::{
    clamp_timeout, enumerate_targets, fingerprint_timeout, local_interfaces, numeric_host_cmp,
    InterfaceV4, ProbeTarget, MAX_CONCURRENCY,
};

/// Thermal printer ports, probed sequentially per host; first hit wins.
pub const PRINTER_PORTS: [u16; 3] = [9100, 515, 631];

/// Fiscal device ports, all collected, picked in this priority order.
pub const FISCAL_PORTS: [u16; 3] = [8008, 80, 443];

/// Default FPMate endpoint on Epson devices.
pub const EPSON_API_PATH: &str = "/cgi-bin/fpmate.cgi";

async fn port_open(host: &str, port: u16, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}

/// Scan the local networks for thermal printers.
pub async fn discover_printers(timeout_ms: Option<u64>) -> Vec<DiscoveredPrinter> {
    let targets = enumerate_targets(&local_interfaces());
    probe_printer_targets(targets, &PRINTER_PORTS, clamp_timeout(timeout_ms)).await
}

/// Probe the given targets for the given printer ports.
pub async fn probe_printer_targets(
    targets: Vec<ProbeTarget>,
    ports: &[u16],
    timeout: Duration,
) -> Vec<DiscoveredPrinter> {
    info!(targets = targets.len(), ?timeout, "printer scan started");
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENCY));
    let ports = ports.to_vec();
    let mut set = JoinSet::new();

    for target in targets {
        let semaphore = semaphore.clone();
        let ports = ports.clone();
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok()?;
            let host = target.host.to_string();
            for port in ports {
                if port_open(&host, port, timeout).await {
                    return Some(DiscoveredPrinter {
                        host,
                        port,
                        connection_type: target.connection_type,
                        interface_name: target.interface_name,
                        interface_ip: target.interface_ip,
                        label: "Stampante di rete".to_string(),
                    });
                }
            }
            None
        });
    }

    let mut found = Vec::new();
    while let Some(result) = set.join_next().await {
        if let Ok(Some(printer)) = result {
            found.push(printer);
        }
    }
    dedup_and_sort(&mut found, |p| (p.host.clone(), p.port));
    debug!(found = found.len(), "printer scan finished");
    found
}

/// Scan the local networks for fiscal (RT) devices.
pub async fn discover_fiscal_devices(timeout_ms: Option<u64>) -> Vec<DiscoveredFiscalDevice> {
    let targets = enumerate_targets(&local_interfaces());
    probe_fiscal_targets(targets, &FISCAL_PORTS, clamp_timeout(timeout_ms)).await
}

/// Probe the given targets for fiscal device ports, fingerprinting over HTTP
/// where possible.
pub async fn probe_fiscal_targets(
    targets: Vec<ProbeTarget>,
    ports: &[u16],
    timeout: Duration,
) -> Vec<DiscoveredFiscalDevice> {
    info!(targets = targets.len(), ?timeout, "fiscal device scan started");
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENCY));
    let http = reqwest::Client::new();
    let ports = ports.to_vec();
    let fp_timeout = fingerprint_timeout(timeout);
    let mut set = JoinSet::new();

    for target in targets {
        let semaphore = semaphore.clone();
        let http = http.clone();
        let ports = ports.clone();
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok()?;
            let host = target.host.to_string();

            let mut open = Vec::new();
            for &port in &ports {
                if port_open(&host, port, timeout).await {
                    open.push(port);
                }
            }
            let preferred = ports.iter().copied().find(|p| open.contains(p))?;

            // Port-based guess first, HTTP fingerprint override second.
            let mut brand = if preferred == 8008 { "epson" } else { "other" };
            let http_port = open.iter().copied().find(|p| *p != 443);
            if let Some(port) = http_port {
                if let Some(detected) = fingerprint_brand(&http, &host, port, fp_timeout).await {
                    brand = detected;
                }
            }

            let api_path = if brand == "epson" { EPSON_API_PATH } else { "/" };
            Some(DiscoveredFiscalDevice {
                host,
                port: preferred,
                brand: brand.to_string(),
                api_path: api_path.to_string(),
                connection_type: target.connection_type,
                interface_name: target.interface_name,
                interface_ip: target.interface_ip,
                source: "lan_scan",
                label: format!("Registratore telematico ({brand})"),
            })
        });
    }

    let mut found = Vec::new();
    while let Some(result) = set.join_next().await {
        if let Ok(Some(device)) = result {
            found.push(device);
        }
    }
    dedup_and_sort(&mut found, |d| (d.host.clone(), d.port));
    debug!(found = found.len(), "fiscal device scan finished");
    found
}

/// Order by numeric-aware host then port, dropping `(host, port)` duplicates.
fn dedup_and_sort<T, K: FnMut(&T) -> (String, u16)>(items: &mut Vec<T>, mut key: K) {
    items.sort_by(|a, b| {
        let (ha, pa) = key(a);
        let (hb, pb) = key(b);
        numeric_host_cmp(&ha, &hb).then(pa.cmp(&pb))
    });
    items.dedup_by(|a, b| key(a) == key(b));
}
