// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scan target enumeration over the local /24 networks.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::time::Duration;

use bridge_core::types::{classify_interface, ConnectionType};

/// Per-probe timeout clamp, in milliseconds.
pub const TIMEOUT_MIN_MS: u64 = 120;
pub const TIMEOUT_MAX_MS: u64 = 2000;
pub const TIMEOUT_DEFAULT_MS: u64 = 350;

/// Fingerprint requests never run shorter than this.
pub const FINGERPRINT_MIN_MS: u64 = 300;

/// Maximum probes in flight.
pub const MAX_CONCURRENCY: usize = 96;

/// Safety valve on total enumerated hosts.
pub const MAX_HOSTS: usize = 1024;

/// Clamp a requested probe timeout into the allowed window.
pub fn clamp_timeout(timeout_ms: Option<u64>) -> Duration {
    let ms = timeout_ms
        .unwrap_or(TIMEOUT_DEFAULT_MS)
        .clamp(TIMEOUT_MIN_MS, TIMEOUT_MAX_MS);
    Duration::from_millis(ms)
}

/// Fingerprint timeout: the probe clamp, floored at 300 ms.
pub fn fingerprint_timeout(probe_timeout: Duration) -> Duration {
    probe_timeout.max(Duration::from_millis(FINGERPRINT_MIN_MS))
}

/// A non-internal IPv4 interface.
#[derive(Debug, Clone)]
pub struct InterfaceV4 {
    pub name: String,
    pub ip: Ipv4Addr,
}

/// One host to probe, annotated with its source interface.
#[derive(Debug, Clone)]
pub struct ProbeTarget {
    pub host: Ipv4Addr,
    pub connection_type: ConnectionType,
    pub interface_name: String,
    pub interface_ip: String,
}

/// All non-internal IPv4 interfaces on this machine.
pub fn local_interfaces() -> Vec<InterfaceV4> {
    let Ok(addrs) = if_addrs::get_if_addrs() else {
        return Vec::new();
    };
    addrs
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .filter_map(|iface| match iface.addr {
            if_addrs::IfAddr::V4(v4) => Some(InterfaceV4 {
                name: iface.name,
                ip: v4.ip,
            }),
            _ => None,
        })
        .collect()
}

/// Enumerate `a.b.c.1..254` for every interface, excluding the interface's
/// own octet, loopback, and link-local ranges. Hosts are deduplicated across
/// interfaces and capped at [`MAX_HOSTS`].
pub fn enumerate_targets(interfaces: &[InterfaceV4]) -> Vec<ProbeTarget> {
    let mut seen: HashSet<Ipv4Addr> = HashSet::new();
    let mut targets = Vec::new();

    for iface in interfaces {
        let octets = iface.ip.octets();
        if octets[0] == 127 || (octets[0] == 169 && octets[1] == 254) {
            continue;
        }
        let connection_type = classify_interface(&iface.name);
        for d in 1..=254u8 {
            if targets.len() >= MAX_HOSTS {
                return targets;
            }
            let host = Ipv4Addr::new(octets[0], octets[1], octets[2], d);
            if host == iface.ip || !seen.insert(host) {
                continue;
            }
            targets.push(ProbeTarget {
                host,
                connection_type,
                interface_name: iface.name.clone(),
                interface_ip: iface.ip.to_string(),
            });
        }
    }
    targets
}

/// Numeric-aware ASCII ordering: digit runs compare as numbers, everything
/// else byte-wise, so `10.0.0.9` sorts before `10.0.0.10`.
pub fn numeric_host_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    let (a, b) = (a.as_bytes(), b.as_bytes());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let (ca, cb) = (a[i], b[j]);
        if ca.is_ascii_digit() && cb.is_ascii_digit() {
            let start_a = i;
            while i < a.len() && a[i].is_ascii_digit() {
                i += 1;
            }
            let start_b = j;
            while j < b.len() && b[j].is_ascii_digit() {
                j += 1;
            }
            let run_a = std::str::from_utf8(&a[start_a..i]).unwrap_or("0");
            let run_b = std::str::from_utf8(&b[start_b..j]).unwrap_or("0");
            let na: u64 = run_a.parse().unwrap_or(0);
            let nb: u64 = run_b.parse().unwrap_or(0);
            match na.cmp(&nb) {
                Ordering::Equal => {}
                other => return other,
            }
        } else {
            match ca.cmp(&cb) {
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
                other => return other,
            }
        }
    }
    a.len().cmp(&b.len())
}
