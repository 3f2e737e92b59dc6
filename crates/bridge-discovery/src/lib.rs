// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LAN discovery for the Sushiamo desktop bridge.
//!
//! Enumerates the /24 of every non-internal IPv4 interface and probes it
//! with a bounded fan-out: thermal printer ports first-hit, fiscal device
//! ports collect-all with HTTP fingerprinting.

pub mod fingerprint;
pub mod probe;
pub mod targets;

pub use probe::{discover_fiscal_devices, discover_printers, FISCAL_PORTS, PRINTER_PORTS};
pub use targets::{clamp_timeout, enumerate_targets, local_interfaces, InterfaceV4};
