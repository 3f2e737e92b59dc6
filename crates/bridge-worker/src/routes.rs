// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route resolution: pick a physical target for a kitchen job.
//!
//! Resolution order: snapshot printer id against the live table, then the
//! job's department, then the restaurant default, then the inline snapshot
//! host. Only enabled printers with a host are eligible from the live table.

use bridge_core::jobs::KitchenJob;
use bridge_core::types::{LivePrinter, LiveRoutes, PrinterTarget, DEFAULT_PRINTER_PORT};
use bridge_core::BridgeError;

fn eligible(printer: &LivePrinter) -> bool {
    printer.enabled && !printer.host.trim().is_empty()
}

fn target_from_live(printer: &LivePrinter) -> PrinterTarget {
    PrinterTarget {
        id: Some(printer.id.clone()),
        name: printer.name.clone(),
        host: printer.host.clone(),
        port: printer.port,
    }
}

/// Resolve the delivery target for a kitchen job.
pub fn resolve_kitchen_target(
    job: &KitchenJob,
    routes: &LiveRoutes,
) -> Result<PrinterTarget, BridgeError> {
    // 1. Snapshot route id against the live table.
    if let Some(id) = job.route.as_ref().and_then(|r| r.id.as_ref()) {
        if let Some(printer) = routes.by_id.get(id) {
            if eligible(printer) {
                return Ok(target_from_live(printer));
            }
        }
    }

    // 2. Department mapping.
    if let Some(id) = routes.by_department.get(&job.department_key()) {
        if let Some(printer) = routes.by_id.get(id) {
            if eligible(printer) {
                return Ok(target_from_live(printer));
            }
        }
    }

    // 3. Restaurant default.
    if let Some(id) = &routes.default_printer_id {
        if let Some(printer) = routes.by_id.get(id) {
            if eligible(printer) {
                return Ok(target_from_live(printer));
            }
        }
    }

    // 4. Inline snapshot host.
    if let Some(route) = &job.route {
        if let Some(host) = &route.host {
            return Ok(PrinterTarget {
                id: route.id.clone(),
                name: route.name.clone(),
                host: host.clone(),
                port: route.port.unwrap_or(DEFAULT_PRINTER_PORT),
            });
        }
    }

    Err(BridgeError::NoPrinterHost)
}
