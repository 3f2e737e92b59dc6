// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket renderers for the Sushiamo desktop bridge.
//!
//! Pure transforms from claimed job payloads to printer documents: ESC/POS
//! byte streams for thermal printers, FPMate XML for Epson RT devices.

pub mod escpos;
pub mod fpmate;
pub mod text;

pub use escpos::{
    render_kitchen_ticket, render_non_fiscal_receipt, KitchenTicket, NonFiscalReceipt,
};
pub use fpmate::{render_fiscal_receipt, render_test_document, FiscalReceipt};
