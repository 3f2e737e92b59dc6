// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Epson FPMate XML documents for fiscal (RT) devices.

use bridge_core::jobs::{num_field, str_field, FiscalJob};

/// Fiscal receipt data extracted from a claimed job payload.
#[derive(Debug, Clone)]
pub struct FiscalReceipt {
    pub table: Option<String>,
    pub total_amount: f64,
    pub payment_method: String,
}

impl FiscalReceipt {
    pub fn from_job(job: &FiscalJob) -> Self {
        let payload = &job.payload;
        Self {
            table: str_field(payload, "table_number"),
            total_amount: num_field(payload, "total_amount").unwrap_or(0.0),
            payment_method: str_field(payload, "payment_method")
                .unwrap_or_else(|| "cash".to_string()),
        }
    }

    /// Amount in integer cents, floored at 1 so the device never rejects a
    /// zero-price item.
    pub fn cents(&self) -> i64 {
        ((self.total_amount.abs() * 100.0).round() as i64).max(1)
    }

    /// FPMate tender description: `ELETTRONICO` for card payments,
    /// `CONTANTI` otherwise.
    pub fn tender(&self) -> &'static str {
        match self.payment_method.trim().to_lowercase().as_str() {
            "card" | "carta" => "ELETTRONICO",
            _ => "CONTANTI",
        }
    }
}

/// Render the fiscal receipt document.
pub fn render_fiscal_receipt(receipt: &FiscalReceipt) -> String {
    let cents = receipt.cents();
    let description = format!(
        "Sushiamo Tavolo {}",
        receipt.table.as_deref().unwrap_or("-")
    );
    format!(
        concat!(
            "<FPMessage>\n",
            "  <beginFiscalReceipt operator=\"1\" />\n",
            "  <printRecItem description=\"{desc}\" price=\"{cents}\" quantity=\"1\" department=\"1\" vatCode=\"1\" />\n",
            "  <printRecTotal description=\"{tender}\" payment=\"{cents}\" />\n",
            "  <endFiscalReceipt />\n",
            "</FPMessage>\n",
        ),
        desc = escape_xml(&description),
        cents = cents,
        tender = receipt.tender(),
    )
}

/// Render the non-fiscal connectivity-test document.
pub fn render_test_document(device_label: &str) -> String {
    format!(
        concat!(
            "<FPMessage>\n",
            "  <beginNonFiscal operator=\"1\" />\n",
            "  <printNormal font=\"1\" data=\"SUSHIAMO BRIDGE\" />\n",
            "  <printNormal font=\"1\" data=\"Test stampa {label}\" />\n",
            "  <endNonFiscal operator=\"1\" />\n",
            "</FPMessage>\n",
        ),
        label = escape_xml(device_label),
    )
}

/// Escape the five XML special characters.
pub fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
