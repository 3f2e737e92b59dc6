// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ESC/POS renderers for the kitchen ticket and the non-fiscal receipt.
//!
//! Both renderers are pure: payload in, byte stream out. Ticket text is
//! encoded as Latin-1 with the euro sign mapped to the PC858 code point;
//! anything else outside Latin-1 degrades to `?`.

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use bridge_core::jobs::{num_field, str_field, KitchenJob, ReceiptJob};

use crate::text::{amount_row, center, format_euro, prettify_dish_name, word_wrap, COLUMNS};

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;

/// Visual class of a ticket line, driving bold and character size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineClass {
    /// `TAVOLO:` and item lines: bold, double width and height.
    Emphasis,
    /// Everything else: regular.
    Normal,
}

/// Incrementally builds an ESC/POS byte stream.
struct EscPosBuilder {
    buf: Vec<u8>,
}

impl EscPosBuilder {
    /// Initialize the printer, select Font B, set character spacing to 2.
    fn new() -> Self {
        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(&[ESC, b'@']); // initialize
        buf.extend_from_slice(&[ESC, b'M', 1]); // Font B
        buf.extend_from_slice(&[ESC, b' ', 2]); // character spacing
        Self { buf }
    }

    fn line(&mut self, class: LineClass, text: &str) {
        let (bold, size) = match class {
            LineClass::Emphasis => (1u8, 0x11u8),
            LineClass::Normal => (0, 0x00),
        };
        self.buf.extend_from_slice(&[ESC, b'E', bold]);
        self.buf.extend_from_slice(&[GS, b'!', size]);
        self.buf.extend(text.chars().map(encode_char));
        self.buf.push(b'\n');
    }

    /// Feed 7 lines and partial-cut.
    fn finish(mut self) -> Vec<u8> {
        self.buf.extend_from_slice(&[ESC, b'd', 7]);
        self.buf.extend_from_slice(&[GS, b'V', 0]);
        self.buf
    }
}

/// Latin-1 byte mapping with the PC858 euro code point.
fn encode_char(c: char) -> u8 {
    match c {
        '€' => 0xD5,
        c if (c as u32) <= 0xFF => c as u32 as u8,
        _ => b'?',
    }
}

/// One order line on a kitchen ticket.
#[derive(Debug, Clone)]
pub struct TicketItem {
    pub name: String,
    pub quantity: i64,
    pub notes: Option<String>,
}

/// Kitchen ticket data extracted from a claimed job payload.
#[derive(Debug, Clone)]
pub struct KitchenTicket {
    pub restaurant_name: Option<String>,
    pub department: String,
    pub table: Option<String>,
    pub order_number: Option<String>,
    pub created_at: Option<DateTime<FixedOffset>>,
    pub items: Vec<TicketItem>,
}

impl KitchenTicket {
    pub fn from_job(job: &KitchenJob) -> Self {
        let payload = &job.payload;
        Self {
            restaurant_name: str_field(payload, "restaurant_name"),
            department: job.department_key(),
            table: str_field(payload, "table_number"),
            order_number: str_field(payload, "order_number"),
            created_at: str_field(payload, "created_at")
                .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok()),
            items: payload
                .get("items")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(ticket_item).collect())
                .unwrap_or_default(),
        }
    }
}

fn ticket_item(value: &Value) -> TicketItem {
    TicketItem {
        name: str_field(value, "name").unwrap_or_else(|| "?".to_string()),
        quantity: num_field(value, "quantity")
            .map(|q| q.round() as i64)
            .filter(|q| *q > 0)
            .unwrap_or(1),
        notes: str_field(value, "notes"),
    }
}

/// Render a kitchen ticket as an ESC/POS byte stream.
pub fn render_kitchen_ticket(ticket: &KitchenTicket) -> Vec<u8> {
    let mut builder = EscPosBuilder::new();

    let order = ticket.order_number.as_deref().unwrap_or("-");
    builder.line(
        LineClass::Normal,
        &format!("COMANDA {} #{order}", ticket.department.to_uppercase()),
    );
    builder.line(
        LineClass::Emphasis,
        &format!("TAVOLO: {}", ticket.table.as_deref().unwrap_or("-").to_uppercase()),
    );
    if let Some(at) = ticket.created_at {
        builder.line(
            LineClass::Normal,
            &format!("DATA: {}", at.format("%Y/%-m/%-d %H:%M")),
        );
    }
    builder.line(LineClass::Normal, &"-".repeat(COLUMNS));

    for item in &ticket.items {
        let text = format!("{}x {}", item.quantity, prettify_dish_name(&item.name));
        for line in word_wrap(&text, COLUMNS) {
            builder.line(LineClass::Emphasis, &line);
        }
        if let Some(notes) = &item.notes {
            for line in word_wrap(&format!("Nota: {notes}"), COLUMNS - 2) {
                builder.line(LineClass::Normal, &format!(" {line}"));
            }
        }
    }

    if let Some(name) = &ticket.restaurant_name {
        builder.line(LineClass::Normal, &format!("-- {name} --"));
    }

    builder.finish()
}

/// Non-fiscal receipt data extracted from a claimed job payload.
#[derive(Debug, Clone)]
pub struct NonFiscalReceipt {
    pub restaurant_name: Option<String>,
    pub ayce: f64,
    pub coperto: f64,
    pub extra: f64,
    pub total: f64,
    pub payment_method: String,
}

impl NonFiscalReceipt {
    pub fn from_job(job: &ReceiptJob) -> Self {
        let payload = &job.payload;
        Self {
            restaurant_name: str_field(payload, "restaurant_name"),
            ayce: num_field(payload, "ayce").unwrap_or(0.0),
            coperto: num_field(payload, "coperto").unwrap_or(0.0),
            extra: num_field(payload, "extra").unwrap_or(0.0),
            total: num_field(payload, "total_amount").unwrap_or(0.0),
            payment_method: str_field(payload, "payment_method")
                .unwrap_or_else(|| "cash".to_string()),
        }
    }
}

/// Payment label for receipt bodies: `Carta` for card payments, `Contanti`
/// otherwise.
pub fn payment_label(method: &str) -> &'static str {
    match method.trim().to_lowercase().as_str() {
        "card" | "carta" => "Carta",
        _ => "Contanti",
    }
}

/// Render a non-fiscal courtesy receipt as an ESC/POS byte stream.
pub fn render_non_fiscal_receipt(receipt: &NonFiscalReceipt) -> Vec<u8> {
    let mut builder = EscPosBuilder::new();
    let frame = "=".repeat(COLUMNS);

    builder.line(LineClass::Normal, &frame);
    if let Some(name) = &receipt.restaurant_name {
        builder.line(LineClass::Normal, &center(&name.to_uppercase(), COLUMNS));
    }
    builder.line(LineClass::Normal, &frame);

    for (label, amount) in [
        ("AYCE", receipt.ayce),
        ("Coperto", receipt.coperto),
        ("Extra", receipt.extra),
    ] {
        if amount > 0.0 {
            builder.line(LineClass::Normal, &amount_row(label, amount, COLUMNS));
        }
    }

    builder.line(LineClass::Normal, &"-".repeat(COLUMNS));
    builder.line(LineClass::Normal, &amount_row("TOTALE", receipt.total, COLUMNS));
    builder.line(LineClass::Normal, payment_label(&receipt.payment_method));
    builder.line(LineClass::Normal, &frame);
    builder.line(LineClass::Normal, &center("Grazie per la visita!", COLUMNS));
    builder.line(LineClass::Normal, &center("*** NON FISCALE ***", COLUMNS));

    builder.finish()
}
