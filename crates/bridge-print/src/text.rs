// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text layout helpers for 42-column thermal tickets.

/// Printable columns in Font B on the supported printers.
pub const COLUMNS: usize = 42;

/// Greedy word wrap. Words longer than `width` are hard-split.
pub fn word_wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        // Hard-split oversized words first.
        while word.chars().count() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let head: String = word.chars().take(width).collect();
            word = word.chars().skip(width).collect();
            lines.push(head);
        }
        if word.is_empty() {
            continue;
        }
        if current.is_empty() {
            current = word;
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(&word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Prettify a dish name token by token: an all-caps token is title-cased,
/// any other token keeps its tail but gets an uppercased first letter.
pub fn prettify_dish_name(name: &str) -> String {
    name.split_whitespace()
        .map(prettify_token)
        .collect::<Vec<_>>()
        .join(" ")
}

fn prettify_token(token: &str) -> String {
    let has_lowercase = token.chars().any(|c| c.is_lowercase());
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let tail: String = chars.collect();
    if has_lowercase {
        format!("{}{tail}", first.to_uppercase())
    } else {
        format!("{}{}", first.to_uppercase(), tail.to_lowercase())
    }
}

/// Currency amount as `€ X,YY` with comma decimal, absolute value.
pub fn format_euro(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as i64;
    format!("€ {},{:02}", cents / 100, cents % 100)
}

/// Label on the left, amount right-aligned to `width` columns.
pub fn amount_row(label: &str, amount: f64, width: usize) -> String {
    let value = format_euro(amount);
    let label_len = label.chars().count();
    let value_len = value.chars().count();
    if label_len + 1 + value_len >= width {
        return format!("{label} {value}");
    }
    let pad = width - label_len - value_len;
    format!("{label}{}{value}", " ".repeat(pad))
}

/// Center a line within `width` columns (left-biased on odd padding).
pub fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let pad = (width - len) / 2;
    format!("{}{text}", " ".repeat(pad))
}
