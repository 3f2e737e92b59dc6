// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded in-memory log ring mirrored to the shell's log stream.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

/// Capacity of the log ring; the oldest row is evicted on overflow.
pub const LOG_CAPACITY: usize = 500;

/// Severity of a log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One operator-visible log row.
#[derive(Debug, Clone, Serialize)]
pub struct LogRow {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Fixed-capacity ring buffer of log rows.
#[derive(Debug)]
pub struct LogBuffer {
    rows: VecDeque<LogRow>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }
}

impl LogBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a row, evicting the oldest when full. Returns the stored row.
    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) -> LogRow {
        let row = LogRow {
            at: Utc::now(),
            level,
            message: message.into(),
        };
        if self.rows.len() == self.capacity {
            self.rows.pop_front();
        }
        self.rows.push_back(row.clone());
        row
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in chronological order.
    pub fn snapshot(&self) -> Vec<LogRow> {
        self.rows.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_snapshot_preserve_order() {
        let mut buf = LogBuffer::with_capacity(10);
        buf.push(LogLevel::Info, "first");
        buf.push(LogLevel::Warn, "second");
        let rows = buf.snapshot();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].message, "first");
        assert_eq!(rows[1].message, "second");
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut buf = LogBuffer::with_capacity(3);
        for i in 0..5 {
            buf.push(LogLevel::Info, format!("row {i}"));
        }
        let rows = buf.snapshot();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].message, "row 2");
        assert_eq!(rows[2].message, "row 4");
    }

    #[test]
    fn level_serializes_uppercase() {
        assert_eq!(LogLevel::Warn.to_string(), "WARN");
        assert_eq!(serde_json::to_string(&LogLevel::Error).unwrap(), "\"ERROR\"");
    }
}
