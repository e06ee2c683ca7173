// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing infrastructure for scheduler activity

/// Something the scheduler did that is worth a log line
///
/// Provides consistent naming and structured fields for logging.
pub trait TracedEvent {
    /// Event name for log lines (e.g., "batch_sent", "record_failed")
    fn name(&self) -> &'static str;

    /// Key-value pairs for structured logging
    fn fields(&self) -> Vec<(&'static str, String)>;
}
