// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listeners notified by the scheduler
//!
//! [`DataEvents`] carries fetch traffic back to whoever owns the cached
//! state. [`Inspector`] mirrors scheduler internals for debugging and never
//! influences scheduling.

use crate::key::ResourceKey;
use crate::record::RecordId;
use crate::state::{FetchOutcome, ResourceError};
use crate::traced::TracedEvent;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Receives request and response notifications, one per key
///
/// After a timeout resend the original call may still answer. Every answer
/// is delivered here, so the cached state reflects whichever arrived last.
pub trait DataEvents: Send + Sync + 'static {
    fn data_requested(&self, keys: &[ResourceKey], at: Instant);

    fn data_received(&self, key: &ResourceKey, outcome: &FetchOutcome, at: Instant);
}

/// Data listener that does nothing
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpDataEvents;

impl DataEvents for NoOpDataEvents {
    fn data_requested(&self, _keys: &[ResourceKey], _at: Instant) {}

    fn data_received(&self, _key: &ResourceKey, _outcome: &FetchOutcome, _at: Instant) {}
}

/// Scheduler activity, mirrored to an [`Inspector`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InspectorEvent {
    RequestScheduled {
        record: RecordId,
        key: ResourceKey,
        operation: String,
    },
    RequestExtended {
        record: RecordId,
        key: ResourceKey,
    },
    BatchSent {
        operation: String,
        keys: Vec<ResourceKey>,
        resend: bool,
    },
    BatchRejected {
        operation: String,
        error: String,
    },
    RecordCompleted {
        record: RecordId,
        key: ResourceKey,
    },
    RecordFailed {
        record: RecordId,
        key: ResourceKey,
        error: ResourceError,
    },
    ResendsExhausted {
        record: RecordId,
        key: ResourceKey,
        attempts: u32,
    },
    RecordsCleaned {
        count: usize,
    },
    TimerArmed {
        #[serde(with = "humantime_serde")]
        delay: Duration,
    },
    RequirementsChanged {
        keys: usize,
    },
}

impl TracedEvent for InspectorEvent {
    fn name(&self) -> &'static str {
        match self {
            InspectorEvent::RequestScheduled { .. } => "request_scheduled",
            InspectorEvent::RequestExtended { .. } => "request_extended",
            InspectorEvent::BatchSent { .. } => "batch_sent",
            InspectorEvent::BatchRejected { .. } => "batch_rejected",
            InspectorEvent::RecordCompleted { .. } => "record_completed",
            InspectorEvent::RecordFailed { .. } => "record_failed",
            InspectorEvent::ResendsExhausted { .. } => "resends_exhausted",
            InspectorEvent::RecordsCleaned { .. } => "records_cleaned",
            InspectorEvent::TimerArmed { .. } => "timer_armed",
            InspectorEvent::RequirementsChanged { .. } => "requirements_changed",
        }
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            InspectorEvent::RequestScheduled {
                record,
                key,
                operation,
            } => vec![
                ("record", record.to_string()),
                ("key", key.to_string()),
                ("operation", operation.clone()),
            ],
            InspectorEvent::RequestExtended { record, key }
            | InspectorEvent::RecordCompleted { record, key } => {
                vec![("record", record.to_string()), ("key", key.to_string())]
            }
            InspectorEvent::BatchSent {
                operation,
                keys,
                resend,
            } => vec![
                ("operation", operation.clone()),
                ("keys", join_keys(keys)),
                ("resend", resend.to_string()),
            ],
            InspectorEvent::BatchRejected { operation, error } => vec![
                ("operation", operation.clone()),
                ("error", error.clone()),
            ],
            InspectorEvent::RecordFailed { record, key, error } => vec![
                ("record", record.to_string()),
                ("key", key.to_string()),
                ("error", error.to_string()),
            ],
            InspectorEvent::ResendsExhausted {
                record,
                key,
                attempts,
            } => vec![
                ("record", record.to_string()),
                ("key", key.to_string()),
                ("attempts", attempts.to_string()),
            ],
            InspectorEvent::RecordsCleaned { count } => vec![("count", count.to_string())],
            InspectorEvent::TimerArmed { delay } => {
                vec![("delay_ms", delay.as_millis().to_string())]
            }
            InspectorEvent::RequirementsChanged { keys } => vec![("keys", keys.to_string())],
        }
    }
}

fn join_keys(keys: &[ResourceKey]) -> String {
    keys.iter()
        .map(ResourceKey::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Observer of scheduler internals
pub trait Inspector: Send + Sync + 'static {
    fn observe(&self, event: &InspectorEvent);
}

/// Inspector that ignores everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpInspector;

impl Inspector for NoOpInspector {
    fn observe(&self, _event: &InspectorEvent) {}
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
