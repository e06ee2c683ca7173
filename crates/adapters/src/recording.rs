// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording listeners for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use freshen_core::{DataEvents, FetchOutcome, Inspector, InspectorEvent, ResourceKey};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Recorded data notification
#[derive(Debug, Clone, PartialEq)]
pub enum DataCall {
    Requested { keys: Vec<ResourceKey>, at: Instant },
    Received {
        key: ResourceKey,
        outcome: FetchOutcome,
        at: Instant,
    },
}

/// Data listener that remembers every notification
#[derive(Clone, Default)]
pub struct RecordingEvents {
    calls: Arc<Mutex<Vec<DataCall>>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<DataCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Keys of every `data_requested` call, in order
    pub fn requested(&self) -> Vec<Vec<ResourceKey>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DataCall::Requested { keys, .. } => Some(keys),
                DataCall::Received { .. } => None,
            })
            .collect()
    }

    /// Every `data_received` call, in order
    pub fn received(&self) -> Vec<(ResourceKey, FetchOutcome)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DataCall::Received { key, outcome, .. } => Some((key, outcome)),
                DataCall::Requested { .. } => None,
            })
            .collect()
    }
}

impl DataEvents for RecordingEvents {
    fn data_requested(&self, keys: &[ResourceKey], at: Instant) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(DataCall::Requested {
                keys: keys.to_vec(),
                at,
            });
    }

    fn data_received(&self, key: &ResourceKey, outcome: &FetchOutcome, at: Instant) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(DataCall::Received {
                key: key.clone(),
                outcome: outcome.clone(),
                at,
            });
    }
}

/// Inspector that remembers every event
#[derive(Clone, Default)]
pub struct RecordingInspector {
    events: Arc<Mutex<Vec<InspectorEvent>>>,
}

impl RecordingInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<InspectorEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Names of recorded events, in order
    pub fn names(&self) -> Vec<&'static str> {
        use freshen_core::TracedEvent;
        self.events().iter().map(TracedEvent::name).collect()
    }
}

impl Inspector for RecordingInspector {
    fn observe(&self, event: &InspectorEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
