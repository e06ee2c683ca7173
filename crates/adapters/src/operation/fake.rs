// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake operation for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use async_trait::async_trait;
use freshen_core::{
    FetchOutcome, Operation, OperationError, OperationResponse, Payload, ResourceError,
    ResourceKey,
};
use futures::FutureExt;
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Recorded operation call
#[derive(Debug, Clone, PartialEq)]
pub struct OperationCall {
    pub keys: Vec<ResourceKey>,
    pub payload: Option<Payload>,
}

#[derive(Default)]
struct FakeOperationState {
    calls: Vec<OperationCall>,
    outcomes: HashMap<ResourceKey, FetchOutcome>,
    omitted: HashSet<ResourceKey>,
    fail_with: Option<OperationError>,
    per_key: bool,
    held: bool,
    waiting: VecDeque<oneshot::Sender<()>>,
}

/// Scriptable operation
///
/// Unscripted keys answer `{"key": <key>, "call": <call number>}`, so tests
/// can tell which call produced the cached value.
#[derive(Clone, Default)]
pub struct FakeOperation {
    state: Arc<Mutex<FakeOperationState>>,
}

impl FakeOperation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<OperationCall> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).calls.len()
    }

    pub fn set_data(&self, key: &ResourceKey, value: serde_json::Value) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.outcomes.insert(key.clone(), Ok(value));
    }

    pub fn set_error(&self, key: &ResourceKey, error: ResourceError) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.outcomes.insert(key.clone(), Err(error));
    }

    /// Leave `key` out of every response
    pub fn omit(&self, key: &ResourceKey) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.omitted.insert(key.clone());
    }

    /// Fail every call as a whole
    pub fn fail_with(&self, error: OperationError) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).fail_with = Some(error);
    }

    pub fn succeed(&self) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).fail_with = None;
    }

    /// Answer with one future per key instead of a combined map
    pub fn per_key(&self, enabled: bool) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).per_key = enabled;
    }

    /// Park later calls until released
    pub fn hold(&self) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).held = true;
    }

    /// Number of parked calls
    pub fn waiting(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .waiting
            .len()
    }

    /// Let the oldest parked call answer. Returns false when none is parked.
    pub fn release_next(&self) -> bool {
        let sender = self
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .waiting
            .pop_front();
        match sender {
            Some(sender) => {
                let _ = sender.send(());
                true
            }
            None => false,
        }
    }

    /// Stop parking and let every parked call answer
    pub fn release_all(&self) -> usize {
        let waiting = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.held = false;
            std::mem::take(&mut state.waiting)
        };
        let count = waiting.len();
        for sender in waiting {
            let _ = sender.send(());
        }
        count
    }

    /// Yield until at least `count` calls were made. Returns false on giving up.
    pub async fn wait_for_calls(&self, count: usize) -> bool {
        for _ in 0..1000 {
            if self.call_count() >= count {
                return true;
            }
            tokio::task::yield_now().await;
        }
        self.call_count() >= count
    }
}

#[async_trait]
impl Operation for FakeOperation {
    async fn call(
        &self,
        keys: Vec<ResourceKey>,
        payload: Option<Payload>,
    ) -> Result<OperationResponse, OperationError> {
        let (call_number, gate) = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.calls.push(OperationCall {
                keys: keys.clone(),
                payload,
            });
            let gate = if state.held {
                let (tx, rx) = oneshot::channel();
                state.waiting.push_back(tx);
                Some(rx)
            } else {
                None
            };
            (state.calls.len(), gate)
        };

        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(error) = &state.fail_with {
            return Err(error.clone());
        }

        let outcomes = keys
            .into_iter()
            .filter(|key| !state.omitted.contains(key))
            .map(|key| {
                let outcome = state.outcomes.get(&key).cloned().unwrap_or_else(|| {
                    Ok(json!({"key": key.to_string(), "call": call_number}))
                });
                (key, outcome)
            });

        if state.per_key {
            Ok(OperationResponse::PerKey(
                outcomes
                    .map(|(key, outcome)| (key, futures::future::ready(outcome).boxed()))
                    .collect(),
            ))
        } else {
            Ok(OperationResponse::combined(outcomes))
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
