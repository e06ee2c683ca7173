// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cached resource state with change notification
//!
//! The state map is immutable behind an `Arc`; every real change swaps in a
//! new map, so subscribers can compare snapshots by identity.

use freshen_core::{DataEvents, FetchOutcome, ResourceKey, ResourceState, StateMap};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc;

/// Client-owned cache of every key's state
#[derive(Default)]
pub struct CacheStore {
    state: Mutex<Arc<StateMap>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Arc<StateMap>>>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<StateMap> {
        Arc::clone(&self.state.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Receive every new snapshot. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Arc<StateMap>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn update<'k>(
        &self,
        keys: impl IntoIterator<Item = &'k ResourceKey>,
        apply: impl Fn(&mut ResourceState),
    ) {
        let (previous, next) = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let previous = Arc::clone(&state);
            let mut changes = Vec::new();
            for key in keys {
                let mut entry = previous.get(key).cloned().unwrap_or_default();
                apply(&mut entry);
                if previous.get(key) != Some(&entry) {
                    changes.push((key.clone(), entry));
                }
            }
            if !changes.is_empty() {
                let mut map = StateMap::clone(&previous);
                map.extend(changes);
                *state = Arc::new(map);
            }
            (previous, Arc::clone(&state))
        };

        if !Arc::ptr_eq(&previous, &next) {
            self.publish(&next);
        }
    }

    fn publish(&self, snapshot: &Arc<StateMap>) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|tx| tx.send(Arc::clone(snapshot)).is_ok());
    }
}

impl DataEvents for CacheStore {
    fn data_requested(&self, keys: &[ResourceKey], at: Instant) {
        self.update(keys, |state| state.record_requested(at));
    }

    fn data_received(&self, key: &ResourceKey, outcome: &FetchOutcome, at: Instant) {
        self.update([key], |state| state.record_received(outcome, at));
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
