// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake timer for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use freshen_core::{Timer, TimerCallback};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Handle of a fake timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FakeTimerHandle(pub u64);

struct Armed {
    delay: Duration,
    callback: TimerCallback,
}

#[derive(Default)]
struct FakeTimerState {
    next_handle: u64,
    armed: BTreeMap<FakeTimerHandle, Armed>,
    history: Vec<Duration>,
    cleared: usize,
}

/// Timer that only fires when the test says so
#[derive(Clone, Default)]
pub struct FakeTimer {
    state: Arc<Mutex<FakeTimerState>>,
}

impl FakeTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays of the currently armed timers, oldest first
    pub fn armed(&self) -> Vec<Duration> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.armed.values().map(|armed| armed.delay).collect()
    }

    /// Delay of the most recently armed timer still pending
    pub fn last_delay(&self) -> Option<Duration> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.armed.values().next_back().map(|armed| armed.delay)
    }

    /// Every delay ever armed, in arming order
    pub fn history(&self) -> Vec<Duration> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .history
            .clone()
    }

    pub fn cleared_count(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).cleared
    }

    /// Fire the oldest armed timer. Returns false when none is armed.
    pub fn fire_next(&self) -> bool {
        let armed = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.armed.pop_first()
        };
        match armed {
            // Run outside the lock: callbacks usually re-arm
            Some((_, armed)) => {
                (armed.callback)();
                true
            }
            None => false,
        }
    }

    /// Fire every timer armed right now. Returns how many fired.
    pub fn fire_all(&self) -> usize {
        let armed = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut state.armed)
        };
        let count = armed.len();
        for (_, armed) in armed {
            (armed.callback)();
        }
        count
    }
}

impl Timer for FakeTimer {
    type Handle = FakeTimerHandle;

    fn set_timer(&self, delay: Duration, callback: TimerCallback) -> Self::Handle {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.next_handle += 1;
        let handle = FakeTimerHandle(state.next_handle);
        state.armed.insert(handle, Armed { delay, callback });
        state.history.push(delay);
        handle
    }

    fn clear_timer(&self, handle: Self::Handle) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.armed.remove(&handle).is_some() {
            state.cleared += 1;
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
