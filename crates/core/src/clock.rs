// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time source for freshness and timeout decisions
//!
//! Every decision the scheduler makes is a comparison against "now", so the
//! clock is injected. Timestamps that may be absent (never requested, never
//! received) are compared with [`is_earlier`].

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Monotonic wall time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually driven time, shared by every clone
///
/// Starts at the instant it was created and only moves when told to.
#[derive(Clone, Debug)]
pub struct FakeClock {
    now: Arc<Mutex<Instant>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) += by;
    }

    /// Jump to `at`, which may lie before the current reading
    pub fn set(&self, at: Instant) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Whether `a` happened strictly before `b`.
///
/// `None` means "never", which precedes every real timestamp. Two `None`s
/// are not ordered.
pub fn is_earlier(a: Option<Instant>, b: Option<Instant>) -> bool {
    match (a, b) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(a), Some(b)) => a < b,
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
