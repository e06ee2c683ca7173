// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Injectable one-shot timers

use std::time::Duration;

/// Callback run when a timer fires
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// One-shot timer primitive
///
/// A cleared handle must never run its callback. Firing an already-fired
/// handle's clear is a no-op.
pub trait Timer: Clone + Send + Sync + 'static {
    type Handle: Send + 'static;

    fn set_timer(&self, delay: Duration, callback: TimerCallback) -> Self::Handle;

    fn clear_timer(&self, handle: Self::Handle);
}
