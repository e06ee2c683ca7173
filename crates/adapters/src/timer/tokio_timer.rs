// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tokio-backed timer

use freshen_core::{Timer, TimerCallback};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Timer that sleeps on the current tokio runtime
///
/// Arming outside a runtime logs an error and returns an inert handle.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioTimer;

impl TokioTimer {
    pub fn new() -> Self {
        Self
    }
}

impl Timer for TokioTimer {
    type Handle = Option<JoinHandle<()>>;

    fn set_timer(&self, delay: Duration, callback: TimerCallback) -> Self::Handle {
        match Handle::try_current() {
            Ok(runtime) => Some(runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                callback();
            })),
            Err(e) => {
                tracing::error!(error = %e, delay_ms = delay.as_millis() as u64, "no runtime, timer not armed");
                None
            }
        }
    }

    fn clear_timer(&self, handle: Self::Handle) {
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}
