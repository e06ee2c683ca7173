// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for timers, transports and observability

pub mod operation;
pub mod timer;
pub mod traced;

pub use operation::{FnOperation, IsolatedOperation};
pub use timer::TokioTimer;
pub use traced::{TracedOperation, TracingInspector};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod recording;

#[cfg(any(test, feature = "test-support"))]
pub use operation::{FakeOperation, OperationCall};
#[cfg(any(test, feature = "test-support"))]
pub use recording::{DataCall, RecordingEvents, RecordingInspector};
#[cfg(any(test, feature = "test-support"))]
pub use timer::{FakeTimer, FakeTimerHandle};
