// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! freshen-core: pure model of a freshness-driven data scheduler
//!
//! This crate provides:
//! - Resource keys, requirements and the per-consumer requirement table
//! - The update calculator deciding which keys are due
//! - The request record state machine
//! - Adapter traits for operations, timers and listeners
//! - Scheduler configuration

pub mod clock;
pub mod config;
pub mod traced;

// Model (order matters for dependencies)
pub mod key;
pub mod requirement;
pub mod consumer;
pub mod state;
pub mod calculator;
pub mod record;

// Seams to the outside world
pub mod events;
pub mod operation;
pub mod timer;

// Re-exports
pub use calculator::{calculate_updates, CheckBounds, Updates};
pub use clock::{is_earlier, Clock, FakeClock, SystemClock};
pub use config::{ConfigError, SchedulerConfig};
pub use consumer::{ConsumerId, ConsumerRequirements};
pub use events::{DataEvents, Inspector, InspectorEvent, NoOpDataEvents, NoOpInspector};
pub use key::{KeyError, ResourceKey};
pub use operation::{Operation, OperationError, OperationResponse, OperationTable};
pub use record::{RecordId, RecordStatus, RequestRecord};
pub use requirement::{
    merge_requirement, Requirement, RequirementError, RequirementMap, DEFAULT_TIMEOUT,
};
pub use state::{FetchOutcome, Payload, ResourceError, ResourceState, StateMap};
pub use timer::{Timer, TimerCallback};
pub use traced::TracedEvent;
