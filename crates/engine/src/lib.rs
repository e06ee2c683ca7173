// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Freshen scheduling engine

mod batch;
mod client;
mod error;
mod scheduler;
mod store;

pub use client::{Client, ClientDeps, Selection};
pub use error::{ClientError, SchedulerError};
pub use scheduler::{RecordSnapshot, Scheduler, SchedulerDeps};
pub use store::CacheStore;
