// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for behavioral specs

#![allow(dead_code, unused_imports)]

pub use freshen_adapters::{FakeOperation, FakeTimer, RecordingInspector};
pub use freshen_core::{
    ConsumerId, FakeClock, Operation, OperationTable, Requirement, ResourceKey, SchedulerConfig,
};
pub use freshen_engine::{Client, ClientDeps, ClientError, SchedulerError};
pub use serde_json::{json, Value};
pub use std::sync::Arc;
pub use std::time::Duration;

pub type TestClient = Client<FakeClock, FakeTimer>;

/// A client on fake time with `operations` registered
pub struct World {
    pub clock: FakeClock,
    pub timer: FakeTimer,
    pub inspector: RecordingInspector,
    pub client: TestClient,
}

impl World {
    pub fn new(operations: OperationTable) -> Self {
        Self::with_config(SchedulerConfig::default(), operations)
    }

    pub fn with_config(config: SchedulerConfig, operations: OperationTable) -> Self {
        let clock = FakeClock::new();
        let timer = FakeTimer::new();
        let inspector = RecordingInspector::new();
        let client = Client::new(ClientDeps {
            clock: clock.clone(),
            timer: timer.clone(),
            config,
            operations,
            inspector: Arc::new(inspector.clone()),
        })
        .unwrap();
        Self {
            clock,
            timer,
            inspector,
            client,
        }
    }

    /// Client reading through a fresh [`FakeOperation`]
    pub fn with_fake_read() -> (Self, FakeOperation) {
        let read = FakeOperation::new();
        (Self::new(OperationTable::new().with("read", read.clone())), read)
    }

    /// Run `consumer`'s selector requiring `name` fresh within `freshness`
    pub fn watch(&self, consumer: &str, name: &str, freshness: Duration) -> Option<Value> {
        self.client
            .select(&ConsumerId::new(consumer), |selection| {
                selection
                    .require_data(Requirement::fresh_within(freshness), &key(name))
                    .cloned()
            })
            .unwrap()
    }

    pub async fn tick(&self) {
        self.client.process_requests().await.unwrap();
    }
}

pub fn key(name: &str) -> ResourceKey {
    ResourceKey::new(name)
}

pub fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}
