// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation adapters plugged into a client.

use crate::prelude::*;
use freshen_adapters::{FnOperation, IsolatedOperation, TracedOperation};
use freshen_core::{OperationError, OperationResponse, Payload, ResourceError};
use std::sync::atomic::{AtomicUsize, Ordering};

#[tokio::test]
async fn closure_operation_serves_reads() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let read = FnOperation::new(move |keys: Vec<ResourceKey>, _payload: Option<Payload>| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            Ok::<_, OperationError>(OperationResponse::combined(
                keys.into_iter()
                    .map(|key| (key.clone(), Ok(json!({"id": key.path()})))),
            ))
        }
    });
    let world = World::new(OperationTable::new().with("read", TracedOperation::new("read", read)));

    world.watch("panel", "thing:1", secs(60));
    world.tick().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        world.client.get_data(&key("thing:1")),
        Some(json!({"id": "thing:1"}))
    );
}

#[tokio::test]
async fn isolated_failure_lands_in_each_key_state() {
    let read = FakeOperation::new();
    read.fail_with(OperationError::Rejected("bad request".into()));
    let world = World::new(
        OperationTable::new().with("read", IsolatedOperation::new("read", read.clone())),
    );

    world.watch("panel", "a", secs(60));
    world.watch("panel-2", "b", secs(60));
    world.tick().await;

    let state = world.client.state();
    for name in ["a", "b"] {
        assert!(matches!(
            state[&key(name)].error,
            Some(ResourceError::Operation { ref operation, .. }) if operation == "read"
        ));
    }
    assert!(world.client.records().iter().all(|record| record.attempts == 1));
}

#[tokio::test]
async fn mutations_use_their_own_operation() {
    let read = FakeOperation::new();
    let write = FakeOperation::new();
    let world = World::new(
        OperationTable::new()
            .with("read", read.clone())
            .with("update", write.clone()),
    );
    let payload = |value: Value| value.as_object().cloned().unwrap();

    world
        .client
        .mutate(
            "update",
            [
                (key("user:1"), payload(json!({"name": "Ada"}))),
                (key("user:2"), payload(json!({"name": "Grace"}))),
            ]
            .into(),
        )
        .unwrap();
    world.tick().await;

    assert_eq!(read.call_count(), 0);
    similar_asserts::assert_eq!(
        write.calls()[0].payload,
        Some(payload(json!({
            "user:1": {"name": "Ada"},
            "user:2": {"name": "Grace"},
        })))
    );
}

#[test]
fn unknown_mutation_operation_is_an_error() {
    let (world, _read) = World::with_fake_read();

    let err = world
        .client
        .mutate("delete", [(key("a"), Payload::new())].into())
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Scheduler(SchedulerError::UnknownOperation(_))
    ));
}
