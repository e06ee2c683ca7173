// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use freshen_adapters::{FakeOperation, FakeTimer, RecordingInspector};
use freshen_core::{ConfigError, FakeClock, RecordStatus, RequirementError, ResourceError};
use serde_json::json;

struct Harness {
    clock: FakeClock,
    timer: FakeTimer,
    read: FakeOperation,
    write: FakeOperation,
    inspector: RecordingInspector,
    client: Client<FakeClock, FakeTimer>,
}

fn deps(config: SchedulerConfig) -> (ClientDeps<FakeClock, FakeTimer>, FakeOperation, FakeOperation) {
    let read = FakeOperation::new();
    let write = FakeOperation::new();
    let deps = ClientDeps {
        clock: FakeClock::new(),
        timer: FakeTimer::new(),
        config,
        operations: OperationTable::new()
            .with("read", read.clone())
            .with("write", write.clone()),
        inspector: Arc::new(RecordingInspector::new()),
    };
    (deps, read, write)
}

fn harness() -> Harness {
    let (mut deps, read, write) = deps(SchedulerConfig::default());
    let inspector = RecordingInspector::new();
    deps.inspector = Arc::new(inspector.clone());
    let clock = deps.clock.clone();
    let timer = deps.timer.clone();
    let client = Client::new(deps).unwrap();
    Harness {
        clock,
        timer,
        read,
        write,
        inspector,
        client,
    }
}

fn key(name: &str) -> ResourceKey {
    ResourceKey::new(name)
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

impl Harness {
    fn watch(&self, consumer: &str, name: &str, freshness: u64) -> Option<Value> {
        self.client
            .select(&ConsumerId::new(consumer), |selection| {
                selection
                    .require_data(Requirement::fresh_within(secs(freshness)), &key(name))
                    .cloned()
            })
            .unwrap()
    }
}

#[tokio::test]
async fn selector_declares_requirement_and_triggers_read() {
    let h = harness();
    h.read.set_data(&key("thing:1"), json!({"name": "first"}));

    assert_eq!(h.watch("panel", "thing:1", 60), None);
    let records = h.client.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RecordStatus::Overdue);
    assert_eq!(records[0].operation, "read");

    h.client.process_requests().await.unwrap();

    assert_eq!(h.client.get_data(&key("thing:1")), Some(json!({"name": "first"})));
    assert_eq!(h.watch("panel", "thing:1", 60), Some(json!({"name": "first"})));
    assert!(h.inspector.names().contains(&"requirements_changed"));
}

#[tokio::test]
async fn subscribers_see_each_state_change() {
    let h = harness();
    let mut rx = h.client.subscribe();
    h.watch("panel", "a", 60);

    h.client.process_requests().await.unwrap();

    let mut snapshots = Vec::new();
    while let Ok(snapshot) = rx.try_recv() {
        snapshots.push(snapshot);
    }
    // Requested, then received
    assert_eq!(snapshots.len(), 2);
    assert!(snapshots[0][&key("a")].is_in_flight());
    assert!(snapshots[1][&key("a")].data.is_some());
    assert!(Arc::ptr_eq(&snapshots[1], &h.client.state()));
}

#[test]
fn requirements_merge_across_consumers() {
    let h = harness();
    h.watch("slow", "a", 90);
    h.watch("fast", "a", 45);
    assert_eq!(h.client.requirements()[&key("a")].freshness, Some(secs(45)));

    assert!(h.client.release(&ConsumerId::new("fast")).unwrap());
    assert_eq!(h.client.requirements()[&key("a")].freshness, Some(secs(90)));

    assert!(!h.client.release(&ConsumerId::new("fast")).unwrap());
}

#[test]
fn reselecting_replaces_previous_declarations() {
    let h = harness();
    h.watch("panel", "a", 60);
    h.watch("panel", "b", 60);

    let requirements = h.client.requirements();
    assert!(!requirements.contains_key(&key("a")));
    assert!(requirements.contains_key(&key("b")));
}

#[tokio::test]
async fn stale_data_is_fetched_again() {
    let h = harness();
    h.watch("panel", "a", 60);
    h.client.process_requests().await.unwrap();
    assert_eq!(h.read.call_count(), 1);

    h.clock.advance(secs(30));
    let updates = h.client.revalidate().unwrap();
    assert!(updates.due_keys.is_empty());
    h.client.process_requests().await.unwrap();
    assert_eq!(h.read.call_count(), 1);

    h.clock.advance(secs(31));
    let updates = h.client.revalidate().unwrap();
    assert_eq!(updates.due_keys, vec![key("a")]);
    h.client.process_requests().await.unwrap();
    assert_eq!(h.read.call_count(), 2);
}

#[test]
fn check_timer_is_armed_for_next_deadline() {
    let h = harness();
    h.watch("panel", "a", 60);

    let updates = h.client.revalidate().unwrap();

    assert!(h.timer.armed().contains(&updates.next_check_delay));
}

#[tokio::test]
async fn error_keeps_previous_data() {
    let h = harness();
    h.read.set_data(&key("a"), json!(1));
    h.watch("panel", "a", 60);
    h.client.process_requests().await.unwrap();

    h.read.set_error(&key("a"), ResourceError::transport("503"));
    h.clock.advance(secs(61));
    h.client.revalidate().unwrap();
    h.client.process_requests().await.unwrap();

    let state = h.client.state();
    let a = &state[&key("a")];
    assert_eq!(a.data, Some(json!(1)));
    assert_eq!(a.error, Some(ResourceError::transport("503")));
}

#[tokio::test]
async fn mutation_sends_combined_payload() {
    let h = harness();
    let payload = json!({"name": "Ada"}).as_object().cloned().unwrap();

    let ids = h
        .client
        .mutate("write", BTreeMap::from([(key("user:1"), payload)]))
        .unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(h.timer.armed(), vec![Duration::ZERO]);

    h.client.process_requests().await.unwrap();

    assert_eq!(h.write.call_count(), 1);
    assert_eq!(
        h.write.calls()[0].payload,
        Some(json!({"user:1": {"name": "Ada"}}).as_object().cloned().unwrap())
    );
    assert!(h.client.get_data(&key("user:1")).is_some());
}

#[tokio::test]
async fn last_answer_wins() {
    let h = harness();
    h.read.hold();
    h.watch("panel", "a", 60);

    let original = tokio::spawn(h.client.process_requests());
    assert!(h.read.wait_for_calls(1).await);
    h.clock.advance(freshen_core::DEFAULT_TIMEOUT + secs(1));
    let resend = tokio::spawn(h.client.process_requests());
    assert!(h.read.wait_for_calls(2).await);

    assert!(h.read.release_next());
    original.await.unwrap().unwrap();
    assert_eq!(h.client.get_data(&key("a")), Some(json!({"key": "a", "call": 1})));

    assert!(h.read.release_next());
    resend.await.unwrap().unwrap();
    assert_eq!(h.client.get_data(&key("a")), Some(json!({"key": "a", "call": 2})));
}

#[test]
fn zero_timeout_is_rejected() {
    let h = harness();
    let err = h
        .client
        .select(&ConsumerId::new("panel"), |selection| {
            selection.require_data(Requirement::new().with_timeout(Duration::ZERO), &key("a"));
        })
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Requirement(RequirementError::ZeroTimeout { .. })
    ));
    assert!(h.client.records().is_empty());
}

#[test]
fn invalid_config_is_rejected() {
    let (deps, _, _) = deps(SchedulerConfig {
        min_check_delay: secs(10),
        max_check_delay: secs(1),
        ..SchedulerConfig::default()
    });

    let err = Client::new(deps).err().unwrap();
    assert!(matches!(err, ClientError::Config(ConfigError::Invalid(_))));
}

#[test]
fn missing_read_operation_is_rejected() {
    let (deps, _, _) = deps(SchedulerConfig {
        read_operation: "fetch".into(),
        ..SchedulerConfig::default()
    });

    let err = Client::new(deps).err().unwrap();
    assert!(matches!(
        err,
        ClientError::Scheduler(SchedulerError::UnknownOperation(ref name)) if name == "fetch"
    ));
}
