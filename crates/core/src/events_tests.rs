// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

fn key(name: &str) -> ResourceKey {
    ResourceKey::new(name)
}

#[parameterized(
    scheduled = {
        InspectorEvent::RequestScheduled { record: RecordId(1), key: key("a"), operation: "read".into() },
        "request_scheduled"
    },
    batch = {
        InspectorEvent::BatchSent { operation: "read".into(), keys: vec![key("a")], resend: false },
        "batch_sent"
    },
    cleaned = { InspectorEvent::RecordsCleaned { count: 2 }, "records_cleaned" },
    timer = { InspectorEvent::TimerArmed { delay: Duration::from_millis(5) }, "timer_armed" },
)]
fn event_names(event: InspectorEvent, name: &str) {
    assert_eq!(event.name(), name);
}

#[test]
fn batch_fields_join_keys() {
    let event = InspectorEvent::BatchSent {
        operation: "read".into(),
        keys: vec![key("a"), key("b").with_param("x", "1")],
        resend: true,
    };

    assert_eq!(
        event.fields(),
        vec![
            ("operation", "read".to_string()),
            ("keys", "a,b?x=1".to_string()),
            ("resend", "true".to_string()),
        ]
    );
}

#[test]
fn events_serialize_tagged() {
    let event = InspectorEvent::RecordFailed {
        record: RecordId(3),
        key: key("thing:1"),
        error: ResourceError::MissingResult,
    };

    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        json!({
            "type": "record_failed",
            "record": 3,
            "key": "thing:1",
            "error": {"type": "missing_result"},
        })
    );
}

#[test]
fn no_op_listeners_accept_everything() {
    let now = Instant::now();
    NoOpDataEvents.data_requested(&[key("a")], now);
    NoOpDataEvents.data_received(&key("a"), &Ok(json!(1)), now);
    NoOpInspector.observe(&InspectorEvent::RecordsCleaned { count: 0 });
}
