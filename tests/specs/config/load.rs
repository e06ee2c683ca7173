// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler configuration loaded from TOML.

use crate::prelude::*;
use freshen_core::ConfigError;

#[tokio::test]
async fn batch_size_from_file_splits_calls() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("freshen.toml");
    std::fs::write(
        &path,
        r#"
max_batch_size = 2
max_check_delay = "1m"
read_operation = "fetch"
"#,
    )
    .unwrap();
    let config = SchedulerConfig::load(&path).unwrap();

    let fetch = FakeOperation::new();
    let world = World::with_config(config, OperationTable::new().with("fetch", fetch.clone()));
    for (i, name) in ["a", "b", "c"].iter().enumerate() {
        world.watch(&format!("consumer-{i}"), name, secs(60));
    }
    world.tick().await;

    let batches: Vec<_> = fetch.calls().into_iter().map(|call| call.keys).collect();
    assert_eq!(batches, vec![vec![key("a"), key("b")], vec![key("c")]]);
}

#[tokio::test]
async fn check_delay_is_capped_by_config() {
    let config = SchedulerConfig::from_toml_str(r#"max_check_delay = "30s""#).unwrap();
    let read = FakeOperation::new();
    let world = World::with_config(config, OperationTable::new().with("read", read.clone()));

    world.watch("panel", "a", secs(600));
    world.tick().await;
    let updates = world.client.revalidate().unwrap();

    assert!(updates.due_keys.is_empty());
    assert_eq!(updates.next_check_delay, secs(30));
    assert!(world.timer.armed().contains(&secs(30)));
}

#[test]
fn unknown_fields_are_rejected() {
    let err = SchedulerConfig::from_toml_str("max_retries = 3").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = SchedulerConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { path: ref p, .. } if *p == path));
}
