// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request lifecycle as seen through the client.

use crate::prelude::*;
use freshen_core::RecordStatus;

fn status_of(world: &World, name: &str) -> Vec<RecordStatus> {
    world
        .client
        .records()
        .into_iter()
        .filter(|record| record.key == key(name))
        .map(|record| record.status)
        .collect()
}

#[tokio::test]
async fn thing_goes_from_overdue_to_cleaned_up() {
    let (world, read) = World::with_fake_read();
    read.hold();

    world.watch("panel", "thing:1", secs(60));
    assert_eq!(status_of(&world, "thing:1"), vec![RecordStatus::Overdue]);

    let tick = tokio::spawn(world.client.process_requests());
    assert!(read.wait_for_calls(1).await);
    assert_eq!(status_of(&world, "thing:1"), vec![RecordStatus::InFlight]);

    world.clock.advance(freshen_core::DEFAULT_TIMEOUT + Duration::from_millis(1));
    assert_eq!(status_of(&world, "thing:1"), vec![RecordStatus::TimedOut]);

    read.release_all();
    tick.await.unwrap().unwrap();
    assert_eq!(status_of(&world, "thing:1"), vec![RecordStatus::Complete]);

    world.tick().await;
    assert!(status_of(&world, "thing:1").is_empty());
    assert!(world.client.get_data(&key("thing:1")).is_some());
}

#[tokio::test]
async fn consumers_share_one_fetch() {
    let (world, read) = World::with_fake_read();

    world.watch("header", "user:1", secs(60));
    world.watch("sidebar", "user:1", secs(30));
    world.watch("sidebar-2", "user:2", secs(30));
    world.tick().await;

    assert_eq!(read.call_count(), 1);
    assert_eq!(read.calls()[0].keys, vec![key("user:1"), key("user:2")]);
}

#[tokio::test]
async fn released_consumer_stops_driving_fetches() {
    let (world, read) = World::with_fake_read();
    world.watch("panel", "a", secs(10));
    world.tick().await;
    assert!(world.client.release(&ConsumerId::new("panel")).unwrap());

    world.clock.advance(secs(60));
    let updates = world.client.revalidate().unwrap();
    world.tick().await;

    assert!(updates.due_keys.is_empty());
    assert_eq!(read.call_count(), 1);
}

#[tokio::test]
async fn whole_call_failure_recovers_on_resend() {
    let (world, read) = World::with_fake_read();
    read.fail_with(freshen_core::OperationError::Transport("connection reset".into()));
    world.watch("panel", "a", secs(60));

    let err = world.client.process_requests().await.unwrap_err();
    assert!(matches!(err, SchedulerError::Operation { .. }));
    assert_eq!(world.client.get_data(&key("a")), None);

    read.succeed();
    world.clock.advance(freshen_core::DEFAULT_TIMEOUT + secs(1));
    world.tick().await;

    assert_eq!(read.call_count(), 2);
    assert!(world.client.get_data(&key("a")).is_some());
}
