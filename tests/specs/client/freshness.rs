// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Freshness requirements decide when data is fetched again.

use crate::prelude::*;
use freshen_core::{calculate_updates, CheckBounds, RequirementMap, ResourceState, StateMap};
use std::time::Instant;

fn received_ago(now: Instant, ago: Duration) -> StateMap {
    let mut state = ResourceState::default();
    state.record_requested(now - ago);
    state.record_received(&Ok(json!(1)), now - ago);
    StateMap::from([(key("a"), state)])
}

#[test]
fn data_62s_old_is_stale_for_60s_but_not_90s() {
    let now = Instant::now() + secs(120);
    let states = received_ago(now, secs(62));

    let strict: RequirementMap = [(key("a"), Requirement::fresh_within(secs(60)))].into_iter().collect();
    let relaxed: RequirementMap = [(key("a"), Requirement::fresh_within(secs(90)))].into_iter().collect();

    assert_eq!(
        calculate_updates(&strict, &states, now, CheckBounds::default()).due_keys,
        vec![key("a")]
    );
    let updates = calculate_updates(&relaxed, &states, now, CheckBounds::default());
    assert!(updates.due_keys.is_empty());
    assert_eq!(updates.next_check_delay, secs(28));
}

#[test]
fn strictest_consumer_wins_until_released() {
    let (world, _read) = World::with_fake_read();

    world.watch("list", "thing:1", secs(90));
    world.watch("detail", "thing:1", secs(45));
    assert_eq!(
        world.client.requirements()[&key("thing:1")].freshness,
        Some(secs(45))
    );

    world.client.release(&ConsumerId::new("detail")).unwrap();
    assert_eq!(
        world.client.requirements()[&key("thing:1")].freshness,
        Some(secs(90))
    );
}

#[tokio::test]
async fn check_timer_refetches_stale_data() {
    let (world, read) = World::with_fake_read();
    world.watch("panel", "a", secs(60));
    world.tick().await;
    assert_eq!(read.call_count(), 1);

    world.clock.advance(secs(61));
    // Fires both the scheduler tick and the freshness check
    world.timer.fire_all();
    world.tick().await;

    assert!(read.wait_for_calls(2).await);
}

#[tokio::test]
async fn subscriber_sees_fresh_data() {
    let (world, read) = World::with_fake_read();
    read.set_data(&key("a"), json!({"v": 1}));
    let mut updates = world.client.subscribe();

    world.watch("panel", "a", secs(60));
    world.tick().await;

    let mut latest = None;
    while let Ok(snapshot) = updates.try_recv() {
        latest = Some(snapshot);
    }
    let latest = latest.unwrap();
    similar_asserts::assert_eq!(latest[&key("a")].data, Some(json!({"v": 1})));
}
