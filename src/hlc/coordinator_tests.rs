// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::time::simulated::SimulatedTimeSource;
use crate::uuid7::OsRandomSource;

fn coordinator(node_id: u16) -> (Arc<SimulatedTimeSource>, HlcCoordinator<SimulatedTimeSource, OsRandomSource>) {
    let time = Arc::new(SimulatedTimeSource::new(1_700_000_000_000));
    let factory = HlcFactory::new(Arc::clone(&time), Arc::new(OsRandomSource), HlcConfig::new(node_id));
    (time, HlcCoordinator::new(factory))
}

#[test]
fn local_event_and_send_counters_track_calls() {
    let (_time, c) = coordinator(1);
    c.local_event().unwrap();
    c.send().unwrap();
    c.send().unwrap();
    assert_eq!(c.stats().local_event_count.get(), 1);
    assert_eq!(c.stats().send_count.get(), 2);
}

#[test]
fn receive_counts_and_tracks_remote_ahead() {
    let (time, c) = coordinator(1);
    let remote = HlcTimestamp::new(time.now_utc_ms() + 500, 0, 2);
    c.receive(remote).unwrap();

    assert_eq!(c.stats().receive_count.get(), 1);
    assert_eq!(c.stats().remote_ahead_count.get(), 1);
    assert_eq!(c.stats().max_remote_ahead_ms.get(), 500);
}

#[test]
fn receive_of_a_behind_remote_tracks_remote_behind_not_ahead() {
    let (time, c) = coordinator(1);
    time.advance(10_000).unwrap();
    c.send().unwrap();
    let remote = HlcTimestamp::new(time.now_utc_ms() - 2_000, 0, 2);
    c.receive(remote).unwrap();

    assert_eq!(c.stats().remote_ahead_count.get(), 0);
    assert!(c.stats().max_remote_behind_ms.get() >= 2_000);
}

#[test]
fn clock_advances_fires_only_when_local_adopts_remote_wall_time() {
    let (time, c) = coordinator(1);
    let remote = HlcTimestamp::new(time.now_utc_ms() + 1_000, 0, 2);
    c.receive(remote).unwrap();
    assert_eq!(c.stats().clock_advances.get(), 1);

    // A second receive of an older remote must not count as an advance.
    let stale = HlcTimestamp::new(time.now_utc_ms(), 0, 2);
    c.receive(stale).unwrap();
    assert_eq!(c.stats().clock_advances.get(), 1);
}

#[test]
fn witness_updates_the_same_stats_as_receive() {
    let (time, c) = coordinator(1);
    c.witness(time.now_utc_ms() + 1_000).unwrap();
    assert_eq!(c.stats().receive_count.get(), 1);
    assert_eq!(c.stats().clock_advances.get(), 1);
}

#[test]
fn registry_register_is_idempotent() {
    let time = Arc::new(SimulatedTimeSource::new(0));
    let registry = HlcClusterRegistry::new(time, Arc::new(OsRandomSource), 60_000, false);
    let a = registry.register(1);
    let b = registry.register(1);
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn registry_simulate_message_sends_and_witnesses() {
    let time = Arc::new(SimulatedTimeSource::new(1_700_000_000_000));
    let registry = HlcClusterRegistry::new(time, Arc::new(OsRandomSource), 60_000, false);

    let (sent, received) = registry.simulate_message(1, 2).unwrap();
    assert!(received > sent);
    assert_eq!(sent.node_id, 1);
    assert_eq!(received.node_id, 2);

    let receiver = registry.register(2);
    assert_eq!(receiver.stats().receive_count.get(), 1);
}
