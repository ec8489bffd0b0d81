//! Integration tests for the admission queue
//!
//! Tests cover:
//! - Admission only from run
//! - Short-circuit evaluation of conjunctions
//! - Exactly-once admission under concurrent runs
//! - Cancel racing run

use super::test_utils::Harness;
use callgate::constraint::Constraint;
use callgate::queue::PendingCall;
use callgate::sensor::{Expiry, Placement};
use callgate::sim::ConnectBehavior;
use callgate::types::{NetworkClass, Point};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_always_allow_waits_for_run() {
    let h = Harness::new(ConnectBehavior::Immediate, NetworkClass::None);
    let id = h
        .queue
        .enqueue(PendingCall::new(Constraint::always_allow(), "ping"))
        .unwrap();

    assert!(h.queue.contains(id));
    assert!(h.executed().is_empty());

    let summary = h.queue.run();
    assert_eq!(summary.admitted, vec![id]);
    assert_eq!(h.executed(), vec!["ping"]);
    assert!(h.queue.is_empty());
}

#[test]
fn test_failed_network_check_skips_location_lookup() {
    let h = Harness::new(ConnectBehavior::Immediate, NetworkClass::None);
    h.provider.set_location(Some(Point::new(10.0, 10.0)));
    let geo = Constraint::geo_circle(
        "office",
        Point::new(10.0, 10.0),
        50.0,
        Placement::Inside,
        Expiry::Never,
    )
    .unwrap();
    h.queue
        .enqueue(PendingCall::new(Constraint::wifi_and(geo), "upload"))
        .unwrap();

    let summary = h.queue.run();
    assert_eq!(summary.held, 1);
    assert_eq!(h.provider.location_lookups(), 0);

    h.network.set_network(NetworkClass::Wifi);
    let summary = h.queue.run();
    assert_eq!(summary.admitted.len(), 1);
    assert_eq!(h.provider.location_lookups(), 1);
    assert_eq!(h.executed(), vec!["upload"]);
}

#[test]
fn test_roaming_wwan_is_held_until_roaming_allowed() {
    let h = Harness::new(ConnectBehavior::Immediate, NetworkClass::Wwan);
    h.network.set_roaming(true);
    h.queue
        .enqueue(PendingCall::new(Constraint::wwan(false), "strict"))
        .unwrap();
    h.queue
        .enqueue(PendingCall::new(Constraint::mobile(true), "lenient"))
        .unwrap();

    h.queue.run();
    assert_eq!(h.executed(), vec!["lenient"]);
    assert_eq!(h.queue.len(), 1);

    h.network.set_roaming(false);
    h.queue.run();
    assert_eq!(h.executed(), vec!["lenient", "strict"]);
}

#[test]
fn test_concurrent_runs_admit_each_call_once() {
    let h = Harness::new(ConnectBehavior::Immediate, NetworkClass::Wifi);
    for _ in 0..64 {
        h.queue
            .enqueue(PendingCall::new(Constraint::wifi(), "job"))
            .unwrap();
    }

    let barrier = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let queue = h.queue.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                queue.run().admitted.len()
            })
        })
        .collect();
    let admitted: usize = handles.into_iter().map(|t| t.join().unwrap()).sum();

    assert_eq!(admitted, 64);
    assert_eq!(h.executed().len(), 64);
    assert_eq!(h.queue.stats().admitted, 64);
}

#[test]
fn test_cancel_racing_run_resolves_exactly_once() {
    let h = Harness::new(ConnectBehavior::Immediate, NetworkClass::Wifi);
    let cancelled = Arc::new(AtomicUsize::new(0));

    for _ in 0..50 {
        let id = h
            .queue
            .enqueue(PendingCall::new(Constraint::wifi(), "raced"))
            .unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let runner = {
            let queue = h.queue.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                queue.run();
            })
        };
        let canceller = {
            let queue = h.queue.clone();
            let barrier = barrier.clone();
            let cancelled = cancelled.clone();
            thread::spawn(move || {
                barrier.wait();
                if queue.cancel(id).is_some() {
                    cancelled.fetch_add(1, Ordering::SeqCst);
                }
            })
        };
        runner.join().unwrap();
        canceller.join().unwrap();
        assert!(!h.queue.contains(id));
    }

    assert_eq!(h.executed().len() + cancelled.load(Ordering::SeqCst), 50);
}

#[test]
fn test_cancelled_geofence_call_releases_session() {
    let h = Harness::new(ConnectBehavior::Immediate, NetworkClass::None);
    let geo = Constraint::geo_circle(
        "depot",
        Point::new(1.0, 1.0),
        100.0,
        Placement::Inside,
        Expiry::Never,
    )
    .unwrap();
    let id = h.queue.enqueue(PendingCall::new(geo, "deliver")).unwrap();
    assert_eq!(h.session.holders(), 1);

    let call = h.queue.cancel(id).unwrap();
    assert_eq!(*call.payload(), "deliver");
    assert_eq!(h.session.holders(), 0);
    assert_eq!(h.provider.removed_geofences().len(), 1);
    assert!(h.executed().is_empty());
}
