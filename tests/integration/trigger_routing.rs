//! Integration tests for trigger routing
//!
//! Provider callbacks and the drain signal flow through an installed
//! `EventRouter`; no test calls `run` directly.

use super::test_utils::Harness;
use callgate::constraint::Constraint;
use callgate::error::ProviderError;
use callgate::queue::{AdmissionQueue, PendingCall};
use callgate::sensor::{
    ConnectionState, Expiry, GeofenceDefinition, LocationProvider, Placement, ProviderEvents,
    Transition, UpdateRequest,
};
use callgate::sim::{ConnectBehavior, SimulatedProvider};
use callgate::trigger::{EventRouter, TriggerEvent};
use callgate::types::{GeofenceId, NetworkClass, Point};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::thread;

fn square() -> Vec<Point> {
    vec![
        Point::new(0.0, 0.0),
        Point::new(0.0, 10.0),
        Point::new(10.0, 10.0),
        Point::new(10.0, 0.0),
    ]
}

#[test]
fn test_location_update_admits_and_tears_down() {
    let h = Harness::new(ConnectBehavior::Immediate, NetworkClass::None);
    let _router = EventRouter::install(h.queue.clone(), h.session.clone());
    h.provider.set_location(Some(Point::new(20.0, 20.0)));

    let region = Constraint::geo_region("field", square(), Placement::Inside).unwrap();
    h.queue.enqueue(PendingCall::new(region, "survey")).unwrap();
    assert!(h.provider.updates_active());

    h.provider.move_to(Point::new(15.0, 15.0));
    assert!(h.executed().is_empty());

    h.provider.move_to(Point::new(5.0, 5.0));
    assert_eq!(h.executed(), vec!["survey"]);
    assert!(h.queue.is_empty());
    assert_eq!(h.session.connection_state(), ConnectionState::Disconnected);
    assert_eq!(h.session.holders(), 0);
    assert!(!h.provider.updates_active());
}

#[test]
fn test_geofence_transition_triggers_run() {
    let h = Harness::new(ConnectBehavior::Immediate, NetworkClass::None);
    let _router = EventRouter::install(h.queue.clone(), h.session.clone());
    h.provider.set_location(Some(Point::new(40.0, -74.0)));

    let circle = Constraint::geo_circle(
        "store",
        Point::new(40.5, -74.0),
        500.0,
        Placement::Inside,
        Expiry::Never,
    )
    .unwrap();
    h.queue.enqueue(PendingCall::new(circle, "coupon")).unwrap();

    h.provider.set_location(Some(Point::new(40.5, -74.0)));
    h.provider
        .trigger_transition(vec![GeofenceId::new("store")], Transition::Enter);

    assert_eq!(h.executed(), vec!["coupon"]);
    assert_eq!(h.provider.removed_geofences(), vec![GeofenceId::new("store")]);
}

#[test]
fn test_connectivity_change_is_routed_to_run() {
    let h = Harness::new(ConnectBehavior::Immediate, NetworkClass::None);
    let router = EventRouter::install(h.queue.clone(), h.session.clone());
    h.queue
        .enqueue(PendingCall::new(Constraint::wifi(), "sync"))
        .unwrap();

    router.dispatch(TriggerEvent::ConnectivityChanged);
    assert!(h.executed().is_empty());

    h.network.set_network(NetworkClass::Wifi);
    router.dispatch(TriggerEvent::ConnectivityChanged);
    assert_eq!(h.executed(), vec!["sync"]);
}

#[test]
fn test_drain_signal_skips_teardown_when_refilled() {
    let h = Harness::new(ConnectBehavior::Immediate, NetworkClass::None);
    let router = EventRouter::install(h.queue.clone(), h.session.clone());
    let region = Constraint::geo_region("lot", square(), Placement::Inside).unwrap();
    h.queue.enqueue(PendingCall::new(region, "park")).unwrap();

    router.dispatch(TriggerEvent::QueueDrained);
    assert_eq!(h.session.holders(), 1);
    assert_eq!(h.session.connection_state(), ConnectionState::Connected);
}

/// Runs the queue once from inside `add_geofences`, the way a trigger on
/// another thread can drain the queue while a geo call is being enqueued.
struct RunOnRegister {
    inner: Arc<SimulatedProvider>,
    queue: Mutex<Option<Weak<AdmissionQueue<&'static str>>>>,
}

impl RunOnRegister {
    fn new(behavior: ConnectBehavior) -> Self {
        Self {
            inner: Arc::new(SimulatedProvider::new(behavior)),
            queue: Mutex::new(None),
        }
    }

    fn arm(&self, queue: &Arc<AdmissionQueue<&'static str>>) {
        *self.queue.lock() = Some(Arc::downgrade(queue));
    }
}

impl LocationProvider for RunOnRegister {
    fn connect(&self, events: ProviderEvents) {
        self.inner.connect(events)
    }

    fn disconnect(&self) {
        self.inner.disconnect()
    }

    fn last_location(&self) -> Result<Option<Point>, ProviderError> {
        self.inner.last_location()
    }

    fn add_geofences(&self, fences: Vec<GeofenceDefinition>) {
        self.inner.add_geofences(fences);
        let queue = self.queue.lock().take().and_then(|queue| queue.upgrade());
        if let Some(queue) = queue {
            queue.run();
        }
    }

    fn remove_geofences(&self, ids: Vec<GeofenceId>) {
        self.inner.remove_geofences(ids)
    }

    fn request_updates(&self, request: UpdateRequest) {
        self.inner.request_updates(request)
    }

    fn remove_updates(&self) {
        self.inner.remove_updates()
    }
}

#[test]
fn test_drain_during_geo_enqueue_keeps_session_hold() {
    let provider = Arc::new(RunOnRegister::new(ConnectBehavior::Immediate));
    let h = Harness::with_provider(provider.inner.clone(), provider.clone(), NetworkClass::None);
    let _router = EventRouter::install(h.queue.clone(), h.session.clone());
    h.queue
        .enqueue(PendingCall::new(Constraint::always_allow(), "ping"))
        .unwrap();
    provider.arm(&h.queue);

    let fence = Constraint::geo_circle(
        "X",
        Point::new(1.0, 1.0),
        100.0,
        Placement::Inside,
        Expiry::Never,
    )
    .unwrap();
    let id = h.queue.enqueue(PendingCall::new(fence, "pong")).unwrap();

    assert_eq!(h.executed(), vec!["ping"]);
    assert!(h.queue.contains(id));
    assert_eq!(h.session.holders(), 1);
    assert_eq!(h.session.status().active_geofences, vec![GeofenceId::new("X")]);
    assert_eq!(h.session.connection_state(), ConnectionState::Connected);
    assert!(h.provider.removed_geofences().is_empty());
    assert_eq!(h.provider.registered_geofences(), vec![GeofenceId::new("X")]);

    h.queue.cancel(id);
    assert_eq!(h.session.holders(), 0);
    assert_eq!(h.provider.removed_geofences(), vec![GeofenceId::new("X")]);
}

#[test]
fn test_concurrent_enqueue_and_drain_keep_holds_balanced() {
    let h = Harness::new(ConnectBehavior::Immediate, NetworkClass::None);
    let _router = EventRouter::install(h.queue.clone(), h.session.clone());

    let enqueuer = {
        let queue = h.queue.clone();
        thread::spawn(move || {
            (0..40)
                .map(|i| {
                    let fence = Constraint::geo_circle(
                        format!("fence-{:02}", i),
                        Point::new(1.0, 1.0),
                        50.0,
                        Placement::Inside,
                        Expiry::Never,
                    )
                    .unwrap();
                    queue.enqueue(PendingCall::new(fence, "geo")).unwrap();
                    GeofenceId::new(format!("fence-{:02}", i))
                })
                .collect::<Vec<_>>()
        })
    };
    let drainer = {
        let queue = h.queue.clone();
        thread::spawn(move || {
            for i in 0..40 {
                let id = queue
                    .enqueue(PendingCall::new(Constraint::always_allow(), "tick"))
                    .unwrap();
                if i % 2 == 0 {
                    queue.run();
                } else {
                    queue.cancel(id);
                }
            }
        })
    };
    let fences = enqueuer.join().unwrap();
    drainer.join().unwrap();

    assert_eq!(h.queue.len(), fences.len());
    assert_eq!(h.session.holders(), fences.len());
    assert_eq!(h.session.status().active_geofences, fences);
    assert!(h.provider.removed_geofences().is_empty());
    assert_eq!(h.session.connection_state(), ConnectionState::Connected);
}

#[test]
fn test_dropped_router_stops_routing() {
    let h = Harness::new(ConnectBehavior::Immediate, NetworkClass::None);
    let router = EventRouter::install(h.queue.clone(), h.session.clone());
    h.provider.set_location(Some(Point::new(20.0, 20.0)));
    let region = Constraint::geo_region("plot", square(), Placement::Inside).unwrap();
    h.queue.enqueue(PendingCall::new(region, "water")).unwrap();

    drop(router);
    h.provider.move_to(Point::new(5.0, 5.0));
    assert!(h.executed().is_empty());
    assert_eq!(h.queue.len(), 1);
}
