//! In-memory providers
//!
//! Scriptable stand-ins for the platform location and connectivity services.
//! The CLI uses them to evaluate constraints against a given position, and the
//! tests use their call counters to observe the session's provider traffic.

use crate::environment::NetworkMonitor;
use crate::error::ProviderError;
use crate::sensor::{
    CoarseLocationSource, GeofenceDefinition, LocationProvider, ProviderEvents,
    RegistrationStatus, Transition, UpdateRequest,
};
use crate::types::{GeofenceId, NetworkClass, Point};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;

/// How the simulated provider answers `connect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectBehavior {
    /// Reports success before `connect` returns.
    Immediate,
    /// Reports failure before `connect` returns.
    Fail,
    /// Waits for [`SimulatedProvider::complete_connect`] or
    /// [`SimulatedProvider::fail_connect`].
    Manual,
}

#[derive(Default)]
struct ProviderState {
    events: Option<ProviderEvents>,
    location: Option<Point>,
    fail_lookups: bool,
    geofences: BTreeMap<GeofenceId, GeofenceDefinition>,
    updates: Option<UpdateRequest>,
    added: Vec<GeofenceId>,
    removed: Vec<GeofenceId>,
}

/// Location provider backed by memory
pub struct SimulatedProvider {
    behavior: RwLock<ConnectBehavior>,
    state: Mutex<ProviderState>,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    location_lookups: AtomicUsize,
    update_requests: AtomicUsize,
    remove_update_calls: AtomicUsize,
}

impl SimulatedProvider {
    pub fn new(behavior: ConnectBehavior) -> Self {
        Self {
            behavior: RwLock::new(behavior),
            state: Mutex::new(ProviderState::default()),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            location_lookups: AtomicUsize::new(0),
            update_requests: AtomicUsize::new(0),
            remove_update_calls: AtomicUsize::new(0),
        }
    }

    /// Provider that connects immediately and reports `location`.
    pub fn at(location: Point) -> Self {
        let provider = Self::new(ConnectBehavior::Immediate);
        provider.set_location(Some(location));
        provider
    }

    pub fn set_behavior(&self, behavior: ConnectBehavior) {
        *self.behavior.write() = behavior;
    }

    pub fn set_location(&self, location: Option<Point>) {
        self.state.lock().location = location;
    }

    pub fn fail_location_lookups(&self, fail: bool) {
        self.state.lock().fail_lookups = fail;
    }

    /// Deliver a success for the pending connect attempt.
    pub fn complete_connect(&self) {
        if let Some(events) = self.events() {
            events.connected();
        }
    }

    pub fn fail_connect(&self, reason: &str) {
        if let Some(events) = self.events() {
            events.connection_failed(reason);
        }
    }

    /// Simulate a provider-side disconnect.
    pub fn drop_connection(&self) {
        if let Some(events) = self.events() {
            events.disconnected();
        }
    }

    /// Move the device; a location callback is delivered while updates are on.
    pub fn move_to(&self, point: Point) {
        let events = {
            let mut state = self.state.lock();
            state.location = Some(point);
            if state.updates.is_some() {
                state.events.clone()
            } else {
                None
            }
        };
        if let Some(events) = events {
            events.location_changed(point);
        }
    }

    pub fn trigger_transition(&self, ids: Vec<GeofenceId>, transition: Transition) {
        if let Some(events) = self.events() {
            events.geofence_transition(ids, transition);
        }
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn location_lookups(&self) -> usize {
        self.location_lookups.load(Ordering::SeqCst)
    }

    pub fn update_requests(&self) -> usize {
        self.update_requests.load(Ordering::SeqCst)
    }

    pub fn remove_update_calls(&self) -> usize {
        self.remove_update_calls.load(Ordering::SeqCst)
    }

    /// Every id ever passed to `add_geofences`, in call order.
    pub fn added_geofences(&self) -> Vec<GeofenceId> {
        self.state.lock().added.clone()
    }

    /// Every id ever passed to `remove_geofences`, in call order.
    pub fn removed_geofences(&self) -> Vec<GeofenceId> {
        self.state.lock().removed.clone()
    }

    /// Geofences currently registered.
    pub fn registered_geofences(&self) -> Vec<GeofenceId> {
        self.state.lock().geofences.keys().cloned().collect()
    }

    pub fn updates_active(&self) -> bool {
        self.state.lock().updates.is_some()
    }

    fn events(&self) -> Option<ProviderEvents> {
        self.state.lock().events.clone()
    }
}

impl LocationProvider for SimulatedProvider {
    fn connect(&self, events: ProviderEvents) {
        self.state.lock().events = Some(events.clone());
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.behavior.read();
        debug!(attempt = events.attempt(), behavior = ?behavior, "Simulated connect");
        match behavior {
            ConnectBehavior::Immediate => events.connected(),
            ConnectBehavior::Fail => events.connection_failed("simulated connection failure"),
            ConnectBehavior::Manual => {}
        }
    }

    fn disconnect(&self) {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        state.updates = None;
    }

    fn last_location(&self) -> Result<Option<Point>, ProviderError> {
        self.location_lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock();
        if state.fail_lookups {
            return Err(ProviderError::Unavailable(
                "simulated location failure".to_string(),
            ));
        }
        Ok(state.location)
    }

    fn add_geofences(&self, fences: Vec<GeofenceDefinition>) {
        let (events, ids) = {
            let mut state = self.state.lock();
            let ids: Vec<GeofenceId> = fences.iter().map(|f| f.id.clone()).collect();
            for fence in fences {
                state.added.push(fence.id.clone());
                state.geofences.insert(fence.id.clone(), fence);
            }
            (state.events.clone(), ids)
        };
        if let Some(events) = events {
            events.geofences_added(RegistrationStatus::Success, ids);
        }
    }

    fn remove_geofences(&self, ids: Vec<GeofenceId>) {
        let events = {
            let mut state = self.state.lock();
            for id in &ids {
                state.geofences.remove(id);
                state.removed.push(id.clone());
            }
            state.events.clone()
        };
        if let Some(events) = events {
            events.geofences_removed(RegistrationStatus::Success, ids);
        }
    }

    fn request_updates(&self, request: UpdateRequest) {
        self.update_requests.fetch_add(1, Ordering::SeqCst);
        self.state.lock().updates = Some(request);
    }

    fn remove_updates(&self) {
        self.remove_update_calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().updates = None;
    }
}

/// Connectivity source backed by memory
pub struct SimulatedNetwork {
    class: RwLock<NetworkClass>,
    roaming: AtomicBool,
}

impl SimulatedNetwork {
    pub fn new(class: NetworkClass) -> Self {
        Self {
            class: RwLock::new(class),
            roaming: AtomicBool::new(false),
        }
    }

    pub fn set_network(&self, class: NetworkClass) {
        *self.class.write() = class;
    }

    pub fn set_roaming(&self, roaming: bool) {
        self.roaming.store(roaming, Ordering::SeqCst);
    }
}

impl NetworkMonitor for SimulatedNetwork {
    fn current_network_class(&self) -> NetworkClass {
        *self.class.read()
    }

    fn is_roaming(&self) -> bool {
        self.roaming.load(Ordering::SeqCst)
    }
}

/// Coarse source returning a fixed fix
pub struct FixedCoarseSource {
    location: Option<Point>,
}

impl FixedCoarseSource {
    pub fn new(location: Option<Point>) -> Self {
        Self { location }
    }
}

impl CoarseLocationSource for FixedCoarseSource {
    fn last_known_location(&self) -> Result<Option<Point>, ProviderError> {
        Ok(self.location)
    }
}
