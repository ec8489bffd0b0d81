//! Sensor Session
//!
//! Shared, reference-counted connection to a [`LocationProvider`]. The session
//! owns the connect/disconnect state machine, the blocking connect handshake,
//! and the bookkeeping for geofence registrations and continuous updates.
//!
//! State machine: `Disconnected -> Connecting -> Connected`, and back to
//! `Disconnected` on provider failure, provider disconnect, release of the last
//! holder, or teardown. A new connect waits until the provider calls of any
//! shutdown still in flight have been issued.

use super::geofence::{GeofenceDefinition, Transition, UpdatePriority, UpdateRequest};
use super::provider::{CoarseLocationSource, LocationProvider, ProviderEvents, RegistrationStatus};
use crate::trigger::{TriggerEvent, TriggerListener};
use crate::types::{GeofenceId, Point};
use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Session timing and update configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Handshake timeout used when a constraint is activated (0 = wait forever)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Handshake timeout used for location lookups and registrations
    #[serde(default = "default_location_timeout_ms")]
    pub location_timeout_ms: u64,

    /// Interval for continuous location updates
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    #[serde(default)]
    pub update_priority: UpdatePriority,
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_location_timeout_ms() -> u64 {
    10_000
}

fn default_update_interval_ms() -> u64 {
    60_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            location_timeout_ms: default_location_timeout_ms(),
            update_interval_ms: default_update_interval_ms(),
            update_priority: UpdatePriority::default(),
        }
    }
}

impl SessionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location_timeout_ms)
    }

    pub fn update_request(&self) -> UpdateRequest {
        UpdateRequest {
            priority: self.update_priority,
            interval: Duration::from_millis(self.update_interval_ms),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.update_interval_ms == 0 {
            return Err("update_interval_ms must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Connection state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Where a best-effort location came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Provider,
    /// Degraded device-level fix; never used for constraint evaluation.
    Coarse,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub point: Point,
    pub source: LocationSource,
}

/// Diagnostic snapshot of the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub connection: ConnectionState,
    pub holders: usize,
    pub active_geofences: Vec<GeofenceId>,
    pub updates_active: bool,
    pub connect_attempts: u64,
}

#[derive(Debug, Default)]
struct GeofenceEntry {
    interest: usize,
    registered: bool,
}

#[derive(Debug)]
struct SessionState {
    connection: ConnectionState,
    holders: usize,
    geofences: HashMap<GeofenceId, GeofenceEntry>,
    updates_active: bool,
    last_location: Option<Point>,
    attempt: u64,
    shutdowns_in_flight: usize,
}

impl SessionState {
    fn new() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            holders: 0,
            geofences: HashMap::new(),
            updates_active: false,
            last_location: None,
            attempt: 0,
            shutdowns_in_flight: 0,
        }
    }

    /// Move to `Disconnected` and return what must be undone on the provider.
    fn shut_down(&mut self, geofences: Vec<GeofenceId>) -> ShutdownPlan {
        let plan = ShutdownPlan {
            was: self.connection,
            remove_updates: self.updates_active,
            geofences,
        };
        self.connection = ConnectionState::Disconnected;
        self.updates_active = false;
        self.shutdowns_in_flight += 1;
        plan
    }
}

struct ShutdownPlan {
    was: ConnectionState,
    remove_updates: bool,
    geofences: Vec<GeofenceId>,
}

/// Shared connection to the location provider
pub struct SensorSession {
    me: Weak<SensorSession>,
    provider: Arc<dyn LocationProvider>,
    coarse: Option<Arc<dyn CoarseLocationSource>>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    connected: Condvar,
    listener: RwLock<Option<TriggerListener>>,
}

impl SensorSession {
    pub fn new(provider: Arc<dyn LocationProvider>, config: SessionConfig) -> Arc<Self> {
        Self::build(provider, None, config)
    }

    /// Create a session that can fall back to a coarse source for
    /// [`SensorSession::best_effort_location`].
    pub fn with_coarse_source(
        provider: Arc<dyn LocationProvider>,
        coarse: Arc<dyn CoarseLocationSource>,
        config: SessionConfig,
    ) -> Arc<Self> {
        Self::build(provider, Some(coarse), config)
    }

    fn build(
        provider: Arc<dyn LocationProvider>,
        coarse: Option<Arc<dyn CoarseLocationSource>>,
        config: SessionConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            provider,
            coarse,
            config,
            state: Mutex::new(SessionState::new()),
            connected: Condvar::new(),
            listener: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.lock().connection
    }

    pub fn holders(&self) -> usize {
        self.state.lock().holders
    }

    pub fn status(&self) -> SessionStatus {
        let state = self.state.lock();
        let mut active_geofences: Vec<GeofenceId> = state
            .geofences
            .iter()
            .filter(|(_, entry)| entry.registered)
            .map(|(id, _)| id.clone())
            .collect();
        active_geofences.sort();
        SessionStatus {
            connection: state.connection,
            holders: state.holders,
            active_geofences,
            updates_active: state.updates_active,
            connect_attempts: state.attempt,
        }
    }

    /// Route location and geofence callbacks to the trigger channel.
    pub fn set_trigger_listener(&self, listener: TriggerListener) {
        *self.listener.write() = Some(listener);
    }

    pub fn clear_trigger_listener(&self) {
        *self.listener.write() = None;
    }

    /// Take a hold on the session and wait for the provider connection.
    ///
    /// Every call must be balanced by [`SensorSession::release`], whether or
    /// not it returned `true`. A zero timeout waits indefinitely.
    pub fn acquire(&self, timeout: Duration) -> bool {
        {
            let mut state = self.state.lock();
            state.holders += 1;
            debug!(holders = state.holders, "Sensor session acquired");
        }
        self.ensure_connected(timeout)
    }

    /// Drop a hold. The last holder cancels continuous updates and disconnects.
    pub fn release(&self) {
        let mut state = self.state.lock();
        if state.holders == 0 {
            warn!("Sensor session released without a matching acquire");
            return;
        }
        state.holders -= 1;
        if state.holders > 0 {
            debug!(holders = state.holders, "Sensor session released, still held");
            return;
        }
        let plan = state.shut_down(Vec::new());
        drop(state);
        self.connected.notify_all();
        debug!("Last sensor session holder released");
        self.apply_shutdown(plan);
    }

    /// Tear an unheld session down: remove updates and any geofence still
    /// registered, then disconnect. Does nothing while any holder remains,
    /// since every pending geo call keeps its own hold.
    pub fn teardown(&self) {
        let mut state = self.state.lock();
        if state.holders > 0 {
            debug!(holders = state.holders, "Sensor session still held, skipping teardown");
            return;
        }
        let geofences: Vec<GeofenceId> = state
            .geofences
            .drain()
            .filter(|(_, entry)| entry.registered)
            .map(|(id, _)| id)
            .collect();
        let plan = state.shut_down(geofences);
        drop(state);
        self.connected.notify_all();
        if plan.was == ConnectionState::Disconnected {
            debug!("Sensor session teardown: already disconnected");
        }
        self.apply_shutdown(plan);
    }

    /// Last known location from the provider, or `None` when the provider
    /// cannot be reached within the location timeout or reports an error.
    pub fn last_known_location(&self) -> Option<Point> {
        if !self.ensure_connected(self.config.location_timeout()) {
            warn!("Location unavailable: not connected to location provider");
            return None;
        }
        self.provider_location()
    }

    /// Like [`SensorSession::last_known_location`], but falls back to the
    /// coarse source when the provider cannot be reached.
    pub fn best_effort_location(&self) -> Option<LocationFix> {
        if self.ensure_connected(self.config.location_timeout()) {
            return self.provider_location().map(|point| LocationFix {
                point,
                source: LocationSource::Provider,
            });
        }

        let coarse = self.coarse.as_ref()?;
        warn!("Location provider not available, using coarse source for last location");
        match coarse.last_known_location() {
            Ok(point) => point.map(|point| LocationFix {
                point,
                source: LocationSource::Coarse,
            }),
            Err(e) => {
                error!(error = %e, "Unable to get last known location");
                None
            }
        }
    }

    /// Register a circular geofence. Only the first holder of an id reaches
    /// the provider; the result is reported asynchronously and only logged.
    pub fn register_geofence(&self, definition: GeofenceDefinition) {
        {
            let mut state = self.state.lock();
            let entry = state.geofences.entry(definition.id.clone()).or_default();
            entry.interest += 1;
            if entry.interest > 1 {
                debug!(
                    geofence_id = %definition.id,
                    interest = entry.interest,
                    "Geofence already registered"
                );
                return;
            }
        }

        if !self.ensure_connected(self.config.location_timeout()) {
            error!(
                geofence_id = %definition.id,
                "Adding geofence failed: not connected to location provider; try again"
            );
            return;
        }

        {
            let mut state = self.state.lock();
            match state.geofences.get_mut(&definition.id) {
                Some(entry) => entry.registered = true,
                None => {
                    debug!(geofence_id = %definition.id, "Geofence dropped before registration");
                    return;
                }
            }
        }

        info!(
            geofence_id = %definition.id,
            radius_meters = definition.radius_meters,
            transition = %definition.transition,
            "Adding geofence"
        );
        self.provider.add_geofences(vec![definition]);
    }

    /// Drop one unit of interest for each id. An id is removed from the
    /// provider only when its interest reaches zero.
    pub fn deregister_geofences(&self, ids: &[GeofenceId]) {
        let mut to_remove = Vec::new();
        {
            let mut state = self.state.lock();
            for id in ids {
                let remaining = match state.geofences.get_mut(id) {
                    Some(entry) => {
                        entry.interest = entry.interest.saturating_sub(1);
                        entry.interest
                    }
                    None => {
                        debug!(geofence_id = %id, "Geofence not tracked, nothing to remove");
                        continue;
                    }
                };
                if remaining > 0 {
                    debug!(geofence_id = %id, interest = remaining, "Geofence still in use");
                    continue;
                }
                if let Some(entry) = state.geofences.remove(id) {
                    if entry.registered {
                        to_remove.push(id.clone());
                    }
                }
            }
        }

        if to_remove.is_empty() {
            return;
        }
        if !self.ensure_connected(self.config.location_timeout()) {
            error!(
                geofences = ?to_remove,
                "Removing geofences failed: not connected to location provider; try again"
            );
            return;
        }
        info!(geofences = ?to_remove, "Removing geofences");
        self.provider.remove_geofences(to_remove);
    }

    /// Enable continuous location updates. Returns `false` when updates were
    /// already enabled or the provider could not be reached.
    pub fn set_continuous_updates(&self, request: UpdateRequest) -> bool {
        if self.state.lock().updates_active {
            debug!("Location updates already enabled");
            return false;
        }
        if !self.ensure_connected(self.config.location_timeout()) {
            error!(
                "Requesting location updates failed: not connected to location provider; try again"
            );
            return false;
        }
        {
            let mut state = self.state.lock();
            if state.updates_active {
                debug!("Location updates already enabled");
                return false;
            }
            if state.connection != ConnectionState::Connected {
                error!("Requesting location updates failed: connection lost");
                return false;
            }
            state.updates_active = true;
        }
        info!(
            priority = ?request.priority,
            interval_ms = request.interval.as_millis() as u64,
            "Enabling location updates"
        );
        self.provider.request_updates(request);
        true
    }

    /// Connect handshake shared by every caller. Only the caller that finds
    /// the session `Disconnected` issues the provider connect; everyone else
    /// waits on the same attempt.
    fn ensure_connected(&self, timeout: Duration) -> bool {
        let deadline = if timeout.is_zero() {
            None
        } else {
            Some(Instant::now() + timeout)
        };

        let mut state = self.state.lock();
        while state.shutdowns_in_flight > 0 {
            if self.wait(&mut state, deadline) {
                warn!("Location provider still shutting down");
                return false;
            }
        }

        match state.connection {
            ConnectionState::Connected => return true,
            ConnectionState::Connecting => {}
            ConnectionState::Disconnected => {
                state.connection = ConnectionState::Connecting;
                state.attempt += 1;
                let events = ProviderEvents::new(self.me.clone(), state.attempt);
                debug!(attempt = state.attempt, "Connecting to location provider");
                MutexGuard::unlocked(&mut state, || self.provider.connect(events));
            }
        }

        while state.connection == ConnectionState::Connecting {
            if self.wait(&mut state, deadline) {
                break;
            }
        }

        let connected = state.connection == ConnectionState::Connected;
        if !connected {
            warn!(
                state = ?state.connection,
                timeout_ms = timeout.as_millis() as u64,
                "Location provider not connected"
            );
        }
        connected
    }

    /// Block on the session condvar. Returns `true` once `deadline` passes.
    fn wait(&self, state: &mut MutexGuard<'_, SessionState>, deadline: Option<Instant>) -> bool {
        match deadline {
            Some(deadline) => self.connected.wait_until(state, deadline).timed_out(),
            None => {
                self.connected.wait(state);
                false
            }
        }
    }

    fn provider_location(&self) -> Option<Point> {
        match self.provider.last_location() {
            Ok(Some(point)) => {
                self.state.lock().last_location = Some(point);
                Some(point)
            }
            Ok(None) => self.state.lock().last_location,
            Err(e) => {
                error!(error = %e, "Unable to get last location");
                None
            }
        }
    }

    fn apply_shutdown(&self, plan: ShutdownPlan) {
        if plan.was == ConnectionState::Connected {
            if !plan.geofences.is_empty() {
                info!(geofences = ?plan.geofences, "Removing geofences on teardown");
                self.provider.remove_geofences(plan.geofences);
            }
            if plan.remove_updates {
                debug!("Removing location updates");
                self.provider.remove_updates();
            }
        } else if !plan.geofences.is_empty() {
            warn!(
                geofences = ?plan.geofences,
                "Geofences left registered: provider not connected"
            );
        }
        if plan.was != ConnectionState::Disconnected {
            info!("Disconnecting from location provider");
            self.provider.disconnect();
        }
        self.state.lock().shutdowns_in_flight -= 1;
        self.connected.notify_all();
    }

    fn fire(&self, event: TriggerEvent) {
        let listener = self.listener.read().clone();
        match listener {
            Some(listener) => listener(event),
            None => debug!(event = ?event, "No trigger listener installed"),
        }
    }

    pub(crate) fn handle_connected(&self, attempt: u64) {
        let mut state = self.state.lock();
        if attempt != state.attempt || state.connection != ConnectionState::Connecting {
            debug!(attempt, current = state.attempt, "Ignoring stale connect callback");
            return;
        }
        state.connection = ConnectionState::Connected;
        drop(state);
        self.connected.notify_all();
        info!(attempt, "Connected to location provider");
    }

    pub(crate) fn handle_connection_failed(&self, attempt: u64, reason: String) {
        let mut state = self.state.lock();
        if attempt != state.attempt || state.connection == ConnectionState::Disconnected {
            debug!(attempt, "Ignoring stale connection failure");
            return;
        }
        state.connection = ConnectionState::Disconnected;
        state.updates_active = false;
        drop(state);
        self.connected.notify_all();
        error!(attempt, reason = %reason, "Location provider connection failed");
    }

    pub(crate) fn handle_disconnected(&self, attempt: u64) {
        let mut state = self.state.lock();
        if attempt != state.attempt || state.connection == ConnectionState::Disconnected {
            return;
        }
        state.connection = ConnectionState::Disconnected;
        state.updates_active = false;
        drop(state);
        self.connected.notify_all();
        warn!(attempt, "Location provider disconnected");
    }

    pub(crate) fn handle_location_changed(&self, point: Point) {
        self.state.lock().last_location = Some(point);
        debug!(lat = point.lat, lng = point.lng, "Location changed");
        self.fire(TriggerEvent::LocationChanged(point));
    }

    pub(crate) fn handle_geofence_transition(&self, ids: Vec<GeofenceId>, transition: Transition) {
        info!(geofences = ?ids, transition = %transition, "Geofence transition");
        self.fire(TriggerEvent::GeofenceTransition { ids, transition });
    }

    pub(crate) fn handle_registration_result(
        &self,
        operation: &str,
        status: RegistrationStatus,
        ids: &[GeofenceId],
    ) {
        match status {
            RegistrationStatus::Success => {
                info!(operation, geofences = ?ids, "Geofence registration result")
            }
            RegistrationStatus::Failed(code) => {
                error!(operation, code, geofences = ?ids, "Geofence registration failed")
            }
        }
    }
}
