//! Provider capability interfaces
//!
//! The session talks to the platform location service only through
//! [`LocationProvider`]. All provider operations are asynchronous: they return
//! immediately and report back through the [`ProviderEvents`] handle passed to
//! `connect`.

use super::geofence::{GeofenceDefinition, Transition, UpdateRequest};
use super::session::SensorSession;
use crate::error::ProviderError;
use crate::types::{GeofenceId, Point};
use std::sync::Weak;

/// External location service.
pub trait LocationProvider: Send + Sync {
    /// Begin connecting. Completion is reported via `events.connected()` or
    /// `events.connection_failed(..)`, possibly before this call returns.
    fn connect(&self, events: ProviderEvents);

    fn disconnect(&self);

    /// Most recent fix known to the provider.
    fn last_location(&self) -> Result<Option<Point>, ProviderError>;

    fn add_geofences(&self, fences: Vec<GeofenceDefinition>);

    fn remove_geofences(&self, ids: Vec<GeofenceId>);

    fn request_updates(&self, request: UpdateRequest);

    fn remove_updates(&self);
}

/// Device-level last-known-location source (e.g. a passive provider). Only used
/// for degraded, best-effort lookups.
pub trait CoarseLocationSource: Send + Sync {
    fn last_known_location(&self) -> Result<Option<Point>, ProviderError>;
}

/// Status code attached to registration results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    Success,
    Failed(i32),
}

impl RegistrationStatus {
    pub fn is_success(self) -> bool {
        matches!(self, RegistrationStatus::Success)
    }
}

/// Callback handle given to the provider for one connect attempt. Callbacks
/// delivered through a handle from an earlier attempt are ignored by the
/// session.
#[derive(Clone)]
pub struct ProviderEvents {
    session: Weak<SensorSession>,
    attempt: u64,
}

impl ProviderEvents {
    pub(crate) fn new(session: Weak<SensorSession>, attempt: u64) -> Self {
        Self { session, attempt }
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn connected(&self) {
        if let Some(session) = self.session.upgrade() {
            session.handle_connected(self.attempt);
        }
    }

    pub fn connection_failed(&self, reason: impl Into<String>) {
        if let Some(session) = self.session.upgrade() {
            session.handle_connection_failed(self.attempt, reason.into());
        }
    }

    pub fn disconnected(&self) {
        if let Some(session) = self.session.upgrade() {
            session.handle_disconnected(self.attempt);
        }
    }

    pub fn location_changed(&self, point: Point) {
        if let Some(session) = self.session.upgrade() {
            session.handle_location_changed(point);
        }
    }

    pub fn geofence_transition(&self, ids: Vec<GeofenceId>, transition: Transition) {
        if let Some(session) = self.session.upgrade() {
            session.handle_geofence_transition(ids, transition);
        }
    }

    pub fn geofences_added(&self, status: RegistrationStatus, ids: Vec<GeofenceId>) {
        if let Some(session) = self.session.upgrade() {
            session.handle_registration_result("add", status, &ids);
        }
    }

    pub fn geofences_removed(&self, status: RegistrationStatus, ids: Vec<GeofenceId>) {
        if let Some(session) = self.session.upgrade() {
            session.handle_registration_result("remove", status, &ids);
        }
    }
}
