//! Error types for the callgate admission system.

use crate::types::{CallId, GeofenceId};
use thiserror::Error;

/// Geometry parsing errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("Malformed point '{0}': expected \"latitude, longitude\"")]
    MalformedPoint(String),
}

/// Constraint construction errors. These are configuration errors and are
/// never coerced into a usable constraint.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintError {
    #[error("Geofence id must not be empty")]
    EmptyId,

    #[error("Geofence '{id}' radius must be a positive number of meters, got {radius}")]
    InvalidRadius { id: GeofenceId, radius: f64 },

    #[error("Geofence '{id}' polygon needs at least 3 vertices, got {vertices}")]
    DegeneratePolygon { id: GeofenceId, vertices: usize },

    #[error("Geofence '{id}' has a non-finite coordinate")]
    NonFiniteCoordinate { id: GeofenceId },
}

/// Errors reported by a location provider
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("Provider not connected")]
    NotConnected,

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Provider request failed: {0}")]
    RequestFailed(String),
}

/// Admission queue errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueueError {
    #[error("Call {0} is already queued")]
    AlreadyQueued(CallId),

    #[error("Admission queue is full ({max_pending} pending calls)")]
    QueueFull { max_pending: usize },
}

/// Crate-level error
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Invalid constraint: {0}")]
    Constraint(#[from] ConstraintError),

    #[error("Invalid geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for GateError {
    fn from(err: config::ConfigError) -> Self {
        GateError::ConfigError(err.to_string())
    }
}
