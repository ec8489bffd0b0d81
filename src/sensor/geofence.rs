//! Geofence and location-update request types sent to a provider.

use crate::types::{GeofenceId, Point};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which side of a fence satisfies a geo constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Inside,
    Outside,
}

impl Placement {
    pub fn is_inside(self) -> bool {
        matches!(self, Placement::Inside)
    }

    /// Transition the provider should report for this placement.
    pub fn transition(self) -> Transition {
        match self {
            Placement::Inside => Transition::Enter,
            Placement::Outside => Transition::Exit,
        }
    }
}

/// Geofence transition kind reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Enter,
    Exit,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Enter => f.write_str("ENTER"),
            Transition::Exit => f.write_str("EXIT"),
        }
    }
}

/// How long the provider keeps a geofence registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Expiry {
    #[default]
    Never,
    /// Counted from registration, not from construction.
    After(Duration),
}

/// Circular fence registered with the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceDefinition {
    pub id: GeofenceId,
    pub center: Point,
    pub radius_meters: f64,
    pub expiry: Expiry,
    pub transition: Transition,
}

/// Power/accuracy trade-off for continuous updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePriority {
    HighAccuracy,
    #[default]
    Balanced,
    LowPower,
    NoPower,
}

/// Continuous location update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub priority: UpdatePriority,
    pub interval: Duration,
}

impl Default for UpdateRequest {
    fn default() -> Self {
        Self {
            priority: UpdatePriority::Balanced,
            interval: Duration::from_secs(60),
        }
    }
}
