//! Environment sampling
//!
//! Constraints are evaluated against an [`Environment`]: a network snapshot
//! taken once per admission pass plus the shared sensor session that answers
//! location queries. The location is also looked up at most once per pass.

use crate::sensor::SensorSession;
use crate::types::{NetworkClass, Point};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;

/// Radio-state source. Implementations wrap the platform connectivity API;
/// the core only reads from it.
pub trait NetworkMonitor: Send + Sync {
    fn current_network_class(&self) -> NetworkClass;

    fn is_roaming(&self) -> bool;
}

/// Point-in-time network state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub network: NetworkClass,
    pub roaming: bool,
}

impl EnvironmentSnapshot {
    pub fn sample(monitor: &dyn NetworkMonitor) -> Self {
        Self {
            network: monitor.current_network_class(),
            roaming: monitor.is_roaming(),
        }
    }
}

/// Evaluation context handed to [`crate::constraint::Constraint::evaluate`].
pub struct Environment<'a> {
    pub snapshot: EnvironmentSnapshot,
    pub sensors: &'a SensorSession,
    location: OnceCell<Option<Point>>,
}

impl<'a> Environment<'a> {
    pub fn new(snapshot: EnvironmentSnapshot, sensors: &'a SensorSession) -> Self {
        Self {
            snapshot,
            sensors,
            location: OnceCell::new(),
        }
    }

    /// Location for this pass. The first caller asks the session; later
    /// callers reuse the answer, including an unavailable one.
    pub fn location(&self) -> Option<Point> {
        *self
            .location
            .get_or_init(|| self.sensors.last_known_location())
    }
}
