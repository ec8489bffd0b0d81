//! callgate: deferred calls gated on network and location constraints
//!
//! Calls wait in an [`AdmissionQueue`] until their [`Constraint`] holds. A
//! constraint composes network-class requirements with circular and polygonal
//! geofences; geofence state comes from a shared, reference-counted
//! [`SensorSession`] over a pluggable location provider. External triggers
//! drive re-evaluation through an [`EventRouter`].

pub mod cli;
pub mod config;
pub mod constraint;
pub mod environment;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod queue;
pub mod sensor;
pub mod sim;
pub mod trigger;
pub mod types;

pub use config::{ConfigLoader, GateConfig};
pub use constraint::{Constraint, NetworkKind, NetworkRequirement};
pub use environment::{Environment, EnvironmentSnapshot, NetworkMonitor};
pub use error::{ConstraintError, GateError, GeometryError, ProviderError, QueueError};
pub use queue::{AdmissionQueue, CallExecutor, PendingCall, QueueConfig, QueueStats, RunSummary};
pub use sensor::{LocationProvider, Placement, SensorSession, SessionConfig};
pub use trigger::{EventRouter, TriggerEvent};
pub use types::{CallId, GeofenceId, NetworkClass, Point};
