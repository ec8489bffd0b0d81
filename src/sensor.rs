//! Sensors: the shared location-provider session and its capability interfaces.

pub mod geofence;
pub mod provider;
pub mod session;

pub use geofence::{
    Expiry, GeofenceDefinition, Placement, Transition, UpdatePriority, UpdateRequest,
};
pub use provider::{CoarseLocationSource, LocationProvider, ProviderEvents, RegistrationStatus};
pub use session::{
    ConnectionState, LocationFix, LocationSource, SensorSession, SessionConfig, SessionStatus,
};
