//! Core value types shared across the crate.

use crate::error::GeometryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lat, self.lng)
    }
}

/// Parses the `"latitude, longitude"` form produced by `Display`.
impl FromStr for Point {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split(',');
        let (lat, lng) = match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(lat), Some(lng), None) => (lat.trim(), lng.trim()),
            _ => return Err(GeometryError::MalformedPoint(s.to_string())),
        };
        let lat: f64 = lat
            .parse()
            .map_err(|_| GeometryError::MalformedPoint(s.to_string()))?;
        let lng: f64 = lng
            .parse()
            .map_err(|_| GeometryError::MalformedPoint(s.to_string()))?;
        if !lat.is_finite() || !lng.is_finite() {
            return Err(GeometryError::MalformedPoint(s.to_string()));
        }
        Ok(Point { lat, lng })
    }
}

/// Identity of a pending call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CallId(u64);

impl CallId {
    /// Generate the next call ID
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        CallId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

/// Stable name of a geo constraint, used for provider registration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GeofenceId(String);

impl GeofenceId {
    pub fn new(id: impl Into<String>) -> Self {
        GeofenceId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeofenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GeofenceId {
    fn from(id: &str) -> Self {
        GeofenceId::new(id)
    }
}

impl From<String> for GeofenceId {
    fn from(id: String) -> Self {
        GeofenceId(id)
    }
}

/// Connectivity class currently reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkClass {
    #[default]
    None,
    Wwan,
    Wifi,
}

impl NetworkClass {
    pub fn as_str(self) -> &'static str {
        match self {
            NetworkClass::None => "none",
            NetworkClass::Wwan => "wwan",
            NetworkClass::Wifi => "wifi",
        }
    }
}

impl FromStr for NetworkClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(NetworkClass::None),
            "wwan" | "cellular" => Ok(NetworkClass::Wwan),
            "wifi" => Ok(NetworkClass::Wifi),
            other => Err(format!(
                "unknown network class '{}' (expected none, wwan or wifi)",
                other
            )),
        }
    }
}
