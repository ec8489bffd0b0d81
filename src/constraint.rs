//! Constraints
//!
//! A [`Constraint`] is a predicate gating whether a queued call may run. Leaf
//! variants test network class or geographic containment; [`Constraint::And`]
//! composes children so new combinations are declared rather than subclassed.
//!
//! Geo leaves are fail-closed: an unknown location never satisfies them.

use crate::environment::{Environment, EnvironmentSnapshot};
use crate::error::ConstraintError;
use crate::geometry::{distance_meters, point_in_circle, point_in_polygon};
use crate::sensor::{Expiry, GeofenceDefinition, Placement, SensorSession};
use crate::types::{GeofenceId, NetworkClass, Point};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Requested connectivity class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    Wwan,
    Wifi,
    /// WWAN (subject to the roaming rule) or Wi-Fi
    Mobile,
}

impl FromStr for NetworkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wwan" | "cellular" => Ok(NetworkKind::Wwan),
            "wifi" => Ok(NetworkKind::Wifi),
            "mobile" => Ok(NetworkKind::Mobile),
            other => Err(format!(
                "unknown network requirement '{}' (expected wwan, wifi or mobile)",
                other
            )),
        }
    }
}

/// Network-class leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkRequirement {
    pub kind: NetworkKind,
    pub allow_roaming: bool,
}

impl NetworkRequirement {
    pub fn is_met(&self, snapshot: &EnvironmentSnapshot) -> bool {
        let wwan_ok = snapshot.network == NetworkClass::Wwan
            && (self.allow_roaming || !snapshot.roaming);
        let wifi_ok = snapshot.network == NetworkClass::Wifi;
        match self.kind {
            NetworkKind::Wwan => wwan_ok,
            NetworkKind::Wifi => wifi_ok,
            NetworkKind::Mobile => wwan_ok || wifi_ok,
        }
    }
}

/// Circular geofence leaf. Built through [`Constraint::geo_circle`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeoCircle {
    id: GeofenceId,
    center: Point,
    radius_meters: f64,
    placement: Placement,
    expiry: Expiry,
}

impl GeoCircle {
    pub fn id(&self) -> &GeofenceId {
        &self.id
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn expiry(&self) -> Expiry {
        self.expiry
    }

    /// Provider registration for this fence.
    pub fn definition(&self) -> GeofenceDefinition {
        GeofenceDefinition {
            id: self.id.clone(),
            center: self.center,
            radius_meters: self.radius_meters,
            expiry: self.expiry,
            transition: self.placement.transition(),
        }
    }

    fn is_met(&self, env: &Environment<'_>) -> bool {
        let location = match env.location() {
            Some(location) => location,
            None => {
                debug!(geofence_id = %self.id, "No location, circle constraint not met");
                return false;
            }
        };
        let inside = point_in_circle(location, self.center, self.radius_meters);
        debug!(
            geofence_id = %self.id,
            distance_meters = distance_meters(location, self.center),
            radius_meters = self.radius_meters,
            inside,
            "Evaluated circle constraint"
        );
        self.placement.is_inside() == inside
    }
}

/// Polygon geofence leaf. Built through [`Constraint::geo_region`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRegion {
    id: GeofenceId,
    polygon: Vec<Point>,
    placement: Placement,
}

impl GeoRegion {
    pub fn id(&self) -> &GeofenceId {
        &self.id
    }

    pub fn polygon(&self) -> &[Point] {
        &self.polygon
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    fn is_met(&self, env: &Environment<'_>) -> bool {
        let location = match env.location() {
            Some(location) => location,
            None => {
                debug!(geofence_id = %self.id, "No location, region constraint not met");
                return false;
            }
        };
        let inside = point_in_polygon(location, &self.polygon);
        debug!(geofence_id = %self.id, inside, "Evaluated region constraint");
        self.placement.is_inside() == inside
    }
}

/// Predicate gating a queued call
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    AlwaysAllow,
    Network(NetworkRequirement),
    GeoCircle(GeoCircle),
    GeoRegion(GeoRegion),
    /// All children, evaluated in declaration order with short-circuit
    And(Vec<Constraint>),
}

impl Constraint {
    pub fn always_allow() -> Self {
        Constraint::AlwaysAllow
    }

    pub fn network(kind: NetworkKind, allow_roaming: bool) -> Self {
        Constraint::Network(NetworkRequirement {
            kind,
            allow_roaming,
        })
    }

    pub fn wifi() -> Self {
        Self::network(NetworkKind::Wifi, false)
    }

    pub fn wwan(allow_roaming: bool) -> Self {
        Self::network(NetworkKind::Wwan, allow_roaming)
    }

    pub fn mobile(allow_roaming: bool) -> Self {
        Self::network(NetworkKind::Mobile, allow_roaming)
    }

    /// Circular fence around `center`.
    pub fn geo_circle(
        id: impl Into<GeofenceId>,
        center: Point,
        radius_meters: f64,
        placement: Placement,
        expiry: Expiry,
    ) -> Result<Self, ConstraintError> {
        let id = id.into();
        if id.as_str().trim().is_empty() {
            return Err(ConstraintError::EmptyId);
        }
        if !center.lat.is_finite() || !center.lng.is_finite() {
            return Err(ConstraintError::NonFiniteCoordinate { id });
        }
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return Err(ConstraintError::InvalidRadius {
                id,
                radius: radius_meters,
            });
        }
        Ok(Constraint::GeoCircle(GeoCircle {
            id,
            center,
            radius_meters,
            placement,
            expiry,
        }))
    }

    /// Polygonal region; the last vertex implicitly connects to the first.
    pub fn geo_region(
        id: impl Into<GeofenceId>,
        polygon: Vec<Point>,
        placement: Placement,
    ) -> Result<Self, ConstraintError> {
        let id = id.into();
        if id.as_str().trim().is_empty() {
            return Err(ConstraintError::EmptyId);
        }
        if polygon.len() < 3 {
            return Err(ConstraintError::DegeneratePolygon {
                id,
                vertices: polygon.len(),
            });
        }
        if polygon
            .iter()
            .any(|p| !p.lat.is_finite() || !p.lng.is_finite())
        {
            return Err(ConstraintError::NonFiniteCoordinate { id });
        }
        Ok(Constraint::GeoRegion(GeoRegion {
            id,
            polygon,
            placement,
        }))
    }

    pub fn all(children: Vec<Constraint>) -> Self {
        Constraint::And(children)
    }

    /// Append `other` to this constraint's conjunction.
    pub fn and(self, other: Constraint) -> Self {
        match self {
            Constraint::And(mut children) => {
                children.push(other);
                Constraint::And(children)
            }
            Constraint::AlwaysAllow => other,
            single => Constraint::And(vec![single, other]),
        }
    }

    /// Wi-Fi check first, then `geo`.
    pub fn wifi_and(geo: Constraint) -> Self {
        Self::all(vec![Self::wifi(), geo])
    }

    /// WWAN check first, then `geo`.
    pub fn wwan_and(geo: Constraint, allow_roaming: bool) -> Self {
        Self::all(vec![Self::wwan(allow_roaming), geo])
    }

    /// Wi-Fi and inside (or outside) a circular fence.
    pub fn wifi_and_geo_circle(
        id: impl Into<GeofenceId>,
        center: Point,
        radius_meters: f64,
        placement: Placement,
        expiry: Expiry,
    ) -> Result<Self, ConstraintError> {
        Self::geo_circle(id, center, radius_meters, placement, expiry).map(Self::wifi_and)
    }

    pub fn wwan_and_geo_circle(
        id: impl Into<GeofenceId>,
        center: Point,
        radius_meters: f64,
        placement: Placement,
        expiry: Expiry,
        allow_roaming: bool,
    ) -> Result<Self, ConstraintError> {
        Self::geo_circle(id, center, radius_meters, placement, expiry)
            .map(|geo| Self::wwan_and(geo, allow_roaming))
    }

    pub fn wifi_and_geo_region(
        id: impl Into<GeofenceId>,
        polygon: Vec<Point>,
        placement: Placement,
    ) -> Result<Self, ConstraintError> {
        Self::geo_region(id, polygon, placement).map(Self::wifi_and)
    }

    pub fn wwan_and_geo_region(
        id: impl Into<GeofenceId>,
        polygon: Vec<Point>,
        placement: Placement,
        allow_roaming: bool,
    ) -> Result<Self, ConstraintError> {
        Self::geo_region(id, polygon, placement).map(|geo| Self::wwan_and(geo, allow_roaming))
    }

    pub fn evaluate(&self, env: &Environment<'_>) -> bool {
        match self {
            Constraint::AlwaysAllow => true,
            Constraint::Network(requirement) => requirement.is_met(&env.snapshot),
            Constraint::GeoCircle(circle) => circle.is_met(env),
            Constraint::GeoRegion(region) => region.is_met(env),
            Constraint::And(children) => children.iter().all(|child| child.evaluate(env)),
        }
    }

    /// Start whatever sensing this constraint needs.
    pub fn activate(&self, session: &SensorSession) {
        match self {
            Constraint::AlwaysAllow => {}
            Constraint::Network(requirement) => {
                debug!(kind = ?requirement.kind, "Network constraint active");
            }
            Constraint::GeoCircle(circle) => {
                if !session.acquire(session.config().connect_timeout()) {
                    warn!(
                        geofence_id = %circle.id,
                        "Activating circle constraint without provider connection"
                    );
                }
                session.register_geofence(circle.definition());
            }
            Constraint::GeoRegion(region) => {
                if !session.acquire(session.config().connect_timeout()) {
                    warn!(
                        geofence_id = %region.id,
                        "Activating region constraint without provider connection"
                    );
                }
                session.set_continuous_updates(session.config().update_request());
            }
            Constraint::And(children) => {
                for child in children {
                    child.activate(session);
                }
            }
        }
    }

    /// Undo [`Constraint::activate`]. Region constraints leave continuous
    /// updates to the session, which stops them when its last holder leaves.
    pub fn deactivate(&self, session: &SensorSession) {
        match self {
            Constraint::AlwaysAllow | Constraint::Network(_) => {}
            Constraint::GeoCircle(circle) => {
                session.deregister_geofences(std::slice::from_ref(&circle.id));
                session.release();
            }
            Constraint::GeoRegion(_) => session.release(),
            Constraint::And(children) => {
                for child in children {
                    child.deactivate(session);
                }
            }
        }
    }

    /// Geofence ids registered by this constraint tree, in declaration order.
    pub fn geofence_ids(&self) -> Vec<GeofenceId> {
        let mut ids = Vec::new();
        self.collect_geofence_ids(&mut ids);
        ids
    }

    fn collect_geofence_ids(&self, ids: &mut Vec<GeofenceId>) {
        match self {
            Constraint::GeoCircle(circle) => ids.push(circle.id.clone()),
            Constraint::GeoRegion(region) => ids.push(region.id.clone()),
            Constraint::And(children) => {
                for child in children {
                    child.collect_geofence_ids(ids);
                }
            }
            Constraint::AlwaysAllow | Constraint::Network(_) => {}
        }
    }

    /// True when evaluation touches the sensor session.
    pub fn requires_location(&self) -> bool {
        match self {
            Constraint::GeoCircle(_) | Constraint::GeoRegion(_) => true,
            Constraint::And(children) => children.iter().any(Constraint::requires_location),
            Constraint::AlwaysAllow | Constraint::Network(_) => false,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::AlwaysAllow => f.write_str("always"),
            Constraint::Network(requirement) => {
                let kind = match requirement.kind {
                    NetworkKind::Wwan => "wwan",
                    NetworkKind::Wifi => "wifi",
                    NetworkKind::Mobile => "mobile",
                };
                if requirement.allow_roaming {
                    write!(f, "{}(roaming)", kind)
                } else {
                    f.write_str(kind)
                }
            }
            Constraint::GeoCircle(circle) => write!(
                f,
                "{} {}m of ({}) [{}]",
                if circle.placement.is_inside() { "within" } else { "beyond" },
                circle.radius_meters,
                circle.center,
                circle.id
            ),
            Constraint::GeoRegion(region) => write!(
                f,
                "{} region of {} vertices [{}]",
                if region.placement.is_inside() { "inside" } else { "outside" },
                region.polygon.len(),
                region.id
            ),
            Constraint::And(children) => {
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" AND ")?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
        }
    }
}
