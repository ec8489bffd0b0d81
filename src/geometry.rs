//! Geometry Kit
//!
//! Pure geographic predicates used by geo constraints: great-circle distance,
//! circle containment and polygon containment. No state, no I/O.

use crate::types::Point;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance in meters between two points (haversine formula).
pub fn distance_meters(a: Point, b: Point) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + (d_lng / 2.0).sin().powi(2) * a.lat.to_radians().cos() * b.lat.to_radians().cos();
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_METERS * c
}

/// True iff `p` lies within `radius_meters` of `center`. The boundary is inclusive.
pub fn point_in_circle(p: Point, center: Point, radius_meters: f64) -> bool {
    distance_meters(p, center) <= radius_meters
}

/// Even-odd ray casting test on the (lat, lng) plane.
///
/// Edges use the half-open rule `(yi <= py < yj) || (yj <= py < yi)` so a ray
/// through a shared vertex toggles exactly once. The polygon is implicitly
/// closed; callers are expected to have rejected fewer than three vertices, in
/// which case this returns `false`.
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for (i, vi) in polygon.iter().enumerate() {
        let vj = polygon[j];
        let spans = (vi.lat <= p.lat && p.lat < vj.lat) || (vj.lat <= p.lat && p.lat < vi.lat);
        if spans {
            let crossing = (vj.lng - vi.lng) * (p.lat - vi.lat) / (vj.lat - vi.lat) + vi.lng;
            if p.lng < crossing {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
