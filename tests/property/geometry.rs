//! Property-based tests for the geometry predicates

use callgate::geometry::{distance_meters, point_in_circle, point_in_polygon};
use callgate::types::Point;
use proptest::prelude::*;

fn point() -> impl Strategy<Value = Point> {
    (-89.0f64..89.0, -179.0f64..179.0).prop_map(|(lat, lng)| Point::new(lat, lng))
}

/// Axis-aligned rectangle as (south, west, north, east).
fn rectangle() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    (-60.0f64..60.0, -170.0f64..170.0, 0.01f64..5.0, 0.01f64..5.0)
        .prop_map(|(lat, lng, dlat, dlng)| (lat, lng, lat + dlat, lng + dlng))
}

proptest! {
    #[test]
    fn distance_is_symmetric(a in point(), b in point()) {
        let ab = distance_meters(a, b);
        let ba = distance_meters(b, a);
        prop_assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn distance_is_non_negative_and_zero_to_self(a in point(), b in point()) {
        prop_assert!(distance_meters(a, b) >= 0.0);
        prop_assert!(distance_meters(a, a).abs() < 1e-6);
    }

    #[test]
    fn distance_is_bounded_by_half_circumference(a in point(), b in point()) {
        let half = std::f64::consts::PI * 6_371_000.0;
        prop_assert!(distance_meters(a, b) <= half + 1.0);
    }

    #[test]
    fn center_is_inside_any_circle(center in point(), radius in 1.0f64..100_000.0) {
        prop_assert!(point_in_circle(center, center, radius));
    }

    #[test]
    fn rectangle_center_is_inside((south, west, north, east) in rectangle()) {
        let polygon = vec![
            Point::new(south, west),
            Point::new(south, east),
            Point::new(north, east),
            Point::new(north, west),
        ];
        let center = Point::new((south + north) / 2.0, (west + east) / 2.0);
        prop_assert!(point_in_polygon(center, &polygon));
    }

    #[test]
    fn point_north_of_rectangle_is_outside(
        (south, west, north, east) in rectangle(),
        offset in 0.01f64..10.0,
    ) {
        let polygon = vec![
            Point::new(south, west),
            Point::new(south, east),
            Point::new(north, east),
            Point::new(north, west),
        ];
        let query = Point::new(north + offset, (west + east) / 2.0);
        prop_assert!(!point_in_polygon(query, &polygon));
    }

    #[test]
    fn vertex_order_does_not_change_membership(
        (south, west, north, east) in rectangle(),
        query in point(),
    ) {
        let clockwise = vec![
            Point::new(south, west),
            Point::new(north, west),
            Point::new(north, east),
            Point::new(south, east),
        ];
        let mut counter = clockwise.clone();
        counter.reverse();
        prop_assert_eq!(
            point_in_polygon(query, &clockwise),
            point_in_polygon(query, &counter)
        );
    }
}
