//! Integration tests for constraint activation, evaluation and construction

use super::test_utils::Harness;
use callgate::constraint::{Constraint, NetworkKind};
use callgate::error::ConstraintError;
use callgate::queue::PendingCall;
use callgate::sensor::{ConnectionState, Expiry, Placement, Transition};
use callgate::sim::ConnectBehavior;
use callgate::types::{GeofenceId, NetworkClass, Point};
use std::time::Duration;

fn square() -> Vec<Point> {
    vec![
        Point::new(0.0, 0.0),
        Point::new(0.0, 10.0),
        Point::new(10.0, 10.0),
        Point::new(10.0, 0.0),
    ]
}

#[test]
fn test_region_calls_share_one_update_request() {
    let h = Harness::new(ConnectBehavior::Immediate, NetworkClass::None);
    h.provider.set_location(Some(Point::new(5.0, 5.0)));
    for payload in ["a", "b"] {
        let region = Constraint::geo_region("yard", square(), Placement::Inside).unwrap();
        h.queue.enqueue(PendingCall::new(region, payload)).unwrap();
    }
    assert_eq!(h.provider.update_requests(), 1);
    assert!(h.session.status().updates_active);

    h.queue.run();
    assert_eq!(h.executed(), vec!["a", "b"]);
    assert_eq!(h.provider.remove_update_calls(), 1);
    assert_eq!(h.session.connection_state(), ConnectionState::Disconnected);
}

#[test]
fn test_outside_placement_admits_beyond_the_fence() {
    let h = Harness::new(ConnectBehavior::Immediate, NetworkClass::None);
    h.provider.set_location(Some(Point::new(5.0, 5.0)));
    let beyond = Constraint::geo_circle(
        "school",
        Point::new(5.0, 5.0),
        200.0,
        Placement::Outside,
        Expiry::After(Duration::from_secs(3600)),
    )
    .unwrap();
    h.queue.enqueue(PendingCall::new(beyond, "leave")).unwrap();

    assert_eq!(h.queue.run().held, 1);

    h.provider.set_location(Some(Point::new(5.1, 5.0)));
    assert_eq!(h.queue.run().admitted.len(), 1);
    assert_eq!(h.executed(), vec!["leave"]);
}

#[test]
fn test_outside_circle_registers_exit_transition() {
    let circle = Constraint::geo_circle(
        "gate",
        Point::new(1.0, 2.0),
        75.0,
        Placement::Outside,
        Expiry::Never,
    )
    .unwrap();
    match &circle {
        Constraint::GeoCircle(circle) => {
            assert_eq!(circle.definition().transition, Transition::Exit)
        }
        other => panic!("unexpected constraint {:?}", other),
    }
}

#[test]
fn test_composite_reports_all_geofence_ids() {
    let constraint = Constraint::mobile(false)
        .and(
            Constraint::geo_circle(
                "gate",
                Point::new(1.0, 2.0),
                50.0,
                Placement::Inside,
                Expiry::Never,
            )
            .unwrap(),
        )
        .and(Constraint::geo_region("campus", square(), Placement::Inside).unwrap());

    assert_eq!(
        constraint.geofence_ids(),
        vec![GeofenceId::new("gate"), GeofenceId::new("campus")]
    );
    assert!(constraint.requires_location());
    assert_eq!(
        constraint.to_string(),
        "(mobile AND within 50m of (1, 2) [gate] AND inside region of 4 vertices [campus])"
    );
}

#[test]
fn test_invalid_constructions_are_rejected() {
    assert_eq!(
        Constraint::geo_circle("", Point::new(0.0, 0.0), 10.0, Placement::Inside, Expiry::Never),
        Err(ConstraintError::EmptyId)
    );
    assert!(matches!(
        Constraint::geo_circle("c", Point::new(0.0, 0.0), 0.0, Placement::Inside, Expiry::Never),
        Err(ConstraintError::InvalidRadius { .. })
    ));
    assert!(matches!(
        Constraint::geo_region("r", square()[..2].to_vec(), Placement::Inside),
        Err(ConstraintError::DegeneratePolygon { vertices: 2, .. })
    ));
    assert!(matches!(
        Constraint::geo_circle(
            "n",
            Point::new(f64::NAN, 0.0),
            10.0,
            Placement::Inside,
            Expiry::Never
        ),
        Err(ConstraintError::NonFiniteCoordinate { .. })
    ));
}

#[test]
fn test_network_kind_parses_cli_names() {
    assert_eq!("wifi".parse::<NetworkKind>().unwrap(), NetworkKind::Wifi);
    assert_eq!("Mobile".parse::<NetworkKind>().unwrap(), NetworkKind::Mobile);
    assert!("ethernet".parse::<NetworkKind>().is_err());
}
