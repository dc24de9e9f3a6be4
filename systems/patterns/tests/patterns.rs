use constellation_core::PatternKind;
use constellation_system_patterns::{PatternRegistry, BASE_SPACING};
use glam::Vec2;

const ROTATIONS: [f32; 8] = [
    0.0,
    0.7,
    std::f32::consts::PI,
    -2.3,
    123.456,
    f32::NAN,
    f32::INFINITY,
    f32::NEG_INFINITY,
];

fn sorted_distances(points: &[Vec2], center: Vec2) -> Vec<f32> {
    let mut distances: Vec<f32> = points.iter().map(|point| point.distance(center)).collect();
    distances.sort_by(|a, b| a.partial_cmp(b).expect("finite distance"));
    distances
}

#[test]
fn every_pattern_yields_exact_finite_counts_for_any_rotation() {
    let registry = PatternRegistry::with_defaults();
    let center = Vec2::new(320.0, -75.0);

    for pattern in registry.iter() {
        for count in pattern.min_members()..=pattern.max_members() {
            for rotation in ROTATIONS {
                let points = pattern.target_positions(center, count, rotation);
                assert_eq!(
                    points.len(),
                    count,
                    "{} produced wrong count for {count}",
                    pattern.name()
                );
                assert!(
                    points.iter().all(|point| point.is_finite()),
                    "{} produced non-finite point for {count} at {rotation}",
                    pattern.name()
                );
            }
        }
    }
}

#[test]
fn center_distances_are_rotation_invariant() {
    let registry = PatternRegistry::with_defaults();
    let center = Vec2::new(10.0, 20.0);

    for kind in [PatternKind::Triangle, PatternKind::Hexagon, PatternKind::Circle] {
        let pattern = registry.get(kind).expect("registered pattern");
        for count in pattern.min_members()..=pattern.max_members() {
            let reference = sorted_distances(&pattern.target_positions(center, count, 0.0), center);
            for rotation in [0.4, 1.9, 3.3, 5.8] {
                let rotated =
                    sorted_distances(&pattern.target_positions(center, count, rotation), center);
                for (expected, actual) in reference.iter().zip(&rotated) {
                    assert!(
                        (expected - actual).abs() < 1e-3,
                        "{kind} distance drifted under rotation {rotation}"
                    );
                }
            }
        }
    }
}

#[test]
fn generators_are_deterministic() {
    let registry = PatternRegistry::with_defaults();
    for pattern in registry.iter() {
        let first = pattern.target_positions(Vec2::new(5.0, 5.0), pattern.max_members(), 1.1);
        let second = pattern.target_positions(Vec2::new(5.0, 5.0), pattern.max_members(), 1.1);
        assert_eq!(first, second, "{} is not deterministic", pattern.name());
    }
}

#[test]
fn spacing_and_extent_stay_within_bounds() {
    let registry = PatternRegistry::with_defaults();
    let center = Vec2::ZERO;

    for pattern in registry.iter() {
        for count in pattern.min_members()..=pattern.max_members() {
            let points = pattern.target_positions(center, count, 0.9);
            for (index, point) in points.iter().enumerate() {
                assert!(
                    point.length() <= 300.0,
                    "{} point {index} escapes the extent limit",
                    pattern.name()
                );
                for other in &points[index + 1..] {
                    assert!(
                        point.distance(*other) >= 10.0,
                        "{} packs points closer than allowed at {count}",
                        pattern.name()
                    );
                }
            }
        }
    }
}

#[test]
fn orbit_keeps_its_protected_member_at_the_center() {
    let registry = PatternRegistry::with_defaults();
    let center = Vec2::new(-40.0, 90.0);
    let points = registry.target_positions(PatternKind::Orbit, center, 6, 2.0);
    assert!(points[0].distance(center) < 1e-3);
    assert!(points[1..]
        .iter()
        .all(|point| point.distance(center) > BASE_SPACING));
}

#[test]
fn counts_three_through_fifteen_have_an_exact_fit() {
    let registry = PatternRegistry::with_defaults();
    for count in 3..=15 {
        assert!(
            registry.fitting(count).next().is_some(),
            "no pattern accepts {count} members"
        );
    }
}
