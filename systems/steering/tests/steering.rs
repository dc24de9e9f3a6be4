use constellation_system_patterns::Orientation;
use constellation_system_steering::{
    advance, drift_force, spring_force, FormationMotion, MotionInput, SteeringTuning,
};
use glam::Vec2;

fn input(centroid: Vec2, target: Vec2, orientation: Orientation, active: usize) -> MotionInput {
    MotionInput {
        live_centroid: Some(centroid),
        target,
        orientation,
        active_formations: active,
    }
}

#[test]
fn center_relaxes_toward_the_live_centroid_without_jumping() {
    let tuning = SteeringTuning {
        pursuit_gain: 0.0,
        orbit_speed: 0.0,
        ..SteeringTuning::default()
    };
    let mut motion = FormationMotion::new(Vec2::ZERO, 0.0, 0.0);
    let centroid = Vec2::new(100.0, 0.0);

    advance(&mut motion, &input(centroid, Vec2::ZERO, Orientation::FreeSpin, 1), 1.0 / 60.0, &tuning);
    assert!(motion.center.x > 0.0 && motion.center.x < 10.0);

    for _ in 0..600 {
        advance(&mut motion, &input(centroid, Vec2::ZERO, Orientation::FreeSpin, 1), 1.0 / 60.0, &tuning);
    }
    assert!(motion.center.distance(centroid) < 0.5);
}

#[test]
fn pursuit_closes_distance_to_the_standoff_ring() {
    let tuning = SteeringTuning {
        center_follow_rate: 0.0,
        orbit_speed: 0.0,
        ..SteeringTuning::default()
    };
    let target = Vec2::new(1_000.0, 0.0);
    let mut motion = FormationMotion::new(Vec2::ZERO, 0.0, 0.0);

    let before = motion.center.distance(target);
    advance(&mut motion, &MotionInput { live_centroid: None, target, orientation: Orientation::FreeSpin, active_formations: 1 }, 0.1, &tuning);
    let moved = before - motion.center.distance(target);
    assert!(moved > 0.0);
    assert!(moved <= tuning.max_pursuit_speed * 0.1 + 1e-3, "pursuit is clamped per tick");

    let mut close = FormationMotion::new(Vec2::new(950.0, 0.0), 0.0, 0.0);
    advance(&mut close, &MotionInput { live_centroid: None, target, orientation: Orientation::FreeSpin, active_formations: 1 }, 0.1, &tuning);
    assert!(close.center.x < 950.0, "inside the standoff the formation backs off");
}

#[test]
fn crowding_scales_movement_down() {
    let tuning = SteeringTuning {
        center_follow_rate: 0.0,
        ..SteeringTuning::default()
    };
    let target = Vec2::new(600.0, 0.0);
    let step = |active: usize| {
        let mut motion = FormationMotion::new(Vec2::ZERO, 0.0, 0.0);
        advance(
            &mut motion,
            &MotionInput { live_centroid: None, target, orientation: Orientation::FreeSpin, active_formations: active },
            0.05,
            &tuning,
        );
        motion.center.length()
    };
    assert!(step(8) < step(1));
}

#[test]
fn facing_patterns_turn_toward_the_target() {
    let tuning = SteeringTuning::default();
    let target = Vec2::new(0.0, 500.0);
    let mut motion = FormationMotion::new(Vec2::ZERO, 0.0, 0.0);
    for _ in 0..300 {
        advance(
            &mut motion,
            &MotionInput { live_centroid: Some(Vec2::ZERO), target, orientation: Orientation::FacesTarget, active_formations: 1 },
            1.0 / 60.0,
            &tuning,
        );
    }
    let heading = Vec2::from_angle(motion.rotation);
    let desired = (target - motion.center).normalize();
    assert!(heading.dot(desired) > 0.99);
}

#[test]
fn free_spin_decays_and_stays_wrapped() {
    let tuning = SteeringTuning::default();
    let mut motion = FormationMotion::new(Vec2::ZERO, 6.2, 3.0);
    for _ in 0..600 {
        advance(&mut motion, &input(Vec2::ZERO, Vec2::new(400.0, 0.0), Orientation::FreeSpin, 1), 1.0 / 60.0, &tuning);
        assert!((0.0..std::f32::consts::TAU).contains(&motion.rotation));
    }
    assert!(motion.rotation_velocity < 3.0);
    assert!(motion.rotation_velocity > 0.0);
}

#[test]
fn non_finite_inputs_leave_motion_finite() {
    let tuning = SteeringTuning::default();
    let mut motion = FormationMotion::new(Vec2::new(10.0, 10.0), f32::NAN, f32::INFINITY);
    assert_eq!(motion.rotation, 0.0);
    assert_eq!(motion.rotation_velocity, 0.0);

    advance(
        &mut motion,
        &MotionInput {
            live_centroid: Some(Vec2::new(f32::NAN, 0.0)),
            target: Vec2::new(f32::INFINITY, 0.0),
            orientation: Orientation::FacesTarget,
            active_formations: 2,
        },
        0.016,
        &tuning,
    );
    assert!(motion.center.is_finite());
    assert!(motion.rotation.is_finite());
}

#[test]
fn spring_force_points_at_the_anchor_and_is_clamped() {
    let tuning = SteeringTuning::default();
    let near = spring_force(Vec2::ZERO, Vec2::new(10.0, 0.0), &tuning);
    assert!((near - Vec2::new(60.0, 0.0)).length() < 1e-4);

    let far = spring_force(Vec2::ZERO, Vec2::new(0.0, 10_000.0), &tuning);
    assert!((far.length() - tuning.max_spring_force).abs() < 1e-2);
    assert!(far.y > 0.0);

    assert_eq!(spring_force(Vec2::new(f32::NAN, 0.0), Vec2::ZERO, &tuning), Vec2::ZERO);
}

#[test]
fn drift_fades_with_distance_and_stops_at_the_radius() {
    let tuning = SteeringTuning::default();
    let center = Vec2::ZERO;

    let close = drift_force(Vec2::new(50.0, 0.0), center, 1, &tuning).expect("inside radius");
    let far = drift_force(Vec2::new(300.0, 0.0), center, 1, &tuning).expect("inside radius");
    assert!(close.x < 0.0 && far.x < 0.0);
    assert!(close.length() > far.length());
    assert!(close.length() < tuning.drift_strength);

    assert!(drift_force(Vec2::new(tuning.drift_radius + 1.0, 0.0), center, 1, &tuning).is_none());

    let crowded = drift_force(Vec2::new(50.0, 0.0), center, 6, &tuning).expect("inside radius");
    assert!(crowded.length() < close.length());
}
