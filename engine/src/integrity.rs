//! Shape checks feeding the integrity strike counter.

use glam::Vec2;

use crate::config::IntegrityTuning;

/// Violations observed during one audit.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Violations {
    pub(crate) edge: bool,
    pub(crate) radius: bool,
    pub(crate) deviation: bool,
    pub(crate) mean_deviation: f32,
}

impl Violations {
    pub(crate) fn any(&self) -> bool {
        self.edge || self.radius || self.deviation
    }
}

/// Compares member `positions` against `targets`, both ordered by anchor.
///
/// Edges join consecutive anchors (wrapping around) and are measured against
/// the same edge in the target layout.
pub(crate) fn evaluate(
    positions: &[Vec2],
    targets: &[Vec2],
    centroid: Vec2,
    edge_tolerance: f32,
    max_radius: f32,
    max_deviation: f32,
) -> Violations {
    let count = positions.len().min(targets.len());
    if count == 0 {
        return Violations::default();
    }

    let mut violations = Violations::default();
    let mut deviation_sum = 0.0;
    for (position, target) in positions.iter().zip(targets) {
        let deviation = position.distance(*target);
        deviation_sum += deviation;
        violations.deviation |= deviation > max_deviation;
        violations.radius |= position.distance(centroid) > max_radius;
    }
    violations.mean_deviation = deviation_sum / count as f32;

    if count >= 2 {
        let worst = (0..count)
            .filter_map(|index| {
                let next = (index + 1) % count;
                let expected = targets[index].distance(targets[next]);
                (expected > 1.0).then(|| positions[index].distance(positions[next]) / expected)
            })
            .fold(0.0_f32, f32::max);
        violations.edge = worst > edge_tolerance;
    }

    violations
}

/// Applies one audit to `strikes` over `dt` seconds and returns the new count.
pub(crate) fn accumulate(strikes: f32, violations: &Violations, dt: f32, tuning: &IntegrityTuning) -> f32 {
    let next = if violations.any() {
        let weighted = |flag: bool, weight: f32| if flag { weight } else { 0.0 };
        let weight = weighted(violations.edge, tuning.edge_weight)
            + weighted(violations.radius, tuning.radius_weight)
            + weighted(violations.deviation, tuning.deviation_weight);
        strikes + weight * dt
    } else if violations.mean_deviation <= tuning.well_formed_deviation {
        strikes - tuning.well_formed_decay_per_sec * dt
    } else {
        strikes - tuning.decay_per_sec * dt
    };
    next.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::{accumulate, evaluate, Violations};
    use crate::config::IntegrityTuning;
    use glam::Vec2;

    fn square(side: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(side, 0.0),
            Vec2::new(side, side),
            Vec2::new(0.0, side),
        ]
    }

    #[test]
    fn matching_layout_has_no_violations() {
        let targets = square(40.0);
        let violations = evaluate(&targets, &targets, Vec2::splat(20.0), 1.5, 220.0, 120.0);
        assert!(!violations.any());
        assert_eq!(violations.mean_deviation, 0.0);
    }

    #[test]
    fn stretched_edges_are_flagged() {
        let targets = square(40.0);
        let mut positions = targets.clone();
        positions[1].x = 110.0;
        let violations = evaluate(&positions, &targets, Vec2::splat(20.0), 1.5, 220.0, 120.0);
        assert!(violations.edge);
        assert!(!violations.deviation);
    }

    #[test]
    fn far_members_break_radius_and_deviation() {
        let targets = square(40.0);
        let mut positions = targets.clone();
        positions[2] = Vec2::new(400.0, 400.0);
        let violations = evaluate(&positions, &targets, Vec2::splat(20.0), 1.5, 220.0, 120.0);
        assert!(violations.radius);
        assert!(violations.deviation);
    }

    #[test]
    fn strikes_grow_by_weight_and_decay_faster_when_well_formed() {
        let tuning = IntegrityTuning::default();
        let broken = Violations {
            edge: true,
            radius: true,
            deviation: true,
            mean_deviation: 200.0,
        };
        assert!((accumulate(0.0, &broken, 0.5, &tuning) - 2.5).abs() < 1e-6);

        let loose = Violations {
            mean_deviation: 60.0,
            ..Violations::default()
        };
        assert!((accumulate(3.0, &loose, 1.0, &tuning) - 2.0).abs() < 1e-6);

        let tight = Violations::default();
        assert!((accumulate(3.0, &tight, 1.0, &tuning) - 1.0).abs() < 1e-6);
        assert_eq!(accumulate(0.5, &tight, 1.0, &tuning), 0.0);
    }
}
