//! Greedy nearest-target anchor assignment.

use constellation_core::AgentId;
use glam::Vec2;

/// Orders `members` so that entry `i` of the result steers toward `targets[i]`.
///
/// Members closest to `centroid` choose first and take their nearest free
/// target, which keeps travel short and avoids crossing paths for the inner
/// ring. Returns `None` when the counts differ or a position is non-finite.
pub(crate) fn assign(
    members: &[(AgentId, Vec2)],
    centroid: Vec2,
    targets: &[Vec2],
) -> Option<Vec<AgentId>> {
    if members.len() != targets.len()
        || !centroid.is_finite()
        || members.iter().any(|(_, position)| !position.is_finite())
        || targets.iter().any(|target| !target.is_finite())
    {
        return None;
    }

    let mut order: Vec<&(AgentId, Vec2)> = members.iter().collect();
    order.sort_by(|a, b| {
        a.1.distance_squared(centroid)
            .total_cmp(&b.1.distance_squared(centroid))
            .then(a.0.cmp(&b.0))
    });

    let mut slots: Vec<Option<AgentId>> = vec![None; targets.len()];
    for (id, position) in order {
        let nearest = targets
            .iter()
            .enumerate()
            .filter(|(index, _)| slots[*index].is_none())
            .min_by(|a, b| {
                a.1.distance_squared(*position)
                    .total_cmp(&b.1.distance_squared(*position))
            })
            .map(|(index, _)| index)?;
        slots[nearest] = Some(*id);
    }

    slots.into_iter().collect()
}

/// Sum of distances between each position and the target sharing its index.
pub(crate) fn total_travel(positions: &[Vec2], targets: &[Vec2]) -> f32 {
    positions
        .iter()
        .zip(targets)
        .map(|(position, target)| position.distance(*target))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::{assign, total_travel};
    use constellation_core::AgentId;
    use glam::Vec2;

    #[test]
    fn members_take_their_nearest_targets() {
        let members = [
            (AgentId::new(1), Vec2::new(10.0, 0.0)),
            (AgentId::new(2), Vec2::new(-10.0, 0.0)),
            (AgentId::new(3), Vec2::new(0.0, 10.0)),
        ];
        let targets = [
            Vec2::new(0.0, 12.0),
            Vec2::new(-12.0, 0.0),
            Vec2::new(12.0, 0.0),
        ];

        let order = assign(&members, Vec2::ZERO, &targets).expect("assignable");
        assert_eq!(order, vec![AgentId::new(3), AgentId::new(2), AgentId::new(1)]);
    }

    #[test]
    fn mismatched_or_non_finite_input_is_refused() {
        let members = [(AgentId::new(1), Vec2::ZERO)];
        assert!(assign(&members, Vec2::ZERO, &[]).is_none());
        assert!(assign(&members, Vec2::ZERO, &[Vec2::new(f32::NAN, 0.0)]).is_none());
    }

    #[test]
    fn travel_sums_pairwise_distances() {
        let positions = [Vec2::ZERO, Vec2::new(3.0, 4.0)];
        let targets = [Vec2::new(0.0, 1.0), Vec2::new(0.0, 0.0)];
        assert!((total_travel(&positions, &targets) - 6.0).abs() < 1e-5);
    }
}
