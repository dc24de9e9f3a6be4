//! Formation records owned by the engine.

use constellation_core::{AgentId, ConstellationId, FormationPhase, PatternKind};
use constellation_system_patterns::{Orientation, PatternRegistry};
use constellation_system_steering::FormationMotion;
use glam::Vec2;

/// Target positions computed for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct TargetCache {
    frame: u64,
    member_count: usize,
    positions: Vec<Vec2>,
    valid: bool,
}

impl TargetCache {
    fn is_fresh(&self, frame: u64, member_count: usize) -> bool {
        self.valid && self.frame == frame && self.member_count == member_count
    }

    fn store(&mut self, frame: u64, positions: Vec<Vec2>) {
        self.frame = frame;
        self.member_count = positions.len();
        self.positions = positions;
        self.valid = true;
    }

    fn invalidate(&mut self) {
        self.valid = false;
    }
}

/// An active formation.
///
/// `members[i]` steers toward anchor `i`; the engine keeps that ordering in
/// sync with every member's formation tag.
#[derive(Clone, Debug)]
pub struct Constellation {
    id: ConstellationId,
    pattern: PatternKind,
    orientation: Orientation,
    complexity: f32,
    edge_tolerance: f32,
    pub(crate) members: Vec<AgentId>,
    pub(crate) motion: FormationMotion,
    pub(crate) age_secs: f32,
    pub(crate) integrity_strikes: f32,
    pub(crate) reoptimize_timer: f32,
    cache: TargetCache,
}

impl Constellation {
    pub(crate) fn new(
        id: ConstellationId,
        registry: &PatternRegistry,
        pattern: PatternKind,
        members: Vec<AgentId>,
        motion: FormationMotion,
    ) -> Self {
        let mut constellation = Self {
            id,
            pattern,
            orientation: Orientation::FreeSpin,
            complexity: 0.0,
            edge_tolerance: constellation_system_patterns::DEFAULT_EDGE_TOLERANCE,
            members,
            motion,
            age_secs: 0.0,
            integrity_strikes: 0.0,
            reoptimize_timer: 0.0,
            cache: TargetCache::default(),
        };
        constellation.set_pattern(registry, pattern);
        constellation
    }

    /// Identifier of the formation.
    #[must_use]
    pub const fn id(&self) -> ConstellationId {
        self.id
    }

    /// Pattern the members are arranged in.
    #[must_use]
    pub const fn pattern(&self) -> PatternKind {
        self.pattern
    }

    /// Members ordered by anchor index.
    #[must_use]
    pub fn members(&self) -> &[AgentId] {
        &self.members
    }

    /// Smoothed formation center.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.motion.center
    }

    /// Heading in `[0, 2π)`.
    #[must_use]
    pub fn rotation(&self) -> f32 {
        self.motion.rotation
    }

    /// Free spin velocity in radians per second.
    #[must_use]
    pub fn rotation_velocity(&self) -> f32 {
        self.motion.rotation_velocity
    }

    /// Seconds since the formation was created.
    #[must_use]
    pub const fn age_secs(&self) -> f32 {
        self.age_secs
    }

    /// Lifecycle phase derived from the age.
    #[must_use]
    pub fn phase(&self) -> FormationPhase {
        FormationPhase::from_age(self.age_secs)
    }

    /// Current integrity strike count.
    #[must_use]
    pub const fn integrity_strikes(&self) -> f32 {
        self.integrity_strikes
    }

    /// Target positions from the most recent refresh, indexed by anchor.
    ///
    /// Empty until the first refresh after a membership or pattern change.
    #[must_use]
    pub fn target_positions(&self) -> &[Vec2] {
        if self.cache.valid {
            &self.cache.positions
        } else {
            &[]
        }
    }

    pub(crate) const fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub(crate) const fn edge_tolerance(&self) -> f32 {
        self.edge_tolerance
    }

    pub(crate) fn grace_secs(&self, base: f32, per_complexity: f32) -> f32 {
        base + per_complexity * self.complexity
    }

    pub(crate) fn set_pattern(&mut self, registry: &PatternRegistry, pattern: PatternKind) {
        self.pattern = pattern;
        if let Some(definition) = registry.get(pattern) {
            self.orientation = definition.orientation();
            self.complexity = definition.complexity();
            self.edge_tolerance = definition.edge_tolerance();
        }
        self.cache.invalidate();
    }

    pub(crate) fn set_members(&mut self, members: Vec<AgentId>) {
        self.members = members;
        self.cache.invalidate();
    }

    /// Recomputes target positions unless this frame's are already cached.
    pub(crate) fn refresh_targets(&mut self, registry: &PatternRegistry, frame: u64) {
        if self.cache.is_fresh(frame, self.members.len()) {
            return;
        }
        let positions = registry.target_positions(
            self.pattern,
            self.motion.center,
            self.members.len(),
            self.motion.rotation,
        );
        self.cache.store(frame, positions);
    }
}

#[cfg(test)]
mod tests {
    use super::Constellation;
    use constellation_core::{AgentId, ConstellationId, PatternKind};
    use constellation_system_patterns::PatternRegistry;
    use constellation_system_steering::FormationMotion;
    use glam::Vec2;

    #[test]
    fn cache_is_reused_within_a_frame_and_invalidated_on_change() {
        let registry = PatternRegistry::with_defaults();
        let members = (1..=4).map(AgentId::new).collect();
        let mut constellation = Constellation::new(
            ConstellationId::new(1),
            &registry,
            PatternKind::Square,
            members,
            FormationMotion::new(Vec2::new(50.0, 50.0), 0.0, 0.0),
        );
        assert!(constellation.target_positions().is_empty());

        constellation.refresh_targets(&registry, 1);
        let first = constellation.target_positions().to_vec();
        assert_eq!(first.len(), 4);

        constellation.motion.center = Vec2::new(500.0, 500.0);
        constellation.refresh_targets(&registry, 1);
        assert_eq!(constellation.target_positions(), first.as_slice());

        constellation.refresh_targets(&registry, 2);
        assert_ne!(constellation.target_positions(), first.as_slice());

        constellation.set_members((1..=5).map(AgentId::new).collect());
        assert!(constellation.target_positions().is_empty());
        constellation.refresh_targets(&registry, 2);
        assert_eq!(constellation.target_positions().len(), 5);
    }
}
