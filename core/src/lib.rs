#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the constellation engine.
//!
//! This crate defines the vocabulary that connects the host game, the
//! authoritative lifecycle manager, and the pure systems. The host owns the
//! [`Agent`] population and hands it to the engine once per frame. The engine
//! writes only the formation bookkeeping fields of each agent and pushes
//! steering forces into the agent's [`ForceAccumulator`]; it never integrates
//! positions itself. Systems receive plain positions and identifiers and return
//! plans, so they remain deterministic and easy to test in isolation.

use std::{fmt, time::Duration};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Age in seconds below which a constellation is still forming.
pub const FORMING_PHASE_END_SECS: f32 = 2.0;

/// Age in seconds below which a constellation is stabilizing.
pub const STABILIZING_PHASE_END_SECS: f32 = 4.0;

/// Unique identifier assigned to an agent by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier allocated to a constellation by the lifecycle manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstellationId(u32);

impl ConstellationId {
    /// Creates a new constellation identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Named geometric templates known to the pattern registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PatternKind {
    /// Three members at the corners of an equilateral triangle.
    Triangle,
    /// Members spaced along a line perpendicular to the heading.
    Line,
    /// Two trailing arms behind a leader.
    VFormation,
    /// Four members on the points of a rhombus.
    Diamond,
    /// Members packed into a near-square lattice.
    Square,
    /// Five members on a regular pentagon.
    Pentagon,
    /// A protected center member circled by orbiters.
    Orbit,
    /// A center member with four arms.
    Cross,
    /// An arrowhead with a trailing shaft.
    Arrow,
    /// Members evenly spaced on a ring.
    Circle,
    /// Six members on a hexagon, with an optional center.
    Hexagon,
    /// Alternating inner and outer points of a star.
    Star,
    /// Members on an outward Archimedean spiral.
    Spiral,
    /// An inner and an outer ring.
    DoubleRing,
    /// Members packed into a dense rectangular grid.
    Grid,
}

impl PatternKind {
    /// Every registered pattern kind in a stable order.
    pub const ALL: [PatternKind; 15] = [
        PatternKind::Triangle,
        PatternKind::Line,
        PatternKind::VFormation,
        PatternKind::Diamond,
        PatternKind::Square,
        PatternKind::Pentagon,
        PatternKind::Orbit,
        PatternKind::Cross,
        PatternKind::Arrow,
        PatternKind::Circle,
        PatternKind::Hexagon,
        PatternKind::Star,
        PatternKind::Spiral,
        PatternKind::DoubleRing,
        PatternKind::Grid,
    ];

    /// Canonical upper-case name of the pattern.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Triangle => "TRIANGLE",
            Self::Line => "LINE",
            Self::VFormation => "V_FORMATION",
            Self::Diamond => "DIAMOND",
            Self::Square => "SQUARE",
            Self::Pentagon => "PENTAGON",
            Self::Orbit => "ORBIT",
            Self::Cross => "CROSS",
            Self::Arrow => "ARROW",
            Self::Circle => "CIRCLE",
            Self::Hexagon => "HEXAGON",
            Self::Star => "STAR",
            Self::Spiral => "SPIRAL",
            Self::DoubleRing => "DOUBLE_RING",
            Self::Grid => "GRID",
        }
    }

    /// Looks up a pattern kind by its canonical name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle phase derived from a constellation's age.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormationPhase {
    /// Younger than [`FORMING_PHASE_END_SECS`]; bonuses are inactive.
    Forming,
    /// Between the forming and stabilizing thresholds; bonuses apply at half strength.
    Stabilizing,
    /// At least [`STABILIZING_PHASE_END_SECS`] old; bonuses apply in full.
    Mature,
}

impl FormationPhase {
    /// Classifies the provided age in seconds.
    ///
    /// Non-finite or negative ages are treated as freshly formed.
    #[must_use]
    pub fn from_age(age_secs: f32) -> Self {
        if !age_secs.is_finite() || age_secs < FORMING_PHASE_END_SECS {
            Self::Forming
        } else if age_secs < STABILIZING_PHASE_END_SECS {
            Self::Stabilizing
        } else {
            Self::Mature
        }
    }
}

/// Tag identifying which subsystem produced a steering force.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForceSource {
    /// Spring force pulling a member toward its anchor target.
    Constellation,
    /// Weak drift pulling a free agent toward a nearby constellation.
    External,
}

/// Single force contribution pushed into an agent's accumulator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AppliedForce {
    /// Subsystem that produced the force.
    pub source: ForceSource,
    /// Force vector in world units.
    pub force: Vec2,
}

/// Per-agent force accumulator drained by the host's movement step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ForceAccumulator {
    forces: Vec<AppliedForce>,
}

impl ForceAccumulator {
    /// Records a force contribution. Non-finite components are discarded.
    pub fn add(&mut self, source: ForceSource, fx: f32, fy: f32) {
        if !fx.is_finite() || !fy.is_finite() {
            return;
        }
        self.forces.push(AppliedForce {
            source,
            force: Vec2::new(fx, fy),
        });
    }

    /// Iterator over the recorded contributions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &AppliedForce> {
        self.forces.iter()
    }

    /// Sum of every recorded contribution.
    #[must_use]
    pub fn net(&self) -> Vec2 {
        self.forces
            .iter()
            .fold(Vec2::ZERO, |acc, applied| acc + applied.force)
    }

    /// Sum of the contributions recorded for a single source.
    #[must_use]
    pub fn net_from(&self, source: ForceSource) -> Vec2 {
        self.forces
            .iter()
            .filter(|applied| applied.source == source)
            .fold(Vec2::ZERO, |acc, applied| acc + applied.force)
    }

    /// Reports whether no contributions were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    /// Removes every recorded contribution.
    pub fn clear(&mut self) {
        self.forces.clear();
    }
}

/// Formation bookkeeping written onto an agent by the lifecycle manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationTag {
    /// Constellation the agent currently belongs to.
    pub constellation: ConstellationId,
    /// Index of the target position the agent steers toward.
    pub anchor: usize,
    /// Engine clock reading when the agent joined the constellation.
    pub joined_at: Duration,
}

/// Mobile agent owned by the host and annotated by the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    /// Stable identity assigned by the host.
    pub id: AgentId,
    /// Current position in world units.
    pub position: Vec2,
    /// Whether the agent is still part of the simulation.
    pub alive: bool,
    /// Base damage dealt per hit before formation modifiers.
    pub damage: f32,
    /// Base movement speed before formation modifiers.
    pub speed: f32,
    /// Remaining health.
    pub health: f32,
    /// Health ceiling used when healing.
    pub max_health: f32,
    /// Formation membership; written exclusively by the lifecycle manager.
    pub formation: Option<FormationTag>,
    /// Engine clock reading before which the agent may not join a formation.
    pub rejoin_cooldown_until: Option<Duration>,
    forces: ForceAccumulator,
}

impl Agent {
    /// Creates a live, unattached agent with neutral combat stats.
    #[must_use]
    pub fn new(id: AgentId, position: Vec2) -> Self {
        Self {
            id,
            position,
            alive: true,
            damage: 10.0,
            speed: 100.0,
            health: 100.0,
            max_health: 100.0,
            formation: None,
            rejoin_cooldown_until: None,
            forces: ForceAccumulator::default(),
        }
    }

    /// Overrides the combat stats of the agent.
    #[must_use]
    pub fn with_stats(mut self, damage: f32, speed: f32, health: f32, max_health: f32) -> Self {
        self.damage = damage;
        self.speed = speed;
        self.health = health;
        self.max_health = max_health;
        self
    }

    /// Pushes a steering force into the agent's accumulator.
    pub fn add_force(&mut self, source: ForceSource, fx: f32, fy: f32) {
        self.forces.add(source, fx, fy);
    }

    /// Read-only access to the agent's force accumulator.
    #[must_use]
    pub fn forces(&self) -> &ForceAccumulator {
        &self.forces
    }

    /// Mutable access so the host's movement step can drain the accumulator.
    pub fn forces_mut(&mut self) -> &mut ForceAccumulator {
        &mut self.forces
    }

    /// Reports whether the agent's position holds only finite coordinates.
    #[must_use]
    pub fn has_finite_position(&self) -> bool {
        self.position.is_finite()
    }

    /// Reports whether the agent's rejoin cooldown is still running at `now`.
    #[must_use]
    pub fn on_cooldown(&self, now: Duration) -> bool {
        self.rejoin_cooldown_until.map_or(false, |until| now < until)
    }

    /// Reports whether the agent may be recruited into a formation at `now`.
    #[must_use]
    pub fn is_free(&self, now: Duration) -> bool {
        self.alive && self.formation.is_none() && !self.on_cooldown(now) && self.has_finite_position()
    }
}

/// Arithmetic mean of the provided points, or `None` when empty.
#[must_use]
pub fn centroid<I>(points: I) -> Option<Vec2>
where
    I: IntoIterator<Item = Vec2>,
{
    let mut sum = Vec2::ZERO;
    let mut count = 0_usize;
    for point in points {
        sum += point;
        count += 1;
    }
    (count > 0).then(|| sum / count as f32)
}

#[cfg(test)]
mod tests {
    use super::{
        centroid, Agent, AgentId, ConstellationId, ForceAccumulator, ForceSource, FormationPhase,
        FormationTag, PatternKind,
    };
    use glam::Vec2;
    use std::time::Duration;

    #[test]
    fn pattern_names_round_trip() {
        for kind in PatternKind::ALL {
            assert_eq!(PatternKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(PatternKind::from_name("PENTAGRAM"), None);
    }

    #[test]
    fn phase_boundaries_match_ramp_thresholds() {
        assert_eq!(FormationPhase::from_age(0.0), FormationPhase::Forming);
        assert_eq!(FormationPhase::from_age(1.99), FormationPhase::Forming);
        assert_eq!(FormationPhase::from_age(2.0), FormationPhase::Stabilizing);
        assert_eq!(FormationPhase::from_age(3.99), FormationPhase::Stabilizing);
        assert_eq!(FormationPhase::from_age(4.0), FormationPhase::Mature);
        assert_eq!(FormationPhase::from_age(f32::NAN), FormationPhase::Forming);
    }

    #[test]
    fn accumulator_discards_non_finite_forces() {
        let mut forces = ForceAccumulator::default();
        forces.add(ForceSource::Constellation, 1.0, 2.0);
        forces.add(ForceSource::External, f32::NAN, 0.0);
        forces.add(ForceSource::External, 0.5, f32::INFINITY);
        forces.add(ForceSource::External, -3.0, 1.0);

        assert_eq!(forces.iter().count(), 2);
        assert_eq!(forces.net(), Vec2::new(-2.0, 3.0));
        assert_eq!(forces.net_from(ForceSource::Constellation), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn free_agents_exclude_tagged_dead_and_cooling_agents() {
        let now = Duration::from_secs(10);
        let mut agent = Agent::new(AgentId::new(1), Vec2::new(5.0, 5.0));
        assert!(agent.is_free(now));

        agent.rejoin_cooldown_until = Some(Duration::from_secs(12));
        assert!(!agent.is_free(now));
        assert!(agent.is_free(Duration::from_secs(12)));

        agent.rejoin_cooldown_until = None;
        agent.formation = Some(FormationTag {
            constellation: ConstellationId::new(3),
            anchor: 0,
            joined_at: Duration::ZERO,
        });
        assert!(!agent.is_free(now));

        agent.formation = None;
        agent.alive = false;
        assert!(!agent.is_free(now));

        agent.alive = true;
        agent.position = Vec2::new(f32::NAN, 0.0);
        assert!(!agent.is_free(now));
    }

    #[test]
    fn centroid_of_empty_set_is_none() {
        assert_eq!(centroid(Vec::new()), None);
        let mean = centroid([Vec2::new(0.0, 0.0), Vec2::new(4.0, 2.0)]);
        assert_eq!(mean, Some(Vec2::new(2.0, 1.0)));
    }

    #[test]
    fn identifiers_round_trip_through_bincode() {
        let id = ConstellationId::new(42);
        let bytes = bincode::serialize(&id).expect("serialize");
        let restored: ConstellationId = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, id);

        let kind = PatternKind::DoubleRing;
        let bytes = bincode::serialize(&kind).expect("serialize");
        let restored: PatternKind = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, kind);
    }
}
