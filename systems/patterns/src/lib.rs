#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Static catalog of the geometric patterns a constellation can adopt.
//!
//! Every pattern owns a deterministic generator that lays out local offsets
//! around the origin with the pattern's heading along +x. The registry rotates
//! and translates those offsets onto a constellation's center, so identical
//! inputs always yield identical targets and the distance of each target from
//! the center never depends on the rotation.

mod shapes;

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use constellation_core::PatternKind;
use glam::Vec2;
use thiserror::Error;

/// Spacing between neighbouring targets, in world units.
pub const BASE_SPACING: f32 = 45.0;

/// Default tolerance on the ratio between an actual and a target edge length.
pub const DEFAULT_EDGE_TOLERANCE: f32 = 1.5;

/// How a pattern chooses its rotation while steering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Rotation blends toward the steering target over time.
    FacesTarget,
    /// Rotation spins freely with a velocity that decays with age.
    FreeSpin,
}

type Generator = fn(usize) -> Vec<Vec2>;

/// Immutable description of a registered pattern.
#[derive(Clone, Copy)]
pub struct Pattern {
    kind: PatternKind,
    min_members: usize,
    max_members: usize,
    selection_weight: f32,
    edge_tolerance: f32,
    complexity: f32,
    orientation: Orientation,
    generator: Generator,
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern")
            .field("kind", &self.kind)
            .field("min_members", &self.min_members)
            .field("max_members", &self.max_members)
            .field("selection_weight", &self.selection_weight)
            .field("edge_tolerance", &self.edge_tolerance)
            .field("complexity", &self.complexity)
            .field("orientation", &self.orientation)
            .finish()
    }
}

impl Pattern {
    /// Name-keyed identity of the pattern.
    #[must_use]
    pub const fn kind(&self) -> PatternKind {
        self.kind
    }

    /// Canonical upper-case name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Smallest member count the pattern supports.
    #[must_use]
    pub const fn min_members(&self) -> usize {
        self.min_members
    }

    /// Largest member count the pattern supports.
    #[must_use]
    pub const fn max_members(&self) -> usize {
        self.max_members
    }

    /// Relative roulette weight in `(0, 1]`.
    #[must_use]
    pub const fn selection_weight(&self) -> f32 {
        self.selection_weight
    }

    /// Largest tolerated ratio between an actual and a target edge length.
    #[must_use]
    pub const fn edge_tolerance(&self) -> f32 {
        self.edge_tolerance
    }

    /// Relative layout complexity in `[0, 1]`, used to lengthen audit grace periods.
    #[must_use]
    pub const fn complexity(&self) -> f32 {
        self.complexity
    }

    /// Rotation behaviour while steering.
    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Reports whether `count` lies within the supported member range.
    #[must_use]
    pub const fn accepts(&self, count: usize) -> bool {
        count >= self.min_members && count <= self.max_members
    }

    /// Generates `count` target positions around `center` rotated by `rotation` radians.
    ///
    /// A non-finite rotation is treated as zero. The output always holds exactly
    /// `count` points; callers validate the count against the pattern range.
    #[must_use]
    pub fn target_positions(&self, center: Vec2, count: usize, rotation: f32) -> Vec<Vec2> {
        if count == 0 {
            return Vec::new();
        }

        let rotation = normalize_rotation(rotation);
        let basis = Vec2::from_angle(rotation);
        (self.generator)(count)
            .into_iter()
            .map(|offset| center + basis.rotate(offset))
            .collect()
    }
}

/// Wraps an angle into `[0, 2π)`, mapping non-finite input to zero.
#[must_use]
pub fn normalize_rotation(rotation: f32) -> f32 {
    if !rotation.is_finite() {
        return 0.0;
    }
    let wrapped = rotation.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Reasons a pattern may be refused by the registry.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RegistryError {
    /// A pattern with the same name is already registered.
    #[error("pattern {0} is already registered")]
    Duplicate(PatternKind),
    /// The member range is empty or admits fewer than two members.
    #[error("pattern {kind} has invalid member range {min}..={max}")]
    InvalidRange {
        /// Pattern being registered.
        kind: PatternKind,
        /// Requested lower bound.
        min: usize,
        /// Requested upper bound.
        max: usize,
    },
    /// The selection weight lies outside `(0, 1]`.
    #[error("pattern {kind} has selection weight {weight} outside (0, 1]")]
    InvalidWeight {
        /// Pattern being registered.
        kind: PatternKind,
        /// Requested weight.
        weight: f32,
    },
}

/// Read-only catalog of patterns keyed by name.
#[derive(Clone, Debug, Default)]
pub struct PatternRegistry {
    patterns: BTreeMap<PatternKind, Pattern>,
}

impl PatternRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a registry holding the reference pattern set.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for spec in DEFAULT_PATTERNS {
            // The reference table satisfies every registration rule.
            if let Err(error) = registry.register(spec.build()) {
                debug_assert!(false, "reference pattern rejected: {error}");
            }
        }
        registry
    }

    /// Adds a pattern to the catalog after validating its metadata.
    pub fn register(&mut self, pattern: Pattern) -> Result<(), RegistryError> {
        if pattern.min_members < 2 || pattern.min_members > pattern.max_members {
            return Err(RegistryError::InvalidRange {
                kind: pattern.kind,
                min: pattern.min_members,
                max: pattern.max_members,
            });
        }
        if !(pattern.selection_weight > 0.0 && pattern.selection_weight <= 1.0) {
            return Err(RegistryError::InvalidWeight {
                kind: pattern.kind,
                weight: pattern.selection_weight,
            });
        }
        if self.patterns.contains_key(&pattern.kind) {
            return Err(RegistryError::Duplicate(pattern.kind));
        }

        let _ = self.patterns.insert(pattern.kind, pattern);
        Ok(())
    }

    /// Looks up a pattern by name.
    #[must_use]
    pub fn get(&self, kind: PatternKind) -> Option<&Pattern> {
        self.patterns.get(&kind)
    }

    /// Iterator over every registered pattern in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.values()
    }

    /// Patterns whose member range contains `count`.
    pub fn fitting(&self, count: usize) -> impl Iterator<Item = &Pattern> {
        self.patterns
            .values()
            .filter(move |pattern| pattern.accepts(count))
    }

    /// Number of registered patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Reports whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Generates target positions for a registered pattern.
    ///
    /// Returns an empty list when the pattern is unknown.
    #[must_use]
    pub fn target_positions(
        &self,
        kind: PatternKind,
        center: Vec2,
        count: usize,
        rotation: f32,
    ) -> Vec<Vec2> {
        self.get(kind)
            .map(|pattern| pattern.target_positions(center, count, rotation))
            .unwrap_or_default()
    }
}

/// Builder used to describe custom patterns before registration.
#[derive(Clone, Copy, Debug)]
pub struct PatternSpec {
    /// Pattern identity.
    pub kind: PatternKind,
    /// Smallest member count.
    pub min_members: usize,
    /// Largest member count.
    pub max_members: usize,
    /// Relative roulette weight in `(0, 1]`.
    pub selection_weight: f32,
    /// Largest tolerated edge ratio.
    pub edge_tolerance: f32,
    /// Layout complexity in `[0, 1]`.
    pub complexity: f32,
    /// Rotation behaviour.
    pub orientation: Orientation,
}

impl PatternSpec {
    /// Materialises the pattern using the built-in generator for its kind.
    #[must_use]
    pub fn build(self) -> Pattern {
        Pattern {
            kind: self.kind,
            min_members: self.min_members,
            max_members: self.max_members,
            selection_weight: self.selection_weight,
            edge_tolerance: self.edge_tolerance,
            complexity: self.complexity.clamp(0.0, 1.0),
            orientation: self.orientation,
            generator: generator_for(self.kind),
        }
    }
}

fn generator_for(kind: PatternKind) -> Generator {
    match kind {
        PatternKind::Triangle => shapes::triangle,
        PatternKind::Line => shapes::line,
        PatternKind::VFormation => shapes::v_formation,
        PatternKind::Diamond => shapes::diamond,
        PatternKind::Square => shapes::square,
        PatternKind::Pentagon => shapes::pentagon,
        PatternKind::Orbit => shapes::orbit,
        PatternKind::Cross => shapes::cross,
        PatternKind::Arrow => shapes::arrow,
        PatternKind::Circle => shapes::circle,
        PatternKind::Hexagon => shapes::hexagon,
        PatternKind::Star => shapes::star,
        PatternKind::Spiral => shapes::spiral,
        PatternKind::DoubleRing => shapes::double_ring,
        PatternKind::Grid => shapes::grid,
    }
}

const fn spec(
    kind: PatternKind,
    min_members: usize,
    max_members: usize,
    selection_weight: f32,
    edge_tolerance: f32,
    complexity: f32,
    orientation: Orientation,
) -> PatternSpec {
    PatternSpec {
        kind,
        min_members,
        max_members,
        selection_weight,
        edge_tolerance,
        complexity,
        orientation,
    }
}

const DEFAULT_PATTERNS: [PatternSpec; 15] = [
    spec(PatternKind::Triangle, 3, 3, 1.0, DEFAULT_EDGE_TOLERANCE, 0.0, Orientation::FreeSpin),
    spec(PatternKind::Line, 3, 8, 0.6, DEFAULT_EDGE_TOLERANCE, 0.1, Orientation::FacesTarget),
    spec(PatternKind::VFormation, 3, 9, 0.8, DEFAULT_EDGE_TOLERANCE, 0.3, Orientation::FacesTarget),
    spec(PatternKind::Diamond, 4, 4, 0.9, DEFAULT_EDGE_TOLERANCE, 0.2, Orientation::FreeSpin),
    spec(PatternKind::Square, 4, 9, 0.7, DEFAULT_EDGE_TOLERANCE, 0.3, Orientation::FreeSpin),
    spec(PatternKind::Pentagon, 5, 5, 0.8, DEFAULT_EDGE_TOLERANCE, 0.3, Orientation::FreeSpin),
    spec(PatternKind::Orbit, 4, 8, 0.7, DEFAULT_EDGE_TOLERANCE, 0.5, Orientation::FreeSpin),
    spec(PatternKind::Cross, 5, 9, 0.6, DEFAULT_EDGE_TOLERANCE, 0.4, Orientation::FreeSpin),
    spec(PatternKind::Arrow, 5, 10, 0.7, DEFAULT_EDGE_TOLERANCE, 0.6, Orientation::FacesTarget),
    spec(PatternKind::Circle, 5, 12, 0.8, DEFAULT_EDGE_TOLERANCE, 0.4, Orientation::FreeSpin),
    spec(PatternKind::Hexagon, 6, 7, 0.8, DEFAULT_EDGE_TOLERANCE, 0.5, Orientation::FreeSpin),
    spec(PatternKind::Star, 6, 10, 0.6, 1.7, 0.7, Orientation::FreeSpin),
    spec(PatternKind::Spiral, 6, 15, 0.5, 1.8, 1.0, Orientation::FreeSpin),
    spec(PatternKind::DoubleRing, 8, 15, 0.5, DEFAULT_EDGE_TOLERANCE, 0.8, Orientation::FreeSpin),
    spec(PatternKind::Grid, 9, 15, 0.4, 1.6, 0.6, Orientation::FreeSpin),
];

#[cfg(test)]
mod tests {
    use super::{normalize_rotation, PatternRegistry, PatternSpec, RegistryError, Orientation};
    use constellation_core::PatternKind;
    use std::f32::consts::TAU;

    #[test]
    fn rotation_wraps_into_unit_turn() {
        assert_eq!(normalize_rotation(f32::NAN), 0.0);
        assert_eq!(normalize_rotation(f32::NEG_INFINITY), 0.0);
        assert!((normalize_rotation(TAU + 1.0) - 1.0).abs() < 1e-5);
        let negative = normalize_rotation(-1.0);
        assert!((0.0..TAU).contains(&negative));
    }

    #[test]
    fn registration_rejects_invalid_metadata() {
        let mut registry = PatternRegistry::empty();
        let base = PatternSpec {
            kind: PatternKind::Triangle,
            min_members: 3,
            max_members: 3,
            selection_weight: 1.0,
            edge_tolerance: 1.5,
            complexity: 0.0,
            orientation: Orientation::FreeSpin,
        };

        let too_small = PatternSpec {
            min_members: 1,
            ..base
        };
        assert!(matches!(
            registry.register(too_small.build()),
            Err(RegistryError::InvalidRange { .. })
        ));

        let weightless = PatternSpec {
            selection_weight: 0.0,
            ..base
        };
        assert!(matches!(
            registry.register(weightless.build()),
            Err(RegistryError::InvalidWeight { .. })
        ));

        assert_eq!(registry.register(base.build()), Ok(()));
        assert_eq!(
            registry.register(base.build()),
            Err(RegistryError::Duplicate(PatternKind::Triangle))
        );
    }

    #[test]
    fn defaults_cover_every_kind() {
        let registry = PatternRegistry::with_defaults();
        assert_eq!(registry.len(), PatternKind::ALL.len());
        for kind in PatternKind::ALL {
            assert!(registry.get(kind).is_some(), "{kind} missing");
        }
    }
}
