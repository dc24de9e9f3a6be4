//! Fixed bonus table keyed by pattern.

use constellation_core::{PatternKind, FORMING_PHASE_END_SECS, STABILIZING_PHASE_END_SECS};

/// Broad category of a pattern's bonus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BonusKind {
    /// Raises damage, speed, or crit.
    Offensive,
    /// Reduces incoming damage.
    Defensive,
    /// Spreads incoming damage across the formation.
    Unity,
    /// Runs a periodic effect such as healing.
    Aura,
    /// Pattern-specific mechanics like orbit protection or lifesteal.
    Special,
    /// No modifiers at all.
    Neutral,
}

/// Modifiers granted to every member of a formation using a pattern.
///
/// Multipliers are neutral at `1.0`; fractions and chances are neutral at `0.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BonusDefinition {
    /// Category of the bonus.
    pub kind: BonusKind,
    /// Movement speed multiplier.
    pub speed: f32,
    /// Outgoing damage multiplier.
    pub damage: f32,
    /// Fraction of incoming damage ignored.
    pub damage_reduction: f32,
    /// Fraction of incoming damage spread over the other members.
    pub damage_sharing: f32,
    /// Fraction of dealt damage returned as health.
    pub lifesteal: f32,
    /// Additional critical hit chance.
    pub crit_chance: f32,
    /// Health restored per aura pulse.
    pub healing: f32,
    /// Fraction of damage aimed at the center member that the orbiters absorb.
    pub orbit_protection: f32,
}

impl BonusDefinition {
    /// Definition that changes nothing.
    pub const NEUTRAL: Self = Self {
        kind: BonusKind::Neutral,
        speed: 1.0,
        damage: 1.0,
        damage_reduction: 0.0,
        damage_sharing: 0.0,
        lifesteal: 0.0,
        crit_chance: 0.0,
        healing: 0.0,
        orbit_protection: 0.0,
    };

    /// Reports whether the definition grants anything.
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        self.kind == BonusKind::Neutral
    }
}

const fn with_kind(kind: BonusKind) -> BonusDefinition {
    BonusDefinition {
        kind,
        ..BonusDefinition::NEUTRAL
    }
}

/// Returns the bonus granted by `pattern`.
#[must_use]
pub fn get_bonus(pattern: PatternKind) -> BonusDefinition {
    match pattern {
        PatternKind::Triangle => BonusDefinition {
            damage_sharing: 0.20,
            damage_reduction: 0.05,
            ..with_kind(BonusKind::Unity)
        },
        PatternKind::Line => BonusDefinition {
            damage: 1.15,
            ..with_kind(BonusKind::Offensive)
        },
        PatternKind::VFormation => BonusDefinition {
            speed: 1.2,
            damage: 1.05,
            ..with_kind(BonusKind::Offensive)
        },
        PatternKind::Diamond => BonusDefinition {
            damage_reduction: 0.20,
            ..with_kind(BonusKind::Defensive)
        },
        PatternKind::Square => BonusDefinition {
            damage_reduction: 0.15,
            speed: 0.95,
            ..with_kind(BonusKind::Defensive)
        },
        PatternKind::Pentagon => BonusDefinition {
            damage_sharing: 0.15,
            damage: 1.1,
            ..with_kind(BonusKind::Unity)
        },
        PatternKind::Orbit => BonusDefinition {
            orbit_protection: 0.40,
            damage_reduction: 0.10,
            ..with_kind(BonusKind::Special)
        },
        PatternKind::Cross => BonusDefinition {
            crit_chance: 0.15,
            damage: 1.1,
            ..with_kind(BonusKind::Offensive)
        },
        PatternKind::Arrow => BonusDefinition {
            speed: 1.25,
            damage: 1.15,
            ..with_kind(BonusKind::Offensive)
        },
        PatternKind::Circle => BonusDefinition {
            damage_sharing: 0.25,
            damage_reduction: 0.10,
            ..with_kind(BonusKind::Unity)
        },
        PatternKind::Hexagon => BonusDefinition {
            healing: 8.0,
            damage_reduction: 0.10,
            ..with_kind(BonusKind::Aura)
        },
        PatternKind::Star => BonusDefinition {
            crit_chance: 0.20,
            lifesteal: 0.10,
            ..with_kind(BonusKind::Special)
        },
        PatternKind::Spiral => BonusDefinition {
            lifesteal: 0.15,
            speed: 1.1,
            ..with_kind(BonusKind::Special)
        },
        PatternKind::DoubleRing => BonusDefinition {
            damage_reduction: 0.25,
            damage_sharing: 0.10,
            ..with_kind(BonusKind::Defensive)
        },
        PatternKind::Grid => BonusDefinition::NEUTRAL,
    }
}

/// Ramp-up applied to every bonus based on time spent in the formation.
///
/// Zero while forming, one half while stabilizing, full strength once mature.
#[must_use]
pub fn get_bonus_multiplier(age_secs: f32) -> f32 {
    if !age_secs.is_finite() || age_secs < FORMING_PHASE_END_SECS {
        0.0
    } else if age_secs < STABILIZING_PHASE_END_SECS {
        0.5
    } else {
        1.0
    }
}
