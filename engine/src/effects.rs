//! Optional notifications for visual and audio effects.

use constellation_core::{AgentId, ConstellationId, PatternKind};
use glam::Vec2;
use serde::Serialize;

/// Why a formation was dismantled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BreakReason {
    /// Integrity strikes exceeded the ceiling.
    IntegrityLost,
    /// Fewer live members remain than the pattern requires.
    Undermanned,
    /// The formation outlived its maximum lifetime.
    Expired,
    /// The host asked for the formation to be dismantled.
    Requested,
    /// The engine was reset.
    Reset,
}

/// Receiver for formation lifecycle notifications.
///
/// Every method defaults to doing nothing, so implementors only override what
/// they render.
pub trait EffectsHook {
    /// A formation was committed.
    fn on_formation_created(&mut self, _id: ConstellationId, _pattern: PatternKind, _center: Vec2) {}

    /// A formation was dismantled.
    fn on_formation_broken(
        &mut self,
        _id: ConstellationId,
        _pattern: PatternKind,
        _reason: BreakReason,
        _center: Vec2,
    ) {
    }

    /// Beams linking the members of a formation should be drawn.
    fn add_beams(&mut self, _id: ConstellationId, _members: &[AgentId]) {}

    /// Beams of a formation should be removed.
    fn remove_beams(&mut self, _id: ConstellationId) {}
}

/// Hook that ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoEffects;

impl EffectsHook for NoEffects {}
