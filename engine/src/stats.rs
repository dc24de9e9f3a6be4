//! Read-only introspection snapshots.

use serde::Serialize;

use crate::effects::BreakReason;

/// Running lifecycle counters for the current session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LifecycleCounters {
    /// Formations committed by creation.
    pub created: u64,
    /// Successful expansions.
    pub expanded: u64,
    /// Successful merges.
    pub merged: u64,
    /// Anchor reoptimizations that were committed.
    pub reoptimized: u64,
    /// Formations lost to integrity strikes.
    pub broken_integrity: u64,
    /// Formations lost to too few live members.
    pub broken_undermanned: u64,
    /// Formations that reached their maximum lifetime.
    pub broken_expired: u64,
    /// Formations dismantled on request.
    pub broken_requested: u64,
}

impl LifecycleCounters {
    pub(crate) fn record_break(&mut self, reason: BreakReason) {
        match reason {
            BreakReason::IntegrityLost => self.broken_integrity += 1,
            BreakReason::Undermanned => self.broken_undermanned += 1,
            BreakReason::Expired => self.broken_expired += 1,
            BreakReason::Requested => self.broken_requested += 1,
            BreakReason::Reset => {}
        }
    }
}

/// Snapshot returned by `Engine::debug_stats`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DebugStats {
    /// Number of updates processed this session.
    pub frame: u64,
    /// Engine clock in seconds.
    pub clock_secs: f32,
    /// Active formations.
    pub active_constellations: usize,
    /// Agents bound to a formation.
    pub members_in_formation: usize,
    /// Agents holding bonus state.
    pub bonus_states: usize,
    /// Agents carrying a break debuff.
    pub debuffed_agents: usize,
    /// Largest integrity strike count among active formations.
    pub worst_strikes: f32,
    /// Normalized diversity of the active pattern mix.
    pub variety_score: f32,
    /// Lifecycle counters.
    pub counters: LifecycleCounters,
}
