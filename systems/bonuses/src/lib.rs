#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Combat modifiers granted to formation members.
//!
//! The bonus engine keeps two side tables keyed by agent identity: the bonus a
//! member received when it joined, and an independently timed break debuff
//! applied when a formation falls apart. Accessors never fail; an agent without
//! bonus state or formation context simply reads the neutral value. Damage
//! redistribution and aura pulses are returned as plans which the caller applies
//! to agent health, so a redirected share is never shared a second time.

pub mod definitions;

use std::{collections::HashMap, time::Duration};

use constellation_core::{Agent, AgentId, ConstellationId, PatternKind};
use serde::Deserialize;

pub use definitions::{get_bonus, get_bonus_multiplier, BonusDefinition, BonusKind};

/// Tuning for debuffs and aura pulses.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BonusTuning {
    /// Speed multiplier applied to members of a broken formation.
    pub break_debuff_speed: f32,
    /// How long the break debuff lasts, in seconds.
    pub break_debuff_secs: f32,
    /// Seconds between aura pulses.
    pub aura_interval_secs: f32,
}

impl Default for BonusTuning {
    fn default() -> Self {
        Self {
            break_debuff_speed: 0.6,
            break_debuff_secs: 2.5,
            aura_interval_secs: 1.0,
        }
    }
}

/// Bonus bookkeeping for one formation member.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BonusState {
    /// Pattern whose bonus is applied.
    pub pattern: PatternKind,
    /// Engine clock reading when the bonus was applied.
    pub applied_at: Duration,
    /// Agent speed captured when the bonus was first applied.
    pub original_speed: f32,
    /// Agent damage captured when the bonus was first applied.
    pub original_damage: f32,
}

/// Temporary disorientation applied after a formation breaks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BreakDebuff {
    /// Speed multiplier while the debuff is active.
    pub speed_multiplier: f32,
    /// Engine clock reading at which the debuff ends.
    pub expires_at: Duration,
}

/// Outcome of redistributing one hit across a formation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DamageSplit {
    /// Damage that remains on the struck agent.
    pub target: f32,
    /// Damage moved onto other members.
    pub redirected: Vec<(AgentId, f32)>,
}

impl DamageSplit {
    /// Split that leaves the full hit on the target.
    #[must_use]
    pub fn unshared(amount: f32) -> Self {
        Self {
            target: amount,
            redirected: Vec::new(),
        }
    }

    /// Total damage described by the split.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.target + self.redirected.iter().map(|(_, amount)| amount).sum::<f32>()
    }
}

/// Healing produced by one aura pulse.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AuraPulse {
    /// Member receiving the heal.
    pub target: AgentId,
    /// Health restored, already capped at the member's missing health.
    pub amount: f32,
}

/// Owner of per-agent bonus and debuff side tables.
#[derive(Debug, Default)]
pub struct BonusEngine {
    tuning: BonusTuning,
    states: HashMap<AgentId, BonusState>,
    debuffs: HashMap<AgentId, BreakDebuff>,
    aura_timers: HashMap<ConstellationId, f32>,
}

impl BonusEngine {
    /// Creates an engine with the provided tuning.
    #[must_use]
    pub fn new(tuning: BonusTuning) -> Self {
        Self {
            tuning,
            ..Self::default()
        }
    }

    /// Drops every bonus, debuff, and aura timer.
    pub fn clear(&mut self) {
        self.states.clear();
        self.debuffs.clear();
        self.aura_timers.clear();
    }

    /// Records that `agent` now benefits from `pattern`.
    ///
    /// Neutral patterns leave no state behind. Re-applying keeps the stats
    /// captured when the agent first joined.
    pub fn apply(&mut self, agent: &Agent, pattern: PatternKind, now: Duration) {
        if get_bonus(pattern).is_neutral() {
            let _ = self.states.remove(&agent.id);
            log::trace!("{pattern} grants no bonus to agent {}", agent.id.get());
            return;
        }

        let (original_speed, original_damage) = self
            .states
            .get(&agent.id)
            .map_or((agent.speed, agent.damage), |state| {
                (state.original_speed, state.original_damage)
            });

        let _ = self.states.insert(
            agent.id,
            BonusState {
                pattern,
                applied_at: now,
                original_speed,
                original_damage,
            },
        );
    }

    /// Removes the bonus of `agent`, returning the state that was dropped.
    pub fn remove(&mut self, agent: AgentId) -> Option<BonusState> {
        self.states.remove(&agent)
    }

    /// Starts the break debuff for `agent`, replacing any running one.
    pub fn apply_break_debuff(&mut self, agent: AgentId, now: Duration) {
        let expires_at = now.saturating_add(debuff_duration(self.tuning.break_debuff_secs));
        let _ = self.debuffs.insert(
            agent,
            BreakDebuff {
                speed_multiplier: self.tuning.break_debuff_speed,
                expires_at,
            },
        );
        log::debug!("agent {} disoriented until {:?}", agent.get(), expires_at);
    }

    /// Forgets debuffs that have run out.
    pub fn expire(&mut self, now: Duration) {
        self.debuffs.retain(|_, debuff| debuff.expires_at > now);
    }

    /// Forgets the aura timer of a constellation that no longer exists.
    pub fn forget_constellation(&mut self, constellation: ConstellationId) {
        let _ = self.aura_timers.remove(&constellation);
    }

    /// Bonus state recorded for `agent`, if any.
    #[must_use]
    pub fn state(&self, agent: AgentId) -> Option<&BonusState> {
        self.states.get(&agent)
    }

    /// Break debuff recorded for `agent`, if any.
    #[must_use]
    pub fn debuff(&self, agent: AgentId) -> Option<&BreakDebuff> {
        self.debuffs.get(&agent)
    }

    /// Number of agents currently holding bonus state.
    #[must_use]
    pub fn bonus_count(&self) -> usize {
        self.states.len()
    }

    /// Number of agents currently debuffed.
    #[must_use]
    pub fn debuff_count(&self) -> usize {
        self.debuffs.len()
    }

    /// Movement speed multiplier combining the debuff and the ramped bonus.
    #[must_use]
    pub fn speed_multiplier(&self, agent: &Agent, now: Duration) -> f32 {
        let debuff = self.active_debuff(agent.id, now);
        let bonus = self
            .ramped(agent, now)
            .map_or(1.0, |(definition, ramp)| 1.0 + (definition.speed - 1.0) * ramp);
        debuff * bonus
    }

    /// Movement speed after modifiers, based on the speed captured at join time.
    #[must_use]
    pub fn effective_speed(&self, agent: &Agent, now: Duration) -> f32 {
        let base = self
            .states
            .get(&agent.id)
            .map_or(agent.speed, |state| state.original_speed);
        base * self.speed_multiplier(agent, now)
    }

    /// Outgoing damage multiplier.
    #[must_use]
    pub fn damage_multiplier(&self, agent: &Agent, now: Duration) -> f32 {
        self.ramped(agent, now)
            .map_or(1.0, |(definition, ramp)| 1.0 + (definition.damage - 1.0) * ramp)
    }

    /// Fraction of incoming damage the agent ignores.
    #[must_use]
    pub fn damage_reduction(&self, agent: &Agent, now: Duration) -> f32 {
        self.ramped(agent, now)
            .map_or(0.0, |(definition, ramp)| definition.damage_reduction * ramp)
    }

    /// Fraction of dealt damage returned as health.
    #[must_use]
    pub fn lifesteal(&self, agent: &Agent, now: Duration) -> f32 {
        self.ramped(agent, now)
            .map_or(0.0, |(definition, ramp)| definition.lifesteal * ramp)
    }

    /// Additional critical hit chance.
    #[must_use]
    pub fn crit_chance(&self, agent: &Agent, now: Duration) -> f32 {
        self.ramped(agent, now)
            .map_or(0.0, |(definition, ramp)| definition.crit_chance * ramp)
    }

    /// Spreads part of a hit on `target` evenly over `others`.
    ///
    /// `others` must hold the other live members of the target's formation.
    #[must_use]
    pub fn process_damage_sharing(
        &self,
        target: &Agent,
        others: &[&Agent],
        incoming: f32,
        now: Duration,
    ) -> DamageSplit {
        let recipients: Vec<AgentId> = others
            .iter()
            .filter(|other| other.alive && other.id != target.id)
            .map(|other| other.id)
            .collect();
        let fraction = self
            .ramped(target, now)
            .map_or(0.0, |(definition, ramp)| definition.damage_sharing * ramp);

        split_evenly(incoming, fraction, &recipients)
    }

    /// Moves part of a hit on the center member onto the orbiters.
    ///
    /// Hits on orbiters are left untouched.
    #[must_use]
    pub fn process_orbit_protection(
        &self,
        target: &Agent,
        others: &[&Agent],
        incoming: f32,
        now: Duration,
    ) -> DamageSplit {
        let is_center = target.formation.map_or(false, |tag| tag.anchor == 0);
        if !is_center {
            return DamageSplit::unshared(incoming);
        }

        let recipients: Vec<AgentId> = others
            .iter()
            .filter(|other| {
                other.alive
                    && other.id != target.id
                    && other.formation.map_or(false, |tag| tag.anchor != 0)
            })
            .map(|other| other.id)
            .collect();
        let fraction = self
            .ramped(target, now)
            .map_or(0.0, |(definition, ramp)| definition.orbit_protection * ramp);

        split_evenly(incoming, fraction, &recipients)
    }

    /// Advances the aura timer of a constellation and emits a heal when it fires.
    ///
    /// Only aura-type patterns pulse. The most wounded live member receives
    /// the heal, scaled by the ramp-up of `formation_age_secs`.
    ///
    /// The pulse belongs to the formation, so it ramps by formation age. Every
    /// other accessor ramps by the member's own time since joining, which
    /// means a recruit of a mature hexagon is healed at full strength while
    /// its own stat bonuses are still forming.
    pub fn update_aura_effects(
        &mut self,
        constellation: ConstellationId,
        pattern: PatternKind,
        formation_age_secs: f32,
        members: &[&Agent],
        dt: f32,
    ) -> Option<AuraPulse> {
        let definition = get_bonus(pattern);
        if definition.kind != BonusKind::Aura || definition.healing <= 0.0 {
            return None;
        }

        let interval = self.tuning.aura_interval_secs.max(f32::EPSILON);
        let timer = self.aura_timers.entry(constellation).or_insert(0.0);
        *timer += dt.max(0.0);
        if *timer < interval {
            return None;
        }
        *timer -= interval;

        let ramp = get_bonus_multiplier(formation_age_secs);
        if ramp <= 0.0 {
            return None;
        }

        let wounded = members
            .iter()
            .filter(|member| member.alive && member.health < member.max_health)
            .min_by(|a, b| {
                let a_ratio = a.health / a.max_health.max(f32::EPSILON);
                let b_ratio = b.health / b.max_health.max(f32::EPSILON);
                a_ratio.total_cmp(&b_ratio)
            })?;

        let amount = (definition.healing * ramp).min(wounded.max_health - wounded.health);
        (amount > 0.0).then_some(AuraPulse {
            target: wounded.id,
            amount,
        })
    }

    fn active_debuff(&self, agent: AgentId, now: Duration) -> f32 {
        self.debuffs
            .get(&agent)
            .filter(|debuff| debuff.expires_at > now)
            .map_or(1.0, |debuff| debuff.speed_multiplier)
    }

    fn ramped(&self, agent: &Agent, now: Duration) -> Option<(BonusDefinition, f32)> {
        let state = self.states.get(&agent.id)?;
        let tag = agent.formation?;
        let membership_age = now.saturating_sub(tag.joined_at).as_secs_f32();
        Some((get_bonus(state.pattern), get_bonus_multiplier(membership_age)))
    }
}

fn split_evenly(incoming: f32, fraction: f32, recipients: &[AgentId]) -> DamageSplit {
    if !incoming.is_finite() || incoming <= 0.0 {
        return DamageSplit::unshared(incoming.max(0.0));
    }
    if recipients.is_empty() || fraction <= 0.0 {
        return DamageSplit::unshared(incoming);
    }

    let shared = incoming * fraction.min(1.0);
    let each = shared / recipients.len() as f32;
    DamageSplit {
        target: incoming - shared,
        redirected: recipients.iter().map(|id| (*id, each)).collect(),
    }
}

/// Non-finite or non-positive lengths disable the debuff; lengths too large
/// for a `Duration` saturate.
fn debuff_duration(secs: f32) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f32(secs).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{debuff_duration, split_evenly, BonusEngine, BonusTuning, DamageSplit};
    use constellation_core::AgentId;

    #[test]
    fn unusable_debuff_lengths_never_panic() {
        assert_eq!(debuff_duration(f32::INFINITY), Duration::ZERO);
        assert_eq!(debuff_duration(f32::NAN), Duration::ZERO);
        assert_eq!(debuff_duration(-1.0), Duration::ZERO);
        assert_eq!(debuff_duration(f32::MAX), Duration::MAX);

        let agent = AgentId::new(3);
        for (secs, still_debuffed) in [(f32::INFINITY, 0), (f32::MAX, 1)] {
            let mut bonuses = BonusEngine::new(BonusTuning {
                break_debuff_secs: secs,
                ..BonusTuning::default()
            });
            bonuses.apply_break_debuff(agent, Duration::from_secs(10));
            bonuses.expire(Duration::from_secs(11));
            assert_eq!(bonuses.debuff_count(), still_debuffed);
        }
    }

    #[test]
    fn non_positive_hits_are_not_split() {
        let recipients = [AgentId::new(1)];
        assert_eq!(split_evenly(-5.0, 0.5, &recipients), DamageSplit::unshared(0.0));
        assert_eq!(split_evenly(f32::NAN, 0.5, &recipients), DamageSplit::unshared(0.0));
    }

    #[test]
    fn fraction_is_capped_at_the_whole_hit() {
        let recipients = [AgentId::new(1), AgentId::new(2)];
        let split = split_evenly(10.0, 3.0, &recipients);
        assert_eq!(split.target, 0.0);
        assert!((split.total() - 10.0).abs() < 1e-5);
    }
}
