#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative formation lifecycle for the constellation engine.
//!
//! The [`Engine`] owns every active [`Constellation`] and the per-session
//! state of the pure systems (selector history, bonus tables, detection
//! scratch buffers). The host hands its agent slice to [`Engine::update`] once
//! per frame. The engine reads positions and liveness, writes only formation
//! tags and rejoin cooldowns, and pushes steering forces into each agent's
//! accumulator. Every failure is recovered locally: the worst outcome of a
//! malformed frame is that no formation changes.

mod anchors;
mod config;
mod constellation;
mod effects;
mod error;
mod integrity;
mod lifecycle;
mod passes;
mod stats;

use std::{
    collections::{hash_map::Entry, HashMap},
    fmt,
    time::Duration,
};

use constellation_core::{centroid, Agent, AgentId, ConstellationId, PatternKind};
use constellation_system_clustering::{Candidate, Cluster, ClusterDetector};
use constellation_system_patterns::PatternRegistry;
use constellation_system_selection::PatternSelector;
use glam::Vec2;

pub use config::{ConfigError, DetectionTuning, EngineConfig, IntegrityTuning, LifecycleTuning};
pub use constellation::Constellation;
pub use constellation_system_bonuses::{BonusEngine, BonusTuning};
pub use constellation_system_selection::PatternDistribution;
pub use effects::{BreakReason, EffectsHook, NoEffects};
pub use error::FormationRejection;
pub use stats::{DebugStats, LifecycleCounters};

/// Lifecycle manager and per-frame driver for emergent formations.
pub struct Engine {
    config: EngineConfig,
    registry: PatternRegistry,
    selector: PatternSelector,
    detector: ClusterDetector,
    bonuses: BonusEngine,
    effects: Box<dyn EffectsHook>,
    constellations: Vec<Constellation>,
    index: HashMap<AgentId, usize>,
    candidates: Vec<Candidate>,
    clusters: Vec<Cluster>,
    counters: LifecycleCounters,
    clock: Duration,
    frame: u64,
    detection_timer: f32,
    merge_timer: f32,
    next_id: u32,
    seed: u64,
    steering_target: Option<Vec2>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("clock", &self.clock)
            .field("frame", &self.frame)
            .field("constellations", &self.constellations.len())
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates an engine after validating `config`.
    pub fn new(config: EngineConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, seed))
    }

    /// Creates an engine with the default tuning.
    #[must_use]
    pub fn with_defaults(seed: u64) -> Self {
        Self::build(EngineConfig::default(), seed)
    }

    fn build(config: EngineConfig, seed: u64) -> Self {
        Self {
            registry: PatternRegistry::with_defaults(),
            selector: PatternSelector::with_tuning(seed, config.selection.clone()),
            detector: ClusterDetector::new(),
            bonuses: BonusEngine::new(config.bonuses.clone()),
            effects: Box::new(NoEffects),
            constellations: Vec::new(),
            index: HashMap::new(),
            candidates: Vec::new(),
            clusters: Vec::new(),
            counters: LifecycleCounters::default(),
            clock: Duration::ZERO,
            frame: 0,
            detection_timer: config.detection.interval_secs,
            merge_timer: 0.0,
            next_id: 1,
            seed,
            steering_target: None,
            config,
        }
    }

    /// Installs a receiver for lifecycle notifications.
    #[must_use]
    pub fn with_effects(mut self, effects: Box<dyn EffectsHook>) -> Self {
        self.effects = effects;
        self
    }

    /// Replaces the pattern catalog. Active formations are unaffected.
    #[must_use]
    pub fn with_registry(mut self, registry: PatternRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Advances every formation by `dt` seconds.
    ///
    /// Passes run in a fixed order: membership pruning, aging, steering and
    /// spring forces, drift toward nearby formations, the integrity audit,
    /// then the rate-limited detection, merge, and reoptimization passes, and
    /// finally aura pulses.
    pub fn update(&mut self, dt: f32, agents: &mut [Agent], target: Vec2) {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.config.lifecycle.max_step_secs)
        } else {
            log::warn!("ignoring non-finite time step {dt}");
            0.0
        };

        self.clock += Duration::from_secs_f32(dt);
        self.frame += 1;
        if target.is_finite() {
            self.steering_target = Some(target);
        }

        self.reindex(agents);
        self.bonuses.expire(self.clock);

        self.prune_members(agents);
        self.age_formations(dt, agents);
        self.steer(dt, agents);
        self.drift(agents);
        self.audit_integrity(dt, agents);

        self.detection_timer += dt;
        if self.detection_timer >= self.config.detection.interval_secs {
            self.detection_timer = 0.0;
            self.absorb_free_agents(agents);
            self.detect_and_create(agents);
        }

        self.merge_timer += dt;
        if self.merge_timer >= self.config.lifecycle.merge_interval_secs {
            self.merge_timer = 0.0;
            self.merge_pass(agents);
        }

        self.reoptimize_pass(agents);
        self.update_auras(dt, agents);
    }

    /// Dismantles every formation and clears all engine-owned agent state.
    ///
    /// Members are released without cooldown or debuff and the session
    /// restarts from a zero clock.
    pub fn reset(&mut self, agents: &mut [Agent]) {
        self.reindex(agents);
        while let Some(last) = self.constellations.len().checked_sub(1) {
            self.dismantle_at(last, BreakReason::Reset, agents);
        }
        for agent in agents.iter_mut() {
            agent.formation = None;
            agent.rejoin_cooldown_until = None;
        }

        self.bonuses.clear();
        self.selector.reset(self.seed);
        self.counters = LifecycleCounters::default();
        self.clock = Duration::ZERO;
        self.frame = 0;
        self.detection_timer = self.config.detection.interval_secs;
        self.merge_timer = 0.0;
        self.next_id = 1;
        self.steering_target = None;
        log::debug!("engine reset");
    }

    /// Forms a constellation from `members` using `pattern`, if possible.
    pub fn create(
        &mut self,
        agents: &mut [Agent],
        members: &[AgentId],
        pattern: PatternKind,
    ) -> Option<ConstellationId> {
        match self.try_create(agents, members, pattern) {
            Ok(id) => Some(id),
            Err(rejection) => {
                log::trace!("formation rejected: {rejection}");
                None
            }
        }
    }

    /// Like [`Engine::create`], reporting why a formation was refused.
    pub fn try_create(
        &mut self,
        agents: &mut [Agent],
        members: &[AgentId],
        pattern: PatternKind,
    ) -> Result<ConstellationId, FormationRejection> {
        self.reindex(agents);
        self.create_indexed(agents, members, pattern)
    }

    /// Grows a constellation with free agents among `candidates`.
    pub fn expand(
        &mut self,
        agents: &mut [Agent],
        id: ConstellationId,
        candidates: &[AgentId],
    ) -> bool {
        self.reindex(agents);
        let Some(index) = self.position_of(id) else {
            return false;
        };
        match self.expand_indexed(index, candidates, agents) {
            Ok(()) => true,
            Err(rejection) => {
                log::trace!("expansion rejected: {rejection}");
                false
            }
        }
    }

    /// Merges `b` into `a`, returning the surviving identifier.
    pub fn merge(
        &mut self,
        agents: &mut [Agent],
        a: ConstellationId,
        b: ConstellationId,
    ) -> Option<ConstellationId> {
        self.reindex(agents);
        match self.merge_indexed(agents, a, b) {
            Ok(id) => Some(id),
            Err(rejection) => {
                log::trace!("merge rejected: {rejection}");
                None
            }
        }
    }

    /// Dismantles a constellation on request, as if its integrity had failed.
    pub fn dismantle(&mut self, agents: &mut [Agent], id: ConstellationId) -> bool {
        self.reindex(agents);
        match self.position_of(id) {
            Some(index) => {
                self.dismantle_at(index, BreakReason::Requested, agents);
                true
            }
            None => false,
        }
    }

    /// Applies a hit of `amount` to `target`, spreading it over the formation.
    ///
    /// `amount` is the hit after the host applied any mitigation such as
    /// [`BonusEngine::damage_reduction`]. Orbit protection runs first, then
    /// damage sharing on what remains; redirected damage is never shared
    /// again. Returns the damage the target itself absorbed.
    pub fn apply_damage(&mut self, agents: &mut [Agent], target: AgentId, amount: f32) -> f32 {
        self.reindex(agents);
        if !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }

        let Some(slot) = self.index.get(&target).copied() else {
            return 0.0;
        };
        let now = self.clock;

        let (taken, redirected) = {
            let Some(victim) = agents.get(slot).filter(|agent| agent.alive) else {
                return 0.0;
            };
            let others: Vec<&Agent> = victim
                .formation
                .and_then(|tag| self.constellation(tag.constellation))
                .map(|constellation| {
                    constellation
                        .members()
                        .iter()
                        .filter(|member| **member != target)
                        .filter_map(|member| self.index.get(member).and_then(|s| agents.get(*s)))
                        .filter(|agent| agent.alive)
                        .collect()
                })
                .unwrap_or_default();

            let protected = self
                .bonuses
                .process_orbit_protection(victim, &others, amount, now);
            let shared = self
                .bonuses
                .process_damage_sharing(victim, &others, protected.target, now);
            let mut redirected = protected.redirected;
            redirected.extend(shared.redirected);
            (shared.target, redirected)
        };

        for (id, share) in redirected {
            if let Some(agent) = self.index.get(&id).and_then(|s| agents.get_mut(*s)) {
                agent.health = (agent.health - share).max(0.0);
            }
        }
        if let Some(victim) = agents.get_mut(slot) {
            victim.health = (victim.health - taken).max(0.0);
        }
        taken
    }

    /// Cached target position of `agent`'s anchor, when it belongs to a formation.
    #[must_use]
    pub fn anchor_target(&self, agent: &Agent) -> Option<Vec2> {
        let tag = agent.formation?;
        let constellation = self.constellation(tag.constellation)?;
        if constellation.members().get(tag.anchor) != Some(&agent.id) {
            return None;
        }
        constellation.target_positions().get(tag.anchor).copied()
    }

    /// Mean position of the live agents tagged with `id`.
    #[must_use]
    pub fn member_centroid(&self, id: ConstellationId, agents: &[Agent]) -> Option<Vec2> {
        centroid(
            agents
                .iter()
                .filter(|agent| {
                    agent.alive
                        && agent.has_finite_position()
                        && agent.formation.map(|tag| tag.constellation) == Some(id)
                })
                .map(|agent| agent.position),
        )
    }

    /// Active formations in creation order.
    #[must_use]
    pub fn constellations(&self) -> &[Constellation] {
        &self.constellations
    }

    /// Looks up an active formation.
    #[must_use]
    pub fn constellation(&self, id: ConstellationId) -> Option<&Constellation> {
        self.constellations
            .iter()
            .find(|constellation| constellation.id() == id)
    }

    /// Number of active formations per pattern.
    #[must_use]
    pub fn pattern_distribution(&self) -> PatternDistribution {
        PatternDistribution::from_kinds(self.constellations.iter().map(Constellation::pattern))
    }

    /// Normalized entropy of the active pattern mix in `[0, 1]`.
    ///
    /// One means every formation uses a different pattern (or the mix is as
    /// even as the catalog allows); zero means no formations or a single
    /// pattern repeated.
    #[must_use]
    pub fn variety_score(&self) -> f32 {
        let distribution = self.pattern_distribution();
        let total = distribution.total();
        if total == 0 {
            return 0.0;
        }
        let reachable = total.min(self.registry.len());
        if reachable <= 1 {
            return 1.0;
        }

        let entropy: f32 = distribution
            .iter()
            .map(|(_, count)| {
                let share = count as f32 / total as f32;
                -share * share.ln()
            })
            .sum();
        (entropy / (reachable as f32).ln()).clamp(0.0, 1.0)
    }

    /// Snapshot of engine health for overlays and logs.
    #[must_use]
    pub fn debug_stats(&self) -> DebugStats {
        DebugStats {
            frame: self.frame,
            clock_secs: self.clock.as_secs_f32(),
            active_constellations: self.constellations.len(),
            members_in_formation: self
                .constellations
                .iter()
                .map(|constellation| constellation.members().len())
                .sum(),
            bonus_states: self.bonuses.bonus_count(),
            debuffed_agents: self.bonuses.debuff_count(),
            worst_strikes: self
                .constellations
                .iter()
                .map(Constellation::integrity_strikes)
                .fold(0.0, f32::max),
            variety_score: self.variety_score(),
            counters: self.counters,
        }
    }

    /// Bonus tables, for hosts reading combat modifiers.
    #[must_use]
    pub fn bonuses(&self) -> &BonusEngine {
        &self.bonuses
    }

    /// Pattern catalog in use.
    #[must_use]
    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Engine clock, advanced by every update.
    #[must_use]
    pub fn clock(&self) -> Duration {
        self.clock
    }

    /// Number of updates processed since creation or the last reset.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn reindex(&mut self, agents: &[Agent]) {
        self.index.clear();
        for (slot, agent) in agents.iter().enumerate() {
            match self.index.entry(agent.id) {
                Entry::Occupied(_) => {
                    log::warn!("duplicate agent id {} ignored", agent.id.get());
                }
                Entry::Vacant(entry) => {
                    let _ = entry.insert(slot);
                }
            }
        }
    }

    fn position_of(&self, id: ConstellationId) -> Option<usize> {
        self.constellations
            .iter()
            .position(|constellation| constellation.id() == id)
    }

    fn agent<'a>(&self, agents: &'a [Agent], id: AgentId) -> Option<&'a Agent> {
        self.index.get(&id).and_then(|slot| agents.get(*slot))
    }
}

/// Reports whether `agent` is a usable member of `id`.
fn is_live_member(agent: &Agent, id: ConstellationId) -> bool {
    agent.alive
        && agent.has_finite_position()
        && agent.formation.map(|tag| tag.constellation) == Some(id)
}
