//! Headless population that drives the engine.
//!
//! Agents spawn in loose squads spread over the arena and wander randomly
//! until the engine recruits them; afterwards they
//! follow the net of their force accumulator, capped by their effective speed.
//! A roaming target gives facing formations something to point at and a
//! periodic volley of hits exercises damage routing.

use std::f32::consts::TAU;

use constellation_core::{Agent, AgentId};
use constellation_engine::{DebugStats, Engine, PatternDistribution};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// Knobs for the synthetic population.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PopulationConfig {
    /// Number of agents spawned at start.
    pub(crate) agents: usize,
    /// Agents per spawn squad.
    pub(crate) squad_size: usize,
    /// Radius of the square a squad spawns in.
    pub(crate) squad_spread: f32,
    /// Side length of the square arena.
    pub(crate) arena: f32,
    /// Seconds between volleys of incoming damage.
    pub(crate) volley_interval_secs: f32,
    /// Damage of a single hit before mitigation.
    pub(crate) hit_damage: f32,
    /// Seconds a dead agent waits before respawning.
    pub(crate) respawn_secs: f32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            agents: 120,
            squad_size: 6,
            squad_spread: 35.0,
            arena: 1_600.0,
            volley_interval_secs: 1.0,
            hit_damage: 12.0,
            respawn_secs: 4.0,
        }
    }
}

/// One line of simulation output.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct Report {
    /// Tick the report was taken on.
    pub(crate) tick: u64,
    /// Agents alive at the time of the report.
    pub(crate) alive: usize,
    /// Engine statistics.
    pub(crate) stats: DebugStats,
    /// Active formations per pattern name.
    pub(crate) patterns: Vec<(String, usize)>,
}

/// Agents, engine, and the randomness that moves them.
pub(crate) struct Simulation {
    engine: Engine,
    agents: Vec<Agent>,
    wander: Vec<Vec2>,
    respawn_timers: Vec<f32>,
    rng: ChaCha8Rng,
    config: PopulationConfig,
    elapsed: f32,
    volley_timer: f32,
    tick: u64,
}

impl Simulation {
    /// Spawns the population in squads laid out on a jittered grid.
    pub(crate) fn new(engine: Engine, config: PopulationConfig, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let squads = squad_centers(&mut rng, &config);
        let squad_size = config.squad_size.max(1);
        let agents: Vec<Agent> = (0..config.agents)
            .map(|index| {
                let id = AgentId::new(u32::try_from(index).unwrap_or(u32::MAX));
                let center = squads[index / squad_size];
                let spread = config.squad_spread;
                let offset = Vec2::new(rng.gen_range(-spread..=spread), rng.gen_range(-spread..=spread));
                Agent::new(id, (center + offset).clamp(Vec2::ZERO, Vec2::splat(config.arena)))
            })
            .collect();
        let wander = agents.iter().map(|_| random_heading(&mut rng)).collect();
        let respawn_timers = vec![0.0; agents.len()];
        Self {
            engine,
            agents,
            wander,
            respawn_timers,
            rng,
            config,
            elapsed: 0.0,
            volley_timer: 0.0,
            tick: 0,
        }
    }

    /// Advances the whole simulation by `dt` seconds.
    pub(crate) fn step(&mut self, dt: f32) {
        self.tick += 1;
        self.elapsed += dt;
        let target = self.target();

        self.engine.update(dt, &mut self.agents, target);
        self.integrate(dt);
        self.volley(dt);
        self.respawn(dt);
    }

    /// Snapshot of the current state.
    pub(crate) fn report(&self) -> Report {
        let distribution: PatternDistribution = self.engine.pattern_distribution();
        Report {
            tick: self.tick,
            alive: self.agents.iter().filter(|agent| agent.alive).count(),
            stats: self.engine.debug_stats(),
            patterns: distribution
                .iter()
                .map(|(kind, count)| (kind.name().to_owned(), count))
                .collect(),
        }
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }

    pub(crate) fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub(crate) const fn arena(&self) -> f32 {
        self.config.arena
    }

    /// Roaming point the formations steer toward.
    fn target(&self) -> Vec2 {
        let half = self.config.arena * 0.5;
        let angle = self.elapsed * 0.1;
        Vec2::new(half, half) + Vec2::new(angle.cos(), angle.sin()) * half * 0.6
    }

    fn integrate(&mut self, dt: f32) {
        let now = self.engine.clock();
        for (agent, heading) in self.agents.iter_mut().zip(self.wander.iter_mut()) {
            if !agent.alive {
                agent.forces_mut().clear();
                continue;
            }

            let speed = self.engine.bonuses().effective_speed(agent, now);
            let mut velocity = agent.forces().net();
            if agent.formation.is_none() {
                if self.rng.gen_bool(0.02) {
                    *heading = random_heading(&mut self.rng);
                }
                velocity += *heading * speed * 0.3;
            }
            let velocity = velocity.clamp_length_max(speed);

            agent.position = (agent.position + velocity * dt)
                .clamp(Vec2::ZERO, Vec2::splat(self.config.arena));
            agent.forces_mut().clear();
        }
    }

    fn volley(&mut self, dt: f32) {
        self.volley_timer += dt;
        if self.volley_timer < self.config.volley_interval_secs {
            return;
        }
        self.volley_timer = 0.0;

        let alive: Vec<usize> = self
            .agents
            .iter()
            .enumerate()
            .filter(|(_, agent)| agent.alive)
            .map(|(slot, _)| slot)
            .collect();
        let hits = (alive.len() / 20).max(1);
        let now = self.engine.clock();
        for _ in 0..hits {
            let Some(slot) = pick(&mut self.rng, &alive) else {
                return;
            };
            let agent = &self.agents[slot];
            let reduction = self.engine.bonuses().damage_reduction(agent, now);
            let amount = self.config.hit_damage * (1.0 - reduction);
            let id = agent.id;
            let _ = self.engine.apply_damage(&mut self.agents, id, amount);
        }

        for (slot, agent) in self.agents.iter_mut().enumerate() {
            if agent.alive && agent.health <= 0.0 {
                agent.alive = false;
                self.respawn_timers[slot] = self.config.respawn_secs;
                log::trace!("agent {} died", agent.id.get());
            }
        }
    }

    fn respawn(&mut self, dt: f32) {
        for (slot, agent) in self.agents.iter_mut().enumerate() {
            if agent.alive {
                continue;
            }
            self.respawn_timers[slot] -= dt;
            if self.respawn_timers[slot] > 0.0 {
                continue;
            }
            agent.alive = true;
            agent.health = agent.max_health;
            agent.position = random_point(&mut self.rng, self.config.arena);
        }
    }
}

/// One center per squad, on a grid with a little jitter so squads start apart.
fn squad_centers(rng: &mut ChaCha8Rng, config: &PopulationConfig) -> Vec<Vec2> {
    let squads = config.agents.div_ceil(config.squad_size.max(1)).max(1);
    let columns = (squads as f32).sqrt().ceil().max(1.0) as usize;
    let spacing = config.arena / columns as f32;
    let jitter = spacing * 0.05;
    (0..squads)
        .map(|squad| {
            let cell = Vec2::new((squad % columns) as f32 + 0.5, (squad / columns) as f32 + 0.5);
            cell * spacing + Vec2::new(rng.gen_range(-jitter..=jitter), rng.gen_range(-jitter..=jitter))
        })
        .collect()
}

fn random_point(rng: &mut ChaCha8Rng, arena: f32) -> Vec2 {
    Vec2::new(rng.gen_range(0.0..arena), rng.gen_range(0.0..arena))
}

fn random_heading(rng: &mut ChaCha8Rng) -> Vec2 {
    let angle = rng.gen_range(0.0..TAU);
    Vec2::new(angle.cos(), angle.sin())
}

fn pick(rng: &mut ChaCha8Rng, slots: &[usize]) -> Option<usize> {
    if slots.is_empty() {
        None
    } else {
        Some(slots[rng.gen_range(0..slots.len())])
    }
}
