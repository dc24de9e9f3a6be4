//! Per-frame passes driven by `Engine::update`.

use constellation_core::{centroid, Agent, AgentId, ConstellationId, ForceSource};
use constellation_system_clustering::{Candidate, ClusterConfig};
use constellation_system_steering::{advance, drift_force, spring_force, MotionInput};
use glam::Vec2;

use crate::{integrity, is_live_member, BreakReason, Engine};

impl Engine {
    /// Drops dead, missing, or retagged members and re-derives anchors.
    pub(crate) fn prune_members(&mut self, agents: &mut [Agent]) {
        let mut index = 0;
        while index < self.constellations.len() {
            let constellation = &self.constellations[index];
            let id = constellation.id();
            let pattern = constellation.pattern();
            let (live, lost): (Vec<AgentId>, Vec<AgentId>) =
                constellation.members().iter().copied().partition(|member| {
                    self.agent(agents, *member)
                        .map_or(false, |agent| is_live_member(agent, id))
                });
            if lost.is_empty() {
                index += 1;
                continue;
            }

            for member in &lost {
                let _ = self.bonuses.remove(*member);
                if let Some(agent) = self.index.get(member).and_then(|slot| agents.get_mut(*slot)) {
                    if agent.formation.map(|tag| tag.constellation) == Some(id) {
                        agent.formation = None;
                    }
                }
            }

            let minimum = self
                .registry
                .get(pattern)
                .map_or(usize::MAX, |definition| definition.min_members());
            if live.len() < minimum {
                log::trace!(
                    "constellation {} down to {} of {minimum} members",
                    id.get(),
                    live.len()
                );
                self.dismantle_at(index, BreakReason::Undermanned, agents);
                continue;
            }

            if self.reanchor(index, &live, agents) {
                index += 1;
            } else {
                log::warn!("constellation {} could not re-derive anchors", id.get());
                self.dismantle_at(index, BreakReason::IntegrityLost, agents);
            }
        }
    }

    /// Ages formations and dissolves those past their lifetime.
    pub(crate) fn age_formations(&mut self, dt: f32, agents: &mut [Agent]) {
        let lifetime = self.config.lifecycle.max_lifetime_secs;
        let mut expired = Vec::new();
        for (index, constellation) in self.constellations.iter_mut().enumerate() {
            constellation.age_secs += dt;
            constellation.reoptimize_timer += dt;
            if constellation.age_secs > lifetime {
                expired.push(index);
            }
        }
        for index in expired.into_iter().rev() {
            self.dismantle_at(index, BreakReason::Expired, agents);
        }
    }

    /// Moves formation centers and pulls members toward their anchors.
    pub(crate) fn steer(&mut self, dt: f32, agents: &mut [Agent]) {
        let active = self.constellations.len();
        let tuning = &self.config.steering;
        for constellation in &mut self.constellations {
            let id = constellation.id();
            let live_centroid = centroid(
                constellation
                    .members()
                    .iter()
                    .filter_map(|member| self.index.get(member).and_then(|slot| agents.get(*slot)))
                    .filter(|agent| is_live_member(agent, id))
                    .map(|agent| agent.position),
            );
            let input = MotionInput {
                live_centroid,
                target: self.steering_target.unwrap_or(constellation.center()),
                orientation: constellation.orientation(),
                active_formations: active,
            };
            advance(&mut constellation.motion, &input, dt, tuning);
            constellation.refresh_targets(&self.registry, self.frame);

            for (member, target) in constellation
                .members()
                .iter()
                .zip(constellation.target_positions())
            {
                let Some(agent) = self.index.get(member).and_then(|slot| agents.get_mut(*slot)) else {
                    continue;
                };
                let force = spring_force(agent.position, *target, tuning);
                agent.add_force(ForceSource::Constellation, force.x, force.y);
            }
        }
    }

    /// Pulls free agents gently toward the nearest formation.
    pub(crate) fn drift(&self, agents: &mut [Agent]) {
        if self.constellations.is_empty() {
            return;
        }
        let now = self.clock;
        let active = self.constellations.len();
        for agent in agents.iter_mut().filter(|agent| agent.is_free(now)) {
            let nearest = self
                .constellations
                .iter()
                .map(|constellation| constellation.center())
                .min_by(|a, b| {
                    a.distance_squared(agent.position)
                        .total_cmp(&b.distance_squared(agent.position))
                });
            let Some(center) = nearest else {
                continue;
            };
            if let Some(force) = drift_force(agent.position, center, active, &self.config.steering) {
                agent.add_force(ForceSource::External, force.x, force.y);
            }
        }
    }

    /// Scores every formation past its grace period and dismantles broken ones.
    pub(crate) fn audit_integrity(&mut self, dt: f32, agents: &mut [Agent]) {
        let tuning = &self.config.integrity;
        let max_radius = self.config.lifecycle.max_radius;
        let mut broken = Vec::new();

        for (index, constellation) in self.constellations.iter_mut().enumerate() {
            let grace = constellation.grace_secs(tuning.base_grace_secs, tuning.complexity_grace_secs);
            if constellation.age_secs < grace {
                continue;
            }

            let positions: Option<Vec<Vec2>> = constellation
                .members()
                .iter()
                .map(|member| {
                    self.index
                        .get(member)
                        .and_then(|slot| agents.get(*slot))
                        .map(|agent| agent.position)
                })
                .collect();
            let Some(positions) = positions else {
                continue;
            };
            let Some(center) = centroid(positions.iter().copied()) else {
                continue;
            };

            let violations = integrity::evaluate(
                &positions,
                constellation.target_positions(),
                center,
                constellation.edge_tolerance(),
                max_radius,
                tuning.max_deviation,
            );
            constellation.integrity_strikes =
                integrity::accumulate(constellation.integrity_strikes, &violations, dt, tuning);
            if constellation.integrity_strikes > tuning.strike_ceiling {
                log::trace!(
                    "constellation {} exceeded strike ceiling: {violations:?}",
                    constellation.id().get()
                );
                broken.push(index);
            }
        }

        for index in broken.into_iter().rev() {
            self.dismantle_at(index, BreakReason::IntegrityLost, agents);
        }
    }

    /// Lets formations old enough to grow absorb nearby free agents.
    pub(crate) fn absorb_free_agents(&mut self, agents: &mut [Agent]) {
        let now = self.clock;
        let radius = self.config.detection.detection_radius;
        let required = self.config.lifecycle.expand_min_age_secs;
        for index in 0..self.constellations.len() {
            let constellation = &self.constellations[index];
            if constellation.age_secs() < required {
                continue;
            }
            let center = constellation.center();
            let nearby: Vec<AgentId> = agents
                .iter()
                .filter(|agent| agent.is_free(now) && agent.position.distance(center) <= radius)
                .map(|agent| agent.id)
                .collect();
            if nearby.is_empty() {
                continue;
            }
            if let Err(rejection) = self.expand_indexed(index, &nearby, agents) {
                log::trace!("expansion skipped: {rejection}");
            }
        }
    }

    /// Clusters free agents and commits a formation per accepted cluster.
    pub(crate) fn detect_and_create(&mut self, agents: &mut [Agent]) {
        let now = self.clock;
        self.candidates.clear();
        self.candidates.extend(
            agents
                .iter()
                .filter(|agent| agent.is_free(now))
                .map(|agent| Candidate::new(agent.id, agent.position)),
        );
        if self.candidates.len() < 3 {
            return;
        }

        let config = ClusterConfig::for_constellation_radius(
            self.config.detection.detection_radius,
            self.config.lifecycle.max_radius,
        );
        let mut clusters = std::mem::take(&mut self.clusters);
        self.detector
            .detect(&config, self.candidates.drain(..), &mut clusters);

        let mut created = 0;
        for cluster in &clusters {
            if created >= self.config.detection.max_new_per_pass {
                break;
            }
            let Some(pattern) = self.choose_pattern(cluster.len()) else {
                log::trace!("no pattern for a cluster of {}", cluster.len());
                continue;
            };
            match self.create_indexed(agents, &cluster.members, pattern) {
                Ok(_) => created += 1,
                Err(rejection) => log::trace!("cluster rejected: {rejection}"),
            }
        }
        self.clusters = clusters;
    }

    /// Merges pairs of mature formations whose centers are close.
    pub(crate) fn merge_pass(&mut self, agents: &mut [Agent]) {
        let required = self.config.lifecycle.merge_min_age_secs;
        let radius = self.config.lifecycle.merge_radius;
        let mut pairs: Vec<(ConstellationId, ConstellationId)> = Vec::new();
        for (offset, first) in self.constellations.iter().enumerate() {
            for second in &self.constellations[offset + 1..] {
                if first.age_secs() >= required
                    && second.age_secs() >= required
                    && first.center().distance(second.center()) <= radius
                {
                    pairs.push((first.id(), second.id()));
                }
            }
        }

        let mut consumed: Vec<ConstellationId> = Vec::new();
        for (a, b) in pairs {
            if consumed.contains(&a) || consumed.contains(&b) {
                continue;
            }
            match self.merge_indexed(agents, a, b) {
                Ok(_) => consumed.extend([a, b]),
                Err(rejection) => log::trace!("merge skipped: {rejection}"),
            }
        }
    }

    /// Attempts anchor reoptimization on formations whose timer elapsed.
    pub(crate) fn reoptimize_pass(&mut self, agents: &mut [Agent]) {
        let interval = self.config.lifecycle.reoptimize_interval_secs;
        for index in 0..self.constellations.len() {
            if self.constellations[index].reoptimize_timer < interval {
                continue;
            }
            self.constellations[index].reoptimize_timer = 0.0;
            let _ = self.reoptimize_at(index, agents);
        }
    }

    /// Runs aura pulses and heals their recipients.
    pub(crate) fn update_auras(&mut self, dt: f32, agents: &mut [Agent]) {
        for constellation in &self.constellations {
            let pulse = {
                let members: Vec<&Agent> = constellation
                    .members()
                    .iter()
                    .filter_map(|member| self.index.get(member).and_then(|slot| agents.get(*slot)))
                    .collect();
                self.bonuses.update_aura_effects(
                    constellation.id(),
                    constellation.pattern(),
                    constellation.age_secs(),
                    &members,
                    dt,
                )
            };
            let Some(pulse) = pulse else {
                continue;
            };
            if let Some(agent) = self.index.get(&pulse.target).and_then(|slot| agents.get_mut(*slot)) {
                agent.health = (agent.health + pulse.amount).min(agent.max_health);
                log::trace!(
                    "constellation {} aura healed agent {} for {:.1}",
                    constellation.id().get(),
                    pulse.target.get(),
                    pulse.amount
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Engine;
    use constellation_core::{Agent, AgentId, PatternKind};
    use glam::Vec2;

    #[test]
    fn drift_only_pulls_free_agents_within_range() {
        let mut engine = Engine::with_defaults(4);
        let mut agents = vec![
            Agent::new(AgentId::new(1), Vec2::new(0.0, 0.0)),
            Agent::new(AgentId::new(2), Vec2::new(40.0, 0.0)),
            Agent::new(AgentId::new(3), Vec2::new(20.0, 35.0)),
            Agent::new(AgentId::new(4), Vec2::new(150.0, 0.0)),
            Agent::new(AgentId::new(5), Vec2::new(5_000.0, 0.0)),
        ];
        let members = [AgentId::new(1), AgentId::new(2), AgentId::new(3)];
        let id = engine
            .create(&mut agents, &members, PatternKind::Triangle)
            .expect("triangle forms");
        assert!(engine.constellation(id).is_some());

        engine.drift(&mut agents);
        assert!(agents[3].forces().net_from(constellation_core::ForceSource::External).x < 0.0);
        assert!(agents[4].forces().is_empty());
        assert!(agents[0].forces().is_empty());
    }
}
