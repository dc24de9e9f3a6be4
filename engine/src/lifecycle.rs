//! Creation, expansion, merging, reoptimization, and dismantling.

use std::{collections::HashSet, time::Duration};

use constellation_core::{centroid, Agent, AgentId, ConstellationId, FormationTag, PatternKind};
use constellation_system_patterns::{Orientation, Pattern};
use constellation_system_selection::PatternDistribution;
use constellation_system_steering::FormationMotion;
use glam::Vec2;

use crate::{
    anchors, is_live_member, BreakReason, Constellation, Engine, FormationRejection,
};

impl Engine {
    pub(crate) fn create_indexed(
        &mut self,
        agents: &mut [Agent],
        members: &[AgentId],
        pattern: PatternKind,
    ) -> Result<ConstellationId, FormationRejection> {
        let now = self.clock;
        let limit = self.config.lifecycle.max_radius;
        let mut seen = HashSet::new();
        let mut chosen: Vec<(AgentId, Vec2)> = members
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| self.agent(agents, *id))
            .filter(|agent| agent.is_free(now))
            .map(|agent| (agent.id, agent.position))
            .collect();

        let mut pattern = pattern;
        let mut definition = self.pattern_definition(pattern)?;
        let mut attempts = 0;
        let center = loop {
            let center = centroid(chosen.iter().map(|(_, position)| *position)).ok_or(
                FormationRejection::NotEnoughMembers {
                    pattern,
                    needed: definition.min_members(),
                    available: 0,
                },
            )?;
            sort_by_distance(&mut chosen, center);
            if chosen.len() > definition.max_members() {
                chosen.truncate(definition.max_members());
                continue;
            }
            if chosen.len() < definition.min_members() {
                return Err(FormationRejection::NotEnoughMembers {
                    pattern,
                    needed: definition.min_members(),
                    available: chosen.len(),
                });
            }

            let spread = chosen
                .last()
                .map_or(0.0, |(_, position)| position.distance(center));
            if spread <= limit {
                break center;
            }
            if attempts >= self.config.lifecycle.max_reselect_attempts {
                return Err(FormationRejection::TooSpread { spread, limit });
            }

            attempts += 1;
            let _ = chosen.pop();
            let distribution = self.pattern_distribution();
            pattern = self
                .selector
                .select_pattern(&self.registry, chosen.len(), true, &distribution)
                .ok_or(FormationRejection::NoFittingPattern(chosen.len()))?;
            definition = self.pattern_definition(pattern)?;
        };

        let (rotation, spin) = match definition.orientation() {
            Orientation::FacesTarget => (self.heading_from(center), 0.0),
            Orientation::FreeSpin => (0.0, self.config.steering.initial_spin),
        };
        let targets = definition.target_positions(center, chosen.len(), rotation);
        let ordered = anchors::assign(&chosen, center, &targets)
            .ok_or(FormationRejection::InvalidGeometry(pattern))?;

        let id = ConstellationId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        let mut constellation = Constellation::new(
            id,
            &self.registry,
            pattern,
            ordered.clone(),
            FormationMotion::new(center, rotation, spin),
        );
        constellation.refresh_targets(&self.registry, self.frame);
        self.constellations.push(constellation);
        self.tag_members(agents, id, &ordered, pattern);
        self.selector.record_usage(pattern);
        self.counters.created += 1;

        log::debug!(
            "constellation {} formed as {pattern} with {} members",
            id.get(),
            ordered.len()
        );
        self.effects.on_formation_created(id, pattern, center);
        self.effects.add_beams(id, &ordered);
        Ok(id)
    }

    pub(crate) fn expand_indexed(
        &mut self,
        index: usize,
        candidates: &[AgentId],
        agents: &mut [Agent],
    ) -> Result<(), FormationRejection> {
        let now = self.clock;
        let limit = self.config.lifecycle.max_radius;
        let required = self.config.lifecycle.expand_min_age_secs;
        let constellation = &self.constellations[index];
        let id = constellation.id();
        if constellation.age_secs() < required {
            return Err(FormationRejection::TooYoung {
                id,
                age: constellation.age_secs(),
                required,
            });
        }

        let center = constellation.center();
        let rotation = constellation.rotation();
        let current_pattern = constellation.pattern();
        let mut combined: Vec<(AgentId, Vec2)> = constellation
            .members()
            .iter()
            .filter_map(|member| self.agent(agents, *member))
            .filter(|agent| is_live_member(agent, id))
            .map(|agent| (agent.id, agent.position))
            .collect();
        let current = combined.len();

        let mut seen: HashSet<AgentId> = combined.iter().map(|(member, _)| *member).collect();
        let mut extras: Vec<(AgentId, Vec2)> = candidates
            .iter()
            .filter(|candidate| seen.insert(**candidate))
            .filter_map(|candidate| self.agent(agents, *candidate))
            .filter(|agent| agent.is_free(now) && agent.position.distance(center) <= limit)
            .map(|agent| (agent.id, agent.position))
            .collect();
        sort_by_distance(&mut extras, center);

        let largest = self
            .registry
            .iter()
            .map(Pattern::max_members)
            .max()
            .unwrap_or(0);
        extras.truncate(largest.saturating_sub(current));
        if extras.is_empty() {
            return Err(FormationRejection::NoGrowth);
        }
        combined.extend(extras);

        let mut pattern = None;
        while combined.len() > current {
            if let Some(kind) = self.choose_exact(combined.len()) {
                pattern = Some(kind);
                break;
            }
            let _ = combined.pop();
        }
        let pattern = pattern.ok_or(FormationRejection::NoGrowth)?;
        let definition = self.pattern_definition(pattern)?;

        let new_center = centroid(combined.iter().map(|(_, position)| *position))
            .ok_or(FormationRejection::NoGrowth)?;
        let spread = combined
            .iter()
            .map(|(_, position)| position.distance(new_center))
            .fold(0.0, f32::max);
        if spread > limit {
            return Err(FormationRejection::TooSpread { spread, limit });
        }

        let targets = definition.target_positions(new_center, combined.len(), rotation);
        let ordered = anchors::assign(&combined, new_center, &targets)
            .ok_or(FormationRejection::InvalidGeometry(pattern))?;

        let constellation = &mut self.constellations[index];
        constellation.set_pattern(&self.registry, pattern);
        constellation.set_members(ordered.clone());
        constellation.reoptimize_timer = 0.0;
        constellation.refresh_targets(&self.registry, self.frame);
        self.tag_members(agents, id, &ordered, pattern);
        if pattern != current_pattern {
            self.selector.record_usage(pattern);
        }
        self.counters.expanded += 1;

        log::debug!(
            "constellation {} expanded from {current} to {} members as {pattern}",
            id.get(),
            ordered.len()
        );
        self.effects.add_beams(id, &ordered);
        Ok(())
    }

    pub(crate) fn merge_indexed(
        &mut self,
        agents: &mut [Agent],
        a: ConstellationId,
        b: ConstellationId,
    ) -> Result<ConstellationId, FormationRejection> {
        let index_a = self
            .position_of(a)
            .ok_or(FormationRejection::UnknownConstellation(a))?;
        let index_b = self
            .position_of(b)
            .filter(|index| *index != index_a)
            .ok_or(FormationRejection::UnknownConstellation(b))?;

        let required = self.config.lifecycle.merge_min_age_secs;
        for index in [index_a, index_b] {
            let constellation = &self.constellations[index];
            if constellation.age_secs() < required {
                return Err(FormationRejection::TooYoung {
                    id: constellation.id(),
                    age: constellation.age_secs(),
                    required,
                });
            }
        }

        let first = &self.constellations[index_a];
        let second = &self.constellations[index_b];
        let distance = first.center().distance(second.center());
        let merge_radius = self.config.lifecycle.merge_radius;
        if distance > merge_radius {
            return Err(FormationRejection::TooFar {
                distance,
                limit: merge_radius,
            });
        }
        let rotation = first.rotation();

        let mut seen = HashSet::new();
        let mut combined: Vec<(AgentId, Vec2)> = Vec::new();
        for (constellation, id) in [(first, a), (second, b)] {
            for member in constellation.members() {
                let Some(agent) = self.agent(agents, *member) else {
                    continue;
                };
                if is_live_member(agent, id) && seen.insert(agent.id) {
                    combined.push((agent.id, agent.position));
                }
            }
        }

        let distribution = PatternDistribution::from_kinds(
            self.constellations
                .iter()
                .filter(|constellation| constellation.id() != a && constellation.id() != b)
                .map(Constellation::pattern),
        );
        let recent: Vec<PatternKind> = self.selector.recent().collect();
        let count = combined.len();
        let pattern = self
            .selector
            .select_pattern_with_variety(&self.registry, count, &recent, &distribution)
            .or_else(|| {
                self.selector
                    .select_pattern(&self.registry, count, true, &distribution)
            })
            .ok_or(FormationRejection::NoFittingPattern(count))?;
        let definition = self.pattern_definition(pattern)?;

        let rough_center = centroid(combined.iter().map(|(_, position)| *position))
            .ok_or(FormationRejection::NoFittingPattern(0))?;
        sort_by_distance(&mut combined, rough_center);
        let released = if combined.len() > definition.max_members() {
            combined.split_off(definition.max_members())
        } else {
            Vec::new()
        };
        if combined.len() < definition.min_members() {
            return Err(FormationRejection::NotEnoughMembers {
                pattern,
                needed: definition.min_members(),
                available: combined.len(),
            });
        }

        let center = centroid(combined.iter().map(|(_, position)| *position))
            .ok_or(FormationRejection::NoFittingPattern(0))?;
        let limit = self.config.lifecycle.max_radius;
        let spread = combined
            .iter()
            .map(|(_, position)| position.distance(center))
            .fold(0.0, f32::max);
        if spread > limit {
            return Err(FormationRejection::TooSpread { spread, limit });
        }

        let targets = definition.target_positions(center, combined.len(), rotation);
        let ordered = anchors::assign(&combined, center, &targets)
            .ok_or(FormationRejection::InvalidGeometry(pattern))?;

        let _ = self.constellations.remove(index_b);
        self.bonuses.forget_constellation(b);
        let index_a = if index_b < index_a { index_a - 1 } else { index_a };

        let now = self.clock;
        let release_cooldown = cooldown(self.config.lifecycle.release_cooldown_secs);
        for (member, _) in &released {
            let _ = self.bonuses.remove(*member);
            if let Some(agent) = self.index.get(member).and_then(|slot| agents.get_mut(*slot)) {
                agent.formation = None;
                agent.rejoin_cooldown_until = Some(now + release_cooldown);
            }
        }

        let survivor = &mut self.constellations[index_a];
        survivor.set_pattern(&self.registry, pattern);
        survivor.set_members(ordered.clone());
        survivor.integrity_strikes = 0.0;
        survivor.reoptimize_timer = 0.0;
        survivor.refresh_targets(&self.registry, self.frame);
        self.tag_members(agents, a, &ordered, pattern);
        self.selector.record_usage(pattern);
        self.counters.merged += 1;

        log::debug!(
            "constellation {} absorbed {} as {pattern} with {} members ({} released)",
            a.get(),
            b.get(),
            ordered.len(),
            released.len()
        );
        self.effects.remove_beams(b);
        self.effects.add_beams(a, &ordered);
        Ok(a)
    }

    /// Reassigns anchors when members drift far from their targets.
    ///
    /// Commits only when total travel drops by the configured fraction.
    pub(crate) fn reoptimize_at(&mut self, index: usize, agents: &mut [Agent]) -> bool {
        let constellation = &self.constellations[index];
        let id = constellation.id();
        let targets = constellation.target_positions();
        if targets.len() != constellation.members().len() {
            return false;
        }

        let current: Option<Vec<(AgentId, Vec2)>> = constellation
            .members()
            .iter()
            .map(|member| {
                self.agent(agents, *member)
                    .map(|agent| (agent.id, agent.position))
            })
            .collect();
        let Some(current) = current else {
            return false;
        };
        let positions: Vec<Vec2> = current.iter().map(|(_, position)| *position).collect();
        let before = anchors::total_travel(&positions, targets);
        let mean = before / positions.len().max(1) as f32;
        if mean <= self.config.lifecycle.reoptimize_deviation {
            return false;
        }

        let Some(live_center) = centroid(positions.iter().copied()) else {
            return false;
        };
        let Some(ordered) = anchors::assign(&current, live_center, targets) else {
            return false;
        };
        let reordered: Vec<Vec2> = ordered
            .iter()
            .filter_map(|member| {
                current
                    .iter()
                    .find(|(id, _)| id == member)
                    .map(|(_, position)| *position)
            })
            .collect();
        let after = anchors::total_travel(&reordered, targets);
        let threshold = before * (1.0 - self.config.lifecycle.reoptimize_min_improvement);
        if after > threshold {
            log::trace!(
                "constellation {} kept anchors: {after:.1} vs {before:.1}",
                id.get()
            );
            return false;
        }

        let pattern = constellation.pattern();
        self.constellations[index].members = ordered.clone();
        self.tag_members(agents, id, &ordered, pattern);
        self.counters.reoptimized += 1;
        log::debug!(
            "constellation {} reassigned anchors, travel {before:.1} -> {after:.1}",
            id.get()
        );
        true
    }

    /// Re-derives anchors for the surviving members of a formation.
    ///
    /// Target positions stay invalid until the next steering pass moves the
    /// center.
    pub(crate) fn reanchor(
        &mut self,
        index: usize,
        survivors: &[AgentId],
        agents: &mut [Agent],
    ) -> bool {
        let constellation = &self.constellations[index];
        let id = constellation.id();
        let pattern = constellation.pattern();
        let members: Vec<(AgentId, Vec2)> = survivors
            .iter()
            .filter_map(|member| self.agent(agents, *member))
            .map(|agent| (agent.id, agent.position))
            .collect();
        let targets = self.registry.target_positions(
            pattern,
            constellation.center(),
            members.len(),
            constellation.rotation(),
        );
        let Some(live_center) = centroid(members.iter().map(|(_, position)| *position)) else {
            return false;
        };
        let Some(ordered) = anchors::assign(&members, live_center, &targets) else {
            return false;
        };

        let constellation = &mut self.constellations[index];
        constellation.set_members(ordered.clone());
        self.tag_members(agents, id, &ordered, pattern);
        true
    }

    pub(crate) fn dismantle_at(&mut self, index: usize, reason: BreakReason, agents: &mut [Agent]) {
        if index >= self.constellations.len() {
            return;
        }
        let constellation = self.constellations.remove(index);
        let id = constellation.id();
        let now = self.clock;
        let rejoin = cooldown(self.config.lifecycle.rejoin_cooldown_secs);

        for member in constellation.members() {
            let _ = self.bonuses.remove(*member);
            let Some(agent) = self.index.get(member).and_then(|slot| agents.get_mut(*slot)) else {
                continue;
            };
            if agent.formation.map(|tag| tag.constellation) == Some(id) {
                agent.formation = None;
            }
            if reason != BreakReason::Reset {
                agent.rejoin_cooldown_until = Some(now + rejoin);
                if agent.alive {
                    self.bonuses.apply_break_debuff(agent.id, now);
                }
            }
        }

        self.bonuses.forget_constellation(id);
        self.counters.record_break(reason);
        log::debug!(
            "constellation {} ({}) dismantled after {:.1}s: {reason:?}",
            id.get(),
            constellation.pattern(),
            constellation.age_secs()
        );
        self.effects
            .on_formation_broken(id, constellation.pattern(), reason, constellation.center());
        self.effects.remove_beams(id);
    }

    /// Picks an exact-fit pattern, falling back to subset mode.
    pub(crate) fn choose_pattern(&mut self, count: usize) -> Option<PatternKind> {
        if let Some(kind) = self.choose_exact(count) {
            return Some(kind);
        }
        let distribution = self.pattern_distribution();
        self.selector
            .select_pattern(&self.registry, count, true, &distribution)
    }

    fn choose_exact(&mut self, count: usize) -> Option<PatternKind> {
        let distribution = self.pattern_distribution();
        let recent: Vec<PatternKind> = self.selector.recent().collect();
        self.selector
            .select_pattern_with_variety(&self.registry, count, &recent, &distribution)
    }

    fn pattern_definition(&self, pattern: PatternKind) -> Result<Pattern, FormationRejection> {
        self.registry
            .get(pattern)
            .copied()
            .ok_or(FormationRejection::UnknownPattern(pattern))
    }

    fn heading_from(&self, center: Vec2) -> f32 {
        self.steering_target
            .map(|target| target - center)
            .filter(|offset| offset.length_squared() > f32::EPSILON)
            .map_or(0.0, |offset| offset.y.atan2(offset.x))
    }

    /// Writes formation tags in anchor order and refreshes member bonuses.
    ///
    /// Members already tagged with `id` keep their join time so their bonus
    /// ramp continues.
    fn tag_members(
        &mut self,
        agents: &mut [Agent],
        id: ConstellationId,
        ordered: &[AgentId],
        pattern: PatternKind,
    ) {
        let now = self.clock;
        for (anchor, member) in ordered.iter().enumerate() {
            let Some(agent) = self.index.get(member).and_then(|slot| agents.get_mut(*slot)) else {
                continue;
            };
            let joined_at = agent
                .formation
                .filter(|tag| tag.constellation == id)
                .map_or(now, |tag| tag.joined_at);
            agent.formation = Some(FormationTag {
                constellation: id,
                anchor,
                joined_at,
            });
            agent.rejoin_cooldown_until = None;
            self.bonuses.apply(agent, pattern, now);
        }
    }
}

fn sort_by_distance(members: &mut [(AgentId, Vec2)], center: Vec2) {
    members.sort_by(|a, b| {
        a.1.distance_squared(center)
            .total_cmp(&b.1.distance_squared(center))
            .then(a.0.cmp(&b.0))
    });
}

fn cooldown(secs: f32) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f32(secs)
    } else {
        Duration::ZERO
    }
}
