#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Weighted pattern selection with diversity balancing.
//!
//! Every choice is a roulette draw over adjusted weights; adjustments only ever
//! scale weights, they never pick a winner outright. The random source is a
//! seeded ChaCha stream so replays with the same seed choose the same shapes.

use std::collections::{BTreeMap, VecDeque};

use constellation_core::PatternKind;
use constellation_system_patterns::{Pattern, PatternRegistry};
use rand::{
    distributions::{Distribution, WeightedIndex},
    SeedableRng,
};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

/// Tuning knobs controlling diversity balancing.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SelectionTuning {
    /// Number of recent picks remembered for repetition decay.
    pub history_len: usize,
    /// Multiplicative decay applied per recent use of a pattern.
    pub repeat_decay: f32,
    /// Lower bound of the repetition decay factor.
    pub repeat_floor: f32,
    /// Boost applied when a pattern holds less than half its fair share.
    pub underrepresented_boost: f32,
    /// Penalty applied when a pattern holds more than twice its fair share.
    pub overrepresented_penalty: f32,
    /// Largest share of active formations any single pattern should reach.
    pub dominance_cap: f32,
    /// Penalty applied when picking a pattern would exceed the dominance cap.
    pub dominance_penalty: f32,
    /// Patterns needing at least this many members count as large.
    pub large_pattern_min_members: usize,
    /// Strength of the small-pattern bias in subset mode when the mix is large-heavy.
    pub small_pattern_bias: f32,
}

impl Default for SelectionTuning {
    fn default() -> Self {
        Self {
            history_len: 8,
            repeat_decay: 0.7,
            repeat_floor: 0.1,
            underrepresented_boost: 1.5,
            overrepresented_penalty: 0.5,
            dominance_cap: 0.25,
            dominance_penalty: 0.05,
            large_pattern_min_members: 6,
            small_pattern_bias: 2.0,
        }
    }
}

/// Count of active formations per pattern.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatternDistribution {
    counts: BTreeMap<PatternKind, usize>,
    total: usize,
}

impl PatternDistribution {
    /// Creates an empty distribution.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a distribution from the patterns of the active formations.
    pub fn from_kinds<I>(kinds: I) -> Self
    where
        I: IntoIterator<Item = PatternKind>,
    {
        let mut distribution = Self::new();
        for kind in kinds {
            distribution.record(kind);
        }
        distribution
    }

    /// Counts one more active formation using `kind`.
    pub fn record(&mut self, kind: PatternKind) {
        *self.counts.entry(kind).or_insert(0) += 1;
        self.total += 1;
    }

    /// Number of active formations using `kind`.
    #[must_use]
    pub fn count(&self, kind: PatternKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Fraction of active formations using `kind`, zero when nothing is active.
    #[must_use]
    pub fn share(&self, kind: PatternKind) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(kind) as f32 / self.total as f32
    }

    /// Total number of active formations.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Iterator over `(pattern, count)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (PatternKind, usize)> + '_ {
        self.counts.iter().map(|(kind, count)| (*kind, *count))
    }
}

/// Stateful pattern selector owning its random stream and usage history.
#[derive(Debug)]
pub struct PatternSelector {
    tuning: SelectionTuning,
    rng: ChaCha8Rng,
    history: VecDeque<PatternKind>,
    weights: Vec<(PatternKind, f32)>,
}

impl PatternSelector {
    /// Creates a selector seeded for reproducible draws.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, SelectionTuning::default())
    }

    /// Creates a selector with explicit tuning.
    #[must_use]
    pub fn with_tuning(seed: u64, tuning: SelectionTuning) -> Self {
        Self {
            tuning,
            rng: ChaCha8Rng::seed_from_u64(seed),
            history: VecDeque::new(),
            weights: Vec::new(),
        }
    }

    /// Clears the usage history and reseeds the random stream.
    pub fn reset(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.history.clear();
    }

    /// Records that `kind` was just committed to a formation.
    pub fn record_usage(&mut self, kind: PatternKind) {
        self.history.push_back(kind);
        while self.history.len() > self.tuning.history_len {
            let _ = self.history.pop_front();
        }
    }

    /// Most recent picks, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = PatternKind> + '_ {
        self.history.iter().copied()
    }

    /// Picks a pattern for `count` members.
    ///
    /// Exact mode samples among patterns whose range contains `count`. When no
    /// pattern fits and `allow_subset` is set, patterns needing at most `count`
    /// members are sampled instead; the caller discards the excess members.
    pub fn select_pattern(
        &mut self,
        registry: &PatternRegistry,
        count: usize,
        allow_subset: bool,
        distribution: &PatternDistribution,
    ) -> Option<PatternKind> {
        self.weights.clear();
        self.weights.extend(
            registry
                .fitting(count)
                .map(|pattern| (pattern.kind(), pattern.selection_weight())),
        );

        if self.weights.is_empty() && allow_subset {
            let large_heavy = self.large_share(registry, distribution) > 0.5;
            let bias = self.tuning.small_pattern_bias;
            self.weights.extend(
                registry
                    .iter()
                    .filter(|pattern| pattern.max_members() <= count)
                    .map(|pattern| {
                        let mut weight = pattern.selection_weight();
                        if large_heavy && count > 0 {
                            let slack = 1.0 - pattern.max_members() as f32 / count as f32;
                            weight *= 1.0 + bias * slack.max(0.0);
                        }
                        (pattern.kind(), weight)
                    }),
            );
        }

        self.draw()
    }

    /// Picks a pattern for exactly `count` members, discouraging recent and over-represented shapes.
    pub fn select_pattern_with_variety(
        &mut self,
        registry: &PatternRegistry,
        count: usize,
        recent: &[PatternKind],
        distribution: &PatternDistribution,
    ) -> Option<PatternKind> {
        let fair_share = if registry.is_empty() {
            0.0
        } else {
            1.0 / registry.len() as f32
        };

        self.weights.clear();
        for pattern in registry.fitting(count) {
            let weight = pattern.selection_weight()
                * self.repetition_factor(pattern, recent)
                * self.balance_factor(pattern, distribution, fair_share);
            self.weights.push((pattern.kind(), weight));
        }

        self.draw()
    }

    fn repetition_factor(&self, pattern: &Pattern, recent: &[PatternKind]) -> f32 {
        let uses = recent.iter().filter(|kind| **kind == pattern.kind()).count();
        let exponent = i32::try_from(uses).unwrap_or(i32::MAX);
        self.tuning
            .repeat_decay
            .powi(exponent)
            .max(self.tuning.repeat_floor)
    }

    fn balance_factor(
        &self,
        pattern: &Pattern,
        distribution: &PatternDistribution,
        fair_share: f32,
    ) -> f32 {
        let total = distribution.total();
        if total == 0 {
            return 1.0;
        }

        let share = distribution.share(pattern.kind());
        let mut factor = if share < fair_share * 0.5 {
            self.tuning.underrepresented_boost
        } else if share > fair_share * 2.0 {
            self.tuning.overrepresented_penalty
        } else {
            1.0
        };

        // With fewer than four formations any pick is at least a quarter of the mix.
        let projected_total = total + 1;
        if projected_total >= 4 {
            let projected = (distribution.count(pattern.kind()) + 1) as f32 / projected_total as f32;
            if projected > self.tuning.dominance_cap {
                factor *= self.tuning.dominance_penalty;
            }
        }
        factor
    }

    fn large_share(&self, registry: &PatternRegistry, distribution: &PatternDistribution) -> f32 {
        if distribution.total() == 0 {
            return 0.0;
        }
        let large = distribution
            .iter()
            .filter(|(kind, _)| {
                registry.get(*kind).map_or(false, |pattern| {
                    pattern.min_members() >= self.tuning.large_pattern_min_members
                })
            })
            .map(|(_, count)| count)
            .sum::<usize>();
        large as f32 / distribution.total() as f32
    }

    fn draw(&mut self) -> Option<PatternKind> {
        match self.weights.as_slice() {
            [] => None,
            [(kind, _)] => Some(*kind),
            weights => match WeightedIndex::new(weights.iter().map(|(_, weight)| *weight)) {
                Ok(index) => Some(weights[index.sample(&mut self.rng)].0),
                Err(error) => {
                    log::warn!("pattern roulette rejected weights: {error}");
                    None
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PatternDistribution, PatternSelector};
    use constellation_core::PatternKind;
    use constellation_system_patterns::PatternRegistry;

    #[test]
    fn repetition_decay_is_floored() {
        let selector = PatternSelector::new(1);
        let registry = PatternRegistry::with_defaults();
        let triangle = registry.get(PatternKind::Triangle).expect("triangle");

        let none = selector.repetition_factor(triangle, &[]);
        assert!((none - 1.0).abs() < f32::EPSILON);

        let twice = selector.repetition_factor(triangle, &[PatternKind::Triangle; 2]);
        assert!((twice - 0.49).abs() < 1e-5);

        let many = selector.repetition_factor(triangle, &[PatternKind::Triangle; 12]);
        assert!((many - 0.1).abs() < 1e-6);
    }

    #[test]
    fn balance_boosts_missing_and_penalises_dominant_patterns() {
        let selector = PatternSelector::new(1);
        let registry = PatternRegistry::with_defaults();
        let fair = 1.0 / registry.len() as f32;
        let circle = registry.get(PatternKind::Circle).expect("circle");
        let line = registry.get(PatternKind::Line).expect("line");

        let distribution = PatternDistribution::from_kinds([
            PatternKind::Circle,
            PatternKind::Circle,
            PatternKind::Circle,
            PatternKind::Star,
        ]);

        let missing = selector.balance_factor(line, &distribution, fair);
        assert!((missing - 1.5).abs() < 1e-6);

        let dominant = selector.balance_factor(circle, &distribution, fair);
        assert!((dominant - 0.5 * 0.05).abs() < 1e-6);
    }

    #[test]
    fn history_is_bounded() {
        let mut selector = PatternSelector::new(7);
        for _ in 0..20 {
            selector.record_usage(PatternKind::Grid);
        }
        selector.record_usage(PatternKind::Star);
        let recent: Vec<_> = selector.recent().collect();
        assert_eq!(recent.len(), 8);
        assert_eq!(recent.last(), Some(&PatternKind::Star));
    }
}
