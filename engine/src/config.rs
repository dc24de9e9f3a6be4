//! Tuning surface for the engine, loadable from TOML.

use constellation_system_bonuses::BonusTuning;
use constellation_system_selection::SelectionTuning;
use constellation_system_steering::SteeringTuning;
use serde::Deserialize;
use thiserror::Error;

/// Every knob the engine exposes, grouped by concern.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cluster detection cadence and radius.
    pub detection: DetectionTuning,
    /// Creation, expansion, merge, and reoptimization rules.
    pub lifecycle: LifecycleTuning,
    /// Integrity audit thresholds and strike weights.
    pub integrity: IntegrityTuning,
    /// Group steering and member forces.
    pub steering: SteeringTuning,
    /// Break debuff and aura cadence.
    pub bonuses: BonusTuning,
    /// Diversity balancing for pattern choice.
    pub selection: SelectionTuning,
}

/// Cluster detection parameters.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectionTuning {
    /// Largest distance between two agents that join the same cluster.
    pub detection_radius: f32,
    /// Seconds between detection passes.
    pub interval_secs: f32,
    /// Upper bound on formations created in one pass.
    pub max_new_per_pass: usize,
}

impl Default for DetectionTuning {
    fn default() -> Self {
        Self {
            detection_radius: 150.0,
            interval_secs: 0.5,
            max_new_per_pass: 12,
        }
    }
}

/// Rules governing how formations come and go.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LifecycleTuning {
    /// Largest distance any member may sit from the formation centroid.
    pub max_radius: f32,
    /// Minimum formation age before free agents may be absorbed.
    pub expand_min_age_secs: f32,
    /// Minimum age both formations need before merging.
    pub merge_min_age_secs: f32,
    /// Largest center distance at which two formations merge.
    pub merge_radius: f32,
    /// Seconds between merge passes.
    pub merge_interval_secs: f32,
    /// Seconds between anchor reoptimization attempts per formation.
    pub reoptimize_interval_secs: f32,
    /// Mean member deviation that triggers a reoptimization attempt.
    pub reoptimize_deviation: f32,
    /// Fractional improvement in total travel required to commit new anchors.
    pub reoptimize_min_improvement: f32,
    /// Cooldown applied to members released by a broken formation.
    pub rejoin_cooldown_secs: f32,
    /// Cooldown applied to extras discarded while merging.
    pub release_cooldown_secs: f32,
    /// How many times creation may shed an outlier and pick a smaller pattern.
    pub max_reselect_attempts: usize,
    /// Age at which a formation dissolves regardless of integrity.
    pub max_lifetime_secs: f32,
    /// Largest time step accepted by a single update.
    pub max_step_secs: f32,
}

impl Default for LifecycleTuning {
    fn default() -> Self {
        Self {
            max_radius: 220.0,
            expand_min_age_secs: 3.0,
            merge_min_age_secs: 5.0,
            merge_radius: 120.0,
            merge_interval_secs: 1.5,
            reoptimize_interval_secs: 2.0,
            reoptimize_deviation: 25.0,
            reoptimize_min_improvement: 0.10,
            rejoin_cooldown_secs: 3.0,
            release_cooldown_secs: 1.0,
            max_reselect_attempts: 3,
            max_lifetime_secs: 45.0,
            max_step_secs: 0.25,
        }
    }
}

/// Integrity audit thresholds.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct IntegrityTuning {
    /// Grace period every formation receives before audits count.
    pub base_grace_secs: f32,
    /// Extra grace per unit of pattern complexity.
    pub complexity_grace_secs: f32,
    /// Largest tolerated distance between a member and its target.
    pub max_deviation: f32,
    /// Mean deviation below which the shape counts as well formed.
    pub well_formed_deviation: f32,
    /// Strikes per second while an edge is stretched past tolerance.
    pub edge_weight: f32,
    /// Strikes per second while a member is outside the maximum radius.
    pub radius_weight: f32,
    /// Strikes per second while a member deviates from its target.
    pub deviation_weight: f32,
    /// Strike decay per second without violations.
    pub decay_per_sec: f32,
    /// Strike decay per second when also well formed.
    pub well_formed_decay_per_sec: f32,
    /// Strike count above which a formation is dismantled.
    pub strike_ceiling: f32,
}

impl Default for IntegrityTuning {
    fn default() -> Self {
        Self {
            base_grace_secs: 4.0,
            complexity_grace_secs: 3.0,
            max_deviation: 120.0,
            well_formed_deviation: 25.0,
            edge_weight: 2.0,
            radius_weight: 2.0,
            deviation_weight: 1.0,
            decay_per_sec: 1.0,
            well_formed_decay_per_sec: 2.0,
            strike_ceiling: 5.0,
        }
    }
}

/// Reasons a configuration is refused.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("failed to parse engine configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A distance, interval, or weight that must be positive was not.
    #[error("{field} must be a positive finite number, got {value}")]
    NonPositive {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Value that was supplied.
        value: f32,
    },
    /// A value fell outside its accepted range.
    #[error("{field} must lie within {min}..={max}, got {value}")]
    OutOfRange {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Value that was supplied.
        value: f32,
        /// Smallest accepted value.
        min: f32,
        /// Largest accepted value.
        max: f32,
    },
}

impl EngineConfig {
    /// Parses and validates a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every radius, interval, and ceiling is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("detection.detection_radius", self.detection.detection_radius),
            ("detection.interval_secs", self.detection.interval_secs),
            ("lifecycle.max_radius", self.lifecycle.max_radius),
            ("lifecycle.merge_radius", self.lifecycle.merge_radius),
            ("lifecycle.merge_interval_secs", self.lifecycle.merge_interval_secs),
            (
                "lifecycle.reoptimize_interval_secs",
                self.lifecycle.reoptimize_interval_secs,
            ),
            ("lifecycle.rejoin_cooldown_secs", self.lifecycle.rejoin_cooldown_secs),
            ("lifecycle.max_lifetime_secs", self.lifecycle.max_lifetime_secs),
            ("lifecycle.max_step_secs", self.lifecycle.max_step_secs),
            ("integrity.max_deviation", self.integrity.max_deviation),
            ("integrity.strike_ceiling", self.integrity.strike_ceiling),
            ("steering.drift_radius", self.steering.drift_radius),
            ("bonuses.aura_interval_secs", self.bonuses.aura_interval_secs),
            ("bonuses.break_debuff_secs", self.bonuses.break_debuff_secs),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }

        let ranged = [
            (
                "lifecycle.reoptimize_min_improvement",
                self.lifecycle.reoptimize_min_improvement,
                0.0,
                0.99,
            ),
            ("lifecycle.max_step_secs", self.lifecycle.max_step_secs, 0.0, 1.0),
            ("bonuses.break_debuff_secs", self.bonuses.break_debuff_secs, 0.0, 600.0),
            ("steering.crowd_factor", self.steering.crowd_factor, 0.0, 10.0),
            (
                "bonuses.break_debuff_speed",
                self.bonuses.break_debuff_speed,
                0.0,
                1.0,
            ),
        ];
        for (field, value, min, max) in ranged {
            if !(min..=max).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    field,
                    value,
                    min,
                    max,
                });
            }
        }

        Ok(())
    }
}
