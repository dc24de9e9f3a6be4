#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Group steering math for active formations.
//!
//! Everything here is a pure function of its inputs. The lifecycle manager
//! owns formation state and decides which forces to push; this crate only
//! answers where a formation's center and heading should move this tick and
//! how strongly an agent should be pulled toward a point.

use std::f32::consts::{PI, TAU};

use constellation_system_patterns::{normalize_rotation, Orientation};
use glam::Vec2;
use serde::Deserialize;

/// Tuning knobs for formation motion and member forces.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SteeringTuning {
    /// Rate (1/s) at which the stored center follows the live centroid.
    pub center_follow_rate: f32,
    /// Distance the formation tries to keep from the steering target.
    pub standoff_distance: f32,
    /// Gain (1/s) applied to the signed standoff error.
    pub pursuit_gain: f32,
    /// Largest center displacement per second caused by pursuit.
    pub max_pursuit_speed: f32,
    /// Tangential speed of the orbit term around the target.
    pub orbit_speed: f32,
    /// Rate (1/s) at which facing patterns turn toward the target.
    pub facing_turn_rate: f32,
    /// Spin velocity (rad/s) given to free-spinning patterns when they form.
    pub initial_spin: f32,
    /// Exponential decay rate (1/s) of free spin.
    pub spin_decay: f32,
    /// Per-formation crowding factor in `1 / (1 + factor * (active - 1))`.
    pub crowd_factor: f32,
    /// Spring stiffness pulling members toward their anchor targets.
    pub spring_stiffness: f32,
    /// Largest spring force magnitude.
    pub max_spring_force: f32,
    /// Radius around a formation center within which free agents drift in.
    pub drift_radius: f32,
    /// Drift force magnitude at the formation center.
    pub drift_strength: f32,
}

impl Default for SteeringTuning {
    fn default() -> Self {
        Self {
            center_follow_rate: 3.0,
            standoff_distance: 220.0,
            pursuit_gain: 0.6,
            max_pursuit_speed: 80.0,
            orbit_speed: 18.0,
            facing_turn_rate: 2.5,
            initial_spin: 0.5,
            spin_decay: 0.08,
            crowd_factor: 0.15,
            spring_stiffness: 6.0,
            max_spring_force: 400.0,
            drift_radius: 330.0,
            drift_strength: 40.0,
        }
    }
}

/// Center and heading of one formation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FormationMotion {
    /// Smoothed formation center.
    pub center: Vec2,
    /// Heading in `[0, 2π)`.
    pub rotation: f32,
    /// Free spin velocity in radians per second.
    pub rotation_velocity: f32,
}

impl FormationMotion {
    /// Starts a formation at `center` with the provided heading and spin.
    #[must_use]
    pub fn new(center: Vec2, rotation: f32, rotation_velocity: f32) -> Self {
        Self {
            center,
            rotation: normalize_rotation(rotation),
            rotation_velocity: if rotation_velocity.is_finite() {
                rotation_velocity
            } else {
                0.0
            },
        }
    }
}

/// Per-tick inputs for [`advance`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionInput {
    /// Mean position of the live members, when any are live.
    pub live_centroid: Option<Vec2>,
    /// Point the formation pursues.
    pub target: Vec2,
    /// Rotation behaviour of the formation's pattern.
    pub orientation: Orientation,
    /// Number of formations currently active.
    pub active_formations: usize,
}

/// Movement scale applied when `active` formations share the field.
#[must_use]
pub fn crowd_scale(active: usize, factor: f32) -> f32 {
    let extra = active.saturating_sub(1) as f32;
    1.0 / (1.0 + factor.max(0.0) * extra)
}

/// Advances a formation's center and heading by `dt` seconds.
///
/// The center first relaxes toward the live centroid, then moves along the
/// line to the target by the clamped standoff error and sideways by a smaller
/// orbit term, both scaled by the crowding factor. Non-finite inputs leave
/// the affected part of the motion unchanged.
pub fn advance(motion: &mut FormationMotion, input: &MotionInput, dt: f32, tuning: &SteeringTuning) {
    if !dt.is_finite() || dt <= 0.0 {
        return;
    }

    if let Some(centroid) = input.live_centroid.filter(|point| point.is_finite()) {
        let blend = 1.0 - (-tuning.center_follow_rate * dt).exp();
        motion.center = motion.center.lerp(centroid, blend);
    }

    let scale = crowd_scale(input.active_formations, tuning.crowd_factor);
    let to_target = input.target - motion.center;
    let distance = to_target.length();
    if input.target.is_finite() && distance > f32::EPSILON {
        let direction = to_target / distance;
        let error = distance - tuning.standoff_distance;
        let max_step = tuning.max_pursuit_speed * dt;
        let pursuit = (error * tuning.pursuit_gain * dt).clamp(-max_step, max_step);
        let orbit = tuning.orbit_speed * dt;
        motion.center += (direction * pursuit + direction.perp() * orbit) * scale;
    }

    match input.orientation {
        Orientation::FacesTarget if input.target.is_finite() && distance > f32::EPSILON => {
            let desired = to_target.y.atan2(to_target.x);
            let blend = 1.0 - (-tuning.facing_turn_rate * dt).exp();
            let turned = motion.rotation + shortest_arc(motion.rotation, desired) * blend;
            motion.rotation = normalize_rotation(turned);
            motion.rotation_velocity = 0.0;
        }
        Orientation::FacesTarget => {}
        Orientation::FreeSpin => {
            motion.rotation = normalize_rotation(motion.rotation + motion.rotation_velocity * dt * scale);
            motion.rotation_velocity *= (-tuning.spin_decay * dt).exp();
        }
    }
}

/// Spring force pulling `position` toward `target`, clamped in magnitude.
#[must_use]
pub fn spring_force(position: Vec2, target: Vec2, tuning: &SteeringTuning) -> Vec2 {
    let offset = target - position;
    if !offset.is_finite() {
        return Vec2::ZERO;
    }
    (offset * tuning.spring_stiffness).clamp_length_max(tuning.max_spring_force)
}

/// Weak pull on a free agent toward a nearby formation center.
///
/// The force fades linearly to zero at the drift radius and is scaled by the
/// crowding factor. Agents outside the radius, or sitting on the center, get
/// no force.
#[must_use]
pub fn drift_force(
    position: Vec2,
    center: Vec2,
    active_formations: usize,
    tuning: &SteeringTuning,
) -> Option<Vec2> {
    let offset = center - position;
    let distance = offset.length();
    if !distance.is_finite() || distance <= f32::EPSILON || distance > tuning.drift_radius {
        return None;
    }

    let falloff = 1.0 - distance / tuning.drift_radius;
    let scale = crowd_scale(active_formations, tuning.crowd_factor);
    Some(offset / distance * tuning.drift_strength * falloff * scale)
}

/// Signed angle in `(-π, π]` turning `from` onto `to`.
#[must_use]
pub fn shortest_arc(from: f32, to: f32) -> f32 {
    let delta = (to - from).rem_euclid(TAU);
    if delta > PI {
        delta - TAU
    } else {
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::{crowd_scale, shortest_arc};
    use std::f32::consts::PI;

    #[test]
    fn crowding_shrinks_with_formation_count() {
        assert_eq!(crowd_scale(0, 0.15), 1.0);
        assert_eq!(crowd_scale(1, 0.15), 1.0);
        assert!((crowd_scale(5, 0.15) - 1.0 / 1.6).abs() < 1e-6);
    }

    #[test]
    fn shortest_arc_wraps_around() {
        assert!((shortest_arc(0.1, 2.0 * PI - 0.1) + 0.2).abs() < 1e-5);
        assert!((shortest_arc(2.0 * PI - 0.1, 0.1) - 0.2).abs() < 1e-5);
        assert!((shortest_arc(0.0, PI) - PI).abs() < 1e-5);
    }
}
