//! Local-space generators for the reference patterns.
//!
//! Generators place the pattern heading along +x and return offsets centered on
//! the origin. They are total in `count`, so a generator never panics for sizes
//! outside its registered range.

use std::f32::consts::{PI, TAU};

use glam::Vec2;

use crate::BASE_SPACING as S;

pub(crate) fn triangle(count: usize) -> Vec<Vec2> {
    ring(count, ring_radius(count, S * 1.2, S * 0.5), 0.0)
}

pub(crate) fn line(count: usize) -> Vec<Vec2> {
    let middle = (count as f32 - 1.0) * 0.5;
    (0..count)
        .map(|index| Vec2::new(0.0, (index as f32 - middle) * S))
        .collect()
}

pub(crate) fn v_formation(count: usize) -> Vec<Vec2> {
    let mut points = Vec::with_capacity(count);
    points.push(Vec2::ZERO);
    for index in 1..count {
        let rank = ((index + 1) / 2) as f32;
        let side = if index % 2 == 1 { 1.0 } else { -1.0 };
        points.push(Vec2::new(-rank * S * 0.8, side * rank * S * 0.8));
    }
    recenter(points)
}

pub(crate) fn diamond(count: usize) -> Vec<Vec2> {
    if count != 4 {
        return ring(count, ring_radius(count, S, S), 0.0);
    }
    vec![
        Vec2::new(S * 1.2, 0.0),
        Vec2::new(0.0, S * 0.8),
        Vec2::new(-S * 1.2, 0.0),
        Vec2::new(0.0, -S * 0.8),
    ]
}

pub(crate) fn square(count: usize) -> Vec<Vec2> {
    lattice(count, S, false)
}

pub(crate) fn pentagon(count: usize) -> Vec<Vec2> {
    ring(count, ring_radius(count, S * 1.1, S * 0.5), 0.0)
}

/// Anchor 0 is the protected center; the rest orbit it.
pub(crate) fn orbit(count: usize) -> Vec<Vec2> {
    let mut points = Vec::with_capacity(count);
    points.push(Vec2::ZERO);
    let orbiters = count.saturating_sub(1);
    points.extend(ring(orbiters, ring_radius(orbiters, S, S * 1.3), 0.0));
    points
}

pub(crate) fn cross(count: usize) -> Vec<Vec2> {
    const ARMS: [Vec2; 4] = [Vec2::X, Vec2::Y, Vec2::NEG_X, Vec2::NEG_Y];

    let mut points = Vec::with_capacity(count);
    points.push(Vec2::ZERO);
    for index in 1..count {
        let arm = ARMS[(index - 1) % ARMS.len()];
        let reach = ((index - 1) / ARMS.len() + 1) as f32;
        points.push(arm * reach * S);
    }
    points
}

pub(crate) fn arrow(count: usize) -> Vec<Vec2> {
    let head = [
        Vec2::new(S, 0.0),
        Vec2::new(0.0, S * 0.8),
        Vec2::new(0.0, -S * 0.8),
        Vec2::new(-S, S * 1.6),
        Vec2::new(-S, -S * 1.6),
    ];

    let mut points: Vec<Vec2> = head.iter().copied().take(count).collect();
    for shaft in 1..count.saturating_sub(4) {
        points.push(Vec2::new(-S * shaft as f32, 0.0));
    }
    recenter(points)
}

pub(crate) fn circle(count: usize) -> Vec<Vec2> {
    ring(count, ring_radius(count, S * 1.1, S * 1.6), 0.0)
}

/// Six ring points, with any seventh member holding the center.
pub(crate) fn hexagon(count: usize) -> Vec<Vec2> {
    if count <= 6 {
        return ring(count, ring_radius(count, S * 1.2, S * 1.2), 0.0);
    }
    let rim = count - 1;
    let mut points = ring(rim, ring_radius(rim, S * 1.2, S * 1.2), 0.0);
    points.push(Vec2::ZERO);
    points
}

pub(crate) fn star(count: usize) -> Vec<Vec2> {
    (0..count)
        .map(|index| {
            let radius = if index % 2 == 0 { S * 2.0 } else { S };
            Vec2::from_angle(TAU * index as f32 / count as f32) * radius
        })
        .collect()
}

pub(crate) fn spiral(count: usize) -> Vec<Vec2> {
    let start = S * 0.45;
    let growth = S / TAU;
    let mut theta = 0.0_f32;
    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        let radius = start + growth * theta;
        points.push(Vec2::from_angle(theta) * radius);
        theta += S / radius.max(S * 0.5);
    }
    recenter(points)
}

pub(crate) fn double_ring(count: usize) -> Vec<Vec2> {
    let inner = (count * 2 / 5).max(3).min(count);
    let outer = count - inner;
    let inner_radius = ring_radius(inner, S, S);
    let outer_radius = (inner_radius + S * 1.1).max(ring_radius(outer, S, 0.0));
    let phase = if outer > 0 { PI / outer as f32 } else { 0.0 };

    let mut points = ring(inner, inner_radius, 0.0);
    points.extend(ring(outer, outer_radius, phase));
    points
}

pub(crate) fn grid(count: usize) -> Vec<Vec2> {
    lattice(count, S * 0.9, true)
}

fn ring(count: usize, radius: f32, phase: f32) -> Vec<Vec2> {
    (0..count)
        .map(|index| Vec2::from_angle(phase + TAU * index as f32 / count as f32) * radius)
        .collect()
}

/// Radius of a regular polygon with the given side, never below `min_radius`.
fn ring_radius(count: usize, side: f32, min_radius: f32) -> f32 {
    if count < 2 {
        return 0.0;
    }
    let chord = 2.0 * (PI / count as f32).sin();
    (side / chord).max(min_radius)
}

fn lattice(count: usize, spacing: f32, staggered: bool) -> Vec<Vec2> {
    let columns = (count as f32).sqrt().ceil().max(1.0) as usize;
    let points = (0..count)
        .map(|index| {
            let row = index / columns;
            let column = index % columns;
            let offset = if staggered && row % 2 == 1 {
                spacing * 0.5
            } else {
                0.0
            };
            Vec2::new(column as f32 * spacing + offset, row as f32 * spacing)
        })
        .collect();
    recenter(points)
}

fn recenter(mut points: Vec<Vec2>) -> Vec<Vec2> {
    if points.is_empty() {
        return points;
    }
    let mean = points.iter().fold(Vec2::ZERO, |acc, point| acc + *point) / points.len() as f32;
    for point in &mut points {
        *point -= mean;
    }
    points
}

#[cfg(test)]
mod tests {
    use super::{arrow, lattice, ring_radius};

    #[test]
    fn ring_radius_matches_polygon_side() {
        let radius = ring_radius(6, 10.0, 0.0);
        assert!((radius - 10.0).abs() < 1e-4);
        assert_eq!(ring_radius(1, 10.0, 5.0), 0.0);
    }

    #[test]
    fn lattice_is_centered() {
        let points = lattice(9, 10.0, false);
        let sum = points.iter().fold(glam::Vec2::ZERO, |acc, point| acc + *point);
        assert!(sum.length() < 1e-3);
    }

    #[test]
    fn short_arrow_keeps_requested_size() {
        assert_eq!(arrow(2).len(), 2);
        assert_eq!(arrow(7).len(), 7);
    }
}
