#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Debug overlay contracts for constellation hosts.
//!
//! The overlay is purely decorative: it reads the engine's cached target
//! positions and draws one outline per formation plus a pulsing marker at its
//! center. Hosts implement [`OverlaySurface`] on top of whatever immediate-mode
//! canvas they already have.

use std::{f32::consts::TAU, time::Duration};

use constellation_core::{ConstellationId, FormationPhase, PatternKind};
use constellation_engine::Engine;
use glam::Vec2;

/// RGBA color used when drawing the overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }

    /// Returns the same color with its alpha replaced.
    #[must_use]
    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            ..self
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Immediate-mode canvas the overlay draws onto.
pub trait OverlaySurface {
    /// Draws a polyline through `points`, closing it back to the first point when `closed`.
    fn draw_polyline(&mut self, points: &[Vec2], closed: bool, thickness: f32, color: Color);

    /// Draws a filled circle.
    fn draw_circle(&mut self, center: Vec2, radius: f32, color: Color);
}

/// Visual parameters of the overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayStyle {
    /// Width of the target outline.
    pub outline_thickness: f32,
    /// Alpha of the target outline.
    pub outline_alpha: f32,
    /// Resting radius of the center marker.
    pub marker_radius: f32,
    /// Fraction by which the marker radius swells at the peak of a pulse.
    pub pulse_amplitude: f32,
    /// Pulses per second.
    pub pulse_hz: f32,
    /// Radius of the small dot drawn on every anchor target.
    pub anchor_radius: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            outline_thickness: 1.5,
            outline_alpha: 0.45,
            marker_radius: 5.0,
            pulse_amplitude: 0.35,
            pulse_hz: 1.2,
            anchor_radius: 2.0,
        }
    }
}

/// Snapshot of a single formation ready to be drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct FormationOverlay {
    /// Formation the snapshot was taken from.
    pub id: ConstellationId,
    /// Pattern the formation is arranged in.
    pub pattern: PatternKind,
    /// Anchor targets in anchor order.
    pub outline: Vec<Vec2>,
    /// Smoothed formation center.
    pub center: Vec2,
    /// Pulsed radius of the center marker.
    pub marker_radius: f32,
    /// Base color of the formation, lightened while it is still settling.
    pub color: Color,
}

/// Overlay snapshot for every active formation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayScene {
    /// Formations in creation order.
    pub formations: Vec<FormationOverlay>,
}

impl OverlayScene {
    /// Captures the formations of `engine` at presentation time `time`.
    ///
    /// Formations whose targets have not been computed yet are skipped.
    #[must_use]
    pub fn capture(engine: &Engine, time: Duration, style: &OverlayStyle) -> Self {
        let marker_radius = pulsed_radius(style, time);
        let formations = engine
            .constellations()
            .iter()
            .filter(|constellation| !constellation.target_positions().is_empty())
            .map(|constellation| FormationOverlay {
                id: constellation.id(),
                pattern: constellation.pattern(),
                outline: constellation.target_positions().to_vec(),
                center: constellation.center(),
                marker_radius,
                color: phase_tint(pattern_color(constellation.pattern()), constellation.phase()),
            })
            .collect();
        Self { formations }
    }

    /// Draws the snapshot onto `surface`.
    pub fn draw(&self, surface: &mut dyn OverlaySurface, style: &OverlayStyle) {
        for formation in &self.formations {
            let outline_color = formation.color.with_alpha(style.outline_alpha);
            let closed = formation.outline.len() > 2;
            surface.draw_polyline(
                &formation.outline,
                closed,
                style.outline_thickness,
                outline_color,
            );
            for anchor in &formation.outline {
                surface.draw_circle(*anchor, style.anchor_radius, outline_color);
            }
            surface.draw_circle(formation.center, formation.marker_radius, formation.color);
        }
    }
}

/// Draws the debug overlay of `engine` with the default style.
pub fn render_overlay(engine: &Engine, surface: &mut dyn OverlaySurface, time: Duration) {
    render_overlay_with_style(engine, surface, time, &OverlayStyle::default());
}

/// Draws the debug overlay of `engine` with a custom style.
pub fn render_overlay_with_style(
    engine: &Engine,
    surface: &mut dyn OverlaySurface,
    time: Duration,
    style: &OverlayStyle,
) {
    OverlayScene::capture(engine, time, style).draw(surface, style);
}

/// Palette entry for a pattern.
#[must_use]
pub const fn pattern_color(pattern: PatternKind) -> Color {
    match pattern {
        PatternKind::Triangle => Color::from_rgb_u8(255, 196, 0),
        PatternKind::Line => Color::from_rgb_u8(120, 200, 255),
        PatternKind::VFormation => Color::from_rgb_u8(90, 160, 255),
        PatternKind::Diamond => Color::from_rgb_u8(200, 120, 255),
        PatternKind::Square => Color::from_rgb_u8(150, 150, 255),
        PatternKind::Pentagon => Color::from_rgb_u8(255, 140, 200),
        PatternKind::Orbit => Color::from_rgb_u8(80, 230, 200),
        PatternKind::Cross => Color::from_rgb_u8(255, 90, 90),
        PatternKind::Arrow => Color::from_rgb_u8(255, 120, 40),
        PatternKind::Circle => Color::from_rgb_u8(120, 255, 140),
        PatternKind::Hexagon => Color::from_rgb_u8(60, 210, 120),
        PatternKind::Star => Color::from_rgb_u8(255, 240, 120),
        PatternKind::Spiral => Color::from_rgb_u8(180, 255, 90),
        PatternKind::DoubleRing => Color::from_rgb_u8(100, 255, 220),
        PatternKind::Grid => Color::from_rgb_u8(190, 190, 190),
    }
}

fn phase_tint(color: Color, phase: FormationPhase) -> Color {
    match phase {
        FormationPhase::Forming => color.lighten(0.5),
        FormationPhase::Stabilizing => color.lighten(0.25),
        FormationPhase::Mature => color,
    }
}

fn pulsed_radius(style: &OverlayStyle, time: Duration) -> f32 {
    let phase = (time.as_secs_f32() * style.pulse_hz * TAU).sin();
    let swell = 0.5 * (phase + 1.0) * style.pulse_amplitude;
    style.marker_radius * (1.0 + swell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use constellation_core::{Agent, AgentId};

    #[derive(Default)]
    struct RecordingSurface {
        polylines: Vec<(usize, bool)>,
        circles: Vec<(Vec2, f32)>,
    }

    impl OverlaySurface for RecordingSurface {
        fn draw_polyline(&mut self, points: &[Vec2], closed: bool, _thickness: f32, _color: Color) {
            self.polylines.push((points.len(), closed));
        }

        fn draw_circle(&mut self, center: Vec2, radius: f32, _color: Color) {
            self.circles.push((center, radius));
        }
    }

    fn engine_with_pentagon() -> (Engine, Vec<Agent>) {
        let mut engine = Engine::with_defaults(3);
        let mut agents: Vec<Agent> = (0..5)
            .map(|index| {
                let angle = index as f32 / 5.0 * TAU;
                Agent::new(
                    AgentId::new(index + 1),
                    Vec2::new(100.0 + angle.cos() * 30.0, 100.0 + angle.sin() * 30.0),
                )
            })
            .collect();
        let members: Vec<AgentId> = agents.iter().map(|agent| agent.id).collect();
        let _ = engine
            .create(&mut agents, &members, PatternKind::Pentagon)
            .expect("pentagon forms");
        (engine, agents)
    }

    #[test]
    fn lighten_moves_channels_towards_white() {
        let color = Color::new(0.2, 0.4, 1.0, 0.5).lighten(0.5);

        assert!((color.red - 0.6).abs() < 1e-6);
        assert!((color.green - 0.7).abs() < 1e-6);
        assert_eq!(color.blue, 1.0);
        assert_eq!(color.alpha, 0.5);
    }

    #[test]
    fn marker_pulses_between_rest_and_peak() {
        let style = OverlayStyle::default();
        let rest = pulsed_radius(&style, Duration::from_secs_f32(0.75 / style.pulse_hz));
        let peak = pulsed_radius(&style, Duration::from_secs_f32(0.25 / style.pulse_hz));

        assert!((rest - style.marker_radius).abs() < 1e-3);
        assert!((peak - style.marker_radius * (1.0 + style.pulse_amplitude)).abs() < 1e-3);
    }

    #[test]
    fn overlay_draws_outline_anchors_and_center() {
        let (engine, _agents) = engine_with_pentagon();
        let mut surface = RecordingSurface::default();

        render_overlay(&engine, &mut surface, Duration::ZERO);

        assert_eq!(surface.polylines, vec![(5, true)]);
        assert_eq!(surface.circles.len(), 6);
        let center = engine.constellations()[0].center();
        assert_eq!(surface.circles.last().map(|(at, _)| *at), Some(center));
    }

    #[test]
    fn young_formations_are_drawn_lighter() {
        let (engine, _agents) = engine_with_pentagon();
        let scene = OverlayScene::capture(&engine, Duration::ZERO, &OverlayStyle::default());

        assert_eq!(scene.formations.len(), 1);
        let formation = &scene.formations[0];
        assert_eq!(formation.pattern, PatternKind::Pentagon);
        assert_eq!(
            formation.color,
            pattern_color(PatternKind::Pentagon).lighten(0.5)
        );
    }

    #[test]
    fn empty_engine_draws_nothing() {
        let engine = Engine::with_defaults(0);
        let mut surface = RecordingSurface::default();

        render_overlay(&engine, &mut surface, Duration::from_secs(3));

        assert!(surface.polylines.is_empty());
        assert!(surface.circles.is_empty());
    }
}
