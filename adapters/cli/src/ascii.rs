//! Character-grid overlay surface for terminal snapshots.

use constellation_core::Agent;
use constellation_rendering::{Color, OverlaySurface};
use glam::Vec2;

/// Rasterizes the overlay into a fixed grid of characters.
#[derive(Clone, Debug)]
pub(crate) struct AsciiSurface {
    columns: usize,
    rows: usize,
    scale: f32,
    cells: Vec<char>,
}

impl AsciiSurface {
    /// Creates a blank grid covering a square arena of side `arena`.
    pub(crate) fn new(columns: usize, arena: f32) -> Self {
        let columns = columns.max(8);
        let rows = (columns / 2).max(4);
        Self {
            columns,
            rows,
            scale: columns as f32 / arena.max(1.0),
            cells: vec![' '; columns * rows],
        }
    }

    /// Marks live agents that are not part of a formation.
    pub(crate) fn plot_free_agents(&mut self, agents: &[Agent]) {
        for agent in agents.iter().filter(|agent| agent.alive && agent.formation.is_none()) {
            self.plot(agent.position, '.');
        }
    }

    /// Renders the grid as newline-separated rows.
    pub(crate) fn into_string(self) -> String {
        self.cells
            .chunks(self.columns)
            .map(|row| row.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn plot(&mut self, point: Vec2, glyph: char) {
        if !point.is_finite() {
            return;
        }
        let column = (point.x * self.scale).floor();
        let row = (point.y * self.scale * 0.5).floor();
        if column < 0.0 || row < 0.0 {
            return;
        }
        let (column, row) = (column as usize, row as usize);
        if column < self.columns && row < self.rows {
            self.cells[row * self.columns + column] = glyph;
        }
    }
}

impl OverlaySurface for AsciiSurface {
    fn draw_polyline(&mut self, points: &[Vec2], closed: bool, _thickness: f32, _color: Color) {
        let segments = points.windows(2).map(|pair| (pair[0], pair[1]));
        let closing = if closed {
            points.first().zip(points.last()).map(|(first, last)| (*last, *first))
        } else {
            None
        };
        for (from, to) in segments.chain(closing) {
            let steps = ((to - from).length() * self.scale).ceil().max(1.0) as usize;
            for step in 0..=steps {
                self.plot(from.lerp(to, step as f32 / steps as f32), '-');
            }
        }
    }

    fn draw_circle(&mut self, center: Vec2, radius: f32, _color: Color) {
        let glyph = if radius * self.scale >= 0.5 { '@' } else { 'o' };
        self.plot(center, glyph);
    }
}

#[cfg(test)]
mod tests {
    use super::AsciiSurface;
    use constellation_core::{Agent, AgentId};
    use constellation_rendering::{Color, OverlaySurface};
    use glam::Vec2;

    #[test]
    fn polyline_and_markers_land_on_the_grid() {
        let mut surface = AsciiSurface::new(20, 100.0);
        surface.draw_polyline(
            &[Vec2::new(0.0, 0.0), Vec2::new(95.0, 0.0)],
            false,
            1.0,
            Color::new(1.0, 1.0, 1.0, 1.0),
        );
        surface.draw_circle(Vec2::new(50.0, 50.0), 1.0, Color::new(1.0, 1.0, 1.0, 1.0));
        surface.draw_circle(Vec2::new(-10.0, 500.0), 1.0, Color::new(1.0, 1.0, 1.0, 1.0));

        let rendered = surface.into_string();
        let rows: Vec<&str> = rendered.lines().collect();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0], "-".repeat(20));
        assert_eq!(rows[5].chars().nth(10), Some('o'));
    }

    #[test]
    fn only_free_live_agents_are_plotted() {
        let mut dead = Agent::new(AgentId::new(2), Vec2::new(60.0, 20.0));
        dead.alive = false;
        let agents = [Agent::new(AgentId::new(1), Vec2::new(10.0, 20.0)), dead];
        let mut surface = AsciiSurface::new(10, 100.0);
        surface.plot_free_agents(&agents);

        let rendered = surface.into_string();
        assert_eq!(rendered.matches('.').count(), 1);
    }
}
