#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spatial-hash clustering of free agents.
//!
//! Candidates are bucketed into a uniform grid whose cell length equals the
//! detection radius, so every neighbour within the radius lives in the 3×3 block
//! of cells around an agent. A breadth-first flood through those blocks yields
//! connected components in amortised O(N). Components that are too small or too
//! elongated are discarded before they ever reach the lifecycle manager.

use std::collections::{HashMap, VecDeque};

use constellation_core::AgentId;
use glam::Vec2;

/// Tuning for the cluster detector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterConfig {
    /// Two agents closer than this are considered adjacent. Also the grid cell length.
    pub detection_radius: f32,
    /// Smallest component that is reported as a cluster.
    pub min_cluster_size: usize,
    /// Largest accepted distance between the centroid and any member.
    pub max_bounding_radius: f32,
}

impl ClusterConfig {
    /// Derives the bounding radius limit as 80% of the maximum constellation radius.
    #[must_use]
    pub fn for_constellation_radius(detection_radius: f32, max_constellation_radius: f32) -> Self {
        Self {
            detection_radius,
            min_cluster_size: 3,
            max_bounding_radius: max_constellation_radius * 0.8,
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self::for_constellation_radius(150.0, 220.0)
    }
}

/// Agent offered to the detector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Identity of the agent.
    pub id: AgentId,
    /// Position of the agent in world units.
    pub position: Vec2,
}

impl Candidate {
    /// Creates a new candidate.
    #[must_use]
    pub const fn new(id: AgentId, position: Vec2) -> Self {
        Self { id, position }
    }
}

/// Spatially coherent group of free agents.
#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    /// Members in discovery order.
    pub members: Vec<AgentId>,
    /// Mean position of the members.
    pub centroid: Vec2,
    /// Largest distance between the centroid and a member.
    pub bounding_radius: f32,
}

impl Cluster {
    /// Number of agents in the cluster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Reports whether the cluster holds no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

type CellKey = (i32, i32);

/// Cluster detector that reuses its grid and traversal buffers between passes.
#[derive(Debug, Default)]
pub struct ClusterDetector {
    candidates: Vec<Candidate>,
    cells: HashMap<CellKey, Vec<usize>>,
    visited: Vec<bool>,
    frontier: VecDeque<usize>,
    component: Vec<usize>,
}

impl ClusterDetector {
    /// Creates a detector with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Partitions the candidates into clusters.
    ///
    /// The output buffer is cleared before it is populated. Candidates with
    /// non-finite positions and repeated identifiers are skipped. Candidates are
    /// visited in ascending identifier order so identical input always produces
    /// identical clusters.
    pub fn detect<I>(&mut self, config: &ClusterConfig, candidates: I, out: &mut Vec<Cluster>)
    where
        I: IntoIterator<Item = Candidate>,
    {
        out.clear();

        let radius = config.detection_radius;
        if !radius.is_finite() || radius <= 0.0 {
            log::warn!("cluster detection skipped: invalid detection radius {radius}");
            return;
        }

        self.prepare_workspace(candidates, radius);
        if self.candidates.len() < config.min_cluster_size.max(1) {
            return;
        }

        let radius_sq = radius * radius;
        for seed in 0..self.candidates.len() {
            if self.visited[seed] {
                continue;
            }
            self.flood_from(seed, radius, radius_sq);

            if self.component.len() < config.min_cluster_size {
                continue;
            }

            if let Some(cluster) = self.summarise_component() {
                if cluster.bounding_radius <= config.max_bounding_radius {
                    out.push(cluster);
                } else {
                    log::trace!(
                        "rejected elongated cluster of {} (radius {:.1})",
                        cluster.len(),
                        cluster.bounding_radius
                    );
                }
            }
        }
    }

    fn prepare_workspace<I>(&mut self, candidates: I, cell_length: f32)
    where
        I: IntoIterator<Item = Candidate>,
    {
        self.candidates.clear();
        self.candidates.extend(
            candidates
                .into_iter()
                .filter(|candidate| candidate.position.is_finite()),
        );
        self.candidates.sort_by_key(|candidate| candidate.id);
        self.candidates.dedup_by_key(|candidate| candidate.id);

        // Only cells occupied last pass keep their allocation.
        self.cells.retain(|_, bucket| {
            let occupied = !bucket.is_empty();
            bucket.clear();
            occupied
        });
        for (index, candidate) in self.candidates.iter().enumerate() {
            self.cells
                .entry(cell_key(candidate.position, cell_length))
                .or_default()
                .push(index);
        }

        self.visited.clear();
        self.visited.resize(self.candidates.len(), false);
        self.frontier.clear();
        self.component.clear();
    }

    fn flood_from(&mut self, seed: usize, cell_length: f32, radius_sq: f32) {
        self.component.clear();
        self.frontier.clear();
        self.visited[seed] = true;
        self.frontier.push_back(seed);

        while let Some(current) = self.frontier.pop_front() {
            self.component.push(current);
            let position = self.candidates[current].position;
            let (column, row) = cell_key(position, cell_length);

            for d_row in -1..=1 {
                for d_column in -1..=1 {
                    let key = (column.saturating_add(d_column), row.saturating_add(d_row));
                    let Some(bucket) = self.cells.get(&key) else {
                        continue;
                    };
                    for &neighbour in bucket {
                        if self.visited[neighbour] {
                            continue;
                        }
                        let other = self.candidates[neighbour].position;
                        if position.distance_squared(other) <= radius_sq {
                            self.visited[neighbour] = true;
                            self.frontier.push_back(neighbour);
                        }
                    }
                }
            }
        }
    }

    fn summarise_component(&self) -> Option<Cluster> {
        let positions = self
            .component
            .iter()
            .map(|&index| self.candidates[index].position);
        let centroid = constellation_core::centroid(positions)?;
        let bounding_radius = self
            .component
            .iter()
            .map(|&index| self.candidates[index].position.distance(centroid))
            .fold(0.0_f32, f32::max);

        Some(Cluster {
            members: self
                .component
                .iter()
                .map(|&index| self.candidates[index].id)
                .collect(),
            centroid,
            bounding_radius,
        })
    }
}

fn cell_key(position: Vec2, cell_length: f32) -> CellKey {
    (
        (position.x / cell_length).floor() as i32,
        (position.y / cell_length).floor() as i32,
    )
}
