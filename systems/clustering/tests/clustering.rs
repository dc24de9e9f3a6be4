use constellation_core::AgentId;
use constellation_system_clustering::{Candidate, Cluster, ClusterConfig, ClusterDetector};
use glam::Vec2;

fn candidate(id: u32, x: f32, y: f32) -> Candidate {
    Candidate::new(AgentId::new(id), Vec2::new(x, y))
}

fn detect(config: &ClusterConfig, candidates: Vec<Candidate>) -> Vec<Cluster> {
    let mut detector = ClusterDetector::new();
    let mut out = Vec::new();
    detector.detect(config, candidates, &mut out);
    out
}

fn sorted_members(cluster: &Cluster) -> Vec<u32> {
    let mut ids: Vec<u32> = cluster.members.iter().map(AgentId::get).collect();
    ids.sort_unstable();
    ids
}

#[test]
fn five_adjacent_agents_form_one_cluster() {
    let config = ClusterConfig::for_constellation_radius(150.0, 220.0);
    let clusters = detect(
        &config,
        vec![
            candidate(1, 200.0, 200.0),
            candidate(2, 230.0, 200.0),
            candidate(3, 170.0, 200.0),
            candidate(4, 200.0, 230.0),
            candidate(5, 200.0, 170.0),
        ],
    );

    assert_eq!(clusters.len(), 1);
    assert_eq!(sorted_members(&clusters[0]), vec![1, 2, 3, 4, 5]);
    assert!(clusters[0].centroid.distance(Vec2::new(200.0, 200.0)) < 1e-3);
}

#[test]
fn pairs_are_too_small_to_cluster() {
    let config = ClusterConfig::default();
    let clusters = detect(
        &config,
        vec![candidate(1, 0.0, 0.0), candidate(2, 20.0, 0.0)],
    );
    assert!(clusters.is_empty());
}

#[test]
fn separated_groups_become_separate_clusters() {
    let config = ClusterConfig::default();
    let mut candidates = Vec::new();
    for index in 0..3 {
        candidates.push(candidate(index, index as f32 * 30.0, 0.0));
        candidates.push(candidate(100 + index, 2_000.0 + index as f32 * 30.0, 500.0));
    }

    let clusters = detect(&config, candidates);
    assert_eq!(clusters.len(), 2);
    assert_eq!(sorted_members(&clusters[0]), vec![0, 1, 2]);
    assert_eq!(sorted_members(&clusters[1]), vec![100, 101, 102]);
}

#[test]
fn elongated_chains_are_rejected() {
    let config = ClusterConfig::for_constellation_radius(150.0, 220.0);
    let chain = (0..10)
        .map(|index| candidate(index, index as f32 * 120.0, 0.0))
        .collect();

    assert!(detect(&config, chain).is_empty());
}

#[test]
fn neighbours_across_cell_boundaries_are_joined() {
    let config = ClusterConfig::for_constellation_radius(100.0, 220.0);
    let clusters = detect(
        &config,
        vec![
            candidate(1, 99.0, 99.0),
            candidate(2, 101.0, 101.0),
            candidate(3, 99.0, 150.0),
        ],
    );
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].len(), 3);
}

#[test]
fn malformed_and_duplicate_candidates_are_skipped() {
    let config = ClusterConfig::default();
    let clusters = detect(
        &config,
        vec![
            candidate(1, 0.0, 0.0),
            candidate(1, 0.0, 0.0),
            candidate(2, f32::NAN, 0.0),
            candidate(3, 10.0, 0.0),
        ],
    );
    assert!(clusters.is_empty(), "only two valid candidates remain");
}

#[test]
fn detector_reuses_buffers_between_passes() {
    let config = ClusterConfig::default();
    let mut detector = ClusterDetector::new();
    let mut out = Vec::new();

    let first = vec![
        candidate(1, 0.0, 0.0),
        candidate(2, 30.0, 0.0),
        candidate(3, 0.0, 30.0),
    ];
    detector.detect(&config, first, &mut out);
    assert_eq!(out.len(), 1);

    detector.detect(&config, vec![candidate(9, 500.0, 500.0)], &mut out);
    assert!(out.is_empty(), "stale clusters must be cleared");
}
