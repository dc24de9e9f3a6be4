use std::collections::HashMap;

use constellation_core::PatternKind;
use constellation_system_patterns::PatternRegistry;
use constellation_system_selection::{PatternDistribution, PatternSelector};

#[test]
fn exact_selection_covers_three_through_fifteen() {
    let registry = PatternRegistry::with_defaults();
    let mut selector = PatternSelector::new(0x5eed);
    let empty = PatternDistribution::new();

    for count in 3..=15 {
        let kind = selector
            .select_pattern(&registry, count, false, &empty)
            .unwrap_or_else(|| panic!("no pattern selected for {count}"));
        let pattern = registry.get(kind).expect("selected pattern is registered");
        assert!(pattern.accepts(count), "{kind} does not accept {count}");
    }
}

#[test]
fn sampling_five_is_diverse() {
    let registry = PatternRegistry::with_defaults();
    let mut selector = PatternSelector::new(0x1234_5678);
    let empty = PatternDistribution::new();
    let mut tallies: HashMap<PatternKind, usize> = HashMap::new();

    for _ in 0..1_000 {
        let kind = selector
            .select_pattern(&registry, 5, false, &empty)
            .expect("five members always fit");
        *tallies.entry(kind).or_insert(0) += 1;
    }

    assert!(tallies.len() >= 2, "selection collapsed to {tallies:?}");
    let busiest = tallies.values().copied().max().unwrap_or(0);
    assert!(busiest <= 800, "one pattern took {busiest} of 1000 draws");
}

#[test]
fn counts_outside_every_range_need_subset_mode() {
    let registry = PatternRegistry::with_defaults();
    let mut selector = PatternSelector::new(3);
    let empty = PatternDistribution::new();

    assert_eq!(selector.select_pattern(&registry, 2, false, &empty), None);
    assert_eq!(selector.select_pattern(&registry, 2, true, &empty), None);
    assert_eq!(selector.select_pattern(&registry, 40, false, &empty), None);

    for _ in 0..50 {
        let kind = selector
            .select_pattern(&registry, 40, true, &empty)
            .expect("subset mode finds a smaller pattern");
        let pattern = registry.get(kind).expect("registered");
        assert!(pattern.max_members() <= 40);
    }
}

#[test]
fn subset_mode_favours_small_patterns_when_large_shapes_dominate() {
    let registry = PatternRegistry::with_defaults();
    let large_heavy = PatternDistribution::from_kinds([
        PatternKind::Grid,
        PatternKind::Spiral,
        PatternKind::DoubleRing,
    ]);
    let empty = PatternDistribution::new();

    let small_picks = |distribution: &PatternDistribution| {
        let mut selector = PatternSelector::new(99);
        (0..2_000)
            .filter_map(|_| selector.select_pattern(&registry, 30, true, distribution))
            .filter(|kind| registry.get(*kind).map_or(false, |p| p.max_members() <= 5))
            .count()
    };

    assert!(small_picks(&large_heavy) > small_picks(&empty));
}

#[test]
fn variety_discourages_recent_patterns() {
    let registry = PatternRegistry::with_defaults();
    let empty = PatternDistribution::new();
    let recent = [PatternKind::Circle; 6];

    let mut plain = PatternSelector::new(11);
    let mut varied = PatternSelector::new(11);
    let mut plain_circles = 0;
    let mut varied_circles = 0;
    for _ in 0..2_000 {
        if plain.select_pattern(&registry, 7, false, &empty) == Some(PatternKind::Circle) {
            plain_circles += 1;
        }
        if varied.select_pattern_with_variety(&registry, 7, &recent, &empty)
            == Some(PatternKind::Circle)
        {
            varied_circles += 1;
        }
    }

    assert!(
        varied_circles * 3 < plain_circles,
        "recent use should suppress CIRCLE ({varied_circles} vs {plain_circles})"
    );
}

#[test]
fn variety_only_returns_fitting_patterns_under_heavy_penalties() {
    let registry = PatternRegistry::with_defaults();
    let mut selector = PatternSelector::new(5);
    let crowded = PatternDistribution::from_kinds([PatternKind::Triangle; 10]);
    let recent = [PatternKind::Triangle; 8];

    for _ in 0..200 {
        let kind = selector
            .select_pattern_with_variety(&registry, 3, &recent, &crowded)
            .expect("penalties never remove a fitting pattern");
        assert!(registry.get(kind).map_or(false, |pattern| pattern.accepts(3)));
    }
}

#[test]
fn identical_seeds_replay_identically() {
    let registry = PatternRegistry::with_defaults();
    let empty = PatternDistribution::new();
    let mut first = PatternSelector::new(0xabc);
    let mut second = PatternSelector::new(0xabc);

    for count in (3..=15).cycle().take(60) {
        assert_eq!(
            first.select_pattern(&registry, count, false, &empty),
            second.select_pattern(&registry, count, false, &empty)
        );
    }
}
