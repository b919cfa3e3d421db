//! Pattern validation over generated adjacency lists.

use proptest::prelude::*;
use qplace_topology::{ExplicitPattern, TopologyCatalog, TopologyPattern};

/// A random spanning tree over `n` slots plus some extra chords.
fn connected_edges() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2_usize..12).prop_flat_map(|n| {
        let parents: Vec<_> = (1..n).map(|i| 0..i).collect();
        let chords = prop::collection::vec((0..n, 0..n), 0..n);
        (Just(n), parents, chords)
            .prop_map(|(n, parents, chords)| {
                let mut edges: Vec<_> = parents
                    .into_iter()
                    .enumerate()
                    .map(|(i, p)| (i + 1, p))
                    .collect();
                for (a, b) in chords {
                    let pair = (a.min(b), a.max(b));
                    if a != b && !edges.iter().any(|&(x, y)| (x.min(y), x.max(y)) == pair) {
                        edges.push((b, a));
                    }
                }
                (n, edges)
            })
    })
}

proptest! {
    #[test]
    fn prop_connected_patterns_validate((n, edges) in connected_edges()) {
        let pattern = ExplicitPattern::new(n, edges.iter().copied()).unwrap();
        prop_assert_eq!(pattern.edges().len(), edges.len());
        prop_assert!(pattern.edges().windows(2).all(|w| w[0] < w[1]));
        prop_assert!(pattern.edges().iter().all(|&(a, b)| a < b && b < n));
    }

    #[test]
    fn prop_dropping_a_slot_link_disconnects(n in 3_usize..12) {
        // A path with its middle edge removed splits in two.
        let mid = n / 2;
        let edges = (1..n).filter(|&i| i != mid).map(|i| (i - 1, i));
        prop_assert!(ExplicitPattern::new(n, edges).is_err());
    }

    #[test]
    fn prop_named_patterns_have_expected_edge_counts(n in 1_usize..30) {
        let catalog = TopologyCatalog::new();
        prop_assert_eq!(catalog.resolve("vqe", n, None).unwrap().edges().len(), n * (n - 1) / 2);
        prop_assert_eq!(catalog.resolve("repetition", n, None).unwrap().edges().len(), n - 1);
        prop_assert_eq!(catalog.resolve("ghz", n, None).unwrap().edges().len(), n - 1);
    }
}

#[test]
fn test_pattern_serialises_with_family_tag() {
    let json = serde_json::to_value(TopologyPattern::Path(4)).unwrap();
    assert_eq!(json, serde_json::json!({ "path": 4 }));

    let explicit = TopologyPattern::Explicit(ExplicitPattern::new(2, [(1, 0)]).unwrap());
    let json = serde_json::to_value(explicit).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "explicit": { "size": 2, "edges": [[0, 1]] } })
    );
}
