//! Slot assignment within a fixed qubit group.
//!
//! Once the group is fixed, only the slot → qubit mapping is left to choose.
//! Small patterns try every permutation; larger ones run pairwise-swap
//! local search from the greedy placement.

use qplace_calibration::CouplingGraph;

use super::PatternShape;
use crate::candidate::neg_log_fidelity;
use crate::config::SearchConfig;

/// Minimum cost decrease accepted by local search.
const COST_EPSILON: f64 = 1e-12;

/// Edge fit of a mapping: matched pattern edges and their total cost.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Fit {
    matched: usize,
    cost: f64,
}

impl Fit {
    const EMPTY: Self = Self {
        matched: 0,
        cost: 0.0,
    };

    fn add(&mut self, error: Option<f64>) {
        if let Some(error) = error {
            self.matched += 1;
            self.cost += neg_log_fidelity(error);
        }
    }

    fn beats(&self, other: &Self) -> bool {
        self.matched > other.matched
            || (self.matched == other.matched && self.cost < other.cost - COST_EPSILON)
    }
}

fn fit(placement: &[usize], shape: &PatternShape, coupling: &CouplingGraph) -> Fit {
    let mut fit = Fit::EMPTY;
    for &(a, b) in &shape.edges {
        fit.add(coupling.pair_error_at(placement[a], placement[b]));
    }
    fit
}

/// Fit of the edges touching slot `i` or slot `j`.
fn local_fit(
    placement: &[usize],
    i: usize,
    j: usize,
    shape: &PatternShape,
    coupling: &CouplingGraph,
) -> Fit {
    let mut fit = Fit::EMPTY;
    for &k in &shape.neighbors[i] {
        fit.add(coupling.pair_error_at(placement[i], placement[k]));
    }
    for &k in shape.neighbors[j].iter().filter(|&&k| k != i) {
        fit.add(coupling.pair_error_at(placement[j], placement[k]));
    }
    fit
}

/// Improve the slot mapping of `placement` without changing its qubit set.
pub(super) fn optimise(
    placement: Vec<usize>,
    shape: &PatternShape,
    coupling: &CouplingGraph,
    config: &SearchConfig,
) -> Vec<usize> {
    if shape.symmetric || shape.edges.is_empty() {
        return placement;
    }
    if shape.size <= config.exact_assignment_limit {
        exhaustive(placement, shape, coupling)
    } else {
        local_search(placement, shape, coupling, config.local_search_passes)
    }
}

/// Best mapping over all permutations (Heap's algorithm). Ties keep the
/// earliest permutation visited, starting with the input.
fn exhaustive(mut perm: Vec<usize>, shape: &PatternShape, coupling: &CouplingGraph) -> Vec<usize> {
    let n = perm.len();
    let mut best = perm.clone();
    let mut best_fit = fit(&perm, shape, coupling);

    let mut counters = vec![0usize; n];
    let mut i = 1;
    while i < n {
        if counters[i] < i {
            if i % 2 == 0 {
                perm.swap(0, i);
            } else {
                perm.swap(counters[i], i);
            }
            let current = fit(&perm, shape, coupling);
            if current.beats(&best_fit) {
                best_fit = current;
                best.copy_from_slice(&perm);
            }
            counters[i] += 1;
            i = 1;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }

    best
}

fn local_search(
    mut placement: Vec<usize>,
    shape: &PatternShape,
    coupling: &CouplingGraph,
    passes: usize,
) -> Vec<usize> {
    let n = placement.len();
    for _ in 0..passes {
        let mut improved = false;
        for i in 0..n {
            for j in (i + 1)..n {
                if shape.neighbors[i].is_empty() && shape.neighbors[j].is_empty() {
                    continue;
                }
                let before = local_fit(&placement, i, j, shape, coupling);
                placement.swap(i, j);
                let after = local_fit(&placement, i, j, shape, coupling);
                if after.beats(&before) {
                    improved = true;
                } else {
                    placement.swap(i, j);
                }
            }
        }
        if !improved {
            break;
        }
    }
    placement
}

#[cfg(test)]
mod tests {
    use super::*;
    use qplace_calibration::SnapshotBuilder;
    use qplace_topology::TopologyPattern;

    fn config(exact_limit: usize) -> SearchConfig {
        SearchConfig {
            exact_assignment_limit: exact_limit,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_exhaustive_finds_path_order() {
        let snapshot = SnapshotBuilder::linear("line", 4).build().unwrap();
        let shape = PatternShape::new(&TopologyPattern::Path(4));
        // 1 - 0 - 3 - 2 only realises one chain edge.
        let placement = optimise(vec![1, 0, 3, 2], &shape, snapshot.coupling(), &config(7));
        assert_eq!(fit(&placement, &shape, snapshot.coupling()).matched, 3);
    }

    #[test]
    fn test_exhaustive_prefers_lower_cost() {
        // Ring 0-1-2-3-0 where 2-3 is noisy: the path should avoid it.
        let snapshot = SnapshotBuilder::linear("ring", 4)
            .coupling(3, 0)
            .edge_error(2, 3, 0.2)
            .build()
            .unwrap();
        let shape = PatternShape::new(&TopologyPattern::Path(4));
        let placement = optimise(vec![0, 1, 2, 3], &shape, snapshot.coupling(), &config(7));
        let result = fit(&placement, &shape, snapshot.coupling());
        assert_eq!(result.matched, 3);
        assert!(result.cost < 3.0 * neg_log_fidelity(0.02));
    }

    #[test]
    fn test_local_search_improves() {
        let snapshot = SnapshotBuilder::linear("line", 10).build().unwrap();
        let shape = PatternShape::new(&TopologyPattern::Path(10));
        let scrambled = vec![0, 2, 1, 3, 4, 5, 6, 7, 9, 8];
        let before = fit(&scrambled, &shape, snapshot.coupling());
        let placement = optimise(scrambled, &shape, snapshot.coupling(), &config(3));
        let after = fit(&placement, &shape, snapshot.coupling());
        assert!(after.matched > before.matched);

        let mut set = placement.clone();
        set.sort_unstable();
        assert_eq!(set, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_symmetric_pattern_untouched() {
        let snapshot = SnapshotBuilder::linear("line", 3).build().unwrap();
        let shape = PatternShape::new(&TopologyPattern::Complete(3));
        assert_eq!(
            optimise(vec![2, 0, 1], &shape, snapshot.coupling(), &config(7)),
            vec![2, 0, 1]
        );
    }
}
