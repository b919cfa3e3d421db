//! Required-connectivity patterns.
//!
//! A [`TopologyPattern`] describes which pairs of logical slots a circuit
//! needs to interact directly. Named circuit types map onto the regular
//! families; anything else is an [`ExplicitPattern`].

use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::fmt;

use crate::error::{TopologyError, TopologyResult};

/// Caller-supplied adjacency over `size` labelled slots.
///
/// Edges are stored normalised (`a < b`) and sorted. Construction rejects
/// out-of-range labels, self-loops, duplicate edges (in either
/// orientation) and disconnected graphs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExplicitPattern {
    size: usize,
    edges: Vec<(usize, usize)>,
}

impl ExplicitPattern {
    /// Validate an adjacency list over `size` slots.
    pub fn new(
        size: usize,
        edges: impl IntoIterator<Item = (usize, usize)>,
    ) -> TopologyResult<Self> {
        if size == 0 {
            return Err(TopologyError::InvalidPattern(
                "pattern must have at least one slot".into(),
            ));
        }

        let mut seen = FxHashSet::default();
        let mut normalised = Vec::new();
        for (a, b) in edges {
            if a >= size || b >= size {
                return Err(TopologyError::InvalidPattern(format!(
                    "edge ({a}, {b}) references a slot outside 0..{size}"
                )));
            }
            if a == b {
                return Err(TopologyError::InvalidPattern(format!(
                    "self-loop on slot {a}"
                )));
            }
            let pair = (a.min(b), a.max(b));
            if !seen.insert(pair) {
                return Err(TopologyError::InvalidPattern(format!(
                    "duplicate edge ({a}, {b})"
                )));
            }
            normalised.push(pair);
        }
        normalised.sort_unstable();

        // A connected graph on `size` nodes has at least `size - 1` edges.
        if normalised.len() < size - 1 {
            return Err(TopologyError::InvalidPattern(format!(
                "pattern over {size} slots is disconnected ({} edges cannot connect them)",
                normalised.len()
            )));
        }

        let mut graph = UnGraph::<(), ()>::with_capacity(size, normalised.len());
        for _ in 0..size {
            graph.add_node(());
        }
        for &(a, b) in &normalised {
            graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), ());
        }
        let components = connected_components(&graph);
        if components != 1 {
            return Err(TopologyError::InvalidPattern(format!(
                "pattern over {size} slots is disconnected ({components} components)"
            )));
        }

        Ok(Self {
            size,
            edges: normalised,
        })
    }

    /// Number of slots.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Required edges, normalised and sorted.
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }
}

/// Abstract connectivity requirement over `size()` logical slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyPattern {
    /// Every pair of slots interacts (K_n).
    Complete(usize),
    /// Nearest-neighbour chain `0 - 1 - ... - (n-1)`.
    Path(usize),
    /// Slot 0 interacts with every other slot.
    Star(usize),
    /// Arbitrary connected adjacency.
    Explicit(ExplicitPattern),
}

impl TopologyPattern {
    /// Number of logical slots.
    pub fn size(&self) -> usize {
        match self {
            Self::Complete(n) | Self::Path(n) | Self::Star(n) => *n,
            Self::Explicit(p) => p.size(),
        }
    }

    /// Number of required edges.
    pub fn num_edges(&self) -> usize {
        match self {
            Self::Complete(n) => n * n.saturating_sub(1) / 2,
            Self::Path(n) | Self::Star(n) => n.saturating_sub(1),
            Self::Explicit(p) => p.edges().len(),
        }
    }

    /// Required edges as `(a, b)` with `a < b`, sorted.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        match self {
            Self::Complete(n) => (0..*n)
                .flat_map(|i| ((i + 1)..*n).map(move |j| (i, j)))
                .collect(),
            Self::Path(n) => (1..*n).map(|i| (i - 1, i)).collect(),
            Self::Star(n) => (1..*n).map(|i| (0, i)).collect(),
            Self::Explicit(p) => p.edges().to_vec(),
        }
    }

    /// Adjacency lists indexed by slot, each sorted.
    pub fn neighbors(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.size()];
        for (a, b) in self.edges() {
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
        for list in &mut adjacency {
            list.sort_unstable();
        }
        adjacency
    }

    /// Check if every permutation of slots yields the same requirement.
    ///
    /// For such patterns the slot assignment cannot change which edges are
    /// matched, so it needs no optimisation.
    pub fn is_slot_symmetric(&self) -> bool {
        match self {
            Self::Complete(_) => true,
            // Two slots with one edge (or fewer) are symmetric in every family.
            other => other.size() <= 2 && other.num_edges() == other.size().saturating_sub(1),
        }
    }

    /// Short name of the pattern family.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Complete(_) => "complete",
            Self::Path(_) => "path",
            Self::Star(_) => "star",
            Self::Explicit(_) => "explicit",
        }
    }
}

impl fmt::Display for TopologyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({} slots, {} edges)",
            self.kind_name(),
            self.size(),
            self.num_edges()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_edges() {
        let k4 = TopologyPattern::Complete(4);
        assert_eq!(k4.num_edges(), 6);
        assert_eq!(k4.edges().len(), 6);
        assert!(k4.edges().iter().all(|&(a, b)| a < b));
        assert!(k4.is_slot_symmetric());
    }

    #[test]
    fn test_path_and_star() {
        let path = TopologyPattern::Path(4);
        assert_eq!(path.edges(), vec![(0, 1), (1, 2), (2, 3)]);
        assert_eq!(path.neighbors()[1], vec![0, 2]);
        assert!(!path.is_slot_symmetric());

        let star = TopologyPattern::Star(4);
        assert_eq!(star.edges(), vec![(0, 1), (0, 2), (0, 3)]);
        assert_eq!(star.neighbors()[0], vec![1, 2, 3]);
    }

    #[test]
    fn test_single_slot() {
        for pattern in [TopologyPattern::Complete(1), TopologyPattern::Path(1)] {
            assert_eq!(pattern.num_edges(), 0);
            assert!(pattern.edges().is_empty());
            assert!(pattern.is_slot_symmetric());
        }
    }

    #[test]
    fn test_explicit_normalises() {
        let pattern = ExplicitPattern::new(3, [(2, 1), (0, 1)]).unwrap();
        assert_eq!(pattern.edges(), &[(0, 1), (1, 2)]);
        assert_eq!(pattern.size(), 3);
    }

    #[test]
    fn test_explicit_rejects_malformed() {
        assert!(matches!(
            ExplicitPattern::new(3, [(0, 3)]),
            Err(TopologyError::InvalidPattern(_))
        ));
        assert!(matches!(
            ExplicitPattern::new(3, [(1, 1), (0, 2)]),
            Err(TopologyError::InvalidPattern(_))
        ));
        assert!(matches!(
            ExplicitPattern::new(3, [(0, 1), (1, 0), (1, 2)]),
            Err(TopologyError::InvalidPattern(_))
        ));
        assert!(matches!(
            ExplicitPattern::new(0, []),
            Err(TopologyError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_explicit_rejects_disconnected() {
        let err = ExplicitPattern::new(4, [(0, 1), (2, 3)]).unwrap_err();
        assert!(err.to_string().contains("disconnected"));
        // A lone slot counts as connected.
        assert!(ExplicitPattern::new(1, []).is_ok());
        // Enough edges but still two components.
        let err = ExplicitPattern::new(4, [(0, 1), (1, 2), (0, 2)]).unwrap_err();
        assert!(err.to_string().contains("2 components"));
    }

    #[test]
    fn test_explicit_too_few_edges_for_size() {
        let err = ExplicitPattern::new(usize::MAX / 4, [(0, 1)]).unwrap_err();
        assert!(matches!(err, TopologyError::InvalidPattern(ref m) if m.contains("disconnected")));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            TopologyPattern::Path(5).to_string(),
            "path(5 slots, 4 edges)"
        );
    }
}
