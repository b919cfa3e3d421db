//! Coupling edges and the coupling graph of a backend.
//!
//! The [`CouplingGraph`] records which physical qubits can be directly
//! two-qubit-gated. It is built once per snapshot and never mutated.
//!
//! Direction is tracked only for validation: a directed edge `a → b` still
//! makes the pair adjacent for placement purposes, because the reverse
//! orientation costs only single-qubit conjugation. When a backend reports
//! both `a → b` and `b → a`, the lower of the two errors is the pair's
//! effective error.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CalibrationError, CalibrationResult, check_rate};
use crate::qubit::{PhysicalQubit, PhysicalQubitId};

/// A pair of physical qubits that can be directly entangled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingEdge {
    /// First qubit (control side when `directed`).
    pub a: PhysicalQubitId,
    /// Second qubit (target side when `directed`).
    pub b: PhysicalQubitId,
    /// Two-qubit gate error for this pair.
    pub two_qubit_error: f64,
    /// Whether the hardware only implements the gate as `a → b`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub directed: bool,
}

impl CouplingEdge {
    /// Create an undirected coupling.
    pub fn new(
        a: impl Into<PhysicalQubitId>,
        b: impl Into<PhysicalQubitId>,
        two_qubit_error: f64,
    ) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            two_qubit_error,
            directed: false,
        }
    }

    /// Create a coupling the hardware only drives as `a → b`.
    pub fn directed(
        a: impl Into<PhysicalQubitId>,
        b: impl Into<PhysicalQubitId>,
        two_qubit_error: f64,
    ) -> Self {
        Self {
            directed: true,
            ..Self::new(a, b, two_qubit_error)
        }
    }

    /// The unordered pair, smaller identifier first.
    #[inline]
    pub fn pair(&self) -> (PhysicalQubitId, PhysicalQubitId) {
        if self.a <= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }
}

/// Directions already reported for one unordered pair.
#[derive(Debug, Default, Clone, Copy)]
struct PairSeen {
    undirected: bool,
    forward: bool,
    backward: bool,
}

/// Undirected coupling graph over the qubits of one snapshot.
///
/// Qubits are addressed either by [`PhysicalQubitId`] or by their dense
/// index (position in the snapshot's id-sorted qubit list). The dense
/// adjacency lists are kept sorted by neighbour index so pair lookups are
/// a binary search.
#[derive(Debug, Clone)]
pub struct CouplingGraph {
    graph: UnGraph<PhysicalQubitId, f64>,
    index: FxHashMap<PhysicalQubitId, usize>,
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl CouplingGraph {
    /// Build and validate the graph. `qubits` must already be sorted by id
    /// and free of duplicates.
    pub(crate) fn build(qubits: &[PhysicalQubit], edges: &[CouplingEdge]) -> CalibrationResult<Self> {
        let mut graph = UnGraph::with_capacity(qubits.len(), edges.len());
        let mut index = FxHashMap::default();
        for qubit in qubits {
            let node = graph.add_node(qubit.id);
            index.insert(qubit.id, node.index());
        }

        let mut seen: FxHashMap<(PhysicalQubitId, PhysicalQubitId), PairSeen> = FxHashMap::default();
        let mut pair_errors: BTreeMap<(usize, usize), f64> = BTreeMap::new();

        for edge in edges {
            if edge.a == edge.b {
                return Err(CalibrationError::SelfLoop(edge.a));
            }
            let lookup = |missing: PhysicalQubitId| {
                index
                    .get(&missing)
                    .copied()
                    .ok_or(CalibrationError::UnknownQubit {
                        a: edge.a,
                        b: edge.b,
                        missing,
                    })
            };
            let ia = lookup(edge.a)?;
            let ib = lookup(edge.b)?;
            check_rate(
                "two-qubit error",
                || format!("edge ({}, {})", edge.a, edge.b),
                edge.two_qubit_error,
            )?;

            let entry = seen.entry(edge.pair()).or_default();
            let forward = edge.a < edge.b;
            let duplicate = if edge.directed {
                entry.undirected || (forward && entry.forward) || (!forward && entry.backward)
            } else {
                entry.undirected || entry.forward || entry.backward
            };
            if duplicate {
                return Err(CalibrationError::DuplicateEdge {
                    a: edge.a,
                    b: edge.b,
                });
            }
            match (edge.directed, forward) {
                (false, _) => entry.undirected = true,
                (true, true) => entry.forward = true,
                (true, false) => entry.backward = true,
            }

            pair_errors
                .entry((ia.min(ib), ia.max(ib)))
                .and_modify(|e| *e = e.min(edge.two_qubit_error))
                .or_insert(edge.two_qubit_error);
        }

        // Pairs arrive in lexicographic order, so every list ends up sorted.
        let mut adjacency = vec![Vec::new(); qubits.len()];
        for (&(i, j), &error) in &pair_errors {
            graph.add_edge(NodeIndex::new(i), NodeIndex::new(j), error);
            adjacency[i].push((j, error));
            adjacency[j].push((i, error));
        }

        Ok(Self {
            graph,
            index,
            adjacency,
        })
    }

    /// Number of qubits (nodes).
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of distinct coupled pairs.
    #[inline]
    pub fn num_couplings(&self) -> usize {
        self.graph.edge_count()
    }

    /// Dense index of a qubit.
    #[inline]
    pub fn index_of(&self, qubit: PhysicalQubitId) -> Option<usize> {
        self.index.get(&qubit).copied()
    }

    /// Identifier of the qubit at a dense index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= num_qubits()`.
    #[inline]
    pub fn qubit_id(&self, index: usize) -> PhysicalQubitId {
        self.graph[NodeIndex::new(index)]
    }

    /// Neighbours of the qubit at `index` with the pair error, sorted by index.
    #[inline]
    pub fn neighbors_at(&self, index: usize) -> &[(usize, f64)] {
        &self.adjacency[index]
    }

    /// Effective two-qubit error between two dense indices, if coupled.
    #[inline]
    pub fn pair_error_at(&self, a: usize, b: usize) -> Option<f64> {
        let list = &self.adjacency[a];
        list.binary_search_by_key(&b, |&(n, _)| n)
            .ok()
            .map(|pos| list[pos].1)
    }

    /// Effective two-qubit error between two qubits, if coupled.
    pub fn pair_error(&self, a: PhysicalQubitId, b: PhysicalQubitId) -> Option<f64> {
        let (a, b) = (self.index_of(a)?, self.index_of(b)?);
        self.pair_error_at(a, b)
    }

    /// Check if two qubits are directly coupled.
    pub fn is_coupled(&self, a: PhysicalQubitId, b: PhysicalQubitId) -> bool {
        self.pair_error(a, b).is_some()
    }

    /// Neighbours of a qubit (empty for unknown qubits).
    pub fn neighbors(&self, qubit: PhysicalQubitId) -> impl Iterator<Item = PhysicalQubitId> + '_ {
        self.index_of(qubit)
            .map(|i| self.adjacency[i].as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&(n, _)| self.qubit_id(n))
    }

    /// Number of qubits coupled to `qubit`.
    pub fn degree(&self, qubit: PhysicalQubitId) -> usize {
        self.index_of(qubit).map_or(0, |i| self.adjacency[i].len())
    }

    /// All coupled pairs as `(a, b, error)` with `a < b`.
    pub fn couplings(&self) -> impl Iterator<Item = (PhysicalQubitId, PhysicalQubitId, f64)> + '_ {
        self.graph.edge_references().map(|e| {
            let (a, b) = (self.graph[e.source()], self.graph[e.target()]);
            (a.min(b), a.max(b), *e.weight())
        })
    }

    fn component_labels(&self) -> Vec<usize> {
        let mut sets = UnionFind::<usize>::new(self.num_qubits());
        for edge in self.graph.edge_references() {
            sets.union(edge.source().index(), edge.target().index());
        }
        sets.into_labeling()
    }

    /// Connected components, each sorted by id, ordered by their smallest member.
    pub fn components(&self) -> Vec<Vec<PhysicalQubitId>> {
        let labels = self.component_labels();
        let mut groups: BTreeMap<usize, Vec<PhysicalQubitId>> = BTreeMap::new();
        for (i, &label) in labels.iter().enumerate() {
            groups.entry(label).or_default().push(self.qubit_id(i));
        }
        let mut components: Vec<_> = groups.into_values().collect();
        components.sort_by_key(|c| c[0]);
        components
    }

    /// For every dense index, the size of the component containing it.
    pub fn component_sizes(&self) -> Vec<usize> {
        let labels = self.component_labels();
        let mut counts: FxHashMap<usize, usize> = FxHashMap::default();
        for &label in &labels {
            *counts.entry(label).or_default() += 1;
        }
        labels.iter().map(|label| counts[label]).collect()
    }

    /// Size of the largest connected component (0 for an empty graph).
    pub fn largest_component_size(&self) -> usize {
        self.component_sizes().into_iter().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qubits(n: u32) -> Vec<PhysicalQubit> {
        (0..n).map(|i| PhysicalQubit::new(i, 0.001, 0.01)).collect()
    }

    #[test]
    fn test_build_linear() {
        let edges: Vec<_> = (0..4).map(|i| CouplingEdge::new(i, i + 1, 0.01)).collect();
        let graph = CouplingGraph::build(&qubits(5), &edges).unwrap();

        assert_eq!(graph.num_qubits(), 5);
        assert_eq!(graph.num_couplings(), 4);
        assert!(graph.is_coupled(PhysicalQubitId(1), PhysicalQubitId(2)));
        assert!(graph.is_coupled(PhysicalQubitId(2), PhysicalQubitId(1)));
        assert!(!graph.is_coupled(PhysicalQubitId(0), PhysicalQubitId(2)));
        assert_eq!(graph.degree(PhysicalQubitId(0)), 1);
        assert_eq!(graph.degree(PhysicalQubitId(2)), 2);
        assert_eq!(graph.largest_component_size(), 5);
    }

    #[test]
    fn test_self_loop_rejected() {
        let result = CouplingGraph::build(&qubits(2), &[CouplingEdge::new(1, 1, 0.01)]);
        assert!(matches!(result, Err(CalibrationError::SelfLoop(PhysicalQubitId(1)))));
    }

    #[test]
    fn test_unknown_qubit_rejected() {
        let result = CouplingGraph::build(&qubits(2), &[CouplingEdge::new(0, 7, 0.01)]);
        assert!(matches!(
            result,
            Err(CalibrationError::UnknownQubit {
                missing: PhysicalQubitId(7),
                ..
            })
        ));
    }

    #[test]
    fn test_duplicate_undirected_rejected() {
        let edges = [CouplingEdge::new(0, 1, 0.01), CouplingEdge::new(1, 0, 0.02)];
        let result = CouplingGraph::build(&qubits(2), &edges);
        assert!(matches!(result, Err(CalibrationError::DuplicateEdge { .. })));
    }

    #[test]
    fn test_opposite_directions_merge_to_lower_error() {
        let edges = [
            CouplingEdge::directed(0, 1, 0.02),
            CouplingEdge::directed(1, 0, 0.01),
        ];
        let graph = CouplingGraph::build(&qubits(2), &edges).unwrap();
        assert_eq!(graph.num_couplings(), 1);
        assert_eq!(graph.pair_error(PhysicalQubitId(0), PhysicalQubitId(1)), Some(0.01));
    }

    #[test]
    fn test_same_direction_twice_rejected() {
        let edges = [
            CouplingEdge::directed(0, 1, 0.02),
            CouplingEdge::directed(0, 1, 0.01),
        ];
        assert!(CouplingGraph::build(&qubits(2), &edges).is_err());
    }

    #[test]
    fn test_invalid_edge_error_rejected() {
        let result = CouplingGraph::build(&qubits(2), &[CouplingEdge::new(0, 1, 1.2)]);
        assert!(matches!(result, Err(CalibrationError::InvalidErrorRate { .. })));
    }

    #[test]
    fn test_components() {
        let edges = [CouplingEdge::new(0, 1, 0.01), CouplingEdge::new(3, 4, 0.01)];
        let graph = CouplingGraph::build(&qubits(5), &edges).unwrap();

        let components = graph.components();
        assert_eq!(components.len(), 3);
        assert_eq!(components[0], vec![PhysicalQubitId(0), PhysicalQubitId(1)]);
        assert_eq!(components[1], vec![PhysicalQubitId(2)]);
        assert_eq!(components[2], vec![PhysicalQubitId(3), PhysicalQubitId(4)]);
        assert_eq!(graph.component_sizes(), vec![2, 2, 1, 2, 2]);
        assert_eq!(graph.largest_component_size(), 2);
    }

    #[test]
    fn test_adjacency_sorted() {
        let edges = [
            CouplingEdge::new(2, 4, 0.01),
            CouplingEdge::new(0, 2, 0.02),
            CouplingEdge::new(2, 3, 0.03),
        ];
        let graph = CouplingGraph::build(&qubits(5), &edges).unwrap();
        let neighbours: Vec<usize> = graph.neighbors_at(2).iter().map(|&(n, _)| n).collect();
        assert_eq!(neighbours, vec![0, 3, 4]);
        assert_eq!(graph.pair_error_at(2, 3), Some(0.03));
        assert_eq!(graph.pair_error_at(0, 4), None);
    }
}
