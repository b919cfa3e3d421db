//! Candidate placements.

use qplace_calibration::{CalibrationSnapshot, PhysicalQubitId};
use serde::{Deserialize, Serialize};

/// Lowest fidelity used when taking logarithms, so a reported error of 1.0
/// stays finite.
const MIN_FIDELITY: f64 = 1e-12;

/// `-ln(1 - error)`: additive cost of an operation with the given error.
#[inline]
pub(crate) fn neg_log_fidelity(error: f64) -> f64 {
    -(1.0 - error).max(MIN_FIDELITY).ln()
}

/// A mapping of pattern slots to physical qubits.
///
/// Slot `i` is placed on `qubits()[i]`. Every pattern edge is recorded as
/// either matched (the two qubits are coupled) or unmet.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    slots: Vec<usize>,
    qubits: Vec<PhysicalQubitId>,
    matched_edges: Vec<(usize, usize)>,
    unmet_edges: Vec<(usize, usize)>,
    matched_cost: f64,
}

impl Candidate {
    /// Evaluate a slot mapping given as dense qubit indices.
    pub(crate) fn evaluate(
        slots: Vec<usize>,
        pattern_edges: &[(usize, usize)],
        snapshot: &CalibrationSnapshot,
    ) -> Self {
        let coupling = snapshot.coupling();
        let mut matched_edges = Vec::new();
        let mut unmet_edges = Vec::new();
        let mut matched_cost = 0.0;
        for &(a, b) in pattern_edges {
            match coupling.pair_error_at(slots[a], slots[b]) {
                Some(error) => {
                    matched_edges.push((a, b));
                    matched_cost += neg_log_fidelity(error);
                }
                None => unmet_edges.push((a, b)),
            }
        }
        let qubits = slots.iter().map(|&i| coupling.qubit_id(i)).collect();
        Self {
            slots,
            qubits,
            matched_edges,
            unmet_edges,
            matched_cost,
        }
    }

    /// Physical qubits in slot order.
    pub fn qubits(&self) -> &[PhysicalQubitId] {
        &self.qubits
    }

    /// Dense snapshot indices in slot order.
    pub(crate) fn slots(&self) -> &[usize] {
        &self.slots
    }

    /// Pattern edges realised by a coupling.
    pub fn matched_edges(&self) -> &[(usize, usize)] {
        &self.matched_edges
    }

    /// Pattern edges with no coupling between their qubits.
    pub fn unmet_edges(&self) -> &[(usize, usize)] {
        &self.unmet_edges
    }

    /// Number of unmet pattern edges.
    pub fn num_unmet(&self) -> usize {
        self.unmet_edges.len()
    }

    /// Sum of `-ln(1 - e)` over matched edges.
    pub fn matched_cost(&self) -> f64 {
        self.matched_cost
    }

    /// Qubit set, sorted. Two candidates with the same set are duplicates.
    pub fn qubit_set(&self) -> Vec<PhysicalQubitId> {
        let mut set = self.qubits.clone();
        set.sort_unstable();
        set
    }

    /// Check if this candidate places better than `other` on the same set:
    /// fewer unmet edges, then lower matched cost.
    pub(crate) fn is_better_than(&self, other: &Self) -> bool {
        match self.num_unmet().cmp(&other.num_unmet()) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => self.matched_cost < other.matched_cost,
        }
    }

    /// Mean single-qubit gate error over the mapped qubits.
    pub fn mean_single_qubit_error(&self, snapshot: &CalibrationSnapshot) -> f64 {
        let total: f64 = self
            .slots
            .iter()
            .map(|&i| snapshot.qubit_at(i).single_qubit_error)
            .sum();
        total / self.slots.len() as f64
    }

    /// Diagnostic view of this candidate.
    pub fn summary(&self, snapshot: &CalibrationSnapshot) -> CandidateSummary {
        CandidateSummary {
            qubits: self.qubits.clone(),
            matched_edges: self.matched_edges.len(),
            unmet_edges: self.unmet_edges.clone(),
            mean_single_qubit_error: self.mean_single_qubit_error(snapshot),
        }
    }
}

/// Serialisable description of a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    /// Physical qubits in slot order.
    pub qubits: Vec<PhysicalQubitId>,
    /// Number of matched pattern edges.
    pub matched_edges: usize,
    /// Unmet pattern edges as slot pairs.
    pub unmet_edges: Vec<(usize, usize)>,
    /// Mean single-qubit gate error over the mapped qubits.
    pub mean_single_qubit_error: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use qplace_calibration::SnapshotBuilder;

    #[test]
    fn test_neg_log_fidelity() {
        assert_eq!(neg_log_fidelity(0.0), 0.0);
        assert!((neg_log_fidelity(0.5) - std::f64::consts::LN_2).abs() < 1e-12);
        assert!(neg_log_fidelity(1.0).is_finite());
    }

    #[test]
    fn test_evaluate_records_edges() {
        let snapshot = SnapshotBuilder::linear("line", 4).build().unwrap();
        // Triangle on qubits 0, 1, 2 of a chain: (0, 2) is missing.
        let candidate = Candidate::evaluate(vec![0, 1, 2], &[(0, 1), (1, 2), (0, 2)], &snapshot);

        assert_eq!(candidate.matched_edges(), &[(0, 1), (1, 2)]);
        assert_eq!(candidate.unmet_edges(), &[(0, 2)]);
        assert_eq!(candidate.num_unmet(), 1);
        assert!((candidate.matched_cost() - 2.0 * neg_log_fidelity(0.01)).abs() < 1e-12);
    }

    #[test]
    fn test_qubit_set_and_ordering() {
        let snapshot = SnapshotBuilder::linear("line", 4).build().unwrap();
        let path = Candidate::evaluate(vec![2, 1, 3], &[(0, 1), (0, 2)], &snapshot);
        let broken = Candidate::evaluate(vec![1, 2, 3], &[(0, 1), (0, 2)], &snapshot);

        assert_eq!(path.qubit_set(), broken.qubit_set());
        assert_eq!(path.num_unmet(), 0);
        assert_eq!(broken.num_unmet(), 1);
        assert!(path.is_better_than(&broken));
        assert!(!broken.is_better_than(&path));
    }

    #[test]
    fn test_summary() {
        let snapshot = SnapshotBuilder::linear("line", 3)
            .qubit_error(0, 0.003, 0.01)
            .build()
            .unwrap();
        let candidate = Candidate::evaluate(vec![0, 1], &[(0, 1)], &snapshot);
        let summary = candidate.summary(&snapshot);
        assert_eq!(summary.qubits, vec![PhysicalQubitId(0), PhysicalQubitId(1)]);
        assert_eq!(summary.matched_edges, 1);
        assert!((summary.mean_single_qubit_error - 0.002).abs() < 1e-12);
    }
}
