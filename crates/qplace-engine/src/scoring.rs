//! Fidelity scoring.
//!
//! The score of a candidate combines three terms:
//!
//! - **quality**: geometric mean over mapped qubits of `(1 - e1)(1 - e_ro)`
//! - **connectivity**: geometric mean of `(1 - e2q)` over matched pattern edges
//! - **penalty**: a fixed cost per unmet pattern edge
//!
//! Both means lie in `[0, 1]`, so the weighted sum of the first two terms
//! spans at most `quality_weight + connectivity_weight`. Each unmet edge
//! costs that span plus `unmet_edge_penalty`, which makes one unmet edge
//! outweigh any difference in qubit quality.

use qplace_calibration::CalibrationSnapshot;
use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;
use crate::config::ScoringWeights;

/// Unweighted score terms of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Geometric-mean qubit survival, in `[0, 1]`.
    pub quality: f64,
    /// Geometric-mean matched-edge fidelity, in `[0, 1]`.
    pub connectivity: f64,
    /// Number of unmet pattern edges.
    pub unmet_edges: usize,
}

impl ScoreBreakdown {
    /// Compute the terms for `candidate` on `snapshot`.
    pub fn evaluate(candidate: &Candidate, snapshot: &CalibrationSnapshot) -> Self {
        let qubits = candidate.qubits();
        let log_survival: f64 = qubits
            .iter()
            .filter_map(|&id| snapshot.qubit(id))
            .map(|q| q.survival().ln())
            .sum();
        let quality = if qubits.is_empty() {
            0.0
        } else {
            (log_survival / qubits.len() as f64).exp()
        };

        let matched = candidate.matched_edges().len();
        let connectivity = if matched + candidate.num_unmet() == 0 {
            1.0
        } else if matched == 0 {
            0.0
        } else {
            // matched_cost is the sum of -ln(1 - e2q)
            (-candidate.matched_cost() / matched as f64).exp()
        };

        Self {
            quality,
            connectivity,
            unmet_edges: candidate.num_unmet(),
        }
    }

    /// Weighted total.
    pub fn total(&self, weights: &ScoringWeights) -> f64 {
        let per_unmet =
            weights.unmet_edge_penalty + weights.quality_weight + weights.connectivity_weight;
        weights.quality_weight * self.quality + weights.connectivity_weight * self.connectivity
            - self.unmet_edges as f64 * per_unmet
    }
}

/// Score `candidate` on `snapshot`.
pub fn score(candidate: &Candidate, snapshot: &CalibrationSnapshot, weights: &ScoringWeights) -> f64 {
    ScoreBreakdown::evaluate(candidate, snapshot).total(weights)
}
