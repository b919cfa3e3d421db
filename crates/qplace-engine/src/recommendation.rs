//! Recommendation results.

use qplace_calibration::PhysicalQubitId;
use serde::{Deserialize, Serialize};

use crate::candidate::CandidateSummary;
use crate::scoring::ScoreBreakdown;

/// A scored candidate, as returned by `list_candidates`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// Backend the candidate was found on.
    pub backend: String,
    /// The placement.
    pub candidate: CandidateSummary,
    /// Unweighted score terms.
    pub breakdown: ScoreBreakdown,
    /// Weighted score.
    pub score: f64,
}

/// A candidate ranked below the recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerUp {
    /// Physical qubits in slot order.
    pub qubits: Vec<PhysicalQubitId>,
    /// Weighted score.
    pub score: f64,
    /// Number of unmet pattern edges.
    pub unmet_edges: usize,
}

impl From<&RankedCandidate> for RunnerUp {
    fn from(ranked: &RankedCandidate) -> Self {
        Self {
            qubits: ranked.candidate.qubits.clone(),
            score: ranked.score,
            unmet_edges: ranked.breakdown.unmet_edges,
        }
    }
}

/// The recommended placement for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Physical qubits in pattern-slot order (data slots first).
    pub qubits: Vec<PhysicalQubitId>,
    /// Qubits of the data slots.
    pub data_qubits: Vec<PhysicalQubitId>,
    /// Qubits of the ancilla slots.
    pub ancilla_qubits: Vec<PhysicalQubitId>,
    /// Backend the placement is on.
    pub backend: String,
    /// Weighted score.
    pub score: f64,
    /// Unweighted score terms.
    pub breakdown: ScoreBreakdown,
    /// Age of the calibration snapshot at request time, in seconds.
    pub snapshot_age_secs: f64,
    /// Number of unmet pattern edges.
    pub unmet_edges: usize,
    /// The snapshot is older than the staleness threshold.
    pub stale: bool,
    /// Next-best candidates, best first.
    pub runner_ups: Vec<RunnerUp>,
    /// Number of placements evaluated.
    pub candidates_evaluated: usize,
    /// The search was cut short by its deadline or candidate cap.
    pub truncated: bool,
}
