//! Greedy growth of a connected qubit group from one seed.

use std::collections::BTreeSet;

use qplace_calibration::CalibrationSnapshot;

use super::PatternShape;
use crate::candidate::neg_log_fidelity;

const UNPLACED: usize = usize::MAX;

/// Ranking of a frontier qubit for the slot being placed.
#[derive(Debug, Clone, Copy)]
struct Choice {
    qubit: usize,
    /// Pattern edges to already-placed slots that this qubit realises.
    satisfied: usize,
    /// Unused couplings available for the slot's still-unplaced neighbours.
    room: usize,
    /// Qubit cost plus the cost of the satisfied edges.
    cost: f64,
}

impl Choice {
    fn beats(&self, other: &Self) -> bool {
        (self.satisfied, self.room) > (other.satisfied, other.room)
            || ((self.satisfied, self.room) == (other.satisfied, other.room)
                && self.cost < other.cost)
    }
}

/// Grow a placement of all pattern slots starting with `seed`.
///
/// Slots are placed in `shape.order`; every new qubit is taken from the
/// frontier of the group placed so far, so the group stays connected.
/// Returns slot → dense qubit index, or `None` if the seed's component is
/// too small.
pub(super) fn expand(
    seed: usize,
    shape: &PatternShape,
    snapshot: &CalibrationSnapshot,
) -> Option<Vec<usize>> {
    let coupling = snapshot.coupling();
    let mut placement = vec![UNPLACED; shape.size];
    let mut used = vec![false; coupling.num_qubits()];
    let mut frontier = BTreeSet::new();

    let (&first, rest) = shape.order.split_first()?;
    place(first, seed, &mut placement, &mut used, &mut frontier, snapshot);

    for &slot in rest {
        let placed_neighbors: Vec<usize> = shape.neighbors[slot]
            .iter()
            .map(|&s| placement[s])
            .filter(|&q| q != UNPLACED)
            .collect();
        let remaining_degree = shape.neighbors[slot].len() - placed_neighbors.len();

        let mut best: Option<Choice> = None;
        for &qubit in &frontier {
            let mut satisfied = 0;
            let mut cost = qubit_cost(snapshot, qubit);
            for &q in &placed_neighbors {
                if let Some(error) = coupling.pair_error_at(qubit, q) {
                    satisfied += 1;
                    cost += neg_log_fidelity(error);
                }
            }
            let free = coupling
                .neighbors_at(qubit)
                .iter()
                .filter(|&&(w, _)| !used[w])
                .count();
            let choice = Choice {
                qubit,
                satisfied,
                room: free.min(remaining_degree),
                cost,
            };
            // Frontier iterates in index order, so ties keep the lower index.
            if best.is_none_or(|b| choice.beats(&b)) {
                best = Some(choice);
            }
        }

        let choice = best?;
        place(slot, choice.qubit, &mut placement, &mut used, &mut frontier, snapshot);
    }

    Some(placement)
}

fn place(
    slot: usize,
    qubit: usize,
    placement: &mut [usize],
    used: &mut [bool],
    frontier: &mut BTreeSet<usize>,
    snapshot: &CalibrationSnapshot,
) {
    placement[slot] = qubit;
    used[qubit] = true;
    frontier.remove(&qubit);
    for &(w, _) in snapshot.coupling().neighbors_at(qubit) {
        if !used[w] {
            frontier.insert(w);
        }
    }
}

/// `-ln` of the qubit's survival probability.
pub(super) fn qubit_cost(snapshot: &CalibrationSnapshot, index: usize) -> f64 {
    neg_log_fidelity(1.0 - snapshot.qubit_at(index).survival())
}
