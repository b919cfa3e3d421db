//! Bounded candidate search.
//!
//! The search grows one connected qubit group per seed, assigns pattern
//! slots within the group, and deduplicates groups with the same qubit set.
//!
//! # Algorithm
//!
//! 1. **Seeds**: qubits in components large enough to hold the pattern,
//!    ordered by local error (qubit errors plus mean adjacent coupling error).
//! 2. **Expansion**: slots are placed in breadth-first order of the pattern,
//!    each on the frontier qubit that realises the most edges to placed
//!    slots (see [`expand`]).
//! 3. **Assignment**: the slot mapping within the group is optimised for
//!    matched edges, then matched-edge cost (see [`assign`]).
//! 4. **Deduplication**: one candidate per qubit set, in seed order.
//!
//! The search stops at the candidate cap or when the deadline passes,
//! returning what it has.

mod assign;
mod expand;

use std::collections::VecDeque;
use std::time::Instant;

use qplace_calibration::CalibrationSnapshot;
use qplace_topology::TopologyPattern;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::candidate::Candidate;
use crate::config::SearchConfig;
use crate::error::{EngineError, EngineResult};

/// Pattern data shared by every seed.
#[derive(Debug, Clone)]
pub(crate) struct PatternShape {
    size: usize,
    edges: Vec<(usize, usize)>,
    neighbors: Vec<Vec<usize>>,
    /// Slot placement order: breadth-first from the highest-degree slot.
    order: Vec<usize>,
    symmetric: bool,
}

impl PatternShape {
    pub(crate) fn new(pattern: &TopologyPattern) -> Self {
        let size = pattern.size();
        let neighbors = pattern.neighbors();

        let mut roots: Vec<usize> = (0..size).collect();
        // Highest degree first, lowest slot on ties.
        roots.sort_by(|&a, &b| neighbors[b].len().cmp(&neighbors[a].len()).then(a.cmp(&b)));

        let mut order = Vec::with_capacity(size);
        let mut visited = vec![false; size];
        for root in roots {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            let mut queue = VecDeque::from([root]);
            while let Some(slot) = queue.pop_front() {
                order.push(slot);
                for &next in &neighbors[slot] {
                    if !visited[next] {
                        visited[next] = true;
                        queue.push_back(next);
                    }
                }
            }
        }

        Self {
            size,
            edges: pattern.edges(),
            neighbors,
            order,
            symmetric: pattern.is_slot_symmetric(),
        }
    }

    pub(crate) fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }
}

/// Result of a search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Distinct candidates, in seed order.
    pub candidates: Vec<Candidate>,
    /// Seeds grown into a full placement.
    pub seeds_expanded: usize,
    /// The deadline or candidate cap cut the search short.
    pub truncated: bool,
}

enum SeedResult {
    Placed(Vec<usize>),
    Exhausted,
    Skipped,
}

/// Candidate search over one snapshot for one pattern.
#[derive(Debug)]
pub struct CandidateSearch<'a> {
    snapshot: &'a CalibrationSnapshot,
    shape: PatternShape,
    config: &'a SearchConfig,
    deadline: Option<Instant>,
}

impl<'a> CandidateSearch<'a> {
    /// Prepare a search of `pattern` on `snapshot`.
    pub fn new(
        snapshot: &'a CalibrationSnapshot,
        pattern: &TopologyPattern,
        config: &'a SearchConfig,
    ) -> Self {
        Self {
            snapshot,
            shape: PatternShape::new(pattern),
            config,
            deadline: None,
        }
    }

    /// Stop expanding seeds at `deadline` (in addition to the time budget).
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Seed qubits (dense indices) in the order they are expanded.
    pub fn seeds(&self) -> Vec<usize> {
        let coupling = self.snapshot.coupling();
        let sizes = coupling.component_sizes();
        let n = self.shape.size;

        let mut seeds: Vec<(f64, usize)> = (0..coupling.num_qubits())
            .filter(|&i| sizes[i] >= n)
            .map(|i| (self.local_cost(i), i))
            .collect();
        seeds.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        seeds.truncate(self.config.max_seeds);
        seeds.into_iter().map(|(_, i)| i).collect()
    }

    fn local_cost(&self, index: usize) -> f64 {
        let qubit = self.snapshot.qubit_at(index).combined_error();
        if self.shape.size <= 1 {
            return qubit;
        }
        let adjacent = self.snapshot.coupling().neighbors_at(index);
        if adjacent.is_empty() {
            qubit + 1.0
        } else {
            qubit + adjacent.iter().map(|&(_, e)| e).sum::<f64>() / adjacent.len() as f64
        }
    }

    fn grow(&self, seed: usize, expired: &(dyn Fn() -> bool + Sync)) -> SeedResult {
        if expired() {
            return SeedResult::Skipped;
        }
        match expand::expand(seed, &self.shape, self.snapshot) {
            Some(placement) => SeedResult::Placed(assign::optimise(
                placement,
                &self.shape,
                self.snapshot.coupling(),
                self.config,
            )),
            None => SeedResult::Exhausted,
        }
    }

    /// Run the search.
    ///
    /// Fails with [`EngineError::NoCandidateFound`] if no connected group
    /// of the pattern's size exists, or if the deadline passes before any
    /// candidate is found.
    pub fn run(&self) -> EngineResult<SearchOutcome> {
        let deadline = self.deadline;
        self.run_until(&move || deadline.is_some_and(|d| Instant::now() >= d))
    }

    /// Run the search, skipping every seed reached once `expired` reports
    /// true. The time budget applies as well.
    pub(crate) fn run_until(
        &self,
        expired: &(dyn Fn() -> bool + Sync),
    ) -> EngineResult<SearchOutcome> {
        let n = self.shape.size;
        let backend = self.snapshot.backend();
        let largest = self.snapshot.coupling().largest_component_size();
        if largest < n {
            return Err(EngineError::NoCandidateFound(format!(
                "'{backend}' has no connected group of {n} qubits (largest connected component has {largest})"
            )));
        }

        let budget = Instant::now() + self.config.time_budget();
        let stop = move || Instant::now() >= budget || expired();
        let seeds = self.seeds();

        let results: Vec<SeedResult> = if self.config.parallel {
            seeds.par_iter().map(|&s| self.grow(s, &stop)).collect()
        } else {
            seeds.iter().map(|&s| self.grow(s, &stop)).collect()
        };

        let mut candidates: Vec<Candidate> = Vec::new();
        let mut by_set: FxHashMap<Vec<usize>, usize> = FxHashMap::default();
        let mut seeds_expanded = 0;
        let mut skipped = 0;
        let mut capped = false;

        for result in results {
            let placement = match result {
                SeedResult::Placed(placement) => placement,
                SeedResult::Exhausted => continue,
                SeedResult::Skipped => {
                    skipped += 1;
                    continue;
                }
            };
            seeds_expanded += 1;

            let candidate = Candidate::evaluate(placement, self.shape.edges(), self.snapshot);
            let mut key = candidate.slots().to_vec();
            key.sort_unstable();
            match by_set.get(&key) {
                Some(&pos) => {
                    if candidate.is_better_than(&candidates[pos]) {
                        candidates[pos] = candidate;
                    }
                }
                None if candidates.len() < self.config.max_candidates => {
                    by_set.insert(key, candidates.len());
                    candidates.push(candidate);
                }
                None => capped = true,
            }
        }

        if skipped > 0 {
            warn!(
                backend = %backend,
                skipped,
                expanded = seeds_expanded,
                "Search deadline reached; using candidates found so far"
            );
        }
        if candidates.is_empty() {
            let reason = if skipped > 0 {
                format!("deadline passed before any group of {n} qubits was found on '{backend}'")
            } else {
                format!("no seed on '{backend}' grew into a group of {n} qubits")
            };
            return Err(EngineError::NoCandidateFound(reason));
        }

        debug!(
            backend = %backend,
            seeds = seeds.len(),
            expanded = seeds_expanded,
            candidates = candidates.len(),
            "Candidate search finished"
        );

        Ok(SearchOutcome {
            candidates,
            seeds_expanded,
            truncated: skipped > 0 || capped,
        })
    }
}
