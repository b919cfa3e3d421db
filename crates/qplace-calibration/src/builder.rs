//! Synthetic snapshots for tests, benchmarks and demos.
//!
//! [`SnapshotBuilder`] generates common device shapes with uniform error
//! rates, optionally overriding individual qubits or couplings.
//!
//! ```
//! use qplace_calibration::{PhysicalQubitId, SnapshotBuilder};
//!
//! let snapshot = SnapshotBuilder::linear("line_5q", 5)
//!     .two_qubit_error(0.01)
//!     .edge_error(1, 2, 0.002)
//!     .build()
//!     .unwrap();
//!
//! let best = snapshot.coupling().pair_error(PhysicalQubitId(1), PhysicalQubitId(2));
//! assert_eq!(best, Some(0.002));
//! ```

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;

use crate::coupling::CouplingEdge;
use crate::error::CalibrationResult;
use crate::qubit::PhysicalQubit;
use crate::snapshot::CalibrationSnapshot;

/// Builder for synthetic calibration snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    backend: String,
    num_qubits: u32,
    couplings: Vec<(u32, u32)>,
    captured_at: Option<DateTime<Utc>>,
    single_qubit_error: f64,
    readout_error: f64,
    two_qubit_error: f64,
    qubit_overrides: FxHashMap<u32, (f64, f64)>,
    edge_overrides: FxHashMap<(u32, u32), f64>,
}

impl SnapshotBuilder {
    /// Device with `num_qubits` qubits and no couplings.
    pub fn new(backend: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            backend: backend.into(),
            num_qubits,
            couplings: Vec::new(),
            captured_at: None,
            single_qubit_error: 0.001,
            readout_error: 0.01,
            two_qubit_error: 0.01,
            qubit_overrides: FxHashMap::default(),
            edge_overrides: FxHashMap::default(),
        }
    }

    /// Linear chain `0-1-2-...`.
    pub fn linear(backend: impl Into<String>, n: u32) -> Self {
        Self::new(backend, n).couplings((0..n.saturating_sub(1)).map(|i| (i, i + 1)))
    }

    /// All-to-all coupling.
    pub fn full(backend: impl Into<String>, n: u32) -> Self {
        let pairs: Vec<_> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();
        Self::new(backend, n).couplings(pairs)
    }

    /// Qubit 0 coupled to every other qubit.
    pub fn star(backend: impl Into<String>, n: u32) -> Self {
        Self::new(backend, n).couplings((1..n).map(|i| (0, i)))
    }

    /// `rows × cols` nearest-neighbour grid, row-major numbering.
    pub fn grid(backend: impl Into<String>, rows: u32, cols: u32) -> Self {
        let mut pairs = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                let idx = r * cols + c;
                if c + 1 < cols {
                    pairs.push((idx, idx + 1));
                }
                if r + 1 < rows {
                    pairs.push((idx, idx + cols));
                }
            }
        }
        Self::new(backend, rows * cols).couplings(pairs)
    }

    /// Add couplings.
    pub fn couplings(mut self, pairs: impl IntoIterator<Item = (u32, u32)>) -> Self {
        self.couplings.extend(pairs);
        self
    }

    /// Add a single coupling.
    pub fn coupling(self, a: u32, b: u32) -> Self {
        self.couplings([(a, b)])
    }

    /// Capture timestamp (defaults to the time of [`build`](Self::build)).
    pub fn captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.captured_at = Some(at);
        self
    }

    /// Uniform single-qubit gate error.
    pub fn single_qubit_error(mut self, error: f64) -> Self {
        self.single_qubit_error = error;
        self
    }

    /// Uniform readout error.
    pub fn readout_error(mut self, error: f64) -> Self {
        self.readout_error = error;
        self
    }

    /// Uniform two-qubit gate error.
    pub fn two_qubit_error(mut self, error: f64) -> Self {
        self.two_qubit_error = error;
        self
    }

    /// Override the errors of one qubit.
    pub fn qubit_error(mut self, qubit: u32, single_qubit_error: f64, readout_error: f64) -> Self {
        self.qubit_overrides
            .insert(qubit, (single_qubit_error, readout_error));
        self
    }

    /// Override the error of one coupling (either orientation).
    pub fn edge_error(mut self, a: u32, b: u32, error: f64) -> Self {
        self.edge_overrides.insert((a.min(b), a.max(b)), error);
        self
    }

    /// Validate and build the snapshot.
    pub fn build(self) -> CalibrationResult<CalibrationSnapshot> {
        let qubits = (0..self.num_qubits)
            .map(|id| {
                let (e1, ero) = self
                    .qubit_overrides
                    .get(&id)
                    .copied()
                    .unwrap_or((self.single_qubit_error, self.readout_error));
                PhysicalQubit::new(id, e1, ero)
            })
            .collect();

        let edges = self
            .couplings
            .iter()
            .map(|&(a, b)| {
                let error = self
                    .edge_overrides
                    .get(&(a.min(b), a.max(b)))
                    .copied()
                    .unwrap_or(self.two_qubit_error);
                CouplingEdge::new(a, b, error)
            })
            .collect();

        CalibrationSnapshot::new(
            self.backend,
            self.captured_at.unwrap_or_else(Utc::now),
            qubits,
            edges,
        )
    }
}
