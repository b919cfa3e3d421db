//! Immutable calibration snapshots.
//!
//! A [`CalibrationSnapshot`] is one timestamped capture of a backend's
//! per-qubit metrics and coupling graph. Snapshots are validated on
//! construction and never mutated afterwards; fresh telemetry produces a
//! new snapshot that replaces the old one wholesale.
//!
//! # Telemetry document
//!
//! Snapshots decode from (and encode to) JSON:
//!
//! ```
//! use qplace_calibration::CalibrationSnapshot;
//!
//! let snapshot = CalibrationSnapshot::from_json(r#"{
//!     "backend": "demo_5q",
//!     "captured_at": "2026-10-19T08:00:00Z",
//!     "qubits": [
//!         {"id": 0, "single_qubit_error": 0.0004, "readout_error": 0.012},
//!         {"id": 1, "single_qubit_error": 0.0003, "readout_error": 0.009, "t1_us": 210.0, "t2_us": 140.0}
//!     ],
//!     "edges": [
//!         {"a": 0, "b": 1, "two_qubit_error": 0.007}
//!     ]
//! }"#).unwrap();
//!
//! assert_eq!(snapshot.num_qubits(), 2);
//! assert_eq!(snapshot.coupling().num_couplings(), 1);
//! ```

use chrono::{DateTime, TimeDelta, Utc};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::coupling::{CouplingEdge, CouplingGraph};
use crate::error::{CalibrationError, CalibrationResult, check_rate};
use crate::qubit::{PhysicalQubit, PhysicalQubitId};

/// Wire form of a snapshot; validated into [`CalibrationSnapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotDocument {
    backend: String,
    captured_at: DateTime<Utc>,
    qubits: Vec<PhysicalQubit>,
    #[serde(default)]
    edges: Vec<CouplingEdge>,
}

/// One immutable capture of a backend's calibration data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SnapshotDocument", into = "SnapshotDocument")]
pub struct CalibrationSnapshot {
    backend: String,
    captured_at: DateTime<Utc>,
    qubits: Vec<PhysicalQubit>,
    edges: Vec<CouplingEdge>,
    coupling: CouplingGraph,
}

impl CalibrationSnapshot {
    /// Validate and assemble a snapshot.
    ///
    /// Qubits are stored sorted by id; their position in that order is the
    /// dense index used by [`CouplingGraph`].
    pub fn new(
        backend: impl Into<String>,
        captured_at: DateTime<Utc>,
        mut qubits: Vec<PhysicalQubit>,
        edges: Vec<CouplingEdge>,
    ) -> CalibrationResult<Self> {
        let backend = backend.into();
        if backend.trim().is_empty() {
            return Err(CalibrationError::InvalidSnapshot(
                "backend name must not be empty".into(),
            ));
        }
        if qubits.is_empty() {
            return Err(CalibrationError::InvalidSnapshot(format!(
                "snapshot for '{backend}' contains no qubits"
            )));
        }

        let mut ids = FxHashSet::default();
        for qubit in &qubits {
            if !ids.insert(qubit.id) {
                return Err(CalibrationError::DuplicateQubit(qubit.id));
            }
            check_rate(
                "single-qubit error",
                || qubit.id.to_string(),
                qubit.single_qubit_error,
            )?;
            check_rate("readout error", || qubit.id.to_string(), qubit.readout_error)?;
        }
        qubits.sort_by_key(|q| q.id);

        let coupling = CouplingGraph::build(&qubits, &edges)?;

        Ok(Self {
            backend,
            captured_at,
            qubits,
            edges,
            coupling,
        })
    }

    /// Decode and validate a JSON telemetry document.
    pub fn from_json(json: &str) -> CalibrationResult<Self> {
        let document: SnapshotDocument = serde_json::from_str(json)?;
        Self::try_from(document)
    }

    /// Encode as a JSON telemetry document.
    pub fn to_json(&self) -> CalibrationResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Backend name.
    #[inline]
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Capture timestamp.
    #[inline]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Qubits sorted by id.
    #[inline]
    pub fn qubits(&self) -> &[PhysicalQubit] {
        &self.qubits
    }

    /// Number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    /// Coupling edges exactly as reported.
    #[inline]
    pub fn edges(&self) -> &[CouplingEdge] {
        &self.edges
    }

    /// The validated coupling graph.
    #[inline]
    pub fn coupling(&self) -> &CouplingGraph {
        &self.coupling
    }

    /// Look up a qubit by id.
    pub fn qubit(&self, id: PhysicalQubitId) -> Option<&PhysicalQubit> {
        self.coupling.index_of(id).map(|i| &self.qubits[i])
    }

    /// Qubit at a dense index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= num_qubits()`.
    #[inline]
    pub fn qubit_at(&self, index: usize) -> &PhysicalQubit {
        &self.qubits[index]
    }

    /// Age of the snapshot at `now`. Snapshots stamped in the future have age zero.
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        (now - self.captured_at).max(TimeDelta::zero())
    }

    /// Whether the snapshot is older than `threshold` at `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: TimeDelta) -> bool {
        self.age(now) > threshold
    }

    /// Mean single-qubit gate error across the device.
    pub fn mean_single_qubit_error(&self) -> f64 {
        self.qubits.iter().map(|q| q.single_qubit_error).sum::<f64>() / self.qubits.len() as f64
    }

    /// Mean effective two-qubit error across coupled pairs, if any.
    pub fn mean_two_qubit_error(&self) -> Option<f64> {
        let count = self.coupling.num_couplings();
        (count > 0).then(|| self.coupling.couplings().map(|(_, _, e)| e).sum::<f64>() / count as f64)
    }
}

impl TryFrom<SnapshotDocument> for CalibrationSnapshot {
    type Error = CalibrationError;

    fn try_from(doc: SnapshotDocument) -> Result<Self, Self::Error> {
        Self::new(doc.backend, doc.captured_at, doc.qubits, doc.edges)
    }
}

impl From<CalibrationSnapshot> for SnapshotDocument {
    fn from(snapshot: CalibrationSnapshot) -> Self {
        Self {
            backend: snapshot.backend,
            captured_at: snapshot.captured_at,
            qubits: snapshot.qubits,
            edges: snapshot.edges,
        }
    }
}
