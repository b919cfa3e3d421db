//! Physical qubit identifiers and per-qubit calibration metrics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a physical qubit, unique within one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhysicalQubitId(pub u32);

impl fmt::Display for PhysicalQubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.0)
    }
}

impl From<u32> for PhysicalQubitId {
    fn from(id: u32) -> Self {
        PhysicalQubitId(id)
    }
}

/// Calibration metrics of one physical qubit.
///
/// Error rates are probabilities in `[0, 1]`; coherence times are in
/// **microseconds**. Values are immutable once part of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalQubit {
    /// Qubit identifier.
    pub id: PhysicalQubitId,
    /// Average single-qubit gate error.
    pub single_qubit_error: f64,
    /// Readout (measurement assignment) error.
    pub readout_error: f64,
    /// T1 relaxation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t1_us: Option<f64>,
    /// T2 dephasing time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t2_us: Option<f64>,
}

impl PhysicalQubit {
    /// Create a qubit record without coherence data.
    pub fn new(id: impl Into<PhysicalQubitId>, single_qubit_error: f64, readout_error: f64) -> Self {
        Self {
            id: id.into(),
            single_qubit_error,
            readout_error,
            t1_us: None,
            t2_us: None,
        }
    }

    /// Attach T1/T2 coherence times.
    pub fn with_coherence(mut self, t1_us: f64, t2_us: f64) -> Self {
        self.t1_us = Some(t1_us);
        self.t2_us = Some(t2_us);
        self
    }

    /// Probability that a gate followed by a measurement on this qubit
    /// succeeds: `(1 - e1)(1 - e_ro)`.
    #[inline]
    pub fn survival(&self) -> f64 {
        (1.0 - self.single_qubit_error) * (1.0 - self.readout_error)
    }

    /// Sum of the single-qubit and readout error rates.
    #[inline]
    pub fn combined_error(&self) -> f64 {
        self.single_qubit_error + self.readout_error
    }
}
