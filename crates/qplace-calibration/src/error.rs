//! Error types for the calibration crate.

use thiserror::Error;

use crate::qubit::PhysicalQubitId;

/// Errors that can occur while building, decoding or reading calibration data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CalibrationError {
    /// No snapshot has ever been ingested for the backend.
    #[error("No telemetry available for backend '{0}'")]
    NoTelemetryAvailable(String),

    /// The snapshot is structurally unusable (empty, unnamed, ...).
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// The same qubit identifier was reported twice.
    #[error("Duplicate qubit {0} in snapshot")]
    DuplicateQubit(PhysicalQubitId),

    /// A coupling edge references a qubit that is not part of the snapshot.
    #[error("Coupling edge ({a}, {b}) references unknown qubit {missing}")]
    UnknownQubit {
        /// First endpoint of the offending edge.
        a: PhysicalQubitId,
        /// Second endpoint of the offending edge.
        b: PhysicalQubitId,
        /// The endpoint that is missing from the snapshot.
        missing: PhysicalQubitId,
    },

    /// A coupling edge connects a qubit to itself.
    #[error("Self-loop on qubit {0}")]
    SelfLoop(PhysicalQubitId),

    /// The same coupling was reported twice in the same direction.
    #[error("Duplicate coupling edge ({a}, {b})")]
    DuplicateEdge {
        /// First endpoint.
        a: PhysicalQubitId,
        /// Second endpoint.
        b: PhysicalQubitId,
    },

    /// An error rate is NaN, infinite or outside `[0, 1]`.
    #[error("Invalid {metric} {value} on {location}")]
    InvalidErrorRate {
        /// Which metric was rejected (e.g. `"readout error"`).
        metric: &'static str,
        /// Qubit or edge the value belongs to.
        location: String,
        /// The rejected value.
        value: f64,
    },

    /// The telemetry document could not be decoded.
    #[error("Telemetry decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type for calibration operations.
pub type CalibrationResult<T> = Result<T, CalibrationError>;

/// Reject error rates that are not probabilities.
pub(crate) fn check_rate(
    metric: &'static str,
    location: impl FnOnce() -> String,
    value: f64,
) -> CalibrationResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CalibrationError::InvalidErrorRate {
            metric,
            location: location(),
            value,
        })
    }
}
