//! Error types for the recommendation engine.

use qplace_calibration::CalibrationError;
use qplace_topology::TopologyError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors returned by recommendation requests.
///
/// Every failure path maps to one variant; none is retried internally.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The request is malformed (bad qubit count, size exceeds the backend).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The circuit type is not in the catalog.
    #[error("Unknown circuit type: '{0}'")]
    UnknownCircuitType(String),

    /// A custom pattern (or ancilla layout) is malformed.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// No snapshot has been ingested for the backend.
    #[error("No telemetry available for backend '{0}'")]
    NoTelemetryAvailable(String),

    /// No connected subset of the requested size exists.
    #[error("No candidate found: {0}")]
    NoCandidateFound(String),

    /// The metering collaborator rejected the request.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Internal failure (worker task panicked or was cancelled).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Check if the error is caller-fixable request validation.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_) | Self::UnknownCircuitType(_) | Self::InvalidPattern(_)
        )
    }
}

impl From<TopologyError> for EngineError {
    fn from(err: TopologyError) -> Self {
        match err {
            TopologyError::UnknownCircuitType(name) => Self::UnknownCircuitType(name),
            TopologyError::InvalidPattern(reason) => Self::InvalidPattern(reason),
            other => Self::InvalidPattern(other.to_string()),
        }
    }
}

impl From<CalibrationError> for EngineError {
    fn from(err: CalibrationError) -> Self {
        match err {
            CalibrationError::NoTelemetryAvailable(backend) => Self::NoTelemetryAvailable(backend),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
