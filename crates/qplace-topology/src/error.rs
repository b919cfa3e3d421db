//! Error types for the topology crate.

use thiserror::Error;

/// Errors raised while resolving or validating a topology pattern.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopologyError {
    /// The circuit type is not in the catalog.
    #[error("Unknown circuit type: '{0}'")]
    UnknownCircuitType(String),

    /// The requested pattern is malformed.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Result type for topology operations.
pub type TopologyResult<T> = Result<T, TopologyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            TopologyError::UnknownCircuitType("grover".into()).to_string(),
            "Unknown circuit type: 'grover'"
        );
        assert_eq!(
            TopologyError::InvalidPattern("self-loop on slot 2".into()).to_string(),
            "Invalid pattern: self-loop on slot 2"
        );
    }
}
