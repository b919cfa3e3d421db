//! Recommendation requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Backend name meaning "evaluate every backend in the store".
pub const AUTO_BACKEND: &str = "auto";

/// Which backend(s) a request targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BackendSelector {
    /// One backend by name.
    Named(String),
    /// The best backend in the store.
    Auto,
}

impl From<String> for BackendSelector {
    fn from(name: String) -> Self {
        if name.trim().eq_ignore_ascii_case(AUTO_BACKEND) {
            Self::Auto
        } else {
            Self::Named(name)
        }
    }
}

impl From<&str> for BackendSelector {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<BackendSelector> for String {
    fn from(selector: BackendSelector) -> Self {
        match selector {
            BackendSelector::Named(name) => name,
            BackendSelector::Auto => AUTO_BACKEND.to_string(),
        }
    }
}

impl fmt::Display for BackendSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::Auto => write!(f, "{AUTO_BACKEND}"),
        }
    }
}

/// A request for a qubit placement.
///
/// ```
/// use qplace_engine::{BackendSelector, RecommendationRequest};
/// use std::time::Duration;
///
/// let request = RecommendationRequest::new("ibm_brisbane", "repetition", 5)
///     .with_ancillas(4)
///     .with_deadline(Duration::from_millis(200));
/// assert_eq!(request.total_qubits(), 9);
///
/// let any = RecommendationRequest::new("auto", "vqe", 4);
/// assert_eq!(any.backend, BackendSelector::Auto);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    /// Target backend, or `"auto"`.
    pub backend: BackendSelector,
    /// Circuit type label (`vqe`, `qaoa`, `repetition`, `ghz`, `custom`, ...).
    pub circuit_type: String,
    /// Number of data qubits.
    pub data_qubits: usize,
    /// Number of ancilla qubits.
    #[serde(default)]
    pub ancilla_qubits: usize,
    /// Slot adjacency for `custom` circuits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_pattern: Option<Vec<(usize, usize)>>,
    /// Caller deadline for the search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Duration>,
}

impl RecommendationRequest {
    /// Request `data_qubits` qubits for `circuit_type` on `backend`.
    pub fn new(
        backend: impl Into<BackendSelector>,
        circuit_type: impl Into<String>,
        data_qubits: usize,
    ) -> Self {
        Self {
            backend: backend.into(),
            circuit_type: circuit_type.into(),
            data_qubits,
            ancilla_qubits: 0,
            custom_pattern: None,
            deadline: None,
        }
    }

    /// Request across all backends in the store.
    pub fn auto(circuit_type: impl Into<String>, data_qubits: usize) -> Self {
        Self::new(BackendSelector::Auto, circuit_type, data_qubits)
    }

    /// Add ancilla qubits.
    pub fn with_ancillas(mut self, ancilla_qubits: usize) -> Self {
        self.ancilla_qubits = ancilla_qubits;
        self
    }

    /// Supply the slot adjacency of a `custom` circuit.
    pub fn with_custom_pattern(mut self, edges: impl IntoIterator<Item = (usize, usize)>) -> Self {
        self.custom_pattern = Some(edges.into_iter().collect());
        self
    }

    /// Bound the search time.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Data plus ancilla qubits, or `None` if the sum overflows.
    pub fn checked_total_qubits(&self) -> Option<usize> {
        self.data_qubits.checked_add(self.ancilla_qubits)
    }

    /// Data plus ancilla qubits, saturating at `usize::MAX`.
    pub fn total_qubits(&self) -> usize {
        self.data_qubits.saturating_add(self.ancilla_qubits)
    }
}
