//! Topology catalog: circuit types to connectivity patterns.
//!
//! The [`TopologyCatalog`] maps circuit-type labels onto a
//! [`PatternFamily`]. Adding a named circuit type is a catalog entry; the
//! search only ever sees the resulting [`TopologyPattern`].

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use crate::error::{TopologyError, TopologyResult};
use crate::pattern::{ExplicitPattern, TopologyPattern};

/// Label of the caller-supplied pattern type.
pub const CUSTOM_CIRCUIT_TYPE: &str = "custom";

/// Family a circuit type resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternFamily {
    /// All-to-all interaction (variational and optimisation ansätze).
    Complete,
    /// Nearest-neighbour chain.
    Path,
    /// One slot fanning out to all others.
    Star,
    /// Adjacency supplied with the request.
    Custom,
}

/// A resolved pattern together with its data/ancilla slot roles.
///
/// Slots `0..data_slots` hold data qubits; the remaining slots are ancillas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPattern {
    /// The connectivity requirement.
    pub pattern: TopologyPattern,
    /// Number of leading data slots.
    pub data_slots: usize,
}

impl ResolvedPattern {
    /// Total number of slots.
    pub fn size(&self) -> usize {
        self.pattern.size()
    }

    /// Number of ancilla slots.
    pub fn ancilla_slots(&self) -> usize {
        self.size() - self.data_slots
    }
}

/// Registry of circuit types.
#[derive(Debug, Clone)]
pub struct TopologyCatalog {
    families: FxHashMap<String, PatternFamily>,
}

impl Default for TopologyCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyCatalog {
    /// Catalog with the built-in circuit types.
    pub fn new() -> Self {
        let mut catalog = Self::empty();
        catalog.register("vqe", PatternFamily::Complete);
        catalog.register("qaoa", PatternFamily::Complete);
        catalog.register("repetition", PatternFamily::Path);
        catalog.register("ghz", PatternFamily::Star);
        catalog.register(CUSTOM_CIRCUIT_TYPE, PatternFamily::Custom);
        catalog
    }

    /// Catalog without any circuit types.
    pub fn empty() -> Self {
        Self {
            families: FxHashMap::default(),
        }
    }

    /// Register (or re-map) a circuit type. Names are case-insensitive.
    ///
    /// Returns the family previously registered under the name.
    pub fn register(&mut self, name: impl AsRef<str>, family: PatternFamily) -> Option<PatternFamily> {
        let key = normalise(name.as_ref());
        debug!("Registering circuit type: {} -> {:?}", key, family);
        self.families.insert(key, family)
    }

    /// Family of a circuit type, if registered.
    pub fn family(&self, circuit_type: &str) -> Option<PatternFamily> {
        self.families.get(&normalise(circuit_type)).copied()
    }

    /// Registered circuit types, sorted.
    pub fn circuit_types(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.families.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve a circuit type over `n` slots.
    pub fn resolve(
        &self,
        circuit_type: &str,
        n: usize,
        custom: Option<&[(usize, usize)]>,
    ) -> TopologyResult<TopologyPattern> {
        self.resolve_layout(circuit_type, n, 0, custom)
            .map(|resolved| resolved.pattern)
    }

    /// Resolve a circuit type with `data` data slots and `ancilla` ancilla slots.
    ///
    /// `repetition` interleaves ancillas between consecutive data qubits and
    /// therefore needs exactly `data - 1` of them. Custom adjacency ranges
    /// over all `data + ancilla` slots. The remaining named families take
    /// no ancillas.
    pub fn resolve_layout(
        &self,
        circuit_type: &str,
        data: usize,
        ancilla: usize,
        custom: Option<&[(usize, usize)]>,
    ) -> TopologyResult<ResolvedPattern> {
        let family = self
            .family(circuit_type)
            .ok_or_else(|| TopologyError::UnknownCircuitType(circuit_type.to_string()))?;

        if data == 0 {
            return Err(TopologyError::InvalidPattern(
                "pattern needs at least one data qubit".into(),
            ));
        }
        if family != PatternFamily::Custom && custom.is_some() {
            return Err(TopologyError::InvalidPattern(format!(
                "explicit adjacency is only accepted for circuit type '{CUSTOM_CIRCUIT_TYPE}', not '{circuit_type}'"
            )));
        }
        if ancilla > 0 && matches!(family, PatternFamily::Complete | PatternFamily::Star) {
            return Err(TopologyError::InvalidPattern(format!(
                "circuit type '{circuit_type}' does not take ancilla qubits"
            )));
        }

        let size = data.checked_add(ancilla).ok_or_else(|| {
            TopologyError::InvalidPattern(format!(
                "{data} data plus {ancilla} ancilla slots overflow the slot count"
            ))
        })?;

        let pattern = match family {
            PatternFamily::Complete => TopologyPattern::Complete(data),
            PatternFamily::Star => TopologyPattern::Star(data),
            PatternFamily::Path if ancilla == 0 => TopologyPattern::Path(data),
            PatternFamily::Path => {
                if ancilla != data - 1 {
                    return Err(TopologyError::InvalidPattern(format!(
                        "a chain of {data} data qubits takes {} ancillas, got {ancilla}",
                        data - 1
                    )));
                }
                // d0 - a0 - d1 - a1 - ... - d(k)
                let edges = (0..ancilla).flat_map(|i| [(i, data + i), (data + i, i + 1)]);
                TopologyPattern::Explicit(ExplicitPattern::new(size, edges)?)
            }
            PatternFamily::Custom => {
                let edges = custom.ok_or_else(|| {
                    TopologyError::InvalidPattern(format!(
                        "circuit type '{CUSTOM_CIRCUIT_TYPE}' requires an explicit adjacency"
                    ))
                })?;
                TopologyPattern::Explicit(ExplicitPattern::new(size, edges.iter().copied())?)
            }
        };

        Ok(ResolvedPattern {
            pattern,
            data_slots: data,
        })
    }
}

fn normalise(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
