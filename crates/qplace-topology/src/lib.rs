//! qplace Topology Patterns
//!
//! Circuits are placed against a connectivity requirement rather than a
//! gate list. This crate turns a circuit type (or a caller-supplied
//! adjacency) into that requirement.
//!
//! # Example
//!
//! ```
//! use qplace_topology::{TopologyCatalog, TopologyPattern};
//!
//! let catalog = TopologyCatalog::new();
//! let pattern = catalog.resolve("repetition", 4, None).unwrap();
//! assert_eq!(pattern, TopologyPattern::Path(4));
//! assert_eq!(pattern.edges(), vec![(0, 1), (1, 2), (2, 3)]);
//!
//! let triangle = catalog.resolve("custom", 3, Some(&[(0, 1), (1, 2), (2, 0)])).unwrap();
//! assert_eq!(triangle.num_edges(), 3);
//! ```

pub mod catalog;
pub mod error;
pub mod pattern;

pub use catalog::{CUSTOM_CIRCUIT_TYPE, PatternFamily, ResolvedPattern, TopologyCatalog};
pub use error::{TopologyError, TopologyResult};
pub use pattern::{ExplicitPattern, TopologyPattern};
