//! qplace Calibration Data
//!
//! This crate holds the device-side inputs of qubit placement: per-qubit
//! error metrics, the coupling graph, and the store that keeps the latest
//! snapshot of each backend.
//!
//! # Overview
//!
//! - [`PhysicalQubit`] / [`CouplingEdge`]: raw calibration records
//! - [`CouplingGraph`]: validated connectivity with pair errors and components
//! - [`CalibrationSnapshot`]: one immutable, timestamped capture
//! - [`SnapshotStore`]: latest snapshot per backend, swapped atomically
//! - [`SnapshotBuilder`]: synthetic devices (linear, full, star, grid)
//!
//! # Example
//!
//! ```
//! use qplace_calibration::{SnapshotBuilder, SnapshotStore};
//!
//! let store = SnapshotStore::new();
//! store.ingest(SnapshotBuilder::grid("grid_3x3", 3, 3).build().unwrap());
//!
//! let snapshot = store.current_snapshot("grid_3x3").unwrap();
//! assert_eq!(snapshot.num_qubits(), 9);
//! assert!(store.current_snapshot("unknown").is_err());
//! ```

pub mod builder;
pub mod coupling;
pub mod error;
pub mod qubit;
pub mod snapshot;
pub mod store;

pub use builder::SnapshotBuilder;
pub use coupling::{CouplingEdge, CouplingGraph};
pub use error::{CalibrationError, CalibrationResult};
pub use qubit::{PhysicalQubit, PhysicalQubitId};
pub use snapshot::CalibrationSnapshot;
pub use store::SnapshotStore;
