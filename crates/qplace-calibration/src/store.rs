//! Latest-snapshot-per-backend store.
//!
//! The [`SnapshotStore`] holds one `Arc<CalibrationSnapshot>` per backend
//! name. Ingestion swaps the `Arc` in a single map write, so a reader holds
//! either the old snapshot or the new one in full, never a mix. Readers
//! only take the lock long enough to clone the `Arc`; everything after
//! that works on the immutable snapshot without coordination.

use rustc_hash::FxHashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::error::{CalibrationError, CalibrationResult};
use crate::snapshot::CalibrationSnapshot;

/// Store of the most recent calibration snapshot for each backend.
///
/// No history is kept: ingesting a snapshot discards the previous one.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    snapshots: RwLock<FxHashMap<String, Arc<CalibrationSnapshot>>>,
}

impl SnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest snapshot for `backend`.
    pub fn current_snapshot(&self, backend: &str) -> CalibrationResult<Arc<CalibrationSnapshot>> {
        // The map only ever holds complete `Arc`s, so a poisoned lock is still consistent.
        let snapshots = self.snapshots.read().unwrap_or_else(PoisonError::into_inner);
        snapshots
            .get(backend)
            .cloned()
            .ok_or_else(|| CalibrationError::NoTelemetryAvailable(backend.to_string()))
    }

    /// Replace the snapshot for the snapshot's backend.
    ///
    /// Returns the snapshot that was replaced, if any. A snapshot older than
    /// the one it replaces is still stored (the telemetry source is
    /// authoritative) but logged.
    pub fn ingest(
        &self,
        snapshot: impl Into<Arc<CalibrationSnapshot>>,
    ) -> Option<Arc<CalibrationSnapshot>> {
        let snapshot = snapshot.into();
        let backend = snapshot.backend().to_string();

        let previous = {
            let mut snapshots = self.snapshots.write().unwrap_or_else(PoisonError::into_inner);
            snapshots.insert(backend.clone(), Arc::clone(&snapshot))
        };

        match &previous {
            Some(old) if old.captured_at() > snapshot.captured_at() => {
                warn!(
                    backend = %backend,
                    previous = %old.captured_at(),
                    ingested = %snapshot.captured_at(),
                    "Ingested snapshot is older than the one it replaced"
                );
            }
            Some(_) => {
                debug!(backend = %backend, "Replaced calibration snapshot");
            }
            None => {}
        }
        info!(
            backend = %backend,
            qubits = snapshot.num_qubits(),
            couplings = snapshot.coupling().num_couplings(),
            captured_at = %snapshot.captured_at(),
            "Ingested calibration snapshot"
        );

        previous
    }

    /// Names of all backends with a snapshot, sorted.
    pub fn backends(&self) -> Vec<String> {
        let snapshots = self.snapshots.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = snapshots.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a snapshot exists for `backend`.
    pub fn contains(&self, backend: &str) -> bool {
        self.snapshots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(backend)
    }

    /// Number of backends with a snapshot.
    pub fn len(&self) -> usize {
        self.snapshots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
