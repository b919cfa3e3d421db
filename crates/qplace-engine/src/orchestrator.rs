//! Recommendation orchestration.
//!
//! Each request runs through
//! `Validating → Resolving → Searching → Scoring → Ranking → Done`,
//! or ends in `Failed` from whichever phase it was in. Requests only read the
//! snapshot store; any number of them can run concurrently.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::TimeDelta;
use qplace_calibration::{CalibrationSnapshot, PhysicalQubitId, SnapshotStore};
use qplace_topology::{ResolvedPattern, TopologyCatalog};
use tracing::{debug, info, info_span, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::recommendation::{RankedCandidate, Recommendation, RunnerUp};
use crate::request::{BackendSelector, RecommendationRequest};
use crate::scoring::ScoreBreakdown;
use crate::search::CandidateSearch;

/// Phase of a recommendation request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestPhase {
    /// Checking sizes and resolving the topology pattern.
    Validating,
    /// Fetching the calibration snapshot.
    Resolving,
    /// Running the candidate search.
    Searching,
    /// Scoring candidates.
    Scoring,
    /// Ordering candidates.
    Ranking,
    /// Finished.
    Done,
    /// Stopped with an error.
    Failed {
        /// Why the request failed.
        reason: String,
    },
}

impl RequestPhase {
    /// Whether the request has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }

    /// Move to `Done` or `Failed` according to `result`, returning the
    /// phase the request was in.
    pub fn finish<T>(&mut self, result: &EngineResult<T>) -> RequestPhase {
        let next = match result {
            Ok(_) => Self::Done,
            Err(e) => Self::Failed {
                reason: e.to_string(),
            },
        };
        std::mem::replace(self, next)
    }
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::Resolving => "resolving",
            Self::Searching => "searching",
            Self::Scoring => "scoring",
            Self::Ranking => "ranking",
            Self::Done => "done",
            Self::Failed { .. } => "failed",
        };
        f.write_str(name)
    }
}

/// Ranked candidates of one backend.
#[derive(Debug)]
struct Evaluation {
    backend: String,
    ranked: Vec<RankedCandidate>,
    snapshot_age_secs: f64,
    stale: bool,
    candidates_evaluated: usize,
    truncated: bool,
}

/// Evaluations of every backend searched for one request.
#[derive(Debug)]
struct Sweep {
    evaluations: Vec<Evaluation>,
    /// Eligible backends left unsearched because the deadline passed.
    deadline_skipped: usize,
}

/// Reports whether the caller's deadline has passed.
fn deadline_check(deadline: Option<Duration>) -> impl Fn() -> bool + Sync {
    // A deadline too far out to represent never expires.
    let at = deadline.and_then(|d| Instant::now().checked_add(d));
    move || at.is_some_and(|at| Instant::now() >= at)
}

/// Ranked candidate with its sorted qubit set for tie-breaking.
struct Keyed {
    ranked: RankedCandidate,
    set: Vec<PhysicalQubitId>,
}

/// Score descending, then lower mean single-qubit error, then the lower
/// sorted qubit tuple, then the lower backend name.
fn rank_order(a: &Keyed, b: &Keyed) -> Ordering {
    b.ranked
        .score
        .total_cmp(&a.ranked.score)
        .then_with(|| {
            a.ranked
                .candidate
                .mean_single_qubit_error
                .total_cmp(&b.ranked.candidate.mean_single_qubit_error)
        })
        .then_with(|| a.set.cmp(&b.set))
        .then_with(|| a.ranked.backend.cmp(&b.ranked.backend))
}

fn keyed(ranked: RankedCandidate) -> Keyed {
    let mut set = ranked.candidate.qubits.clone();
    set.sort_unstable();
    Keyed { ranked, set }
}

/// Computes recommendations against the snapshot store.
#[derive(Debug, Clone)]
pub struct Recommender {
    store: Arc<SnapshotStore>,
    catalog: TopologyCatalog,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl Recommender {
    /// Create a recommender with the built-in catalog and the system clock.
    pub fn new(store: Arc<SnapshotStore>, config: EngineConfig) -> Self {
        Self {
            store,
            catalog: TopologyCatalog::new(),
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the topology catalog.
    pub fn with_catalog(mut self, catalog: TopologyCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The snapshot store.
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// The topology catalog.
    pub fn catalog(&self) -> &TopologyCatalog {
        &self.catalog
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Best placement for `request`, with runner-ups.
    pub fn get_recommendation(
        &self,
        request: &RecommendationRequest,
    ) -> EngineResult<Recommendation> {
        let span = info_span!(
            "recommendation",
            backend = %request.backend,
            circuit_type = %request.circuit_type,
            qubits = request.total_qubits()
        );
        let _enter = span.enter();

        let mut phase = RequestPhase::Validating;
        let expired = deadline_check(request.deadline);
        let result = self.recommend(request, &expired, &mut phase);
        let last = phase.finish(&result);
        match &result {
            Ok(rec) => info!(
                backend = %rec.backend,
                qubits = ?rec.qubits,
                score = rec.score,
                unmet_edges = rec.unmet_edges,
                stale = rec.stale,
                "Recommendation ready"
            ),
            Err(e) => warn!(phase = %last, error = %e, "Recommendation failed"),
        }
        result
    }

    /// Every distinct candidate for `request`, best first.
    ///
    /// With `"auto"` the candidates of all eligible backends are merged
    /// into one ranking.
    pub fn list_candidates(
        &self,
        request: &RecommendationRequest,
    ) -> EngineResult<Vec<RankedCandidate>> {
        let span = info_span!(
            "list_candidates",
            backend = %request.backend,
            circuit_type = %request.circuit_type,
            qubits = request.total_qubits()
        );
        let _enter = span.enter();

        let mut phase = RequestPhase::Validating;
        let expired = deadline_check(request.deadline);
        let result = self.evaluate(request, &expired, &mut phase).map(|sweep| {
            let mut all: Vec<Keyed> = sweep
                .evaluations
                .into_iter()
                .flat_map(|e| e.ranked)
                .map(keyed)
                .collect();
            all.sort_by(rank_order);
            all.into_iter().map(|k| k.ranked).collect::<Vec<_>>()
        });
        let last = phase.finish(&result);
        match &result {
            Ok(list) => debug!(candidates = list.len(), "Candidates listed"),
            Err(e) => warn!(phase = %last, error = %e, "Candidate listing failed"),
        }
        result
    }

    fn recommend(
        &self,
        request: &RecommendationRequest,
        expired: &(dyn Fn() -> bool + Sync),
        phase: &mut RequestPhase,
    ) -> EngineResult<Recommendation> {
        let resolved = self.validate(request)?;
        let Sweep {
            evaluations,
            deadline_skipped,
        } = self.evaluate_resolved(request, &resolved, expired, phase)?;

        let candidates_evaluated = evaluations.iter().map(|e| e.candidates_evaluated).sum();
        let truncated = deadline_skipped > 0 || evaluations.iter().any(|e| e.truncated);

        // Each evaluation is already ranked; pick the backend with the best top.
        let mut best: Option<(Keyed, Evaluation)> = None;
        for mut evaluation in evaluations {
            if evaluation.ranked.is_empty() {
                continue;
            }
            let top = keyed(evaluation.ranked.remove(0));
            let better = best
                .as_ref()
                .is_none_or(|(current, _)| rank_order(&top, current) == Ordering::Less);
            if better {
                best = Some((top, evaluation));
            }
        }
        let (top, evaluation) = best.ok_or_else(|| {
            EngineError::Internal("search returned no candidates".to_string())
        })?;

        let top = top.ranked;
        let data_slots = resolved.data_slots.min(top.candidate.qubits.len());
        let runner_ups = evaluation
            .ranked
            .iter()
            .take(self.config.max_runner_ups)
            .map(RunnerUp::from)
            .collect();

        Ok(Recommendation {
            data_qubits: top.candidate.qubits[..data_slots].to_vec(),
            ancilla_qubits: top.candidate.qubits[data_slots..].to_vec(),
            qubits: top.candidate.qubits,
            backend: evaluation.backend,
            score: top.score,
            breakdown: top.breakdown,
            snapshot_age_secs: evaluation.snapshot_age_secs,
            unmet_edges: top.breakdown.unmet_edges,
            stale: evaluation.stale,
            runner_ups,
            candidates_evaluated,
            truncated,
        })
    }

    fn evaluate(
        &self,
        request: &RecommendationRequest,
        expired: &(dyn Fn() -> bool + Sync),
        phase: &mut RequestPhase,
    ) -> EngineResult<Sweep> {
        let resolved = self.validate(request)?;
        self.evaluate_resolved(request, &resolved, expired, phase)
    }

    /// Sizes are checked against the target backend before the pattern is
    /// built, so a pattern never outgrows the device it is meant for.
    fn validate(&self, request: &RecommendationRequest) -> EngineResult<ResolvedPattern> {
        if request.data_qubits == 0 {
            return Err(EngineError::InvalidRequest(
                "at least one data qubit is required".to_string(),
            ));
        }
        let n = request.checked_total_qubits().ok_or_else(|| {
            EngineError::InvalidRequest(format!(
                "{} data plus {} ancilla qubits overflow the qubit count",
                request.data_qubits, request.ancilla_qubits
            ))
        })?;
        if self.catalog.family(&request.circuit_type).is_none() {
            return Err(EngineError::UnknownCircuitType(request.circuit_type.clone()));
        }

        match &request.backend {
            BackendSelector::Named(name) => {
                let available = self.store.current_snapshot(name)?.num_qubits();
                if n > available {
                    return Err(EngineError::InvalidRequest(format!(
                        "{n} qubits requested but '{name}' has {available}"
                    )));
                }
            }
            BackendSelector::Auto => {
                let largest = self
                    .store
                    .backends()
                    .iter()
                    .filter_map(|name| self.store.current_snapshot(name).ok())
                    .map(|snapshot| snapshot.num_qubits())
                    .max()
                    .ok_or_else(|| {
                        EngineError::NoTelemetryAvailable(request.backend.to_string())
                    })?;
                if n > largest {
                    return Err(EngineError::InvalidRequest(format!(
                        "no backend has {n} qubits (largest has {largest})"
                    )));
                }
            }
        }

        let resolved = self.catalog.resolve_layout(
            &request.circuit_type,
            request.data_qubits,
            request.ancilla_qubits,
            request.custom_pattern.as_deref(),
        )?;
        debug!(pattern = %resolved.pattern, "Resolved topology pattern");
        Ok(resolved)
    }

    fn evaluate_resolved(
        &self,
        request: &RecommendationRequest,
        resolved: &ResolvedPattern,
        expired: &(dyn Fn() -> bool + Sync),
        phase: &mut RequestPhase,
    ) -> EngineResult<Sweep> {
        let n = resolved.size();

        match &request.backend {
            BackendSelector::Named(name) => {
                *phase = RequestPhase::Resolving;
                let snapshot = self.store.current_snapshot(name)?;
                if n > snapshot.num_qubits() {
                    return Err(EngineError::InvalidRequest(format!(
                        "{n} qubits requested but '{name}' has {}",
                        snapshot.num_qubits()
                    )));
                }
                let evaluation = self.evaluate_snapshot(&snapshot, resolved, expired, phase)?;
                Ok(Sweep {
                    evaluations: vec![evaluation],
                    deadline_skipped: 0,
                })
            }
            BackendSelector::Auto => {
                *phase = RequestPhase::Resolving;
                let backends = self.store.backends();
                if backends.is_empty() {
                    return Err(EngineError::NoTelemetryAvailable(request.backend.to_string()));
                }

                let mut evaluations = Vec::new();
                let mut eligible = 0;
                let mut skipped = Vec::new();
                let mut last_failure = None;
                for name in backends {
                    *phase = RequestPhase::Resolving;
                    let snapshot = self.store.current_snapshot(&name)?;
                    if snapshot.num_qubits() < n {
                        continue;
                    }
                    eligible += 1;
                    if expired() {
                        skipped.push(name);
                        continue;
                    }
                    match self.evaluate_snapshot(&snapshot, resolved, expired, phase) {
                        Ok(evaluation) => evaluations.push(evaluation),
                        Err(EngineError::NoCandidateFound(_)) if expired() => skipped.push(name),
                        Err(EngineError::NoCandidateFound(reason)) => {
                            debug!(backend = %name, reason = %reason, "Backend has no candidate");
                            last_failure = Some(reason);
                        }
                        Err(e) => return Err(e),
                    }
                }

                if !skipped.is_empty() {
                    warn!(
                        skipped = ?skipped,
                        searched = evaluations.len(),
                        "Deadline reached before every backend was searched"
                    );
                }

                if eligible == 0 {
                    return Err(EngineError::InvalidRequest(format!(
                        "no backend has {n} qubits"
                    )));
                }
                if evaluations.is_empty() {
                    let reason = if skipped.is_empty() {
                        last_failure.unwrap_or_else(|| {
                            format!("no backend has a connected group of {n} qubits")
                        })
                    } else {
                        format!(
                            "deadline passed before a group of {n} qubits was found on any of {eligible} backends"
                        )
                    };
                    return Err(EngineError::NoCandidateFound(reason));
                }
                Ok(Sweep {
                    evaluations,
                    deadline_skipped: skipped.len(),
                })
            }
        }
    }

    fn evaluate_snapshot(
        &self,
        snapshot: &CalibrationSnapshot,
        resolved: &ResolvedPattern,
        expired: &(dyn Fn() -> bool + Sync),
        phase: &mut RequestPhase,
    ) -> EngineResult<Evaluation> {
        let now = self.clock.now();
        let threshold = i64::try_from(self.config.staleness_threshold_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        let age = snapshot.age(now);
        let stale = snapshot.is_stale(now, threshold);
        let snapshot_age_secs = age.num_milliseconds() as f64 / 1000.0;
        if stale {
            warn!(
                backend = %snapshot.backend(),
                age_secs = snapshot_age_secs,
                threshold_secs = self.config.staleness_threshold_secs,
                "Calibration snapshot is stale"
            );
        }

        *phase = RequestPhase::Searching;
        let outcome = CandidateSearch::new(snapshot, &resolved.pattern, &self.config.search)
            .run_until(expired)?;

        *phase = RequestPhase::Scoring;
        let weights = &self.config.scoring;
        let mut ranked: Vec<Keyed> = outcome
            .candidates
            .iter()
            .map(|candidate| {
                let breakdown = ScoreBreakdown::evaluate(candidate, snapshot);
                keyed(RankedCandidate {
                    backend: snapshot.backend().to_string(),
                    candidate: candidate.summary(snapshot),
                    breakdown,
                    score: breakdown.total(weights),
                })
            })
            .collect();

        *phase = RequestPhase::Ranking;
        ranked.sort_by(rank_order);

        Ok(Evaluation {
            backend: snapshot.backend().to_string(),
            ranked: ranked.into_iter().map(|k| k.ranked).collect(),
            snapshot_age_secs,
            stale,
            candidates_evaluated: outcome.seeds_expanded,
            truncated: outcome.truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use qplace_calibration::SnapshotBuilder;

    fn recommender(store: SnapshotStore) -> Recommender {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        Recommender::new(Arc::new(store), EngineConfig::default())
            .with_clock(Arc::new(FixedClock(at)))
    }

    fn captured(minutes_before_noon: i64) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
            - TimeDelta::minutes(minutes_before_noon)
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(RequestPhase::Validating.to_string(), "validating");
        assert_eq!(RequestPhase::Done.to_string(), "done");
    }

    #[test]
    fn test_finish_records_terminal_phase() {
        let mut phase = RequestPhase::Ranking;
        let last = phase.finish(&Ok::<(), EngineError>(()));
        assert_eq!(last, RequestPhase::Ranking);
        assert_eq!(phase, RequestPhase::Done);
        assert!(phase.is_terminal());

        let mut phase = RequestPhase::Searching;
        let err: EngineResult<()> = Err(EngineError::NoCandidateFound("nothing".into()));
        let last = phase.finish(&err);
        assert_eq!(last, RequestPhase::Searching);
        assert!(matches!(phase, RequestPhase::Failed { ref reason } if reason.contains("nothing")));
        assert_eq!(phase.to_string(), "failed");
        assert!(!RequestPhase::Scoring.is_terminal());
    }

    #[test]
    fn test_oversized_request_fails_while_validating() {
        let store = SnapshotStore::new();
        store.ingest(SnapshotBuilder::grid("grid", 3, 3).build().unwrap());
        let engine = recommender(store);

        let request = RecommendationRequest::new("grid", "custom", 10)
            .with_custom_pattern((0..9).map(|i| (i, i + 1)));
        let mut phase = RequestPhase::Validating;
        let result = engine.recommend(&request, &|| false, &mut phase);
        assert!(matches!(result, Err(EngineError::InvalidRequest(_))));
        assert_eq!(phase.finish(&result), RequestPhase::Validating);
    }

    #[test]
    fn test_zero_qubits_is_invalid() {
        let store = SnapshotStore::new();
        store.ingest(SnapshotBuilder::linear("dev", 3).build().unwrap());
        let err = recommender(store)
            .get_recommendation(&RecommendationRequest::new("dev", "vqe", 0))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequest(_)));
    }

    #[test]
    fn test_validation_precedes_telemetry_lookup() {
        let err = recommender(SnapshotStore::new())
            .get_recommendation(&RecommendationRequest::new("dev", "grover", 3))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownCircuitType(_)));
    }

    #[test]
    fn test_age_and_staleness() {
        let store = SnapshotStore::new();
        store.ingest(
            SnapshotBuilder::linear("fresh", 4)
                .captured_at(captured(10))
                .build()
                .unwrap(),
        );
        store.ingest(
            SnapshotBuilder::linear("old", 4)
                .captured_at(captured(120))
                .build()
                .unwrap(),
        );
        let engine = recommender(store);

        let fresh = engine
            .get_recommendation(&RecommendationRequest::new("fresh", "repetition", 2))
            .unwrap();
        assert_eq!(fresh.snapshot_age_secs, 600.0);
        assert!(!fresh.stale);

        let old = engine
            .get_recommendation(&RecommendationRequest::new("old", "repetition", 2))
            .unwrap();
        assert_eq!(old.snapshot_age_secs, 7200.0);
        assert!(old.stale);
    }

    #[test]
    fn test_ranking_breaks_ties_by_qubit_tuple() {
        let store = SnapshotStore::new();
        store.ingest(SnapshotBuilder::full("uniform", 4).build().unwrap());
        let list = recommender(store)
            .list_candidates(&RecommendationRequest::new("uniform", "vqe", 2))
            .unwrap();

        let sets: Vec<Vec<u32>> = list
            .iter()
            .map(|r| {
                let mut ids: Vec<u32> = r.candidate.qubits.iter().map(|q| q.0).collect();
                ids.sort_unstable();
                ids
            })
            .collect();
        let mut sorted = sets.clone();
        sorted.sort();
        assert_eq!(sets, sorted);
    }

    #[test]
    fn test_runner_ups_are_capped() {
        let store = SnapshotStore::new();
        store.ingest(SnapshotBuilder::grid("grid", 4, 4).build().unwrap());
        let rec = recommender(store)
            .get_recommendation(&RecommendationRequest::new("grid", "repetition", 3))
            .unwrap();
        assert_eq!(rec.runner_ups.len(), 3);
        assert!(rec.runner_ups.iter().all(|r| r.score <= rec.score));
    }

    /// Expires after `checks` calls.
    fn expires_after(checks: usize) -> impl Fn() -> bool + Sync {
        let calls = std::sync::atomic::AtomicUsize::new(0);
        move || calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) >= checks
    }

    fn sequential(store: SnapshotStore) -> Recommender {
        let mut config = EngineConfig::default();
        config.search.parallel = false;
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        Recommender::new(Arc::new(store), config).with_clock(Arc::new(FixedClock(at)))
    }

    #[test]
    fn test_deadline_during_search_keeps_partial_results() {
        let store = SnapshotStore::new();
        store.ingest(SnapshotBuilder::grid("grid", 3, 3).build().unwrap());
        let engine = sequential(store);

        let request = RecommendationRequest::new("grid", "repetition", 3);
        let mut phase = RequestPhase::Validating;
        let rec = engine
            .recommend(&request, &expires_after(2), &mut phase)
            .unwrap();
        assert!(rec.truncated);
        assert_eq!(rec.candidates_evaluated, 2);
        assert_eq!(rec.qubits.len(), 3);
    }

    #[test]
    fn test_auto_reports_backends_skipped_by_deadline() {
        let store = SnapshotStore::new();
        store.ingest(SnapshotBuilder::linear("a", 3).two_qubit_error(0.05).build().unwrap());
        store.ingest(SnapshotBuilder::linear("b", 3).two_qubit_error(0.001).build().unwrap());
        let engine = sequential(store);
        let request = RecommendationRequest::auto("repetition", 2);

        // Unbounded, the quieter backend wins.
        let full = engine.get_recommendation(&request).unwrap();
        assert_eq!(full.backend, "b");
        assert!(!full.truncated);

        // One check before "a", one per seed of "a", then "b" is out of time.
        let mut phase = RequestPhase::Validating;
        let rec = engine
            .recommend(&request, &expires_after(4), &mut phase)
            .unwrap();
        assert_eq!(rec.backend, "a");
        assert!(rec.truncated);
    }

    #[test]
    fn test_auto_with_every_backend_skipped() {
        let store = SnapshotStore::new();
        store.ingest(SnapshotBuilder::linear("a", 3).build().unwrap());
        store.ingest(SnapshotBuilder::linear("b", 3).build().unwrap());
        let engine = sequential(store);

        let mut phase = RequestPhase::Validating;
        let err = engine
            .recommend(&RecommendationRequest::auto("vqe", 2), &|| true, &mut phase)
            .unwrap_err();
        assert!(matches!(err, EngineError::NoCandidateFound(ref m) if m.contains("deadline")));
    }
}
