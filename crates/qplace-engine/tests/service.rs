//! Async service: metering pre-flight and usage events.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use qplace_calibration::{SnapshotBuilder, SnapshotStore};
use qplace_engine::{
    EngineConfig, EngineError, Metering, RecommendationRequest, RecommendationService, Recommender,
    UsageEvent, UsageKind,
};
use tokio::sync::Mutex;

/// Admits up to `limit` requests and keeps every recorded event.
#[derive(Default)]
struct CountingMeter {
    limit: usize,
    admitted: AtomicUsize,
    events: Mutex<Vec<UsageEvent>>,
}

impl CountingMeter {
    fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Metering for CountingMeter {
    async fn preflight(&self, _request: &RecommendationRequest) -> Result<(), String> {
        if self.admitted.fetch_add(1, Ordering::SeqCst) < self.limit {
            Ok(())
        } else {
            Err(format!("credit limit of {} requests reached", self.limit))
        }
    }

    async fn record(&self, event: UsageEvent) {
        self.events.lock().await.push(event);
    }
}

fn service(meter: Arc<CountingMeter>) -> RecommendationService {
    let store = Arc::new(SnapshotStore::new());
    store.ingest(SnapshotBuilder::grid("grid_3x3", 3, 3).build().unwrap());
    let recommender = Arc::new(Recommender::new(store, EngineConfig::default()));
    RecommendationService::new(recommender).with_metering(meter)
}

#[tokio::test]
async fn test_recommendation_records_one_event() {
    let meter = Arc::new(CountingMeter::with_limit(10));
    let service = service(Arc::clone(&meter));

    let rec = service
        .get_recommendation(RecommendationRequest::new("grid_3x3", "repetition", 4))
        .await
        .unwrap();
    assert_eq!(rec.qubits.len(), 4);

    let events = meter.events.lock().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, UsageKind::Recommendation);
    assert_eq!(events[0].backend, "grid_3x3");
    assert_eq!(events[0].circuit_type, "repetition");
    assert_eq!(events[0].qubits, 4);
}

#[tokio::test]
async fn test_rejection_is_surfaced_verbatim() {
    let meter = Arc::new(CountingMeter::with_limit(0));
    let service = service(Arc::clone(&meter));

    let err = service
        .get_recommendation(RecommendationRequest::new("grid_3x3", "vqe", 2))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::QuotaExceeded(ref m) if m == "credit limit of 0 requests reached"));
    assert!(meter.events.lock().await.is_empty());
}

#[tokio::test]
async fn test_failed_request_records_nothing() {
    let meter = Arc::new(CountingMeter::with_limit(10));
    let service = service(Arc::clone(&meter));

    let err = service
        .get_recommendation(RecommendationRequest::new("unknown_backend", "vqe", 2))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoTelemetryAvailable(_)));
    assert!(meter.events.lock().await.is_empty());
}

#[tokio::test]
async fn test_list_candidates_is_metered() {
    let meter = Arc::new(CountingMeter::with_limit(10));
    let service = service(Arc::clone(&meter));

    let listed = service
        .list_candidates(RecommendationRequest::new("grid_3x3", "vqe", 2))
        .await
        .unwrap();
    assert!(!listed.is_empty());

    let events = meter.events.lock().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, UsageKind::CandidateListing);
}

#[tokio::test]
async fn test_concurrent_requests_get_distinct_ids() {
    let meter = Arc::new(CountingMeter::with_limit(100));
    let service = service(Arc::clone(&meter));

    let handles: Vec<_> = (1..=8)
        .map(|n| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .get_recommendation(RecommendationRequest::new("grid_3x3", "qaoa", n))
                    .await
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    let events = meter.events.lock().await;
    assert_eq!(events.len(), 8);
    let mut ids: Vec<_> = events.iter().map(|e| e.request_id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}
