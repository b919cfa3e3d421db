//! Async request service with metering hooks.
//!
//! [`RecommendationService`] wraps a [`Recommender`] for async callers:
//! the metering collaborator can reject a request before any work is done,
//! the search runs on tokio's blocking pool, and every completed request
//! emits one [`UsageEvent`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::orchestrator::Recommender;
use crate::recommendation::{RankedCandidate, Recommendation};
use crate::request::RecommendationRequest;

/// Kind of work a usage event accounts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    /// A `get_recommendation` call.
    Recommendation,
    /// A `list_candidates` call.
    CandidateListing,
}

/// One unit of work performed, reported to the metering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Unique id of the request.
    pub request_id: Uuid,
    /// Kind of work.
    pub kind: UsageKind,
    /// Backend that served the request.
    pub backend: String,
    /// Circuit type of the request.
    pub circuit_type: String,
    /// Number of qubits placed.
    pub qubits: usize,
    /// Completion time.
    pub timestamp: DateTime<Utc>,
}

/// External billing/metering collaborator.
#[async_trait]
pub trait Metering: Send + Sync {
    /// Admit or reject a request before any work is done.
    ///
    /// A rejection reason is surfaced to the caller unchanged as
    /// [`EngineError::QuotaExceeded`].
    async fn preflight(&self, request: &RecommendationRequest) -> Result<(), String>;

    /// Record a completed request.
    async fn record(&self, event: UsageEvent);
}

/// Metering that admits everything and records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetering;

#[async_trait]
impl Metering for NoopMetering {
    async fn preflight(&self, _request: &RecommendationRequest) -> Result<(), String> {
        Ok(())
    }

    async fn record(&self, _event: UsageEvent) {}
}

/// Async front end of the recommender.
#[derive(Clone)]
pub struct RecommendationService {
    recommender: Arc<Recommender>,
    metering: Arc<dyn Metering>,
}

impl RecommendationService {
    /// Create a service without metering.
    pub fn new(recommender: Arc<Recommender>) -> Self {
        Self {
            recommender,
            metering: Arc::new(NoopMetering),
        }
    }

    /// Replace the metering collaborator.
    pub fn with_metering(mut self, metering: Arc<dyn Metering>) -> Self {
        self.metering = metering;
        self
    }

    /// The underlying recommender.
    pub fn recommender(&self) -> &Arc<Recommender> {
        &self.recommender
    }

    /// Best placement for `request`.
    pub async fn get_recommendation(
        &self,
        request: RecommendationRequest,
    ) -> EngineResult<Recommendation> {
        self.admit(&request).await?;

        let recommender = Arc::clone(&self.recommender);
        let worker_request = request.clone();
        let recommendation =
            tokio::task::spawn_blocking(move || recommender.get_recommendation(&worker_request))
                .await
                .map_err(|e| EngineError::Internal(format!("Recommendation task failed: {e}")))??;

        self.record(
            UsageKind::Recommendation,
            &recommendation.backend,
            &request,
        )
        .await;
        Ok(recommendation)
    }

    /// Every distinct candidate for `request`, best first.
    pub async fn list_candidates(
        &self,
        request: RecommendationRequest,
    ) -> EngineResult<Vec<RankedCandidate>> {
        self.admit(&request).await?;

        let recommender = Arc::clone(&self.recommender);
        let worker_request = request.clone();
        let candidates =
            tokio::task::spawn_blocking(move || recommender.list_candidates(&worker_request))
                .await
                .map_err(|e| EngineError::Internal(format!("Candidate listing task failed: {e}")))??;

        let backend = candidates
            .first()
            .map_or_else(|| request.backend.to_string(), |c| c.backend.clone());
        self.record(UsageKind::CandidateListing, &backend, &request)
            .await;
        Ok(candidates)
    }

    async fn admit(&self, request: &RecommendationRequest) -> EngineResult<()> {
        self.metering.preflight(request).await.map_err(|reason| {
            info!(backend = %request.backend, reason = %reason, "Request rejected by metering");
            EngineError::QuotaExceeded(reason)
        })
    }

    async fn record(&self, kind: UsageKind, backend: &str, request: &RecommendationRequest) {
        let event = UsageEvent {
            request_id: Uuid::new_v4(),
            kind,
            backend: backend.to_string(),
            circuit_type: request.circuit_type.clone(),
            qubits: request.total_qubits(),
            timestamp: Utc::now(),
        };
        debug!(request_id = %event.request_id, kind = ?kind, "Recording usage");
        self.metering.record(event).await;
    }
}

impl std::fmt::Debug for RecommendationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationService")
            .field("recommender", &self.recommender)
            .field("metering", &"<dyn Metering>")
            .finish()
    }
}
