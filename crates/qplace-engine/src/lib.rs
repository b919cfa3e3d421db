//! qplace Recommendation Engine
//!
//! Picks the best-performing connected group of physical qubits for a
//! circuit's connectivity requirement, using live calibration data.
//!
//! # Overview
//!
//! - [`Recommender`]: synchronous orchestration of one request
//! - [`RecommendationService`]: async front end with metering hooks
//! - [`CandidateSearch`]: bounded seed/expand/assign search
//! - [`ScoreBreakdown`]: quality, connectivity and unmet-edge terms
//! - [`EngineConfig`]: weights, budgets and policy, from YAML and `QPLACE_*`
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use qplace_calibration::{SnapshotBuilder, SnapshotStore};
//! use qplace_engine::{EngineConfig, RecommendationRequest, Recommender};
//!
//! let store = Arc::new(SnapshotStore::new());
//! store.ingest(SnapshotBuilder::linear("line_5q", 5).build().unwrap());
//!
//! let recommender = Recommender::new(store, EngineConfig::default());
//! let rec = recommender
//!     .get_recommendation(&RecommendationRequest::new("line_5q", "repetition", 3))
//!     .unwrap();
//!
//! assert_eq!(rec.qubits.len(), 3);
//! assert_eq!(rec.unmet_edges, 0);
//! ```

pub mod candidate;
pub mod clock;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod recommendation;
pub mod request;
pub mod scoring;
pub mod search;
pub mod service;
pub mod telemetry;

pub use candidate::{Candidate, CandidateSummary};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, EngineConfig, LoggingConfig, ScoringWeights, SearchConfig};
pub use error::{EngineError, EngineResult};
pub use orchestrator::{Recommender, RequestPhase};
pub use recommendation::{RankedCandidate, Recommendation, RunnerUp};
pub use request::{AUTO_BACKEND, BackendSelector, RecommendationRequest};
pub use scoring::{ScoreBreakdown, score};
pub use search::{CandidateSearch, SearchOutcome};
pub use service::{Metering, NoopMetering, RecommendationService, UsageEvent, UsageKind};
pub use telemetry::{LogFormat, LogSettings, init_logging};
