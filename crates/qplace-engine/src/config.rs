//! Engine configuration.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with `QPLACE_` prefix)
//! 3. .env files
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Score weights
    #[serde(default)]
    pub scoring: ScoringWeights,

    /// Candidate search budget
    #[serde(default)]
    pub search: SearchConfig,

    /// Snapshot age (seconds) above which a recommendation is flagged stale
    #[serde(default = "default_staleness_threshold")]
    pub staleness_threshold_secs: u64,

    /// Maximum number of runner-ups returned with a recommendation
    #[serde(default = "default_max_runner_ups")]
    pub max_runner_ups: usize,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Weights of the fidelity score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Weight of the per-qubit quality term
    #[serde(default = "default_weight")]
    pub quality_weight: f64,

    /// Weight of the matched-edge connectivity term
    #[serde(default = "default_weight")]
    pub connectivity_weight: f64,

    /// Extra cost per unmet pattern edge, on top of the full quality and
    /// connectivity range
    #[serde(default = "default_weight")]
    pub unmet_edge_penalty: f64,
}

/// Candidate search budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of seed qubits expanded per request
    #[serde(default = "default_max_seeds")]
    pub max_seeds: usize,

    /// Maximum number of distinct candidates kept
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Wall-clock ceiling for the search in milliseconds
    #[serde(default = "default_time_budget_ms")]
    pub time_budget_ms: u64,

    /// Largest pattern size assigned by trying every permutation
    #[serde(default = "default_exact_assignment_limit")]
    pub exact_assignment_limit: usize,

    /// Pairwise-swap passes for larger patterns
    #[serde(default = "default_local_search_passes")]
    pub local_search_passes: usize,

    /// Expand seeds on the rayon thread pool
    #[serde(default = "default_true")]
    pub parallel: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "console" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_weight() -> f64 {
    1.0
}

fn default_max_seeds() -> usize {
    64
}

fn default_max_candidates() -> usize {
    64
}

fn default_time_budget_ms() -> u64 {
    500
}

fn default_exact_assignment_limit() -> usize {
    7 // 5040 permutations
}

fn default_local_search_passes() -> usize {
    8
}

fn default_staleness_threshold() -> u64 {
    3600 // 1 hour
}

fn default_max_runner_ups() -> usize {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "console".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringWeights::default(),
            search: SearchConfig::default(),
            staleness_threshold_secs: default_staleness_threshold(),
            max_runner_ups: default_max_runner_ups(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            quality_weight: default_weight(),
            connectivity_weight: default_weight(),
            unmet_edge_penalty: default_weight(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_seeds: default_max_seeds(),
            max_candidates: default_max_candidates(),
            time_budget_ms: default_time_budget_ms(),
            exact_assignment_limit: default_exact_assignment_limit(),
            local_search_passes: default_local_search_passes(),
            parallel: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl SearchConfig {
    /// Search time budget.
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }
}

impl EngineConfig {
    /// Parse configuration from YAML text.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            serde_yaml_ng::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml_str(&contents)
    }

    /// Load configuration with the following precedence:
    /// 1. Load .env file if it exists
    /// 2. Load from file if provided
    /// 3. Apply environment variable overrides
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        let config = config.merge_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Merge variables from `lookup` into this configuration.
    ///
    /// Only variables that are set override the current values; a set but
    /// unparsable value is an error rather than silently ignored.
    pub fn merge_env_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Scoring
        override_parsed(&lookup, "QPLACE_QUALITY_WEIGHT", &mut self.scoring.quality_weight)?;
        override_parsed(
            &lookup,
            "QPLACE_CONNECTIVITY_WEIGHT",
            &mut self.scoring.connectivity_weight,
        )?;
        override_parsed(
            &lookup,
            "QPLACE_UNMET_EDGE_PENALTY",
            &mut self.scoring.unmet_edge_penalty,
        )?;

        // Search
        override_parsed(&lookup, "QPLACE_MAX_SEEDS", &mut self.search.max_seeds)?;
        override_parsed(&lookup, "QPLACE_MAX_CANDIDATES", &mut self.search.max_candidates)?;
        override_parsed(&lookup, "QPLACE_TIME_BUDGET_MS", &mut self.search.time_budget_ms)?;
        override_parsed(
            &lookup,
            "QPLACE_EXACT_ASSIGNMENT_LIMIT",
            &mut self.search.exact_assignment_limit,
        )?;
        override_parsed(
            &lookup,
            "QPLACE_LOCAL_SEARCH_PASSES",
            &mut self.search.local_search_passes,
        )?;
        override_parsed(&lookup, "QPLACE_PARALLEL_SEARCH", &mut self.search.parallel)?;

        // Policy
        override_parsed(
            &lookup,
            "QPLACE_STALENESS_THRESHOLD_SECS",
            &mut self.staleness_threshold_secs,
        )?;
        override_parsed(&lookup, "QPLACE_MAX_RUNNER_UPS", &mut self.max_runner_ups)?;

        // Logging
        if let Some(v) = lookup("QPLACE_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("QPLACE_LOG_FORMAT") {
            self.logging.format = v;
        }

        Ok(self)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("quality_weight", self.scoring.quality_weight),
            ("connectivity_weight", self.scoring.connectivity_weight),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        let penalty = self.scoring.unmet_edge_penalty;
        if !penalty.is_finite() || penalty <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "unmet_edge_penalty must be a finite positive number, got {penalty}"
            )));
        }

        if self.search.max_seeds == 0 {
            return Err(ConfigError::ValidationError(
                "max_seeds must be greater than 0".to_string(),
            ));
        }
        if self.search.max_candidates == 0 {
            return Err(ConfigError::ValidationError(
                "max_candidates must be greater than 0".to_string(),
            ));
        }
        if self.search.time_budget_ms == 0 {
            return Err(ConfigError::ValidationError(
                "time_budget_ms must be greater than 0".to_string(),
            ));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {other}"
                )));
            }
        }
        match self.logging.format.as_str() {
            "console" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {other}"
                )));
            }
        }

        Ok(())
    }

    /// Staleness threshold as a duration.
    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_secs(self.staleness_threshold_secs)
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw.trim().parse().map_err(|_| {
            ConfigError::ValidationError(format!("{key}: cannot parse '{raw}'"))
        })?;
    }
    Ok(())
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file: {0}")]
    IoError(String),

    /// The configuration file is not valid YAML for [`EngineConfig`].
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: FxHashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scoring.unmet_edge_penalty, 1.0);
        assert_eq!(config.search.max_seeds, 64);
        assert_eq!(config.staleness_threshold(), Duration::from_secs(3600));
        assert_eq!(config.search.time_budget(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = EngineConfig::from_yaml_str(
            "scoring:\n  unmet_edge_penalty: 4.0\nsearch:\n  parallel: false\n",
        )
        .unwrap();
        assert_eq!(config.scoring.unmet_edge_penalty, 4.0);
        assert_eq!(config.scoring.quality_weight, 1.0);
        assert!(!config.search.parallel);
        assert_eq!(config.search.max_candidates, 64);
        assert_eq!(config.max_runner_ups, 3);
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::default()
            .merge_env_from(env(&[
                ("QPLACE_MAX_RUNNER_UPS", "5"),
                ("QPLACE_PARALLEL_SEARCH", "false"),
                ("QPLACE_LOG_FORMAT", "json"),
                ("QPLACE_QUALITY_WEIGHT", " 2.5 "),
            ]))
            .unwrap();
        assert_eq!(config.max_runner_ups, 5);
        assert!(!config.search.parallel);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.scoring.quality_weight, 2.5);
        assert_eq!(config.search.max_seeds, 64);
    }

    #[test]
    fn test_unparsable_env_value() {
        let err = EngineConfig::default()
            .merge_env_from(env(&[("QPLACE_MAX_SEEDS", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref m) if m.contains("QPLACE_MAX_SEEDS")));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.scoring.unmet_edge_penalty = 0.0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.scoring.quality_weight = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.search.max_candidates = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_yaml() {
        let err = EngineConfig::from_yaml_str("scoring: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
