//! Benchmark configuration.
//!
//! Constants define the defaults used by the library, the CLI and the
//! benches. [`FusebenchConfig`] bundles the tunable values into one explicit
//! object, loaded from TOML at start-up and passed by reference to whatever
//! needs it.
//!
//! # Usage
//!
//! ```
//! use fusebench_core::config::FusebenchConfig;
//!
//! let config = FusebenchConfig::from_toml_str(
//!     r#"
//!     [search.hybrid]
//!     fusion_method = "weighted"
//!     weights = [0.7, 0.3]
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.search.default_top_k, 10);
//! ```

use crate::error::ConfigError;
use crate::evaluation::metrics::DuplicatePolicy;
use crate::search::fusion::FusionMethod;
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// Fusion
// =============================================================================

/// RRF dampening constant.
///
/// Large enough that the difference between rank 1 and rank 2 does not
/// dominate items ranked moderately well by several backends.
pub const DEFAULT_RRF_K: usize = 60;

/// Default weight of the dense list in two-way weighted fusion.
pub const DEFAULT_DENSE_WEIGHT: f64 = 0.6;

/// Default weight of the sparse list in two-way weighted fusion.
pub const DEFAULT_SPARSE_WEIGHT: f64 = 0.4;

/// Each child backend of a hybrid search is asked for
/// `top_k * DEFAULT_CANDIDATE_MULTIPLIER` candidates before fusion.
pub const DEFAULT_CANDIDATE_MULTIPLIER: usize = 2;

// =============================================================================
// Evaluation
// =============================================================================

/// Result list length requested from each backend.
pub const DEFAULT_TOP_K: usize = 10;

/// Cutoffs for recall, precision and F1.
pub const DEFAULT_K_VALUES: [usize; 4] = [1, 3, 5, 10];

/// Fixed cutoff of the `ndcg@10` entry in every metrics map.
pub const NDCG_CUTOFF: usize = 10;

/// Fixed cutoff of the `map@10` entry in every metrics map.
pub const MAP_CUTOFF: usize = 10;

// =============================================================================
// Configuration file
// =============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusebenchConfig {
    /// Retrieval settings
    pub search: SearchConfig,
    /// Metric settings
    pub evaluation: EvaluationConfig,
}

/// Retrieval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of results requested per query
    pub default_top_k: usize,
    /// Candidate over-fetch factor for hybrid search.
    ///
    /// Read by library callers building a
    /// [`FusionBackend`](crate::search::FusionBackend); offline fusion of saved
    /// runs fuses whatever depth the runs were saved with.
    pub candidate_multiplier: usize,
    /// Fusion settings
    pub hybrid: HybridConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: DEFAULT_TOP_K,
            candidate_multiplier: DEFAULT_CANDIDATE_MULTIPLIER,
            hybrid: HybridConfig::default(),
        }
    }
}

/// Fusion settings for hybrid search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    /// `"rrf"` or `"weighted"`
    pub fusion_method: String,
    /// RRF dampening constant
    pub rrf_k: usize,
    /// Weighted-fusion weights, in child-backend order
    pub weights: Vec<f64>,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            fusion_method: "rrf".to_string(),
            rrf_k: DEFAULT_RRF_K,
            weights: vec![DEFAULT_DENSE_WEIGHT, DEFAULT_SPARSE_WEIGHT],
        }
    }
}

impl HybridConfig {
    /// Resolves the configured method name and parameters.
    pub fn fusion_method(&self) -> Result<FusionMethod, ConfigError> {
        Ok(FusionMethod::from_name(
            &self.fusion_method,
            self.rrf_k,
            self.weights.clone(),
        )?)
    }
}

/// Metric settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Cutoffs for recall, precision and F1
    pub k_values: Vec<usize>,
    /// Treatment of repeated ids in MRR, NDCG and MAP
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            k_values: DEFAULT_K_VALUES.to_vec(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl FusebenchConfig {
    /// Parses and validates a TOML document. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: FusebenchConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks that the values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.default_top_k == 0 {
            return Err(ConfigError::Invalid(
                "search.default_top_k must be at least 1".to_string(),
            ));
        }
        if self.search.candidate_multiplier == 0 {
            return Err(ConfigError::Invalid(
                "search.candidate_multiplier must be at least 1".to_string(),
            ));
        }
        if self.evaluation.k_values.is_empty() {
            return Err(ConfigError::Invalid(
                "evaluation.k_values must not be empty".to_string(),
            ));
        }
        if self.evaluation.k_values.contains(&0) {
            return Err(ConfigError::Invalid(
                "evaluation.k_values must be positive".to_string(),
            ));
        }
        if let Some(w) = self.search.hybrid.weights.iter().find(|w| !w.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "search.hybrid.weights contains non-finite value {w}"
            )));
        }
        self.search.hybrid.fusion_method()?;
        Ok(())
    }
}
