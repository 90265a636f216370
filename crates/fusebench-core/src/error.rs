//! Error types for fusebench-core.
//!
//! Errors are split by origin: fusion configuration, retrieval backends,
//! dataset files, and configuration files. Data conditions that occur in
//! normal query traffic (empty relevance sets, short result lists, duplicate
//! ids) are not errors; the metric and fusion functions define fallback
//! values for them instead.

use thiserror::Error;

/// Errors raised when a fusion call receives an invalid configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FusionError {
    /// No ranked lists were supplied
    #[error("No ranked lists supplied for fusion")]
    NoLists,
    /// Weighted fusion needs exactly one weight per list
    #[error("Weight count mismatch: {lists} lists but {weights} weights")]
    WeightCountMismatch {
        /// Number of ranked lists supplied
        lists: usize,
        /// Number of weights supplied
        weights: usize,
    },
    /// Fusion method name not recognised
    #[error("Unknown fusion method: {0} (expected \"rrf\" or \"weighted\")")]
    UnknownMethod(String),
    /// A weight is NaN or infinite
    #[error("Invalid fusion weight: {0}")]
    InvalidWeight(String),
}

/// Errors returned by retrieval backends.
///
/// These never reach the fusion or metrics code: callers either propagate
/// them or substitute an empty list via
/// [`search_or_empty`](crate::search::backend::search_or_empty).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// Backend could not be reached or failed internally
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    /// Query lacks the representation this backend searches with
    #[error("Query has no {0} representation")]
    MissingRepresentation(&'static str),
    /// Query vector dimension does not match the index
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the indexed vectors
        expected: usize,
        /// Dimension of the query vector
        actual: usize,
    },
    /// Request parameters are unusable
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors that can occur while reading or writing dataset files.
#[derive(Debug, Clone, Error)]
pub enum DatasetError {
    /// Failed to read or write the file
    #[error("I/O error on {path}: {message}")]
    Io {
        /// File involved
        path: String,
        /// Underlying error message
        message: String,
    },
    /// File content is not in the expected format
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// File involved
        path: String,
        /// Underlying error message
        message: String,
    },
}

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config {path}: {message}")]
    Read {
        /// File involved
        path: String,
        /// Underlying error message
        message: String,
    },
    /// Configuration file is not valid TOML for this schema
    #[error("Failed to parse config: {0}")]
    Parse(String),
    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<FusionError> for ConfigError {
    fn from(err: FusionError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}

impl From<FusionError> for BackendError {
    fn from(err: FusionError) -> Self {
        BackendError::InvalidRequest(err.to_string())
    }
}
