//! # Fusebench Core
//!
//! Library for comparing retrieval strategies on a shared query set.
//!
//! Ranked lists from heterogeneous backends are merged with Reciprocal Rank
//! Fusion or weighted-score fusion, scored against gold relevance data with
//! standard IR metrics, and aggregated into a per-method comparison table.
//!
//! ## Modules
//!
//! - [`search`] - Ranked-list model, fusion engine, backend trait and in-memory backends
//! - [`evaluation`] - Metrics, cross-query aggregation, run execution, latency, dataset I/O
//! - [`config`] - Defaults and the explicit [`FusebenchConfig`](config::FusebenchConfig)
//! - [`error`] - Error types for fusion, backends, datasets and configuration

pub mod config;
pub mod error;
pub mod evaluation;
pub mod search;
