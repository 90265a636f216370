//! Evaluation: metrics, aggregation, run execution and dataset I/O.
//!
//! # Overview
//!
//! 1. Produce a run per method, either by executing backends
//!    ([`runner::run_methods`]) or by loading saved results
//!    ([`datasets::load_method_results`]).
//! 2. Load gold relevance data ([`datasets::load_gold_queries`],
//!    [`datasets::relevance_sets`]).
//! 3. Compare methods ([`compare::compare_methods`]).
//!
//! # Example
//!
//! ```
//! use fusebench_core::evaluation::{compare_methods, MethodResults, QueryResults, RelevanceSets};
//!
//! let mut run = QueryResults::new();
//! run.insert("q1".to_string(), vec!["d5".to_string(), "d2".to_string()]);
//! let mut all = MethodResults::new();
//! all.insert("dense".to_string(), run);
//!
//! let mut relevant = RelevanceSets::new();
//! relevant.insert("q1".to_string(), ["d2".to_string()].into_iter().collect());
//!
//! let table = compare_methods(&all, &relevant, &[1, 3, 5, 10]);
//! assert_eq!(table.get("dense").unwrap().get("mrr"), Some(0.5));
//! ```
//!
//! # Metrics Reference
//!
//! | Metric | Description | Cutoff |
//! |--------|-------------|--------|
//! | recall@k | Fraction of relevant documents found in the top k | each configured k |
//! | precision@k | Fraction of the top k that is relevant | each configured k |
//! | f1@k | Harmonic mean of precision@k and recall@k | each configured k |
//! | mrr | Reciprocal rank of the first relevant document | none |
//! | ndcg@10 | Position-discounted gain, normalized by the ideal ranking | 10 |
//! | map@10 | Mean of precision at each relevant position | 10 |

pub mod compare;
pub mod datasets;
pub mod latency;
pub mod metrics;
pub mod runner;

pub use compare::{
    compare_methods, ComparisonTable, MethodResults, MethodSummary, QueryResults, RelevanceSets,
    KEY_METRICS,
};
pub use datasets::{
    load_gold_queries, load_method_results, load_scored_run, relevance_sets, save_json, GoldQuery,
    ScoredRun,
};
pub use latency::{measure_latency, LatencyStats};
pub use metrics::{
    f1_at_k, map_at_k, map_at_k_with_policy, mrr, ndcg_at_k, ndcg_at_k_with_policy,
    precision_at_k, recall_at_k, DuplicatePolicy, Evaluator, MetricsMap,
};
pub use runner::{run_backend, run_methods};
