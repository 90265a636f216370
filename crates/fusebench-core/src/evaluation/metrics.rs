//! Binary-relevance Information Retrieval metrics.
//!
//! All functions take the retrieved ids in rank order and the set of ids
//! judged relevant for the query:
//! - Recall@k, Precision@k, F1@k
//! - MRR (Mean Reciprocal Rank, over the whole list)
//! - NDCG@k (Normalized Discounted Cumulative Gain)
//! - MAP@k (Mean Average Precision)
//!
//! Every function tolerates lists shorter than `k` and empty relevance sets;
//! none of them fail.
//!
//! # Repeated ids
//!
//! Retrieved ids are usually parent document ids, so several chunks of one
//! document can appear more than once. Recall and precision use set
//! semantics and never count a document twice. MRR, NDCG and MAP follow a
//! [`DuplicatePolicy`].
//!
//! # References
//!
//! - Järvelin & Kekäläinen (2002). "Cumulated gain-based evaluation of IR techniques"
//! - Voorhees & Harman (2005). "TREC: Experiment and Evaluation in Information Retrieval"

use crate::config::{DEFAULT_K_VALUES, MAP_CUTOFF, NDCG_CUTOFF};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Metric name -> value, keyed `"<metric>@<k>"` or `"mrr"`.
pub type MetricsMap = BTreeMap<String, f64>;

/// How MRR, NDCG and MAP treat an id that appears more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Only the first occurrence of an id can be a hit. Later occurrences
    /// still occupy their rank position but count as non-relevant.
    #[default]
    FirstOccurrence,
    /// Every occurrence of a relevant id counts as a hit. Matches numbers
    /// produced by a plain membership scan; NDCG can exceed 1.0.
    CountRepeats,
}

/// Per-position relevance of `retrieved[..limit]` under `policy`.
fn hits<S: AsRef<str>>(
    retrieved: &[S],
    relevant: &HashSet<String>,
    limit: usize,
    policy: DuplicatePolicy,
) -> Vec<bool> {
    let mut seen: HashSet<&str> = HashSet::new();
    retrieved
        .iter()
        .take(limit)
        .map(|id| {
            let id = id.as_ref();
            let first = seen.insert(id);
            relevant.contains(id) && (first || policy == DuplicatePolicy::CountRepeats)
        })
        .collect()
}

/// Number of distinct relevant ids in the first `k` positions.
fn relevant_in_top_k<S: AsRef<str>>(
    retrieved: &[S],
    relevant: &HashSet<String>,
    k: usize,
) -> usize {
    retrieved
        .iter()
        .take(k)
        .filter_map(|id| {
            let id: &str = id.as_ref();
            relevant.contains(id).then_some(id)
        })
        .collect::<HashSet<&str>>()
        .len()
}

// ============================================================================
// Recall / Precision / F1
// ============================================================================

/// Computes Recall@k.
///
/// # Formula
///
/// ```text
/// Recall@k = |set(retrieved[..k]) ∩ relevant| / |relevant|
/// ```
///
/// Returns 0.0 when `relevant` is empty.
pub fn recall_at_k<S: AsRef<str>>(retrieved: &[S], relevant: &HashSet<String>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    relevant_in_top_k(retrieved, relevant, k) as f64 / relevant.len() as f64
}

/// Computes Precision@k.
///
/// # Formula
///
/// ```text
/// Precision@k = |set(retrieved[..k]) ∩ relevant| / k
/// ```
///
/// The denominator is `k` even when fewer than `k` ids were retrieved.
/// Returns 0.0 when `k == 0`.
pub fn precision_at_k<S: AsRef<str>>(retrieved: &[S], relevant: &HashSet<String>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    relevant_in_top_k(retrieved, relevant, k) as f64 / k as f64
}

/// Computes F1@k, the harmonic mean of Precision@k and Recall@k.
///
/// Returns 0.0 when both are zero.
pub fn f1_at_k<S: AsRef<str>>(retrieved: &[S], relevant: &HashSet<String>, k: usize) -> f64 {
    let precision = precision_at_k(retrieved, relevant, k);
    let recall = recall_at_k(retrieved, relevant, k);

    if precision + recall == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / (precision + recall)
}

// ============================================================================
// MRR (Mean Reciprocal Rank)
// ============================================================================

/// Computes the reciprocal rank of the first relevant id.
///
/// Scans the whole list (no cutoff). Averaging this over queries gives MRR.
/// The first relevant id is always a first occurrence, so no
/// [`DuplicatePolicy`] applies.
///
/// # Returns
///
/// `1 / rank` (1-based) of the first relevant id, or 0.0 if there is none.
pub fn mrr<S: AsRef<str>>(retrieved: &[S], relevant: &HashSet<String>) -> f64 {
    retrieved
        .iter()
        .position(|id| {
            let id: &str = id.as_ref();
            relevant.contains(id)
        })
        .map_or(0.0, |idx| 1.0 / (idx + 1) as f64)
}

// ============================================================================
// NDCG (Normalized Discounted Cumulative Gain)
// ============================================================================

/// Computes NDCG@k with binary relevance and [`DuplicatePolicy::FirstOccurrence`].
///
/// # Formula
///
/// ```text
/// DCG@k  = Σ rel_i / log₂(i + 1)                 for i in 1..=k
/// IDCG@k = Σ 1 / log₂(i + 1)                     for i in 1..=min(|relevant|, k)
/// NDCG@k = DCG@k / IDCG@k
/// ```
///
/// Returns 0.0 when IDCG is zero (empty relevance set or `k == 0`).
pub fn ndcg_at_k<S: AsRef<str>>(retrieved: &[S], relevant: &HashSet<String>, k: usize) -> f64 {
    ndcg_at_k_with_policy(retrieved, relevant, k, DuplicatePolicy::FirstOccurrence)
}

/// Computes NDCG@k under an explicit [`DuplicatePolicy`].
pub fn ndcg_at_k_with_policy<S: AsRef<str>>(
    retrieved: &[S],
    relevant: &HashSet<String>,
    k: usize,
    policy: DuplicatePolicy,
) -> f64 {
    let dcg: f64 = hits(retrieved, relevant, k, policy)
        .into_iter()
        .enumerate()
        .filter(|(_, hit)| *hit)
        .map(|(idx, _)| discount(idx + 1))
        .sum();

    let idcg: f64 = (1..=relevant.len().min(k)).map(discount).sum();

    if idcg > 0.0 {
        dcg / idcg
    } else {
        0.0
    }
}

/// `1 / log₂(rank + 1)` for a 1-based rank.
fn discount(rank: usize) -> f64 {
    1.0 / ((rank + 1) as f64).log2()
}

// ============================================================================
// MAP (Mean Average Precision)
// ============================================================================

/// Computes Average Precision@k with [`DuplicatePolicy::FirstOccurrence`].
///
/// # Formula
///
/// ```text
/// AP@k = (1 / H) × Σ hits_so_far(i) / i    over hit positions i <= k
/// ```
///
/// where `H` is the number of hits in the top `k`. Averaging this over
/// queries gives MAP@k.
///
/// Returns 0.0 when there is no hit in the top `k`.
pub fn map_at_k<S: AsRef<str>>(retrieved: &[S], relevant: &HashSet<String>, k: usize) -> f64 {
    map_at_k_with_policy(retrieved, relevant, k, DuplicatePolicy::FirstOccurrence)
}

/// Computes Average Precision@k under an explicit [`DuplicatePolicy`].
pub fn map_at_k_with_policy<S: AsRef<str>>(
    retrieved: &[S],
    relevant: &HashSet<String>,
    k: usize,
    policy: DuplicatePolicy,
) -> f64 {
    let mut hit_count = 0usize;
    let mut precision_sum = 0.0;

    for (idx, hit) in hits(retrieved, relevant, k, policy).into_iter().enumerate() {
        if hit {
            hit_count += 1;
            precision_sum += hit_count as f64 / (idx + 1) as f64;
        }
    }

    if hit_count == 0 {
        0.0
    } else {
        precision_sum / hit_count as f64
    }
}

// ============================================================================
// Per-query evaluation
// ============================================================================

/// Computes the standard metric set for queries.
///
/// Every metrics map contains `mrr`, `ndcg@10` and `map@10`, plus
/// `recall@k`, `precision@k` and `f1@k` for each configured `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluator {
    k_values: Vec<usize>,
    duplicate_policy: DuplicatePolicy,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(DEFAULT_K_VALUES.to_vec())
    }
}

impl Evaluator {
    /// Creates an evaluator for the given cutoffs. An empty list falls back
    /// to the defaults `[1, 3, 5, 10]`.
    pub fn new(k_values: Vec<usize>) -> Self {
        let k_values = if k_values.is_empty() {
            DEFAULT_K_VALUES.to_vec()
        } else {
            k_values
        };
        Self {
            k_values,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }

    /// Sets the duplicate policy for MRR, NDCG and MAP.
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Builds an evaluator from the `[evaluation]` configuration section.
    pub fn from_config(config: &crate::config::EvaluationConfig) -> Self {
        Self::new(config.k_values.clone()).with_duplicate_policy(config.duplicate_policy)
    }

    /// Configured cutoffs.
    pub fn k_values(&self) -> &[usize] {
        &self.k_values
    }

    /// Configured duplicate policy.
    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    /// Computes all metrics for one query.
    pub fn evaluate_single_query<S: AsRef<str>>(
        &self,
        retrieved: &[S],
        relevant: &HashSet<String>,
    ) -> MetricsMap {
        let policy = self.duplicate_policy;
        let mut metrics = MetricsMap::new();

        metrics.insert("mrr".to_string(), mrr(retrieved, relevant));
        metrics.insert(
            format!("ndcg@{NDCG_CUTOFF}"),
            ndcg_at_k_with_policy(retrieved, relevant, NDCG_CUTOFF, policy),
        );
        metrics.insert(
            format!("map@{MAP_CUTOFF}"),
            map_at_k_with_policy(retrieved, relevant, MAP_CUTOFF, policy),
        );

        for &k in &self.k_values {
            metrics.insert(format!("recall@{k}"), recall_at_k(retrieved, relevant, k));
            metrics.insert(
                format!("precision@{k}"),
                precision_at_k(retrieved, relevant, k),
            );
            metrics.insert(format!("f1@{k}"), f1_at_k(retrieved, relevant, k));
        }

        metrics
    }
}
