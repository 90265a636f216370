//! Cross-query aggregation and method comparison.
//!
//! A *run* ([`QueryResults`]) is the ranked id list one method produced for
//! each query. Runs are scored per query with [`Evaluator::evaluate_single_query`]
//! and averaged into a [`MethodSummary`]; summaries for several methods form a
//! [`ComparisonTable`].
//!
//! Queries whose relevance set is missing or empty are skipped and do not
//! count toward `query_count`.
//!
//! Methods and the queries within a method are evaluated in parallel with
//! rayon. Per-query metrics are collected in query-id order and summed
//! sequentially, so averages are identical from run to run.

use super::metrics::{Evaluator, MetricsMap};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, info};

/// Query id -> ranked ids retrieved for that query.
pub type QueryResults = BTreeMap<String, Vec<String>>;

/// Method name -> run.
pub type MethodResults = BTreeMap<String, QueryResults>;

/// Query id -> ids judged relevant.
pub type RelevanceSets = HashMap<String, HashSet<String>>;

/// Metrics that headline a comparison.
pub const KEY_METRICS: [&str; 4] = ["recall@10", "mrr", "ndcg@10", "map@10"];

/// Averaged metrics for one method.
///
/// Serializes flat, e.g. `{"mrr": 0.5, "ndcg@10": 0.61, "query_count": 2}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodSummary {
    /// Mean of each metric over qualifying queries
    #[serde(flatten)]
    pub metrics: MetricsMap,
    /// Number of queries with a non-empty relevance set
    pub query_count: usize,
}

impl MethodSummary {
    /// Value of `metric`, if it was computed.
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied()
    }
}

/// Method name -> averaged metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComparisonTable {
    methods: BTreeMap<String, MethodSummary>,
}

impl ComparisonTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a method's summary.
    pub fn insert(&mut self, method: impl Into<String>, summary: MethodSummary) {
        self.methods.insert(method.into(), summary);
    }

    /// Summary for `method`.
    pub fn get(&self, method: &str) -> Option<&MethodSummary> {
        self.methods.get(method)
    }

    /// Iterates over `(method, summary)` in method-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MethodSummary)> {
        self.methods.iter().map(|(name, summary)| (name.as_str(), summary))
    }

    /// Method names in order.
    pub fn method_names(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }

    /// Number of methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` if the table has no methods.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Sorted union of metric names across all methods.
    pub fn metric_names(&self) -> Vec<String> {
        self.methods
            .values()
            .flat_map(|s| s.metrics.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Methods ordered by `metric`, best first.
    ///
    /// A method without the metric (for example one with no judged queries)
    /// ranks with 0.0. Empty when no method reports the metric. Equal values
    /// keep method-name order.
    pub fn ranking(&self, metric: &str) -> Vec<(&str, f64)> {
        if self.methods.values().all(|s| s.get(metric).is_none()) {
            return Vec::new();
        }

        let mut ranked: Vec<(&str, f64)> = self
            .iter()
            .map(|(name, summary)| (name, summary.get(metric).unwrap_or(0.0)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    /// Best method for `metric`, if any method has it.
    pub fn best_method(&self, metric: &str) -> Option<(&str, f64)> {
        self.ranking(metric).into_iter().next()
    }
}

impl FromIterator<(String, MethodSummary)> for ComparisonTable {
    fn from_iter<I: IntoIterator<Item = (String, MethodSummary)>>(iter: I) -> Self {
        Self {
            methods: iter.into_iter().collect(),
        }
    }
}

impl Evaluator {
    /// Per-query metrics for every query with a non-empty relevance set.
    pub fn per_query(
        &self,
        results: &QueryResults,
        relevant: &RelevanceSets,
    ) -> BTreeMap<String, MetricsMap> {
        let scored: Vec<(String, MetricsMap)> = results
            .par_iter()
            .filter_map(|(query_id, retrieved)| {
                let relevant_docs = relevant.get(query_id).filter(|r| !r.is_empty())?;
                Some((
                    query_id.clone(),
                    self.evaluate_single_query(retrieved, relevant_docs),
                ))
            })
            .collect();

        scored.into_iter().collect()
    }

    /// Averages per-query metrics over all qualifying queries of one run.
    ///
    /// With no qualifying query the summary has no metrics and
    /// `query_count == 0`.
    pub fn evaluate_all_queries(
        &self,
        results: &QueryResults,
        relevant: &RelevanceSets,
    ) -> MethodSummary {
        let per_query = self.per_query(results, relevant);

        let skipped = results.len() - per_query.len();
        if skipped > 0 {
            debug!(skipped, "Skipped queries without relevance judgments");
        }

        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for metrics in per_query.values() {
            for (name, value) in metrics {
                let entry = sums.entry(name.clone()).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }

        MethodSummary {
            metrics: sums
                .into_iter()
                .map(|(name, (sum, count))| (name, sum / count as f64))
                .collect(),
            query_count: per_query.len(),
        }
    }

    /// Evaluates every method's run against the same relevance sets.
    pub fn compare_methods(
        &self,
        all_results: &MethodResults,
        relevant: &RelevanceSets,
    ) -> ComparisonTable {
        let table: ComparisonTable = all_results
            .par_iter()
            .map(|(method, results)| (method.clone(), self.evaluate_all_queries(results, relevant)))
            .collect::<Vec<_>>()
            .into_iter()
            .collect();

        for (method, summary) in table.iter() {
            info!(
                method,
                query_count = summary.query_count,
                mrr = summary.get("mrr").unwrap_or(0.0),
                "Evaluated method"
            );
        }

        table
    }
}

/// Evaluates every method with the given recall/precision/F1 cutoffs.
///
/// An empty `k_values` uses the defaults `[1, 3, 5, 10]`.
pub fn compare_methods(
    all_results: &MethodResults,
    relevant: &RelevanceSets,
    k_values: &[usize],
) -> ComparisonTable {
    Evaluator::new(k_values.to_vec()).compare_methods(all_results, relevant)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(entries: &[(&str, &[&str])]) -> QueryResults {
        entries
            .iter()
            .map(|(q, ids)| (q.to_string(), ids.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    fn relevance(entries: &[(&str, &[&str])]) -> RelevanceSets {
        entries
            .iter()
            .map(|(q, ids)| (q.to_string(), ids.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    fn gold() -> RelevanceSets {
        relevance(&[
            ("q_001", &["doc_001", "doc_002", "doc_005"]),
            ("q_002", &["doc_001", "doc_003", "doc_007"]),
        ])
    }

    fn methods() -> MethodResults {
        let mut all = MethodResults::new();
        all.insert(
            "dense".to_string(),
            run(&[
                ("q_001", &["doc_005", "doc_002", "doc_008", "doc_001", "doc_010"]),
                ("q_002", &["doc_003", "doc_007", "doc_001", "doc_009"]),
            ]),
        );
        all.insert(
            "sparse".to_string(),
            run(&[
                ("q_001", &["doc_008", "doc_005", "doc_002", "doc_001", "doc_010"]),
                ("q_002", &["doc_009", "doc_007", "doc_003", "doc_001"]),
            ]),
        );
        all
    }

    #[test]
    fn test_average_over_queries() {
        let results = run(&[("q1", &["a", "x"]), ("q2", &["x", "b"])]);
        let relevant = relevance(&[("q1", &["a"]), ("q2", &["b"])]);

        let summary = Evaluator::default().evaluate_all_queries(&results, &relevant);

        assert_eq!(summary.query_count, 2);
        // MRR: (1 + 1/2) / 2
        assert!((summary.get("mrr").unwrap() - 0.75).abs() < 1e-9);
        // recall@1: (1 + 0) / 2
        assert!((summary.get("recall@1").unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_queries_without_relevance_are_skipped() {
        let results = run(&[("q1", &["a"]), ("q2", &["b"]), ("q3", &["c"])]);
        let relevant = relevance(&[("q1", &["a"]), ("q2", &[])]);

        let summary = Evaluator::default().evaluate_all_queries(&results, &relevant);

        assert_eq!(summary.query_count, 1);
        assert!((summary.get("mrr").unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_qualifying_queries() {
        let results = run(&[("q1", &["a"])]);
        let summary = Evaluator::default().evaluate_all_queries(&results, &RelevanceSets::new());

        assert_eq!(summary.query_count, 0);
        assert!(summary.metrics.is_empty());

        let empty = Evaluator::default().evaluate_all_queries(&QueryResults::new(), &gold());
        assert_eq!(empty, MethodSummary::default());
    }

    #[test]
    fn test_compare_methods() {
        let table = compare_methods(&methods(), &gold(), &[1, 3, 5, 10]);

        assert_eq!(table.method_names(), vec!["dense", "sparse"]);
        let dense = table.get("dense").unwrap();
        assert_eq!(dense.query_count, 2);
        assert!((dense.get("mrr").unwrap() - 1.0).abs() < 1e-9);

        let sparse = table.get("sparse").unwrap();
        assert!((sparse.get("mrr").unwrap() - 0.5).abs() < 1e-9);

        assert_eq!(table.best_method("mrr"), Some(("dense", 1.0)));
    }

    #[test]
    fn test_compare_matches_sequential_evaluation() {
        let evaluator = Evaluator::default();
        let table = evaluator.compare_methods(&methods(), &gold());

        for (method, results) in methods() {
            let expected = evaluator.evaluate_all_queries(&results, &gold());
            assert_eq!(table.get(&method), Some(&expected));
        }
    }

    #[test]
    fn test_ranking_ties_keep_name_order() {
        let mut table = ComparisonTable::new();
        for (name, mrr) in [("c", 0.5), ("a", 0.5), ("b", 0.9)] {
            let mut summary = MethodSummary::default();
            summary.metrics.insert("mrr".to_string(), mrr);
            table.insert(name, summary);
        }

        let names: Vec<&str> = table.ranking("mrr").into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert!(table.ranking("ndcg@10").is_empty());
        assert_eq!(table.best_method("ndcg@10"), None);
    }

    #[test]
    fn test_ranking_counts_missing_metric_as_zero() {
        let mut table = ComparisonTable::new();
        let mut scored = MethodSummary::default();
        scored.metrics.insert("mrr".to_string(), 0.4);
        table.insert("dense", scored);
        // No judged queries: no metrics at all
        table.insert("broken", MethodSummary::default());

        assert_eq!(table.ranking("mrr"), vec![("dense", 0.4), ("broken", 0.0)]);
        assert_eq!(table.best_method("mrr"), Some(("dense", 0.4)));
    }

    #[test]
    fn test_metric_names_union() {
        let table = compare_methods(&methods(), &gold(), &[2]);
        assert_eq!(
            table.metric_names(),
            vec!["f1@2", "map@10", "mrr", "ndcg@10", "precision@2", "recall@2"]
        );
    }

    #[test]
    fn test_flat_json_layout() {
        let mut table = ComparisonTable::new();
        let mut summary = MethodSummary {
            query_count: 2,
            ..Default::default()
        };
        summary.metrics.insert("mrr".to_string(), 0.5);
        table.insert("dense", summary);

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["dense"]["mrr"], 0.5);
        assert_eq!(json["dense"]["query_count"], 2);

        let back: ComparisonTable = serde_json::from_value(json).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_per_query_breakdown() {
        let per_query = Evaluator::default().per_query(&methods()["dense"], &gold());
        assert_eq!(per_query.len(), 2);
        assert!((per_query["q_002"]["mrr"] - 1.0).abs() < 1e-9);
    }
}
