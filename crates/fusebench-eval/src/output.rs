//! Output formatting for comparison results.
//!
//! Supports a human-readable terminal table and JSON for scripting. Without
//! per-query data the JSON is the flat comparison table
//! (`{"method": {"metric": value, "query_count": n}}`).

use fusebench_core::evaluation::{ComparisonTable, MetricsMap, KEY_METRICS};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Method -> query id -> metrics.
pub type PerQueryMetrics = BTreeMap<String, BTreeMap<String, MetricsMap>>;

/// Width of the method-name column
const METHOD_WIDTH: usize = 20;

/// Width of each metric column
const METRIC_WIDTH: usize = 12;

/// JSON output when per-query metrics are requested
#[derive(Serialize)]
struct JsonReport<'a> {
    comparison: &'a ComparisonTable,
    per_query: &'a PerQueryMetrics,
}

/// Formats the comparison (and optional per-query breakdown) as JSON.
pub fn format_json(
    table: &ComparisonTable,
    per_query: Option<&PerQueryMetrics>,
) -> serde_json::Result<String> {
    match per_query {
        Some(per_query) => serde_json::to_string_pretty(&JsonReport {
            comparison: table,
            per_query,
        }),
        None => serde_json::to_string_pretty(table),
    }
}

/// Formats the comparison as a table: one row per method, one column per
/// metric (sorted by name), plus the query count.
pub fn format_table(table: &ComparisonTable) -> String {
    let metrics = table.metric_names();
    let rule_len = METHOD_WIDTH + (metrics.len() + 1) * (METRIC_WIDTH + 1);
    let mut out = String::new();

    let _ = writeln!(out, "\n{}", "=".repeat(rule_len));
    let _ = writeln!(out, "RETRIEVAL METHOD COMPARISON");
    let _ = writeln!(out, "{}", "=".repeat(rule_len));

    let _ = write!(out, "{:<METHOD_WIDTH$}", "Method");
    for metric in &metrics {
        let _ = write!(out, " {metric:>METRIC_WIDTH$}");
    }
    let _ = writeln!(out, " {:>METRIC_WIDTH$}", "queries");
    let _ = writeln!(out, "{}", "-".repeat(rule_len));

    for (method, summary) in table.iter() {
        let _ = write!(out, "{method:<METHOD_WIDTH$}");
        for metric in &metrics {
            match summary.get(metric) {
                Some(value) => {
                    let _ = write!(out, " {value:>METRIC_WIDTH$.4}");
                }
                None => {
                    let _ = write!(out, " {:>METRIC_WIDTH$}", "-");
                }
            }
        }
        let _ = writeln!(out, " {:>METRIC_WIDTH$}", summary.query_count);
    }

    let _ = writeln!(out, "{}", "=".repeat(rule_len));
    out
}

/// Formats the ranking of methods for each key metric, best first.
pub fn format_rankings(table: &ComparisonTable) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n{}", "=".repeat(80));
    let _ = writeln!(out, "RANKINGS BY KEY METRIC (highest first)");
    let _ = writeln!(out, "{}", "=".repeat(80));

    for metric in KEY_METRICS {
        let _ = writeln!(out, "\n[{}]", metric.to_uppercase());
        let ranking = table.ranking(metric);
        if ranking.is_empty() {
            let _ = writeln!(out, "  (no data)");
            continue;
        }
        for (rank, (method, value)) in ranking.iter().enumerate() {
            let _ = writeln!(out, "  {}. {method:<METHOD_WIDTH$} {value:.4}", rank + 1);
        }
    }

    let _ = writeln!(out, "\n{}", "=".repeat(80));
    out
}

/// Formats key metrics per query for every method.
pub fn format_per_query(per_query: &PerQueryMetrics) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n{}", "-".repeat(70));
    let _ = writeln!(out, "PER-QUERY BREAKDOWN");

    for (method, queries) in per_query {
        let _ = writeln!(out, "\n{method}");
        let _ = write!(out, "  {:<METHOD_WIDTH$}", "Query");
        for metric in KEY_METRICS {
            let _ = write!(out, " {metric:>METRIC_WIDTH$}");
        }
        let _ = writeln!(out);

        for (query_id, metrics) in queries {
            let _ = write!(out, "  {query_id:<METHOD_WIDTH$}");
            for metric in KEY_METRICS {
                let value = metrics.get(metric).copied().unwrap_or(0.0);
                let _ = write!(out, " {value:>METRIC_WIDTH$.4}");
            }
            let _ = writeln!(out);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusebench_core::evaluation::MethodSummary;

    fn summary(mrr: f64, recall: f64, queries: usize) -> MethodSummary {
        let mut metrics = MetricsMap::new();
        metrics.insert("mrr".to_string(), mrr);
        metrics.insert("recall@10".to_string(), recall);
        MethodSummary {
            metrics,
            query_count: queries,
        }
    }

    fn table() -> ComparisonTable {
        let mut table = ComparisonTable::new();
        table.insert("dense", summary(0.5, 0.8, 2));
        table.insert("hybrid_rrf", summary(0.75, 0.9, 2));
        table
    }

    #[test]
    fn test_format_table_contains_rows_and_columns() {
        let output = format_table(&table());

        assert!(output.contains("RETRIEVAL METHOD COMPARISON"));
        assert!(output.contains("recall@10"));
        assert!(output.contains("hybrid_rrf"));
        assert!(output.contains("0.7500"));
        assert!(output.contains("queries"));
    }

    #[test]
    fn test_format_table_marks_missing_metrics() {
        let mut table = table();
        let mut partial = MethodSummary::default();
        partial.metrics.insert("mrr".to_string(), 0.25);
        table.insert("sparse", partial);

        let output = format_table(&table);
        let sparse_row = output.lines().find(|l| l.starts_with("sparse")).unwrap();
        assert!(sparse_row.contains('-'));
        assert!(sparse_row.contains("0.2500"));
    }

    #[test]
    fn test_rankings_order() {
        let output = format_rankings(&table());

        let mrr_section = output.split("[MRR]").nth(1).unwrap();
        let hybrid = mrr_section.find("hybrid_rrf").unwrap();
        let dense = mrr_section.find("dense").unwrap();
        assert!(hybrid < dense);
        assert!(output.contains("[NDCG@10]\n  (no data)"));
    }

    #[test]
    fn test_format_json_flat_without_per_query() {
        let json: serde_json::Value =
            serde_json::from_str(&format_json(&table(), None).unwrap()).unwrap();
        assert_eq!(json["dense"]["mrr"], 0.5);
        assert_eq!(json["dense"]["query_count"], 2);
    }

    #[test]
    fn test_format_json_with_per_query() {
        let mut per_query = PerQueryMetrics::new();
        let mut queries = BTreeMap::new();
        queries.insert("q1".to_string(), summary(1.0, 1.0, 0).metrics);
        per_query.insert("dense".to_string(), queries);

        let json: serde_json::Value =
            serde_json::from_str(&format_json(&table(), Some(&per_query)).unwrap()).unwrap();
        assert_eq!(json["comparison"]["hybrid_rrf"]["mrr"], 0.75);
        assert_eq!(json["per_query"]["dense"]["q1"]["mrr"], 1.0);
    }

    #[test]
    fn test_format_per_query() {
        let mut per_query = PerQueryMetrics::new();
        let mut queries = BTreeMap::new();
        queries.insert("q_001".to_string(), summary(0.5, 1.0, 0).metrics);
        per_query.insert("dense".to_string(), queries);

        let output = format_per_query(&per_query);
        assert!(output.contains("PER-QUERY BREAKDOWN"));
        assert!(output.contains("q_001"));
        assert!(output.contains("0.5000"));
    }
}
