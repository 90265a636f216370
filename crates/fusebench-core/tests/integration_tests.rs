//! End-to-end tests for the retrieval comparison pipeline.
//!
//! These tests exercise the full workflow on a small in-memory corpus:
//! 1. Retrieval: dense, sparse and full-text backends plus hybrid fusion
//! 2. Runs: per-query parent ids, with failing backends degraded to empty lists
//! 3. Evaluation: per-method averages, rankings and the flat JSON output
//!
//! Run with: `cargo test -p fusebench-core --test integration_tests`

use fusebench_core::config::FusebenchConfig;
use fusebench_core::error::BackendError;
use fusebench_core::evaluation::{
    compare_methods, load_method_results, load_scored_run, run_backend, run_methods, save_json,
    Evaluator, QueryResults, RelevanceSets, ScoredRun,
};
use fusebench_core::search::{
    fuse, BackendKind, ChunkRecord, DenseIndex, FullTextIndex, FusionBackend, FusionMethod, Query,
    RankedList, SearchBackend, SparseIndex, SparseVector,
};

// ============================================================================
// Test Corpus
// ============================================================================

/// (chunk id, parent id, dense embedding, sparse terms, text)
type ChunkFixture = (
    &'static str,
    &'static str,
    [f32; 3],
    &'static [(u32, f32)],
    &'static str,
);

// Sparse term ids
const RUST: u32 = 1;
const PYTHON: u32 = 2;
const COOKING: u32 = 3;
const MEMORY: u32 = 4;

const CORPUS: [ChunkFixture; 5] = [
    (
        "d1#0",
        "d1",
        [1.0, 0.0, 0.0],
        &[(RUST, 2.0), (MEMORY, 1.0)],
        "rust ownership and memory safety",
    ),
    ("d1#1", "d1", [0.8, 0.6, 0.0], &[(RUST, 1.0)], "rust borrow checker"),
    ("d2#0", "d2", [0.0, 1.0, 0.0], &[(PYTHON, 2.0)], "python dynamic typing"),
    ("d3#0", "d3", [0.0, 0.0, 1.0], &[(COOKING, 2.0)], "slow roasting vegetables"),
    (
        "d4#0",
        "d4",
        [0.6, 0.0, 0.8],
        &[(MEMORY, 2.0)],
        "garbage collected memory management",
    ),
];

fn sparse(terms: &[(u32, f32)]) -> SparseVector {
    terms.iter().copied().collect()
}

fn dense_index() -> DenseIndex {
    let mut index = DenseIndex::new("dense", 3);
    for (chunk, parent, embedding, _, _) in CORPUS {
        index
            .add(ChunkRecord::new(chunk, parent), embedding.to_vec())
            .unwrap();
    }
    index
}

fn sparse_index() -> SparseIndex {
    let mut index = SparseIndex::new("sparse");
    for (chunk, parent, _, terms, _) in CORPUS {
        index.add(ChunkRecord::new(chunk, parent), sparse(terms));
    }
    index
}

fn text_index() -> FullTextIndex {
    let mut index = FullTextIndex::new("es_bm25");
    for (chunk, parent, _, _, text) in CORPUS {
        index.add(ChunkRecord::new(chunk, parent), text);
    }
    index
}

fn queries() -> Vec<Query> {
    vec![
        Query::new("q1", "rust memory safety")
            .with_dense(vec![1.0, 0.0, 0.0])
            .with_sparse(sparse(&[(RUST, 1.0), (MEMORY, 1.0)])),
        Query::new("q2", "python typing")
            .with_dense(vec![0.0, 1.0, 0.0])
            .with_sparse(sparse(&[(PYTHON, 1.0)])),
        Query::new("q3", "memory management")
            .with_dense(vec![0.6, 0.0, 0.8])
            .with_sparse(sparse(&[(MEMORY, 1.0)])),
        // No judgments: searched, but left out of the averages
        Query::new("q4", "roasting")
            .with_dense(vec![0.0, 0.0, 1.0])
            .with_sparse(sparse(&[(COOKING, 1.0)])),
    ]
}

fn gold() -> RelevanceSets {
    [("q1", "d1"), ("q2", "d2"), ("q3", "d4")]
        .into_iter()
        .map(|(q, d)| (q.to_string(), [d.to_string()].into_iter().collect()))
        .collect()
}

/// Stand-in for a search service that is down.
struct UnreachableBackend;

impl SearchBackend for UnreachableBackend {
    fn name(&self) -> &str {
        "es_mv_hybrid_rrf"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::FullText
    }

    fn search(&self, _query: &Query, _top_k: usize) -> Result<RankedList, BackendError> {
        Err(BackendError::Unavailable("connection refused".to_string()))
    }
}

fn hybrid(name: &str, method: FusionMethod) -> FusionBackend {
    FusionBackend::new(
        name,
        vec![
            Box::new(dense_index()) as Box<dyn SearchBackend>,
            Box::new(sparse_index()),
        ],
        method,
    )
    .unwrap()
}

// ============================================================================
// Full Pipeline
// ============================================================================

#[test]
fn test_full_pipeline() {
    let dense = dense_index();
    let sparse = sparse_index();
    let text = text_index();
    let hybrid_rrf = hybrid("hybrid_rrf", FusionMethod::rrf());
    let hybrid_weighted = hybrid("hybrid_weighted", FusionMethod::weighted(vec![0.6, 0.4]));
    let unreachable = UnreachableBackend;

    let backends: Vec<&dyn SearchBackend> = vec![
        &dense,
        &sparse,
        &text,
        &hybrid_rrf,
        &hybrid_weighted,
        &unreachable,
    ];
    let all = run_methods(&backends, &queries(), 10);

    assert_eq!(all.len(), 6);
    // Two chunks of d1 rank first and second
    assert_eq!(all["dense"]["q1"][..2], ["d1", "d1"]);

    let table = compare_methods(&all, &gold(), &[1, 3, 5, 10]);

    for method in ["dense", "sparse", "es_bm25", "hybrid_rrf", "hybrid_weighted"] {
        let summary = table.get(method).unwrap();
        assert_eq!(summary.query_count, 3, "{method}");
        assert!((summary.get("mrr").unwrap() - 1.0).abs() < 1e-9, "{method}");
        assert!((summary.get("recall@10").unwrap() - 1.0).abs() < 1e-9, "{method}");
    }

    // The failed backend still counts its queries, with zero scores
    let degraded = table.get("es_mv_hybrid_rrf").unwrap();
    assert_eq!(degraded.query_count, 3);
    assert_eq!(degraded.get("mrr"), Some(0.0));

    // Ties at 1.0 resolve in method-name order
    assert_eq!(table.best_method("mrr"), Some(("dense", 1.0)));
    assert_eq!(
        table.ranking("mrr").last().map(|(name, _)| *name),
        Some("es_mv_hybrid_rrf")
    );
}

#[test]
fn test_comparison_json_output() {
    let dense = dense_index();
    let all = run_methods(&[&dense as &dyn SearchBackend], &queries(), 10);
    let table = compare_methods(&all, &gold(), &[1, 3, 5, 10]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("comparison.json");
    save_json(&path, &table).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["dense"]["query_count"], 3);
    assert!(json["dense"]["ndcg@10"].is_f64());
    assert!(json["dense"]["f1@5"].is_f64());
}

#[test]
fn test_saved_runs_evaluate_like_live_runs() {
    let dense = dense_index();
    let text = text_index();
    let live = run_methods(&[&dense as &dyn SearchBackend, &text], &queries(), 10);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("all_results.json");
    save_json(&path, &live).unwrap();
    let loaded = load_method_results(&path).unwrap();

    assert_eq!(
        compare_methods(&loaded, &gold(), &[1, 3, 5, 10]),
        compare_methods(&live, &gold(), &[1, 3, 5, 10])
    );
}

// ============================================================================
// Fusion Behavior
// ============================================================================

#[test]
fn test_weighted_with_zero_weight_follows_single_backend() {
    let weighted = hybrid("weighted", FusionMethod::weighted(vec![1.0, 0.0]));
    let dense = dense_index();

    for query in queries() {
        let fused = weighted.search(&query, 3).unwrap();
        let expected = dense.search(&query, 3).unwrap();
        // Only positive dense scores are strictly ordered; compare those
        let positive: Vec<String> = expected
            .iter()
            .filter(|item| item.score > 0.0)
            .map(|item| item.item_id.clone())
            .collect();
        assert_eq!(fused.item_ids()[..positive.len()], positive[..], "{}", query.id);
    }
}

#[test]
fn test_hybrid_with_unreachable_child_keeps_other_ranking() {
    let degraded = FusionBackend::new(
        "hybrid",
        vec![
            Box::new(dense_index()) as Box<dyn SearchBackend>,
            Box::new(UnreachableBackend),
        ],
        FusionMethod::rrf(),
    )
    .unwrap();

    let fused = run_backend(&degraded, &queries(), 5);
    let dense = run_backend(&dense_index(), &queries(), 5);
    assert_eq!(fused, dense);
}

#[test]
fn test_offline_fusion_of_saved_scored_runs() {
    let dir = tempfile::tempdir().unwrap();
    let dense = dense_index();
    let sparse = sparse_index();

    let mut paths = Vec::new();
    for backend in [&dense as &dyn SearchBackend, &sparse] {
        let run: ScoredRun = queries()
            .iter()
            .map(|q| (q.id.clone(), backend.search(q, 20).unwrap()))
            .collect();
        let path = dir.path().join(format!("{}.json", backend.name()));
        save_json(&path, &run).unwrap();
        paths.push(path);
    }

    let runs: Vec<ScoredRun> = paths.iter().map(|p| load_scored_run(p).unwrap()).collect();
    let mut fused = QueryResults::new();
    for query in queries() {
        let lists: Vec<RankedList> = runs
            .iter()
            .map(|run| run.get(&query.id).cloned().unwrap_or_default())
            .collect();
        let ranked = fuse(&lists, 10, &FusionMethod::rrf()).unwrap();
        fused.insert(query.id.clone(), ranked.parent_ids());
    }

    // Same candidates and method as the live hybrid backend
    let live = run_backend(&hybrid("hybrid_rrf", FusionMethod::rrf()), &queries(), 10);
    assert_eq!(fused, live);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_drives_fusion_and_metrics() {
    let config = FusebenchConfig::from_toml_str(
        r#"
        [search]
        default_top_k = 5

        [search.hybrid]
        fusion_method = "weighted"
        weights = [0.7, 0.3]

        [evaluation]
        k_values = [1, 5]
        "#,
    )
    .unwrap();

    let method = config.search.hybrid.fusion_method().unwrap();
    let backend = hybrid("hybrid_weighted", method)
        .with_candidate_multiplier(config.search.candidate_multiplier);
    let run = run_backend(&backend, &queries(), config.search.default_top_k);
    assert!(run.values().all(|ids| ids.len() <= 5));

    let evaluator = Evaluator::from_config(&config.evaluation);
    let summary = evaluator.evaluate_all_queries(&run, &gold());
    assert!(summary.metrics.contains_key("recall@5"));
    assert!(!summary.metrics.contains_key("recall@10"));
    assert!(summary.metrics.contains_key("ndcg@10"));
}
