//! Executes backends over a query set to produce runs.
//!
//! Each query is searched in degraded mode: a backend failure is logged and
//! yields an empty result list for that query instead of aborting the run.
//! Retrieved chunks are mapped to their parent document ids, because
//! relevance is judged per document.

use super::compare::{MethodResults, QueryResults};
use crate::search::backend::{search_or_empty, Query, SearchBackend};
use rayon::prelude::*;
use tracing::info;

/// Runs `backend` over every query and returns parent ids per query.
///
/// Rank order is preserved. Several chunks of one document produce repeated
/// parent ids; the metrics handle those.
pub fn run_backend(backend: &dyn SearchBackend, queries: &[Query], top_k: usize) -> QueryResults {
    let results: QueryResults = queries
        .par_iter()
        .map(|query| {
            let ids = search_or_empty(backend, query, top_k).parent_ids();
            (query.id.clone(), ids)
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect();

    let empty = results.values().filter(|ids| ids.is_empty()).count();
    info!(
        backend = backend.name(),
        kind = %backend.kind(),
        queries = results.len(),
        empty,
        "Run complete"
    );

    results
}

/// Runs every backend and keys the runs by backend name.
///
/// Backends with the same name overwrite each other's run; give each method
/// a distinct name.
pub fn run_methods(
    backends: &[&dyn SearchBackend],
    queries: &[Query],
    top_k: usize,
) -> MethodResults {
    backends
        .iter()
        .map(|backend| (backend.name().to_string(), run_backend(*backend, queries, top_k)))
        .collect()
}
