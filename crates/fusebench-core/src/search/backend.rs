//! Retrieval backend abstraction.
//!
//! Every retrieval strategy (dense vectors, sparse vectors, full-text, and
//! fusion of other backends) implements [`SearchBackend`]. Orchestration code
//! depends only on this trait.
//!
//! Backends return `Result<RankedList, BackendError>`. Callers that want to
//! keep evaluating when one backend fails use [`search_or_empty`], which logs
//! the failure and substitutes an empty list so fusion and metrics still run
//! for that query.

use super::types::{ItemPayload, RankedList, ScoredItem};
use crate::error::BackendError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Sparse query/document vector: term id -> weight.
pub type SparseVector = BTreeMap<u32, f32>;

/// Retrieval strategy implemented by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Dense embedding similarity
    Dense,
    /// Sparse (BM25-weighted) vector similarity
    Sparse,
    /// Full-text keyword search
    FullText,
    /// Fusion of other backends
    Fusion,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Dense => "dense",
            BackendKind::Sparse => "sparse",
            BackendKind::FullText => "full_text",
            BackendKind::Fusion => "fusion",
        };
        f.write_str(name)
    }
}

/// A query with every representation a backend might search with.
///
/// Embedding and tokenization happen outside this crate; a query carries
/// whatever representations the caller computed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Query identifier (matches the gold relevance data)
    pub id: String,
    /// Raw query text, used by full-text backends
    pub text: String,
    /// Dense embedding, used by dense backends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dense: Option<Vec<f32>>,
    /// Sparse term weights, used by sparse backends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse: Option<SparseVector>,
}

impl Query {
    /// Creates a text-only query.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            dense: None,
            sparse: None,
        }
    }

    /// Attaches a dense embedding.
    pub fn with_dense(mut self, embedding: Vec<f32>) -> Self {
        self.dense = Some(embedding);
        self
    }

    /// Attaches sparse term weights.
    pub fn with_sparse(mut self, weights: SparseVector) -> Self {
        self.sparse = Some(weights);
        self
    }
}

/// A retrieval backend that ranks items for a query.
///
/// Implementations must return items in descending score order with each
/// `item_id` at most once (guaranteed by [`RankedList::new`]).
pub trait SearchBackend: Send + Sync {
    /// Name used as the method key in evaluation results.
    fn name(&self) -> &str;

    /// Retrieval strategy of this backend.
    fn kind(&self) -> BackendKind;

    /// Returns up to `top_k` items for `query`.
    fn search(&self, query: &Query, top_k: usize) -> Result<RankedList, BackendError>;
}

/// Searches `backend`, substituting an empty list on failure.
///
/// The failure is logged at `warn` level with the backend name and query id.
pub fn search_or_empty(backend: &dyn SearchBackend, query: &Query, top_k: usize) -> RankedList {
    match backend.search(query, top_k) {
        Ok(list) => list,
        Err(err) => {
            warn!(
                backend = backend.name(),
                query_id = %query.id,
                error = %err,
                "Search failed, continuing with empty result"
            );
            RankedList::empty()
        }
    }
}

/// Identity and display data of an indexed chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Chunk id
    pub item_id: String,
    /// Parent document id
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Display payload returned with hits
    #[serde(default)]
    pub payload: Option<ItemPayload>,
}

impl ChunkRecord {
    /// Creates a record for chunk `item_id` of document `parent_id`.
    pub fn new(item_id: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            parent_id: Some(parent_id.into()),
            payload: None,
        }
    }

    /// Builds a hit for this record.
    pub fn hit(&self, score: f64) -> ScoredItem {
        ScoredItem {
            item_id: self.item_id.clone(),
            score,
            parent_id: self.parent_id.clone(),
            payload: self.payload.clone(),
        }
    }
}

/// Ranks `(record index, score)` candidates and keeps the best `top_k`.
///
/// Ties keep index order, so results are deterministic for a given index.
pub(crate) fn top_k_hits(
    records: &[ChunkRecord],
    mut candidates: Vec<(usize, f64)>,
    top_k: usize,
) -> RankedList {
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    RankedList::new(
        candidates
            .into_iter()
            .take(top_k)
            .filter_map(|(idx, score)| records.get(idx).map(|r| r.hit(score)))
            .collect(),
    )
}

/// Checks that a query vector matches the index dimension.
pub(crate) fn validate_dimension(expected: usize, actual: usize) -> Result<(), BackendError> {
    if actual == expected {
        Ok(())
    } else {
        Err(BackendError::DimensionMismatch { expected, actual })
    }
}
