//! Sparse vector search.
//!
//! Documents and queries are `{term_id: weight}` maps (typically BM25 term
//! weights computed offline). The score is the sparse inner product over
//! shared terms. Documents sharing no term with the query are not returned.

use super::backend::{top_k_hits, BackendKind, ChunkRecord, Query, SearchBackend, SparseVector};
use super::types::RankedList;
use crate::error::BackendError;
use tracing::instrument;

/// In-memory sparse vector index.
pub struct SparseIndex {
    name: String,
    records: Vec<ChunkRecord>,
    vectors: Vec<SparseVector>,
}

impl SparseIndex {
    /// Creates an empty index.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Adds a chunk with its term weights.
    pub fn add(&mut self, record: ChunkRecord, weights: SparseVector) {
        self.records.push(record);
        self.vectors.push(weights);
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no chunks have been indexed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Inner product over shared terms, `None` when no term is shared.
fn sparse_dot(query: &SparseVector, doc: &SparseVector) -> Option<f64> {
    // Iterate the shorter map
    let (small, large) = if query.len() <= doc.len() {
        (query, doc)
    } else {
        (doc, query)
    };

    let mut matched = false;
    let mut score = 0.0;
    for (term, w) in small {
        if let Some(other) = large.get(term) {
            matched = true;
            score += (*w as f64) * (*other as f64);
        }
    }
    matched.then_some(score)
}

impl SearchBackend for SparseIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Sparse
    }

    #[instrument(skip_all, fields(backend = %self.name, query_id = %query.id, top_k = top_k))]
    fn search(&self, query: &Query, top_k: usize) -> Result<RankedList, BackendError> {
        let weights = query
            .sparse
            .as_ref()
            .ok_or(BackendError::MissingRepresentation("sparse"))?;

        let candidates = self
            .vectors
            .iter()
            .enumerate()
            .filter_map(|(idx, v)| sparse_dot(weights, v).map(|score| (idx, score)))
            .collect();

        Ok(top_k_hits(&self.records, candidates, top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sv(pairs: &[(u32, f32)]) -> SparseVector {
        pairs.iter().copied().collect()
    }

    fn index() -> SparseIndex {
        let mut index = SparseIndex::new("sparse");
        index.add(ChunkRecord::new("d1#0", "d1"), sv(&[(1, 2.0), (2, 1.0)]));
        index.add(ChunkRecord::new("d2#0", "d2"), sv(&[(2, 3.0)]));
        index.add(ChunkRecord::new("d3#0", "d3"), sv(&[(7, 5.0)]));
        index
    }

    #[test]
    fn test_sparse_inner_product() {
        let query = Query::new("q1", "").with_sparse(sv(&[(1, 1.0), (2, 1.0)]));
        let results = index().search(&query, 10).unwrap();

        // d1: 2 + 1 = 3, d2: 3, tie keeps index order; d3 shares no term
        assert_eq!(results.item_ids(), vec!["d1#0", "d2#0"]);
        assert!((results.items()[0].score - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_shared_terms() {
        let query = Query::new("q1", "").with_sparse(sv(&[(99, 1.0)]));
        assert!(index().search(&query, 10).unwrap().is_empty());
    }

    #[test]
    fn test_missing_sparse_representation() {
        assert_eq!(
            index().search(&Query::new("q1", "text"), 10),
            Err(BackendError::MissingRepresentation("sparse"))
        );
    }
}
