//! Brute-force dense vector search.
//!
//! Scores every stored embedding against the query with the inner product,
//! the metric used for normalized sentence embeddings. Intended for small
//! evaluation corpora; there is no approximate index.

use super::backend::{
    top_k_hits, validate_dimension, BackendKind, ChunkRecord, Query, SearchBackend,
};
use super::types::RankedList;
use crate::error::BackendError;
use tracing::instrument;

/// In-memory dense embedding index.
pub struct DenseIndex {
    name: String,
    dimension: usize,
    records: Vec<ChunkRecord>,
    vectors: Vec<Vec<f32>>,
}

impl DenseIndex {
    /// Creates an empty index for vectors of `dimension` components.
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            records: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Adds a chunk with its embedding.
    ///
    /// Fails with [`BackendError::DimensionMismatch`] if the embedding has the
    /// wrong length.
    pub fn add(&mut self, record: ChunkRecord, embedding: Vec<f32>) -> Result<(), BackendError> {
        validate_dimension(self.dimension, embedding.len())?;
        self.records.push(record);
        self.vectors.push(embedding);
        Ok(())
    }

    /// Embedding dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
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

fn inner_product(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum()
}

impl SearchBackend for DenseIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Dense
    }

    #[instrument(skip_all, fields(backend = %self.name, query_id = %query.id, top_k = top_k))]
    fn search(&self, query: &Query, top_k: usize) -> Result<RankedList, BackendError> {
        let embedding = query
            .dense
            .as_deref()
            .ok_or(BackendError::MissingRepresentation("dense"))?;
        validate_dimension(self.dimension, embedding.len())?;

        let candidates = self
            .vectors
            .iter()
            .enumerate()
            .map(|(idx, v)| (idx, inner_product(embedding, v)))
            .collect();

        Ok(top_k_hits(&self.records, candidates, top_k))
    }
}
