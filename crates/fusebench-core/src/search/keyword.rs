//! BM25 full-text search.
//!
//! Wraps the [`bm25`](https://crates.io/crates/bm25) crate. Chunks are indexed
//! by their text and searched with natural-language queries; the crate handles
//! English tokenization and stemming.
//!
//! Chunk ids are strings, while the bm25 engine keys documents by `u64`. The
//! index keeps a position table mapping one to the other.

use super::backend::{BackendKind, ChunkRecord, Query, SearchBackend};
use super::types::RankedList;
use crate::error::BackendError;
use bm25::{Document, Language, SearchEngineBuilder};
use std::collections::HashMap;
use tracing::instrument;

/// BM25 full-text index.
pub struct FullTextIndex {
    name: String,
    search_engine: bm25::SearchEngine<u64>,
    records: Vec<ChunkRecord>,
    /// item_id -> position in `records` (also the bm25 document id)
    positions: HashMap<String, u64>,
}

impl FullTextIndex {
    /// Creates an empty index with English tokenization.
    pub fn new(name: impl Into<String>) -> Self {
        let empty_docs: Vec<Document<u64>> = vec![];
        let search_engine =
            SearchEngineBuilder::<u64>::with_documents(Language::English, empty_docs).build();

        Self {
            name: name.into(),
            search_engine,
            records: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Indexes a chunk's text.
    ///
    /// Adding an `item_id` that is already indexed replaces its text and record.
    #[instrument(skip_all, fields(item_id = %record.item_id, text_len = tracing::field::Empty))]
    pub fn add(&mut self, record: ChunkRecord, text: impl Into<String>) {
        let contents: String = text.into();
        tracing::Span::current().record("text_len", contents.len());

        let id = match self.positions.get(&record.item_id) {
            Some(&id) => {
                self.records[id as usize] = record;
                id
            }
            None => {
                let id = self.records.len() as u64;
                self.positions.insert(record.item_id.clone(), id);
                self.records.push(record);
                id
            }
        };

        self.search_engine.upsert(Document { id, contents });
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

impl SearchBackend for FullTextIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::FullText
    }

    #[instrument(skip_all, fields(backend = %self.name, query_id = %query.id, top_k = top_k))]
    fn search(&self, query: &Query, top_k: usize) -> Result<RankedList, BackendError> {
        if query.text.trim().is_empty() {
            return Err(BackendError::MissingRepresentation("text"));
        }

        let hits = self
            .search_engine
            .search(&query.text, top_k)
            .into_iter()
            .filter_map(|result| {
                self.records
                    .get(result.document.id as usize)
                    .map(|record| record.hit(result.score as f64))
            })
            .collect();

        Ok(RankedList::new(hits))
    }
}
