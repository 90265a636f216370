//! Gold query files, run files and comparison output.
//!
//! All files are JSON:
//!
//! | File | Layout |
//! |------|--------|
//! | Gold queries | `[{"query_id": .., "query": .., "relevant_docs": [..]}, ..]` |
//! | Method results | `{"<method>": {"<query_id>": ["<doc_id>", ..]}}` |
//! | Scored run | `{"<query_id>": [{"item_id": .., "score": .., "parent_id": ..}]}` |
//!
//! Unknown fields in gold query records are ignored, so files carrying extra
//! annotations (query type, difficulty, ...) load unchanged.

use super::compare::{MethodResults, RelevanceSets};
use crate::error::DatasetError;
use crate::search::types::RankedList;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// A query with its gold relevance judgments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldQuery {
    /// Query identifier
    pub query_id: String,
    /// Query text
    pub query: String,
    /// Ids of the documents judged relevant
    #[serde(default)]
    pub relevant_docs: Vec<String>,
}

/// Query id -> ranked scored items from one backend.
pub type ScoredRun = BTreeMap<String, RankedList>;

fn io_error(path: &Path, err: std::io::Error) -> DatasetError {
    DatasetError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DatasetError> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| DatasetError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Loads and concatenates gold query files, in argument order.
pub fn load_gold_queries<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<GoldQuery>, DatasetError> {
    let mut queries = Vec::new();
    for path in paths {
        let mut batch: Vec<GoldQuery> = read_json(path.as_ref())?;
        queries.append(&mut batch);
    }
    Ok(queries)
}

/// Builds relevance sets from gold queries.
///
/// A query id that appears more than once takes the judgments of its last
/// occurrence.
pub fn relevance_sets(queries: &[GoldQuery]) -> RelevanceSets {
    queries
        .iter()
        .map(|q| (q.query_id.clone(), q.relevant_docs.iter().cloned().collect()))
        .collect()
}

/// Loads a method-results file.
pub fn load_method_results(path: impl AsRef<Path>) -> Result<MethodResults, DatasetError> {
    read_json(path.as_ref())
}

/// Loads a scored run. Repeated item ids within a query keep their first
/// occurrence.
pub fn load_scored_run(path: impl AsRef<Path>) -> Result<ScoredRun, DatasetError> {
    read_json(path.as_ref())
}

/// Writes `value` as pretty-printed JSON, creating parent directories.
pub fn save_json<T: Serialize + ?Sized>(
    path: impl AsRef<Path>,
    value: &T,
) -> Result<(), DatasetError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }

    let file = File::create(path).map_err(|e| io_error(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| DatasetError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    writer.write_all(b"\n").map_err(|e| io_error(path, e))?;
    writer.flush().map_err(|e| io_error(path, e))
}
