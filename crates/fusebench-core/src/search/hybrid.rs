//! Hybrid search: fuse the results of several child backends.
//!
//! Each child is asked for `top_k * candidate_multiplier` candidates so that
//! items ranked just outside one backend's top `k` can still win after
//! fusion. A failing child contributes an empty list (degraded mode); the
//! remaining children are still fused.

use super::backend::{search_or_empty, BackendKind, Query, SearchBackend};
use super::fusion::{fuse, FusionMethod};
use super::types::RankedList;
use crate::config::DEFAULT_CANDIDATE_MULTIPLIER;
use crate::error::{BackendError, FusionError};
use rayon::prelude::*;
use tracing::{debug, instrument};

/// A backend that fuses the output of child backends.
pub struct FusionBackend {
    name: String,
    children: Vec<Box<dyn SearchBackend>>,
    method: FusionMethod,
    candidate_multiplier: usize,
}

impl FusionBackend {
    /// Creates a fusion backend over `children`, in fusion-list order.
    ///
    /// Fails with [`FusionError::NoLists`] when `children` is empty and with
    /// [`FusionError::WeightCountMismatch`] when weighted fusion has a weight
    /// count different from the number of children.
    pub fn new(
        name: impl Into<String>,
        children: Vec<Box<dyn SearchBackend>>,
        method: FusionMethod,
    ) -> Result<Self, FusionError> {
        if children.is_empty() {
            return Err(FusionError::NoLists);
        }
        if let FusionMethod::Weighted { weights } = &method {
            if weights.len() != children.len() {
                return Err(FusionError::WeightCountMismatch {
                    lists: children.len(),
                    weights: weights.len(),
                });
            }
        }

        Ok(Self {
            name: name.into(),
            children,
            method,
            candidate_multiplier: DEFAULT_CANDIDATE_MULTIPLIER,
        })
    }

    /// Sets the candidate over-fetch factor (minimum 1).
    pub fn with_candidate_multiplier(mut self, multiplier: usize) -> Self {
        self.candidate_multiplier = multiplier.max(1);
        self
    }

    /// Fusion method in use.
    pub fn method(&self) -> &FusionMethod {
        &self.method
    }

    /// Names of the child backends, in fusion-list order.
    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.name()).collect()
    }
}

impl SearchBackend for FusionBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Fusion
    }

    #[instrument(skip_all, fields(backend = %self.name, query_id = %query.id, top_k = top_k))]
    fn search(&self, query: &Query, top_k: usize) -> Result<RankedList, BackendError> {
        let candidates = top_k.saturating_mul(self.candidate_multiplier);

        let lists: Vec<RankedList> = self
            .children
            .par_iter()
            .map(|child| search_or_empty(child.as_ref(), query, candidates))
            .collect();

        debug!(
            method = %self.method.kind(),
            list_sizes = ?lists.iter().map(RankedList::len).collect::<Vec<_>>(),
            "Fusing child results"
        );

        Ok(fuse(&lists, top_k, &self.method)?)
    }
}
