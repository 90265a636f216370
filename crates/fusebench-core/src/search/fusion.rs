//! Rank fusion: Reciprocal Rank Fusion and weighted-score fusion.
//!
//! Both methods take ranked lists produced by different backends for the
//! same query and merge them into one list keyed by `item_id`.
//!
//! **RRF** uses ranks only:
//!
//! ```text
//! RRF_score(d) = Σ_r 1 / (k + rank_r(d))
//! ```
//!
//! where `rank_r(d)` is the 1-based position of `d` in list `r`. It needs no
//! normalization, which suits backends with incomparable scales (inner
//! product vs BM25 vs full-text relevance).
//!
//! **Weighted fusion** normalizes each list by its own maximum score and
//! sums `weight_i * normalized_i`. Weights are not required to sum to 1.
//!
//! In both methods the first list in which an item appears supplies its
//! payload and parent id. Ties in fused score keep first-seen order.

use super::types::{RankedList, ScoredItem};
use crate::config::DEFAULT_RRF_K;
use crate::error::FusionError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Fusion method name, parsed from `"rrf"` or `"weighted"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionKind {
    /// Reciprocal Rank Fusion
    Rrf,
    /// Max-normalized weighted score fusion
    Weighted,
}

impl FusionKind {
    /// Lowercase name used in configs, metadata and CLI flags.
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionKind::Rrf => "rrf",
            FusionKind::Weighted => "weighted",
        }
    }
}

impl fmt::Display for FusionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FusionKind {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rrf" => Ok(FusionKind::Rrf),
            "weighted" => Ok(FusionKind::Weighted),
            _ => Err(FusionError::UnknownMethod(s.to_string())),
        }
    }
}

/// A fusion method together with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum FusionMethod {
    /// Reciprocal Rank Fusion with dampening constant `k_constant`
    Rrf {
        /// Added to every rank before taking the reciprocal
        k_constant: usize,
    },
    /// Weighted fusion with one weight per input list
    Weighted {
        /// Per-list weights, in input-list order
        weights: Vec<f64>,
    },
}

impl FusionMethod {
    /// RRF with the conventional `k = 60`.
    pub fn rrf() -> Self {
        FusionMethod::Rrf {
            k_constant: DEFAULT_RRF_K,
        }
    }

    /// Weighted fusion with the given weights.
    pub fn weighted(weights: Vec<f64>) -> Self {
        FusionMethod::Weighted { weights }
    }

    /// Builds a method from its name plus parameters.
    ///
    /// `k_constant` is used for RRF, `weights` for weighted fusion; the other
    /// parameter is ignored.
    pub fn from_name(
        name: &str,
        k_constant: usize,
        weights: Vec<f64>,
    ) -> Result<Self, FusionError> {
        Ok(match name.parse::<FusionKind>()? {
            FusionKind::Rrf => FusionMethod::Rrf { k_constant },
            FusionKind::Weighted => FusionMethod::Weighted { weights },
        })
    }

    /// Which kind of fusion this is.
    pub fn kind(&self) -> FusionKind {
        match self {
            FusionMethod::Rrf { .. } => FusionKind::Rrf,
            FusionMethod::Weighted { .. } => FusionKind::Weighted,
        }
    }
}

impl Default for FusionMethod {
    fn default() -> Self {
        Self::rrf()
    }
}

/// Fuses `lists` with the given method and returns the top `top_k` items.
pub fn fuse(
    lists: &[RankedList],
    top_k: usize,
    method: &FusionMethod,
) -> Result<RankedList, FusionError> {
    match method {
        FusionMethod::Rrf { k_constant } => fuse_rrf(lists, top_k, *k_constant),
        FusionMethod::Weighted { weights } => fuse_weighted(lists, weights, top_k),
    }
}

/// Combines ranked lists using Reciprocal Rank Fusion.
///
/// Each item at 1-based rank `r` in any list contributes `1 / (k_constant + r)`.
/// Contributions are summed per `item_id`, sorted descending (stable on
/// first-seen order) and truncated to `top_k`.
///
/// # Errors
///
/// [`FusionError::NoLists`] if `lists` is empty. Empty lists inside `lists`
/// are fine and contribute nothing.
pub fn fuse_rrf(
    lists: &[RankedList],
    top_k: usize,
    k_constant: usize,
) -> Result<RankedList, FusionError> {
    if lists.is_empty() {
        return Err(FusionError::NoLists);
    }

    let k_param = k_constant as f64;
    let mut acc = FusedScores::default();

    for list in lists {
        for (rank, item) in list.iter().enumerate() {
            let rank_position = (rank + 1) as f64; // 1-indexed
            acc.add(item, 1.0 / (k_param + rank_position));
        }
    }

    Ok(acc.into_ranked(top_k, FusionKind::Rrf))
}

/// Combines ranked lists using max-normalized weighted scores.
///
/// Every score in list `i` is divided by the maximum score of list `i`. A
/// list that is empty or whose maximum is not positive uses a divisor of 1.
/// Non-finite input scores count as 0 and are left out of the maximum.
/// An item's fused score is `Σ weights[i] * normalized_i` over the lists it
/// appears in.
///
/// # Errors
///
/// - [`FusionError::NoLists`] if `lists` is empty
/// - [`FusionError::WeightCountMismatch`] if `lists.len() != weights.len()`
/// - [`FusionError::InvalidWeight`] if a weight is NaN or infinite
pub fn fuse_weighted(
    lists: &[RankedList],
    weights: &[f64],
    top_k: usize,
) -> Result<RankedList, FusionError> {
    if lists.is_empty() {
        return Err(FusionError::NoLists);
    }
    if lists.len() != weights.len() {
        return Err(FusionError::WeightCountMismatch {
            lists: lists.len(),
            weights: weights.len(),
        });
    }
    if let Some(bad) = weights.iter().find(|w| !w.is_finite()) {
        return Err(FusionError::InvalidWeight(bad.to_string()));
    }

    let mut acc = FusedScores::default();

    for (list, &weight) in lists.iter().zip(weights) {
        let divisor = normalization_divisor(list);
        for item in list {
            acc.add(item, weight * (finite_or_zero(item.score) / divisor));
        }
    }

    Ok(acc.into_ranked(top_k, FusionKind::Weighted))
}

/// Divisor used to scale a list's scores into `[0, 1]`.
///
/// Only finite scores take part in the maximum.
fn normalization_divisor(list: &RankedList) -> f64 {
    let max = list
        .iter()
        .map(|item| item.score)
        .filter(|score| score.is_finite())
        .reduce(f64::max);

    match max {
        Some(max) if max > 0.0 => max,
        _ => 1.0,
    }
}

/// NaN and infinite scores count as 0.
fn finite_or_zero(score: f64) -> f64 {
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// Running fused scores in first-seen order.
#[derive(Default)]
struct FusedScores {
    items: Vec<ScoredItem>,
    scores: Vec<f64>,
    index: HashMap<String, usize>,
}

impl FusedScores {
    fn add(&mut self, item: &ScoredItem, contribution: f64) {
        match self.index.get(&item.item_id) {
            Some(&idx) => self.scores[idx] += contribution,
            None => {
                self.index.insert(item.item_id.clone(), self.items.len());
                self.items.push(item.clone());
                self.scores.push(contribution);
            }
        }
    }

    fn into_ranked(self, top_k: usize, kind: FusionKind) -> RankedList {
        let mut combined: Vec<(ScoredItem, f64)> =
            self.items.into_iter().zip(self.scores).collect();

        // sort_by is stable: equal scores keep first-seen order
        combined.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let fused = combined
            .into_iter()
            .take(top_k)
            .map(|(mut item, score)| {
                item.score = score;
                if let Some(payload) = item.payload.as_mut() {
                    payload
                        .metadata
                        .insert("fusion_method".to_string(), kind.as_str().into());
                    payload
                        .metadata
                        .insert("fusion_score".to_string(), score.into());
                }
                item
            })
            .collect();

        RankedList::new(fused)
    }
}
