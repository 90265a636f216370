use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Display data attached to a retrieval hit.
///
/// Fusion keeps the payload from the first list an item appears in and
/// records the fusion method and fused score in `metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPayload {
    /// Document or chunk title
    #[serde(default)]
    pub title: String,
    /// Chunk text
    #[serde(default)]
    pub content: String,
    /// Free-form metadata (source path, fusion annotations, ...)
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// A single retrieval hit.
///
/// `item_id` identifies the retrievable unit (a chunk). `parent_id` is the
/// document the chunk belongs to; relevance is judged at the document level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    /// Unique id of the retrieved unit
    pub item_id: String,
    /// Backend-specific relevance score (higher is better)
    pub score: f64,
    /// Parent document id, if the unit is a chunk of a larger document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Display payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ItemPayload>,
}

impl ScoredItem {
    /// Creates a hit with no parent id and no payload.
    pub fn new(item_id: impl Into<String>, score: f64) -> Self {
        Self {
            item_id: item_id.into(),
            score,
            parent_id: None,
            payload: None,
        }
    }

    /// Sets the parent document id.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Sets the display payload.
    pub fn with_payload(mut self, payload: ItemPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Id used for relevance judging: the parent id, or the item id itself.
    pub fn parent_or_item_id(&self) -> &str {
        self.parent_id.as_deref().unwrap_or(&self.item_id)
    }
}

/// Ordered retrieval output, rank 1 first.
///
/// A `RankedList` never reorders its items. Construction drops repeated
/// `item_id`s, keeping the first occurrence, so each id appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ScoredItem>", into = "Vec<ScoredItem>")]
pub struct RankedList {
    items: Vec<ScoredItem>,
}

impl RankedList {
    /// Builds a list from items in rank order, dropping later duplicates.
    pub fn new(items: Vec<ScoredItem>) -> Self {
        let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
        let items = items
            .into_iter()
            .filter(|item| seen.insert(item.item_id.clone()))
            .collect();
        Self { items }
    }

    /// Creates an empty list.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the first `k` items (or all of them if the list is shorter).
    pub fn truncate(&self, k: usize) -> RankedList {
        Self {
            items: self.items.iter().take(k).cloned().collect(),
        }
    }

    /// Items in rank order.
    pub fn items(&self) -> &[ScoredItem] {
        &self.items
    }

    /// Iterates over items in rank order.
    pub fn iter(&self) -> std::slice::Iter<'_, ScoredItem> {
        self.items.iter()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the list holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item ids in rank order.
    pub fn item_ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.item_id.clone()).collect()
    }

    /// Parent ids in rank order (item id where no parent is set).
    ///
    /// Several chunks of one document map to the same parent id, so the
    /// result may contain repeats. Metric functions handle those.
    pub fn parent_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|i| i.parent_or_item_id().to_string())
            .collect()
    }

    /// Highest score in the list, `None` if empty.
    pub fn max_score(&self) -> Option<f64> {
        self.items.iter().map(|i| i.score).reduce(f64::max)
    }

    /// Consumes the list, returning its items.
    pub fn into_items(self) -> Vec<ScoredItem> {
        self.items
    }
}

impl From<Vec<ScoredItem>> for RankedList {
    fn from(items: Vec<ScoredItem>) -> Self {
        Self::new(items)
    }
}

impl From<RankedList> for Vec<ScoredItem> {
    fn from(list: RankedList) -> Self {
        list.items
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for RankedList {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(id, score)| ScoredItem::new(id, score))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a RankedList {
    type Item = &'a ScoredItem;
    type IntoIter = std::slice::Iter<'a, ScoredItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
