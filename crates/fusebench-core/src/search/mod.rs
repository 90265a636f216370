//! Retrieval side: ranked lists, fusion, and the backends that produce them.
//!
//! # Architecture
//!
//! - `types`: [`ScoredItem`], [`RankedList`], [`ItemPayload`]
//! - `fusion`: Reciprocal Rank Fusion and weighted-score fusion over N lists
//! - `backend`: the [`SearchBackend`] trait, [`Query`], degraded-mode [`search_or_empty`]
//! - `dense`: brute-force inner-product search over `f32` embeddings
//! - `sparse`: inner-product search over sparse term-weight vectors
//! - `keyword`: BM25 full-text search
//! - `hybrid`: [`FusionBackend`], which fuses the output of child backends
//!
//! # Usage
//!
//! ```
//! use fusebench_core::search::{fuse, FusionMethod, RankedList};
//!
//! let dense: RankedList = vec![("a", 0.9), ("b", 0.8), ("c", 0.7)].into_iter().collect();
//! let sparse: RankedList = vec![("c", 12.0), ("a", 9.5), ("d", 3.1)].into_iter().collect();
//!
//! let fused = fuse(&[dense, sparse], 3, &FusionMethod::rrf()).unwrap();
//! assert_eq!(fused.item_ids(), vec!["a", "c", "b"]);
//! ```
//!
//! The in-memory backends are brute force. They exist so that runs, tests and
//! benches can be produced without an external search service.

pub mod backend;
pub mod dense;
pub mod fusion;
pub mod hybrid;
pub mod keyword;
pub mod sparse;
pub mod types;

pub use backend::{search_or_empty, BackendKind, ChunkRecord, Query, SearchBackend, SparseVector};
pub use dense::DenseIndex;
pub use fusion::{fuse, fuse_rrf, fuse_weighted, FusionKind, FusionMethod};
pub use hybrid::FusionBackend;
pub use keyword::FullTextIndex;
pub use sparse::SparseIndex;
pub use types::{ItemPayload, RankedList, ScoredItem};
