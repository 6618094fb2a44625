//! passage-query - Hybrid retrieval orchestration
//!
//! This crate combines the two rankers into one engine:
//!
//! - [`fuse_results`]: merges semantic and lexical result lists into a
//!   single confidence-ranked list.
//! - [`ConversationMemory`]: bounded per-session history of (query,
//!   answer) pairs.
//! - [`RetrievalEngine`]: the orchestrator owning both indices, the
//!   metadata store, and the collaborators, exposing the ingest and query
//!   paths.
//!
//! # Example
//!
//! ```rust,ignore
//! use passage_query::RetrievalEngine;
//! use std::sync::Arc;
//!
//! let engine = RetrievalEngine::open(
//!     store, embedder, generator, normalizer, index_path, search, memory,
//! ).await?;
//! let ids = engine.ingest(Some("s1"), "notes.txt", "notes.txt", &passages).await?;
//! let response = engine.query(Some("s1"), "What color is the sky?", 3).await?;
//! ```

mod engine;
mod fusion;
mod memory;

pub use engine::RetrievalEngine;
pub use fusion::fuse_results;
pub use memory::ConversationMemory;

// Re-export for convenience
pub use passage_core::{QueryResponse, ScoredPassage};
