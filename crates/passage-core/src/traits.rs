//! Core traits defining the interfaces between components.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Exchange, NewPassage, Passage, Stats};

/// Metadata store: the durable, queryable record of passages and the
/// source of truth for content and session scoping.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Append one passage, returning the assigned identifier.
    ///
    /// Identifiers are strictly increasing and never reused for the
    /// lifetime of the store.
    async fn insert_passage(&self, passage: NewPassage) -> Result<i64>;

    /// Fetch rows for the given ids. Missing ids are silently omitted.
    async fn fetch_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, Passage>>;

    /// All `(id, content)` pairs in ascending id order.
    ///
    /// Used solely to rebuild the lexical index from the store.
    async fn fetch_all(&self) -> Result<Vec<(i64, String)>>;

    /// Counts and storage size.
    async fn stats(&self) -> Result<Stats>;
}

/// Embedding collaborator: maps text to fixed-dimension float vectors.
///
/// Called once per passage batch at ingest and once per query. The vector
/// index discovers the dimension from the first inserted vector, so the
/// trait does not expose it.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of passage texts, one vector per input, in order.
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

/// Generation collaborator: synthesizes an answer from the query, the
/// retrieved contexts, and the session's conversation history.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        query: &str,
        contexts: &[String],
        history: &[Exchange],
    ) -> Result<String>;
}

/// Optional query-expansion collaborator: enriches a query with synonyms
/// and related terms before retrieval. The engine treats an absent
/// expander as a pass-through.
#[async_trait]
pub trait QueryExpander: Send + Sync {
    async fn expand(&self, query: &str) -> Result<String>;
}

/// Lexical normalizer: turns text into the term sequence scored by the
/// lexical index. The same normalizer MUST be applied at index time and
/// query time, or relevance degrades silently.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, text: &str) -> Vec<String>;
}

/// Chunking configuration.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Token budget per chunk.
    pub chunk_tokens: usize,

    /// Token overlap between consecutive chunks.
    pub overlap_tokens: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_tokens: 400,
            overlap_tokens: 100,
        }
    }
}

/// Chunker collaborator: splits extracted text into ordered, non-empty,
/// whitespace-trimmed passages under the token budget.
pub trait Chunker: Send + Sync {
    fn chunk(&self, text: &str, config: &ChunkConfig) -> Vec<String>;
}
