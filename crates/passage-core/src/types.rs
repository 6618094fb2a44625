//! Core domain types for the retrieval engine.

use serde::{Deserialize, Serialize};

/// A stored passage: one retrievable unit of source-document text.
///
/// Owned by the metadata store; both indices reference passages by `id`
/// and never hold authoritative content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    /// Store-assigned identifier. Strictly increasing, never reused.
    pub id: i64,

    /// Source document identifier (typically the original filename).
    /// Not unique: a document yields many passages.
    pub doc_id: String,

    /// Passage text. Immutable after creation.
    pub content: String,

    /// 0-based position within the source document. Traceability only.
    pub chunk_index: u32,

    /// Original filename, kept for citation.
    pub source_filename: String,

    /// Insertion timestamp (Unix millis). Never updated.
    pub created_at: i64,

    /// Isolation boundary. `None` for single-tenant rows.
    pub session_id: Option<String>,
}

/// A passage awaiting insertion; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewPassage {
    pub doc_id: String,
    pub content: String,
    pub chunk_index: u32,
    pub source_filename: String,
    pub session_id: Option<String>,
}

/// A passage paired with a relevance score.
///
/// Used for both raw ranker output (cosine similarity or BM25, depending
/// on the source) and fused results, where `score` is the synthetic
/// confidence in `[0.6, 0.95]` - a display band, not a probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub id: i64,
    pub doc_id: String,
    pub content: String,
    pub source_filename: String,
    pub score: f32,
}

impl ScoredPassage {
    /// Build a scored passage from a stored row and a ranker score.
    pub fn from_passage(passage: &Passage, score: f32) -> Self {
        Self {
            id: passage.id,
            doc_id: passage.doc_id.clone(),
            content: passage.content.clone(),
            source_filename: passage.source_filename.clone(),
            score,
        }
    }
}

/// One remembered interaction: a query and the answer it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub query: String,
    pub response: String,
}

/// The outcome of a query: the generated answer plus the fused,
/// confidence-ranked passages it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub results: Vec<ScoredPassage>,
}

/// Statistics about the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    /// Distinct source documents.
    pub documents: u64,

    /// Stored passages.
    pub passages: u64,

    /// Database size in bytes.
    pub storage_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scored_passage_from_passage() {
        let passage = Passage {
            id: 7,
            doc_id: "report.txt".to_string(),
            content: "The sky is blue.".to_string(),
            chunk_index: 0,
            source_filename: "report.txt".to_string(),
            created_at: 0,
            session_id: Some("s1".to_string()),
        };

        let scored = ScoredPassage::from_passage(&passage, 0.9);
        assert_eq!(scored.id, 7);
        assert_eq!(scored.content, "The sky is blue.");
        assert!((scored.score - 0.9).abs() < f32::EPSILON);
    }
}
