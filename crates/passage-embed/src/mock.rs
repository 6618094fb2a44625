//! Deterministic mock embedder for tests.

use async_trait::async_trait;

use passage_core::{Embedder, PassageError, Result};

/// A mock embedder that needs no network or model files.
///
/// Produces a hashed bag-of-words unit vector: each lowercased word maps
/// to a dimension by hash and contributes its count. Texts sharing
/// vocabulary therefore land closer in cosine space, which is enough for
/// retrieval tests to behave like a real embedding model.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    /// Create a mock embedder with the default dimension.
    pub fn new() -> Self {
        Self { dimension: 256 }
    }

    /// Create a mock embedder with a custom dimension.
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];

        for word in text.split_whitespace() {
            let word: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if word.is_empty() {
                continue;
            }

            let hash = word
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            embedding[(hash % self.dimension as u64) as usize] += 1.0;
        }

        // L2 normalize
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }
        embedding
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_documents(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| PassageError::embedding("No embedding returned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_vectors_are_unit_length() {
        let embedder = MockEmbedder::new();
        let embedding = embedder.embed_query("hello world").await.unwrap();

        assert_eq!(embedding.len(), 256);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_deterministic() {
        let embedder = MockEmbedder::new();
        let a = embedder.embed_query("consistent input").await.unwrap();
        let b = embedder.embed_query("consistent input").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let embedder = MockEmbedder::new();
        let query = embedder.embed_query("What color is the sky?").await.unwrap();
        let docs = embedder
            .embed_documents(&["The sky is blue.", "Grass is green."])
            .await
            .unwrap();

        assert!(cosine(&query, &docs[0]) > cosine(&query, &docs[1]));
    }

    #[tokio::test]
    async fn test_batch_order_matches_input() {
        let embedder = MockEmbedder::new();
        let batch = embedder.embed_documents(&["alpha", "beta"]).await.unwrap();
        let alpha = embedder.embed_query("alpha").await.unwrap();

        assert_eq!(batch[0], alpha);
        assert_ne!(batch[0], batch[1]);
    }

    #[tokio::test]
    async fn test_custom_dimension() {
        let embedder = MockEmbedder::with_dimension(32);
        let embedding = embedder.embed_query("test").await.unwrap();
        assert_eq!(embedding.len(), 32);
    }
}
