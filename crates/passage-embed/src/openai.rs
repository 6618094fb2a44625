//! OpenAI-compatible embedding client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use passage_core::{Embedder, EmbeddingConfig, PassageError, Result};

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
///
/// Sends a batch of texts and returns one vector per input, in input
/// order. Transport and auth failures surface as `Embedding` errors; no
/// retry is attempted here - backoff, if wanted, belongs to the caller.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Build an embedder from configuration, resolving the API key from
    /// the config value or the `OPENAI_API_KEY` environment variable.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        Self::new(&config.api_base, &api_key, &config.model, config.timeout_secs)
    }

    /// Build an embedder with explicit credentials.
    pub fn new(api_base: &str, api_key: &str, model: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PassageError::embedding(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    async fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| PassageError::embedding(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PassageError::embedding(format!(
                "API returned {}: {}",
                status, detail
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| PassageError::embedding(format!("Malformed response: {}", e)))?;

        if parsed.data.len() != texts.len() {
            return Err(PassageError::embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        // The API echoes input positions; order by index rather than
        // trusting response order
        let mut items = parsed.data;
        items.sort_by_key(|item| item.index);

        debug!("Embedded {} texts with {}", texts.len(), self.model);
        Ok(items.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.request(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| PassageError::embedding("No embedding returned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed_from_api_base() {
        let embedder =
            OpenAiEmbedder::new("https://api.example.com/v1/", "sk-test", "model", 30).unwrap();
        assert_eq!(embedder.api_base, "https://api.example.com/v1");
    }

    #[tokio::test]
    async fn test_empty_batch_short_circuits() {
        let embedder =
            OpenAiEmbedder::new("https://api.example.com/v1", "sk-test", "model", 30).unwrap();
        let embeddings = embedder.embed_documents(&[]).await.unwrap();
        assert!(embeddings.is_empty());
    }
}
