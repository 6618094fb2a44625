//! OpenAI-compatible chat-completions clients.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use passage_core::{Exchange, GenerationConfig, Generator, PassageError, QueryExpander, Result};

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// Shared chat-completions transport.
struct ChatClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl ChatClient {
    fn from_config(config: &GenerationConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PassageError::generation(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    async fn complete(&self, messages: Vec<serde_json::Value>) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| PassageError::generation(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PassageError::generation(format!(
                "API returned {}: {}",
                status, detail
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| PassageError::generation(format!("Malformed response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| PassageError::generation("No completion returned"))
    }
}

/// Answer generator grounded in retrieved contexts.
///
/// The session's conversation history is replayed as prior chat turns so
/// the model can resolve follow-up questions; the final turn instructs it
/// to answer from the supplied contexts only.
pub struct OpenAiGenerator {
    chat: ChatClient,
}

impl OpenAiGenerator {
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            chat: ChatClient::from_config(config)?,
        })
    }
}

/// Build the grounded-answer prompt from contexts and the query.
fn answer_prompt(query: &str, contexts: &[String]) -> String {
    format!(
        "You are an assistant with access to retrieved contexts from various documents.\n\
         Using the information you find in the documents, answer the user query using only \
         the contexts below.\n\nContext:\n{}\n\nQuery: {}\n\nAnswer:",
        contexts.join("\n"),
        query
    )
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(
        &self,
        query: &str,
        contexts: &[String],
        history: &[Exchange],
    ) -> Result<String> {
        let mut messages = Vec::with_capacity(history.len() * 2 + 1);

        for exchange in history {
            messages.push(serde_json::json!({"role": "user", "content": exchange.query}));
            messages.push(serde_json::json!({"role": "assistant", "content": exchange.response}));
        }

        messages.push(serde_json::json!({
            "role": "user",
            "content": answer_prompt(query, contexts),
        }));

        debug!(
            "Generating answer from {} contexts, {} remembered exchanges",
            contexts.len(),
            history.len()
        );

        self.chat.complete(messages).await
    }
}

/// Query expander: rewrites a query with synonyms and related terms to
/// widen lexical recall. Optional - the engine runs without one.
pub struct OpenAiQueryExpander {
    chat: ChatClient,
}

impl OpenAiQueryExpander {
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            chat: ChatClient::from_config(config)?,
        })
    }
}

#[async_trait]
impl QueryExpander for OpenAiQueryExpander {
    async fn expand(&self, query: &str) -> Result<String> {
        let prompt = format!(
            "Rewrite the following search query by appending synonyms and closely related \
             terms, keeping the original wording first. Return only the rewritten query.\n\n\
             Query: {}",
            query
        );

        let messages = vec![serde_json::json!({"role": "user", "content": prompt})];
        let expanded = self.chat.complete(messages).await?;

        // An empty rewrite would erase the query; keep the original
        if expanded.is_empty() {
            return Ok(query.to_string());
        }
        Ok(expanded)
    }
}
