//! Configuration types for the retrieval engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the engine and its collaborators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Metadata store configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Vector index persistence configuration.
    #[serde(default)]
    pub index: IndexConfig,

    /// Embedding collaborator configuration.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Generation collaborator configuration.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Chunking configuration.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Search configuration.
    #[serde(default)]
    pub search: SearchConfig,

    /// Conversation memory configuration.
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Metadata store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_data_dir().join("chunks.db"),
        }
    }
}

/// Vector index persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Path the vector index blob is persisted to.
    pub path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_data_dir().join("index.vec"),
        }
    }
}

/// Embedding collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Embedding model name.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// API key. Falls back to `OPENAI_API_KEY` when unset.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_embedding_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Generation collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Chat model name.
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// API key. Falls back to `OPENAI_API_KEY` when unset.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Sampling temperature. Low keeps answers grounded in the contexts.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_generation_model(),
            api_key: None,
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Chunking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Token budget per chunk.
    #[serde(default = "default_chunk_tokens")]
    pub chunk_tokens: usize,

    /// Token overlap between consecutive chunks.
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_tokens: default_chunk_tokens(),
            overlap_tokens: default_overlap_tokens(),
        }
    }
}

/// Search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default number of fused results.
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Candidate pool multiplier for session-filtered search. Candidates
    /// are over-provisioned before the session filter because filtering
    /// can eliminate entries; a sparse session may still return fewer
    /// than k results.
    #[serde(default = "default_candidate_factor")]
    pub candidate_factor: usize,

    /// Enrich queries through the expansion collaborator when wired.
    #[serde(default = "default_true")]
    pub expand_queries: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            candidate_factor: default_candidate_factor(),
            expand_queries: true,
        }
    }
}

/// Conversation memory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Exchanges retained per session, oldest evicted first.
    #[serde(default = "default_memory_capacity")]
    pub capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_memory_capacity(),
        }
    }
}

impl EmbeddingConfig {
    /// Resolve the API key: config value first, then `OPENAI_API_KEY`.
    pub fn resolve_api_key(&self) -> crate::error::Result<String> {
        resolve_key(self.api_key.as_deref())
    }
}

impl GenerationConfig {
    /// Resolve the API key: config value first, then `OPENAI_API_KEY`.
    pub fn resolve_api_key(&self) -> crate::error::Result<String> {
        resolve_key(self.api_key.as_deref())
    }
}

fn resolve_key(configured: Option<&str>) -> crate::error::Result<String> {
    if let Some(key) = configured {
        return Ok(key.to_string());
    }
    std::env::var("OPENAI_API_KEY").map_err(|_| {
        crate::error::PassageError::config(
            "no api_key configured and OPENAI_API_KEY is not set",
        )
    })
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_chunk_tokens() -> usize {
    400
}

fn default_overlap_tokens() -> usize {
    100
}

fn default_top_k() -> usize {
    3
}

fn default_candidate_factor() -> usize {
    2
}

fn default_memory_capacity() -> usize {
    3
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("passage")
}

impl EngineConfig {
    /// Load configuration from file.
    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::PassageError::config(format!("Failed to parse config: {}", e))
        })?;
        Ok(config)
    }

    /// Load configuration from default paths.
    pub fn load_default() -> crate::error::Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("passage").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        // Try local config
        let local_config = PathBuf::from("passage.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        // Return defaults
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.search.default_top_k, 3);
        assert_eq!(config.search.candidate_factor, 2);
        assert_eq!(config.memory.capacity, 3);
        assert_eq!(config.chunking.chunk_tokens, 400);
        assert_eq!(config.chunking.overlap_tokens, 100);
    }

    #[test]
    fn test_parse_partial_config() {
        let config: EngineConfig = toml::from_str(
            r#"
            [search]
            default_top_k = 5

            [embedding]
            model = "text-embedding-3-small"
            "#,
        )
        .unwrap();

        assert_eq!(config.search.default_top_k, 5);
        assert_eq!(config.search.candidate_factor, 2);
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.generation.model, "gpt-4o-mini");
    }

    #[test]
    fn test_resolve_api_key_prefers_config() {
        let config = EmbeddingConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key().unwrap(), "sk-test");
    }
}
