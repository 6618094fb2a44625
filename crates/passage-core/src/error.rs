//! Error types for the retrieval engine.

use thiserror::Error;

/// Result type alias using PassageError.
pub type Result<T> = std::result::Result<T, PassageError>;

/// Errors that can occur in the retrieval engine.
#[derive(Error, Debug)]
pub enum PassageError {
    /// A vector with the wrong dimension was offered to the vector index.
    /// Fatal to the add call, not to the process.
    #[error("Dimension mismatch: index holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A persisted vector index blob could not be decoded. The caller
    /// decides whether to proceed with an empty index.
    #[error("Failed to load vector index: {message}")]
    IndexLoad { message: String },

    /// File extension not recognized by the text extractor.
    #[error("Unsupported file format: .{extension}")]
    UnsupportedFormat { extension: String },

    /// Embedding collaborator failure (transport, auth, malformed reply).
    #[error("Embedding error: {message}")]
    Embedding { message: String },

    /// Generation collaborator failure.
    #[error("Generation error: {message}")]
    Generation { message: String },

    /// Metadata store failure.
    #[error("Database error: {message}")]
    Database { message: String },

    /// Invalid argument provided.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal error (unexpected).
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PassageError {
    /// Create an index-load error.
    pub fn index_load(message: impl Into<String>) -> Self {
        Self::IndexLoad {
            message: message.into(),
        }
    }

    /// Create an embedding error.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a generation error.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
