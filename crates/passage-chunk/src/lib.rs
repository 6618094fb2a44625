//! passage-chunk - Chunking collaborator
//!
//! Splits extracted document text into overlapping passages under a token
//! budget, ready for embedding and indexing.
//!
//! # Example
//!
//! ```rust
//! use passage_chunk::TokenWindowChunker;
//! use passage_core::{ChunkConfig, Chunker};
//!
//! let chunker = TokenWindowChunker::new();
//! let config = ChunkConfig { chunk_tokens: 8, overlap_tokens: 2 };
//! let passages = chunker.chunk("some long document text ...", &config);
//! ```

mod window;

pub use window::TokenWindowChunker;

// Re-export types for convenience
pub use passage_core::{ChunkConfig, Chunker};
