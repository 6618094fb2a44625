//! passage-llm - Answer generation and query expansion
//!
//! This crate provides the LLM-backed collaborators of the retrieval
//! engine:
//!
//! - [`OpenAiGenerator`]: grounds an answer in the retrieved contexts and
//!   the session's conversation history via a chat-completions endpoint.
//! - [`OpenAiQueryExpander`]: enriches a query with synonyms and related
//!   terms before retrieval.
//! - [`MockGenerator`] / [`MockExpander`]: deterministic stand-ins for
//!   tests.

mod mock;
mod openai;

pub use mock::{MockExpander, MockGenerator};
pub use openai::{OpenAiGenerator, OpenAiQueryExpander};

// Re-export the collaborator traits for convenience
pub use passage_core::{Generator, QueryExpander};
