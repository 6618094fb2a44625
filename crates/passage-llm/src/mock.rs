//! Deterministic mock collaborators for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use passage_core::{Exchange, Generator, PassageError, QueryExpander, Result};

/// A mock generator that echoes what it was asked with, recording calls.
///
/// The produced answer embeds the query, context count, and history
/// length, so tests can assert what reached the generation collaborator
/// without parsing free text.
pub struct MockGenerator {
    calls: Mutex<Vec<(String, usize, usize)>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(query, context count, history length)` per generate call.
    pub fn calls(&self) -> Vec<(String, usize, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(
        &self,
        query: &str,
        contexts: &[String],
        history: &[Exchange],
    ) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), contexts.len(), history.len()));

        Ok(format!(
            "answer to '{}' from {} contexts ({} remembered)",
            query,
            contexts.len(),
            history.len()
        ))
    }
}

/// A mock expander that appends a fixed suffix, or fails on demand.
pub struct MockExpander {
    suffix: String,
    fail: bool,
}

impl MockExpander {
    pub fn new(suffix: &str) -> Self {
        Self {
            suffix: suffix.to_string(),
            fail: false,
        }
    }

    /// An expander whose `expand` always errors.
    pub fn failing() -> Self {
        Self {
            suffix: String::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl QueryExpander for MockExpander {
    async fn expand(&self, query: &str) -> Result<String> {
        if self.fail {
            return Err(PassageError::generation("expansion unavailable"));
        }
        Ok(format!("{} {}", query, self.suffix))
    }
}
