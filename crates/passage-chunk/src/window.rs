//! Sliding token-window chunker.

use passage_core::{ChunkConfig, Chunker};

/// Chunker that slides a fixed-size token window across the text with
/// overlap between consecutive windows, so information near a boundary
/// appears in both neighbors.
///
/// Tokens are approximated by whitespace-delimited words; a sub-word
/// tokenizer can replace this behind the [`Chunker`] trait without
/// touching callers.
#[derive(Debug, Default, Clone)]
pub struct TokenWindowChunker;

impl TokenWindowChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for TokenWindowChunker {
    fn chunk(&self, text: &str, config: &ChunkConfig) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }

        let chunk_tokens = config.chunk_tokens.max(1);
        // Step must advance or the window never terminates
        let step = chunk_tokens.saturating_sub(config.overlap_tokens).max(1);

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < words.len() {
            let end = (start + chunk_tokens).min(words.len());
            let chunk = words[start..end].join(" ");
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }
            if end == words.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunker = TokenWindowChunker::new();
        let config = ChunkConfig {
            chunk_tokens: 100,
            overlap_tokens: 10,
        };

        let chunks = chunker.chunk("just a few words here", &config);
        assert_eq!(chunks, vec!["just a few words here"]);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunker = TokenWindowChunker::new();
        let config = ChunkConfig::default();

        assert!(chunker.chunk("", &config).is_empty());
        assert!(chunker.chunk("   \n\t ", &config).is_empty());
    }

    #[test]
    fn test_windows_overlap() {
        let chunker = TokenWindowChunker::new();
        let config = ChunkConfig {
            chunk_tokens: 4,
            overlap_tokens: 2,
        };

        let chunks = chunker.chunk(&words(8), &config);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "w0 w1 w2 w3");
        assert_eq!(chunks[1], "w2 w3 w4 w5");
        assert_eq!(chunks[2], "w4 w5 w6 w7");
    }

    #[test]
    fn test_every_chunk_within_budget() {
        let chunker = TokenWindowChunker::new();
        let config = ChunkConfig {
            chunk_tokens: 5,
            overlap_tokens: 1,
        };

        for chunk in chunker.chunk(&words(23), &config) {
            assert!(chunk.split_whitespace().count() <= 5);
        }
    }

    #[test]
    fn test_last_words_are_covered() {
        let chunker = TokenWindowChunker::new();
        let config = ChunkConfig {
            chunk_tokens: 4,
            overlap_tokens: 1,
        };

        let chunks = chunker.chunk(&words(10), &config);
        assert!(chunks.last().unwrap().contains("w9"));
    }

    #[test]
    fn test_overlap_larger_than_budget_still_advances() {
        let chunker = TokenWindowChunker::new();
        let config = ChunkConfig {
            chunk_tokens: 3,
            overlap_tokens: 10,
        };

        let chunks = chunker.chunk(&words(6), &config);
        assert!(!chunks.is_empty());
        assert!(chunks.len() <= 6);
    }
}
