//! Default lexical normalizer.

use passage_core::Normalizer;

/// Stopwords filtered from term sequences. Negations (`no`, `not`,
/// `never`) are deliberately absent: dropping them inverts meaning for
/// lexical matching.
const STOPWORDS: &[&str] = &[
    "a", "about", "after", "again", "all", "also", "an", "and", "any", "are", "as", "at", "be",
    "because", "been", "before", "being", "between", "both", "but", "by", "can", "could", "did",
    "do", "does", "doing", "down", "during", "each", "few", "for", "from", "further", "had",
    "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how", "i", "if", "in",
    "into", "is", "it", "its", "just", "may", "me", "might", "more", "most", "must", "my", "of",
    "off", "on", "once", "only", "or", "other", "our", "ours", "out", "over", "own", "same",
    "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "then", "there", "these", "they", "this", "those", "through", "to", "too", "under", "until",
    "up", "us", "very", "was", "we", "were", "what", "when", "where", "which", "while", "who",
    "whom", "why", "will", "with", "would", "you", "your", "yours",
];

/// Rule-based normalizer: lowercased alphanumeric terms, stopwords
/// removed, single-character terms dropped unless numeric.
///
/// Deliberately light - no lemmatization or stemming. The [`Normalizer`]
/// trait is the seam for swapping in a heavier implementation; whatever
/// normalizer indexes the corpus must also normalize queries.
#[derive(Debug, Default, Clone)]
pub struct SimpleNormalizer;

impl SimpleNormalizer {
    pub fn new() -> Self {
        Self
    }

    fn is_stopword(term: &str) -> bool {
        STOPWORDS.binary_search(&term).is_ok()
    }

    fn is_numeric(term: &str) -> bool {
        term.chars().all(|c| c.is_ascii_digit() || c == '.')
    }
}

impl Normalizer for SimpleNormalizer {
    fn normalize(&self, text: &str) -> Vec<String> {
        let mut terms = Vec::new();

        for raw in text.split_whitespace() {
            // Keep '.' so version-like tokens ("3.1") survive intact
            for piece in raw.split(|c: char| !(c.is_alphanumeric() || c == '.')) {
                let term = piece.trim_matches('.').to_lowercase();
                if term.is_empty() {
                    continue;
                }
                if Self::is_stopword(&term) {
                    continue;
                }
                if !Self::is_numeric(&term) && term.chars().count() < 2 {
                    continue;
                }
                terms.push(term);
            }
        }

        terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopwords_are_sorted_for_binary_search() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOPWORDS);
    }

    #[test]
    fn test_lowercases_and_drops_stopwords() {
        let normalizer = SimpleNormalizer::new();
        let terms = normalizer.normalize("What color is the Sky?");
        assert_eq!(terms, vec!["color", "sky"]);
    }

    #[test]
    fn test_preserves_negations() {
        let normalizer = SimpleNormalizer::new();
        let terms = normalizer.normalize("Running is not supported");
        assert!(terms.contains(&"not".to_string()));
    }

    #[test]
    fn test_keeps_numeric_tokens() {
        let normalizer = SimpleNormalizer::new();
        let terms = normalizer.normalize("supported in versions 3.1-3.2");
        assert!(terms.contains(&"3.1".to_string()));
        assert!(terms.contains(&"3.2".to_string()));
    }

    #[test]
    fn test_drops_single_letters_but_not_digits() {
        let normalizer = SimpleNormalizer::new();
        let terms = normalizer.normalize("x 7 marks q spot");
        assert_eq!(terms, vec!["7", "marks", "spot"]);
    }

    #[test]
    fn test_identical_for_index_and_query_text() {
        let normalizer = SimpleNormalizer::new();
        assert_eq!(
            normalizer.normalize("The grass IS green."),
            normalizer.normalize("the Grass is GREEN")
        );
    }
}
