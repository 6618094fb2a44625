//! BM25 lexical index.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use passage_core::Normalizer;

/// BM25 term-frequency saturation constant.
const BM25_K1: f32 = 1.5;

/// BM25 document-length normalization constant.
const BM25_B: f32 = 0.75;

/// In-memory BM25 index over normalized term sequences.
///
/// A derived cache: the corpus can always be reconstructed by
/// re-normalizing every passage in the metadata store in ascending id
/// order, and must be rebuilt that way on process start. Every `add`
/// rebuilds the ranking statistics over the full corpus; corpus sizes are
/// moderate, so incremental maintenance of document frequencies stays a
/// future optimization.
pub struct LexicalIndex {
    normalizer: Arc<dyn Normalizer>,

    /// Passage ids, in first-seen order.
    ids: Vec<i64>,

    /// Per-passage term frequencies, parallel to `ids`.
    term_freqs: Vec<HashMap<String, u32>>,

    /// Per-passage term counts, parallel to `ids`.
    doc_lens: Vec<f32>,

    /// Number of passages each term occurs in.
    doc_freq: HashMap<String, u32>,

    /// Average passage length in terms.
    avgdl: f32,
}

impl LexicalIndex {
    /// Create an empty index around a normalizer.
    ///
    /// The same normalizer is applied at index time and query time; the
    /// two must never diverge.
    pub fn new(normalizer: Arc<dyn Normalizer>) -> Self {
        Self {
            normalizer,
            ids: Vec::new(),
            term_freqs: Vec::new(),
            doc_lens: Vec::new(),
            doc_freq: HashMap::new(),
            avgdl: 0.0,
        }
    }

    /// Number of indexed passages.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Normalize and append `(id, text)` pairs, then rebuild the ranking
    /// statistics over the full corpus.
    pub fn add(&mut self, ids: &[i64], texts: &[&str]) {
        for (id, text) in ids.iter().zip(texts) {
            let terms = self.normalizer.normalize(text);

            let mut tf: HashMap<String, u32> = HashMap::new();
            for term in &terms {
                *tf.entry(term.clone()).or_default() += 1;
            }

            self.ids.push(*id);
            self.doc_lens.push(terms.len() as f32);
            self.term_freqs.push(tf);
        }

        self.rebuild_stats();
        debug!("Lexical index now holds {} passages", self.len());
    }

    /// Discard the corpus and rebuild it from `(id, content)` rows in
    /// ascending id order, as fetched from the metadata store.
    pub fn rebuild_from(&mut self, rows: &[(i64, String)]) {
        self.ids.clear();
        self.term_freqs.clear();
        self.doc_lens.clear();

        let ids: Vec<i64> = rows.iter().map(|(id, _)| *id).collect();
        let texts: Vec<&str> = rows.iter().map(|(_, content)| content.as_str()).collect();
        self.add(&ids, &texts);
    }

    /// Recompute document frequencies and average length.
    fn rebuild_stats(&mut self) {
        self.doc_freq.clear();
        for tf in &self.term_freqs {
            for term in tf.keys() {
                *self.doc_freq.entry(term.clone()).or_default() += 1;
            }
        }

        self.avgdl = if self.doc_lens.is_empty() {
            0.0
        } else {
            self.doc_lens.iter().sum::<f32>() / self.doc_lens.len() as f32
        };
    }

    /// Inverse document frequency, always positive.
    fn idf(&self, term: &str) -> f32 {
        let n = self.ids.len() as f32;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Top-k BM25 search.
    ///
    /// Normalizes the query with the indexing-time rules, scores every
    /// corpus entry, discards non-positive scores, and returns `(id,
    /// score)` pairs by descending score, ties broken by first-seen
    /// order. An empty corpus yields an empty result.
    pub fn search(&self, query: &str, k: usize) -> Vec<(i64, f32)> {
        if self.is_empty() || k == 0 {
            return Vec::new();
        }

        let terms = self.normalizer.normalize(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<(i64, f32)> = Vec::new();

        for (i, id) in self.ids.iter().enumerate() {
            let tf = &self.term_freqs[i];
            let len_norm = 1.0 - BM25_B + BM25_B * self.doc_lens[i] / self.avgdl;

            let mut score = 0.0f32;
            for term in &terms {
                let freq = tf.get(term).copied().unwrap_or(0) as f32;
                if freq == 0.0 {
                    continue;
                }
                score += self.idf(term) * freq * (BM25_K1 + 1.0)
                    / (freq + BM25_K1 * len_norm);
            }

            if score > 0.0 {
                hits.push((*id, score));
            }
        }

        // Stable sort keeps first-seen order for equal scores
        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);

        hits
    }
}
