//! Rank fusion for combining semantic and lexical search results.
//!
//! Cosine similarity and BM25 live on different scales, so fusing by raw
//! score would let one ranker dominate. Each entry instead gets a blend of
//! a coarse reciprocal-rank term and its native score scaled into [0, 1],
//! shifted into a fixed display band. The output score is a synthetic
//! confidence, not a probability.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use passage_core::ScoredPassage;

/// RRF constant (commonly 60).
/// Higher values give more weight to lower-ranked results.
const RRF_K: f32 = 60.0;

/// Additive floor of the displayed confidence band.
const CONFIDENCE_FLOOR: f32 = 0.6;

/// Weight of the normalized native score.
const NATIVE_WEIGHT: f32 = 0.3;

/// Weight of the reciprocal-rank term.
const RANK_WEIGHT: f32 = 0.1;

/// Ceiling of the displayed confidence band.
const CONFIDENCE_CEILING: f32 = 0.95;

/// Normalize a cosine similarity into [0, 1].
///
/// Scores above 1 come from rankers that report unnormalized inner
/// products and are halved; negative similarity carries no confidence.
fn normalize_semantic(score: f32) -> f32 {
    let score = if score <= 1.0 { score } else { score / 2.0 };
    score.clamp(0.0, 1.0)
}

/// Normalize an unbounded BM25 score into [0, 1].
fn normalize_lexical(score: f32) -> f32 {
    (score / 2.0).clamp(0.0, 1.0)
}

/// Combined confidence for one entry at 0-based rank `rank`.
fn combine(native: f32, rank: usize) -> f32 {
    let rrf = 1.0 / (RRF_K + rank as f32 + 1.0);
    (CONFIDENCE_FLOOR + native * NATIVE_WEIGHT + rrf * RANK_WEIGHT).min(CONFIDENCE_CEILING)
}

/// Fuse semantic and lexical result lists into one confidence-ranked list.
///
/// An id appearing in both lists keeps a single entry whose score is the
/// average (never the sum) of its two combined scores; content and
/// metadata are identical per id, so either source's copy is kept.
/// Returns the top `k` by descending score, ties broken by first
/// appearance (semantic list first).
pub fn fuse_results(
    semantic: Vec<ScoredPassage>,
    lexical: Vec<ScoredPassage>,
    k: usize,
) -> Vec<ScoredPassage> {
    let mut order: Vec<i64> = Vec::with_capacity(semantic.len() + lexical.len());
    let mut entries: HashMap<i64, (ScoredPassage, f32)> = HashMap::new();

    for (rank, result) in semantic.into_iter().enumerate() {
        let combined = combine(normalize_semantic(result.score), rank);
        order.push(result.id);
        entries.insert(result.id, (result, combined));
    }

    for (rank, result) in lexical.into_iter().enumerate() {
        let combined = combine(normalize_lexical(result.score), rank);
        match entries.entry(result.id) {
            Entry::Occupied(mut occupied) => {
                // Average, never sum: dual-listed ids would otherwise
                // escape the confidence band
                let (_, existing) = occupied.get_mut();
                *existing = (*existing + combined) / 2.0;
            }
            Entry::Vacant(vacant) => {
                order.push(result.id);
                vacant.insert((result, combined));
            }
        }
    }

    let mut fused: Vec<ScoredPassage> = order
        .into_iter()
        .filter_map(|id| entries.remove(&id))
        .map(|(mut passage, combined)| {
            passage.score = combined;
            passage
        })
        .collect();

    // Stable sort keeps first-appearance order for equal scores
    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    fused.truncate(k);

    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: i64, score: f32) -> ScoredPassage {
        ScoredPassage {
            id,
            doc_id: format!("doc-{}", id),
            content: format!("content {}", id),
            source_filename: format!("doc-{}.txt", id),
            score,
        }
    }

    #[test]
    fn test_single_list_scores_stay_in_band() {
        for native in [-0.8, 0.0, 0.4, 1.0, 7.3] {
            let fused = fuse_results(vec![scored(1, native)], vec![], 5);
            assert!(fused[0].score >= CONFIDENCE_FLOOR, "score {}", fused[0].score);
            assert!(fused[0].score <= CONFIDENCE_CEILING);
        }

        for native in [0.1, 2.0, 55.0] {
            let fused = fuse_results(vec![], vec![scored(1, native)], 5);
            assert!(fused[0].score >= CONFIDENCE_FLOOR);
            assert!(fused[0].score <= CONFIDENCE_CEILING);
        }
    }

    #[test]
    fn test_dual_list_id_is_averaged_not_summed() {
        let semantic = vec![scored(1, 0.9)];
        let lexical = vec![scored(1, 1.4)];

        let expected_semantic = combine(normalize_semantic(0.9), 0);
        let expected_lexical = combine(normalize_lexical(1.4), 0);
        let expected = (expected_semantic + expected_lexical) / 2.0;

        let fused = fuse_results(semantic, lexical, 5);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - expected).abs() < 1e-6);
        // The average never exceeds the ceiling either
        assert!(fused[0].score <= CONFIDENCE_CEILING);
    }

    #[test]
    fn test_higher_native_score_ranks_first() {
        let fused = fuse_results(
            vec![scored(1, 0.2), scored(2, 0.9)],
            vec![],
            5,
        );

        // Rank term favors id 1, but the native gap dominates
        assert_eq!(fused[0].id, 2);
    }

    #[test]
    fn test_truncates_to_k() {
        let semantic = (1..=5).map(|id| scored(id, 0.5)).collect();
        let lexical = (6..=10).map(|id| scored(id, 1.0)).collect();

        let fused = fuse_results(semantic, lexical, 3);
        assert_eq!(fused.len(), 3);
    }

    #[test]
    fn test_semantic_above_one_is_halved() {
        let direct = fuse_results(vec![scored(1, 0.8)], vec![], 1)[0].score;
        let halved = fuse_results(vec![scored(1, 1.6)], vec![], 1)[0].score;
        assert!((direct - halved).abs() < 1e-6);
    }

    #[test]
    fn test_lexical_normalization_clamps_at_one() {
        let at_cap = fuse_results(vec![], vec![scored(1, 2.0)], 1)[0].score;
        let over_cap = fuse_results(vec![], vec![scored(1, 40.0)], 1)[0].score;
        assert!((at_cap - over_cap).abs() < 1e-6);
    }

    #[test]
    fn test_empty_lists() {
        assert!(fuse_results(vec![], vec![], 5).is_empty());
    }

    #[test]
    fn test_ties_keep_first_appearance_order() {
        // Both entries sit at rank 0 of their list with the same
        // normalized native score, so their combined scores are equal;
        // the semantic list is folded in first
        let fused = fuse_results(vec![scored(3, 0.5)], vec![scored(4, 1.0)], 2);
        assert!((fused[0].score - fused[1].score).abs() < 1e-6);
        assert_eq!(fused[0].id, 3);
        assert_eq!(fused[1].id, 4);
    }
}
