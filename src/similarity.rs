//! Match strength between normalized user input and an entry pattern.

use crate::normalize::TokenSet;

/// Scores how well `input` covers `pattern`, in `[0, 1]`.
///
/// Implementations must be pure: the same pair always yields the same score.
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, input: &TokenSet, pattern: &TokenSet) -> f32;

    fn name(&self) -> &'static str;
}

/// Share of the pattern's tokens found in the input.
///
/// The denominator is the pattern size, so verbose input is not rewarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordOverlap;

impl SimilarityScorer for KeywordOverlap {
    fn score(&self, input: &TokenSet, pattern: &TokenSet) -> f32 {
        if pattern.is_empty() {
            return 0.0;
        }
        pattern.overlap(input) as f32 / pattern.len() as f32
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

/// Intersection over union of the two token sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jaccard;

impl SimilarityScorer for Jaccard {
    fn score(&self, input: &TokenSet, pattern: &TokenSet) -> f32 {
        let union = input.union_len(pattern);
        if union == 0 {
            0.0
        } else {
            input.overlap(pattern) as f32 / union as f32
        }
    }

    fn name(&self) -> &'static str {
        "jaccard"
    }
}
