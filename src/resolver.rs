//! Ranks knowledge entries against user input and applies the threshold policy.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::conversation::ConversationContext;
use crate::knowledge::KnowledgeEntry;
use crate::normalize::{normalize, TokenSet};
use crate::similarity::{KeywordOverlap, SimilarityScorer};

pub const DEFAULT_THRESHOLD: f32 = 0.3;
pub const DEFAULT_CONTINUITY_BOOST: f32 = 0.1;

/// Outcome of resolving one input against the store.
///
/// `matched` implies `entry.is_some()`, `score > 0` and `score >= threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult<'a> {
    pub entry: Option<&'a KnowledgeEntry>,
    pub score: f32,
    pub matched: bool,
}

impl<'a> MatchResult<'a> {
    pub fn none() -> Self {
        Self {
            entry: None,
            score: 0.0,
            matched: false,
        }
    }

    fn hit(entry: &'a KnowledgeEntry, score: f32) -> Self {
        Self {
            entry: Some(entry),
            score,
            matched: true,
        }
    }
}

/// Which qualifying entry wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// First entry in store order whose score clears the threshold.
    #[default]
    FirstMatch,
    /// Highest-scoring entry; ties go to the earliest.
    BestMatch,
}

#[derive(Clone)]
pub struct IntentResolver {
    scorer: Arc<dyn SimilarityScorer>,
    threshold: f32,
    policy: MatchPolicy,
    continuity_boost: f32,
}

impl std::fmt::Debug for IntentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentResolver")
            .field("scorer", &self.scorer.name())
            .field("threshold", &self.threshold)
            .field("policy", &self.policy)
            .field("continuity_boost", &self.continuity_boost)
            .finish()
    }
}

impl Default for IntentResolver {
    fn default() -> Self {
        Self::new(Arc::new(KeywordOverlap))
    }
}

impl IntentResolver {
    pub fn new(scorer: Arc<dyn SimilarityScorer>) -> Self {
        Self {
            scorer,
            threshold: DEFAULT_THRESHOLD,
            policy: MatchPolicy::FirstMatch,
            continuity_boost: DEFAULT_CONTINUITY_BOOST,
        }
    }

    /// A NaN threshold is ignored and the current one kept.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        if threshold.is_nan() {
            log::warn!("Ignoring NaN match threshold; keeping {}", self.threshold);
        } else {
            self.threshold = threshold;
        }
        self
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_continuity_boost(mut self, boost: f32) -> Self {
        self.continuity_boost = boost;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn resolve<'a>(&self, input: &str, entries: &'a [KnowledgeEntry]) -> MatchResult<'a> {
        self.resolve_biased(input, entries, None)
    }

    /// Like [`resolve`](Self::resolve), but entries in the conversation's last
    /// matched category get `continuity_boost` added to any non-zero score.
    pub fn resolve_in_context<'a>(
        &self,
        input: &str,
        entries: &'a [KnowledgeEntry],
        context: &ConversationContext,
    ) -> MatchResult<'a> {
        self.resolve_biased(input, entries, context.last_topic.as_deref())
    }

    fn resolve_biased<'a>(
        &self,
        input: &str,
        entries: &'a [KnowledgeEntry],
        topic: Option<&str>,
    ) -> MatchResult<'a> {
        let input_tokens = normalize(input);
        if input_tokens.is_empty() {
            return MatchResult::none();
        }

        let mut best: Option<MatchResult<'a>> = None;
        for entry in entries {
            let score = self.entry_score(&input_tokens, entry, topic);
            // A zero score never matches, whatever the threshold.
            if !(score > 0.0 && score >= self.threshold) {
                continue;
            }
            match self.policy {
                MatchPolicy::FirstMatch => {
                    best = Some(MatchResult::hit(entry, score));
                    break;
                }
                MatchPolicy::BestMatch => {
                    if best.map_or(true, |b| score > b.score) {
                        best = Some(MatchResult::hit(entry, score));
                    }
                }
            }
        }

        match best {
            Some(result) => {
                log::debug!(
                    "Resolved {:?} to {} with score {:.3} ({})",
                    input,
                    result.entry.map_or("-", |e| e.id.as_str()),
                    result.score,
                    self.scorer.name()
                );
                result
            }
            None => {
                log::debug!("No entry cleared threshold {} for {:?}", self.threshold, input);
                MatchResult::none()
            }
        }
    }

    fn entry_score(&self, input: &TokenSet, entry: &KnowledgeEntry, topic: Option<&str>) -> f32 {
        let raw = self.scorer.score(input, &normalize(&entry.pattern));
        match topic {
            Some(topic) if raw > 0.0 && !entry.category.is_empty() && entry.category == topic => {
                (raw + self.continuity_boost).min(1.0)
            }
            _ => raw,
        }
    }
}

/// Keyword-overlap resolution with the first-match policy.
pub fn resolve<'a>(input: &str, entries: &'a [KnowledgeEntry], threshold: f32) -> MatchResult<'a> {
    IntentResolver::default()
        .with_threshold(threshold)
        .resolve(input, entries)
}
