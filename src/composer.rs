//! Response composition.
//!
//! Turns a resolution (or a conversational pre-filter hit) into the outgoing
//! message and records the turn in the conversation context.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::conversation::{ConversationContext, Role};
use crate::entities::{extract_entities, Entity};
use crate::knowledge::KnowledgeEntry;
use crate::resolver::{IntentResolver, MatchResult};

pub const FALLBACK_CONFIDENCE: f32 = 0.7;
/// Knowledge matches scoring below this are flagged for a human. Sits under
/// the default match threshold, so it only fires when that is lowered.
pub const DEFAULT_ESCALATION_THRESHOLD: f32 = 0.2;
pub const DEFAULT_MAX_SUGGESTIONS: usize = 3;
pub const UNKNOWN_INTENT: &str = "unknown";

const FALLBACK_TEXT: &str =
    "I'm here to help! Could you tell me a bit more about what you're looking for?";
const FALLBACK_SUGGESTIONS: &[&str] = &[
    "Show popular questions",
    "Contact support",
    "Talk to a human",
];
const ANSWER_SUGGESTIONS: &[&str] = &[
    "Ask another question",
    "Was this helpful?",
    "Talk to a human",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub text: String,
    pub intent: String,
    pub confidence: f32,
    pub suggested_actions: Vec<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub requires_human_intervention: bool,
}

// =============================================================================
// Conversational pre-filters
// =============================================================================

struct PreFilter {
    intent: &'static str,
    pattern: Regex,
    reply: &'static str,
    suggestions: &'static [&'static str],
    handoff: bool,
}

const PRE_FILTER_CONFIDENCE: f32 = 0.9;

// Tried in order; the first hit wins and skips knowledge matching.
static PRE_FILTERS: Lazy<Vec<PreFilter>> = Lazy::new(|| {
    vec![
        PreFilter {
            intent: "human_handoff",
            pattern: Regex::new(concat!(
                r"(?i)\b(?:(?:talk|speak|chat)\s+(?:to|with)|connect\s+me\s+(?:to|with))\s+",
                r"(?:a\s+|an\s+|the\s+|your\s+)?(?:human|person|agent|representative|operator|someone)\b",
                r"|\b(?:real\s+person|live\s+agent|human\s+agent)\b",
            ))
            .unwrap(),
            reply: "I'll connect you with a member of our support team. Someone will be with you shortly.",
            suggestions: &["Leave a message", "Keep chatting with the assistant"],
            handoff: true,
        },
        PreFilter {
            intent: "greeting",
            pattern: Regex::new(
                r"(?i)\b(hi|hello|hey|greetings|good morning|good afternoon|good evening)\b",
            )
            .unwrap(),
            reply: "Hello! How can I help you today?",
            suggestions: &["Business hours", "Pricing", "Contact support"],
            handoff: false,
        },
        PreFilter {
            intent: "thanks",
            pattern: Regex::new(r"(?i)\b(thanks|thank you|thx|appreciate it|cheers)\b").unwrap(),
            reply: "You're welcome! Is there anything else I can help you with?",
            suggestions: &["Ask another question", "That's all"],
            handoff: false,
        },
        PreFilter {
            intent: "goodbye",
            pattern: Regex::new(r"(?i)\b(bye|goodbye|see you|farewell|that's all)\b").unwrap(),
            reply: "Goodbye! Feel free to come back any time.",
            suggestions: &[],
            handoff: false,
        },
    ]
});

fn pre_filter(input: &str) -> Option<&'static PreFilter> {
    PRE_FILTERS.iter().find(|f| f.pattern.is_match(input))
}

// =============================================================================
// ResponseComposer
// =============================================================================

#[derive(Debug, Clone)]
pub struct ResponseComposer {
    pub fallback_confidence: f32,
    pub escalation_threshold: f32,
    pub max_suggestions: usize,
    /// Follow-up prompts per entry category (keys are lowercase).
    pub category_suggestions: HashMap<String, Vec<String>>,
}

impl Default for ResponseComposer {
    fn default() -> Self {
        Self {
            fallback_confidence: FALLBACK_CONFIDENCE,
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            category_suggestions: HashMap::new(),
        }
    }
}

impl ResponseComposer {
    pub fn with_category_suggestions(mut self, map: HashMap<String, Vec<String>>) -> Self {
        self.category_suggestions = map
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        self
    }

    /// Composes the reply for `input` given an existing resolution.
    ///
    /// Pre-filters still take precedence over `resolution`.
    pub fn compose(
        &self,
        input: &str,
        resolution: &MatchResult<'_>,
        context: &mut ConversationContext,
    ) -> ChatResponse {
        let response = match pre_filter(input) {
            Some(filter) => self.pre_filter_reply(input, filter),
            None => self.resolution_reply(input, resolution, context),
        };
        self.record(input, &response, context);
        response
    }

    /// Runs the full turn: pre-filters, then context-aware resolution.
    pub fn respond(
        &self,
        input: &str,
        resolver: &IntentResolver,
        entries: &[KnowledgeEntry],
        context: &mut ConversationContext,
    ) -> ChatResponse {
        let response = match pre_filter(input) {
            Some(filter) => self.pre_filter_reply(input, filter),
            None => {
                let resolution = resolver.resolve_in_context(input, entries, context);
                self.resolution_reply(input, &resolution, context)
            }
        };
        self.record(input, &response, context);
        response
    }

    fn pre_filter_reply(&self, input: &str, filter: &PreFilter) -> ChatResponse {
        log::debug!("Pre-filter {} handled {:?}", filter.intent, input);
        ChatResponse {
            text: filter.reply.to_string(),
            intent: filter.intent.to_string(),
            confidence: PRE_FILTER_CONFIDENCE,
            suggested_actions: self.limit(filter.suggestions.iter().map(|s| s.to_string())),
            entities: extract_entities(input),
            requires_human_intervention: filter.handoff,
        }
    }

    fn resolution_reply(
        &self,
        input: &str,
        resolution: &MatchResult<'_>,
        context: &mut ConversationContext,
    ) -> ChatResponse {
        let entities = extract_entities(input);
        match resolution.entry.filter(|_| resolution.matched) {
            Some(entry) => {
                context.last_topic = Some(entry.category.clone()).filter(|c| !c.is_empty());
                ChatResponse {
                    text: entry.answer.clone(),
                    intent: entry.id.clone(),
                    confidence: resolution.score,
                    suggested_actions: self.suggestions_for(&entry.category),
                    entities,
                    requires_human_intervention: resolution.score < self.escalation_threshold,
                }
            }
            None => {
                context.last_topic = None;
                ChatResponse {
                    text: FALLBACK_TEXT.to_string(),
                    intent: UNKNOWN_INTENT.to_string(),
                    confidence: self.fallback_confidence,
                    suggested_actions: self
                        .limit(FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string())),
                    entities,
                    requires_human_intervention: false,
                }
            }
        }
    }

    fn suggestions_for(&self, category: &str) -> Vec<String> {
        match self.category_suggestions.get(&category.to_lowercase()) {
            Some(list) if !list.is_empty() => self.limit(list.iter().cloned()),
            _ => self.limit(ANSWER_SUGGESTIONS.iter().map(|s| s.to_string())),
        }
    }

    fn limit(&self, suggestions: impl Iterator<Item = String>) -> Vec<String> {
        suggestions.take(self.max_suggestions).collect()
    }

    fn record(&self, input: &str, response: &ChatResponse, context: &mut ConversationContext) {
        context.push_message(Role::User, input);
        context.push_message(Role::Assistant, response.text.clone());
        context.record_intent(response.intent.clone());
    }
}
