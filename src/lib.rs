//! FAQ and intent matching engine.
//!
//! Free-text input is normalized, matched against a knowledge store by
//! keyword overlap (or a pluggable scorer), and turned into a reply with a
//! confidence score and suggested follow-ups. Conversation history is kept
//! per session so follow-up questions can lean on the previous topic.

pub mod composer;
pub mod conversation;
pub mod embedding;
pub mod entities;
pub mod error;
pub mod knowledge;
pub mod normalize;
pub mod resolver;
pub mod session;
pub mod settings;
pub mod similarity;

pub use composer::{ChatResponse, ResponseComposer, FALLBACK_CONFIDENCE, UNKNOWN_INTENT};
pub use conversation::{ChatMessage, ConversationContext, Role};
pub use embedding::{EmbeddingModel, EmbeddingScorer};
pub use entities::{extract_entities, Entity, EntityKind};
pub use error::{EngineError, KnowledgeError};
pub use knowledge::{EntryDraft, EntryPatch, KnowledgeEntry, KnowledgeStore};
pub use normalize::{normalize, TokenSet};
pub use resolver::{resolve, IntentResolver, MatchPolicy, MatchResult, DEFAULT_THRESHOLD};
pub use session::{ChatTurn, SessionManager};
pub use settings::Settings;
pub use similarity::{Jaccard, KeywordOverlap, SimilarityScorer};
