//! Per-conversation turn handling over a shared knowledge store.
//!
//! Turns for one conversation run strictly one after another in submission
//! order; different conversations do not wait on each other.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::composer::{ChatResponse, ResponseComposer};
use crate::conversation::ConversationContext;
use crate::knowledge::KnowledgeStore;
use crate::resolver::IntentResolver;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub conversation_id: String,
    pub response: ChatResponse,
}

type SharedContext = Arc<tokio::sync::Mutex<ConversationContext>>;

pub struct SessionManager {
    store: Arc<RwLock<KnowledgeStore>>,
    resolver: IntentResolver,
    composer: ResponseComposer,
    response_delay: Duration,
    sessions: Mutex<HashMap<String, SharedContext>>,
}

impl SessionManager {
    pub fn new(
        store: Arc<RwLock<KnowledgeStore>>,
        resolver: IntentResolver,
        composer: ResponseComposer,
    ) -> Self {
        Self {
            store,
            resolver,
            composer,
            response_delay: Duration::ZERO,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_response_delay(mut self, delay: Duration) -> Self {
        self.response_delay = delay;
        self
    }

    pub fn store(&self) -> &Arc<RwLock<KnowledgeStore>> {
        &self.store
    }

    /// Handles one user message, starting a conversation if needed.
    ///
    /// A new id is generated when `conversation_id` is `None`.
    pub async fn turn(&self, conversation_id: Option<String>, text: &str) -> ChatTurn {
        let conversation_id =
            conversation_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let shared = self.session(&conversation_id);

        // Held for the whole turn so later messages queue behind this one.
        let mut context = shared.lock().await;
        if !self.response_delay.is_zero() {
            tokio::time::sleep(self.response_delay).await;
        }

        let response = {
            let store = self.store.read();
            self.composer
                .respond(text, &self.resolver, store.all(), &mut context)
        };
        log::debug!(
            "Conversation {} turn {} -> {} ({:.2})",
            conversation_id,
            context.turn_count(),
            response.intent,
            response.confidence
        );

        ChatTurn {
            conversation_id,
            response,
        }
    }

    fn session(&self, conversation_id: &str) -> SharedContext {
        let mut sessions = self.sessions.lock();
        sessions
            .entry(conversation_id.to_string())
            .or_insert_with(|| {
                log::info!("Starting conversation {}", conversation_id);
                Arc::new(tokio::sync::Mutex::new(ConversationContext::new(
                    conversation_id,
                )))
            })
            .clone()
    }

    /// Snapshot of a conversation, waiting for any in-flight turn.
    pub async fn history(&self, conversation_id: &str) -> Option<ConversationContext> {
        let shared = self.sessions.lock().get(conversation_id).cloned()?;
        let context = shared.lock().await;
        Some(context.clone())
    }

    /// Tears a conversation down. Returns `false` when it was unknown.
    pub fn end(&self, conversation_id: &str) -> bool {
        let removed = self.sessions.lock().remove(conversation_id).is_some();
        if removed {
            log::info!("Ended conversation {}", conversation_id);
        }
        removed
    }

    pub fn active_conversations(&self) -> usize {
        self.sessions.lock().len()
    }
}
