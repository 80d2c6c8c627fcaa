use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Running history of one conversation.
///
/// Messages and intents are append-only and kept in submission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    pub conversation_id: String,
    pub recent_messages: Vec<ChatMessage>,
    pub identified_intents: Vec<String>,
    /// Category of the last knowledge entry matched in this conversation.
    pub last_topic: Option<String>,
}

impl ConversationContext {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            recent_messages: Vec::new(),
            identified_intents: Vec::new(),
            last_topic: None,
        }
    }

    pub fn push_message(&mut self, role: Role, content: impl Into<String>) {
        self.recent_messages.push(ChatMessage {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn record_intent(&mut self, intent: impl Into<String>) {
        self.identified_intents.push(intent.into());
    }

    pub fn last_intent(&self) -> Option<&str> {
        self.identified_intents.last().map(String::as_str)
    }

    /// Number of user messages seen so far.
    pub fn turn_count(&self) -> usize {
        self.recent_messages
            .iter()
            .filter(|m| m.role == Role::User)
            .count()
    }
}
