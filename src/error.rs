//! Error types for the matching engine.

/// Validation failures raised by the knowledge store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KnowledgeError {
    #[error("knowledge entry is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Errors from loading settings, seed data and models.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
    #[error("invalid setting `{name}`: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
    #[error("embedding model error: {0}")]
    Embedding(String),
}
