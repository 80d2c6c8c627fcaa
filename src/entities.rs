//! Lightweight named-entity extraction for chat messages.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Email,
    Url,
    Phone,
    OrderNumber,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub value: String,
}

struct EntityPatterns {
    email: Regex,
    url: Regex,
    phone: Regex,
    order: Regex,
}

static PATTERNS: Lazy<EntityPatterns> = Lazy::new(|| EntityPatterns {
    email: Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").unwrap(),
    url: Regex::new(r"(?i)\bhttps?://[^\s]+").unwrap(),
    phone: Regex::new(r"(?:\+\d{1,3}[\s.-]?)?(?:\(\d{3}\)|\b\d{3})[\s.-]?\d{3}[\s.-]?\d{4}\b").unwrap(),
    order: Regex::new(r"(?i)(?:#|\border\s+(?:number\s+|no\.?\s*)?#?)(\d{4,})\b").unwrap(),
});

/// Extracts entities grouped by kind, each kind in order of appearance.
pub fn extract_entities(text: &str) -> Vec<Entity> {
    let pats = &*PATTERNS;
    let mut entities = Vec::new();

    let mut push = |kind, value: &str| {
        let value = value.trim_end_matches(|c: char| matches!(c, '.' | ',' | '!' | '?' | ')'));
        if !entities.iter().any(|e: &Entity| e.kind == kind && e.value == value) {
            entities.push(Entity {
                kind,
                value: value.to_string(),
            });
        }
    };

    for m in pats.email.find_iter(text) {
        push(EntityKind::Email, m.as_str());
    }
    for m in pats.url.find_iter(text) {
        push(EntityKind::Url, m.as_str());
    }
    for m in pats.phone.find_iter(text) {
        push(EntityKind::Phone, m.as_str());
    }
    for caps in pats.order.captures_iter(text) {
        if let Some(number) = caps.get(1) {
            push(EntityKind::OrderNumber, number.as_str());
        }
    }
    entities
}
