//! In-memory knowledge store: FAQ and intent entries in insertion order.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{EngineError, KnowledgeError};

/// A stored question/answer pair used as a matching target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub pattern: String,
    pub answer: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Input to [`KnowledgeStore::add`]. Any supplied `id` is discarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryDraft {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default, alias = "input")]
    pub pattern: Option<String>,
    #[serde(default, alias = "response")]
    pub answer: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl EntryDraft {
    pub fn new(pattern: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            answer: Some(answer.into()),
            ..Self::default()
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }
}

/// Partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryPatch {
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, KnowledgeError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(KnowledgeError::MissingField(field)),
    }
}

#[derive(Debug, Default)]
pub struct KnowledgeStore {
    entries: Vec<KnowledgeEntry>,
    next_id: u64,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `draft` and appends it under a freshly generated id.
    pub fn add(&mut self, draft: EntryDraft) -> Result<KnowledgeEntry, KnowledgeError> {
        let pattern = required(draft.pattern, "pattern")?;
        let answer = required(draft.answer, "answer")?;

        self.next_id += 1;
        let entry = KnowledgeEntry {
            id: format!("kb-{}", self.next_id),
            pattern,
            answer,
            category: draft.category.unwrap_or_default(),
            tags: draft.tags.unwrap_or_default(),
        };
        log::info!("Added knowledge entry {} ({:?})", entry.id, entry.pattern);
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Shallow-merges `patch` into the entry with `id`.
    ///
    /// Returns `Ok(None)` when no such entry exists.
    pub fn update(
        &mut self,
        id: &str,
        patch: EntryPatch,
    ) -> Result<Option<KnowledgeEntry>, KnowledgeError> {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        let pattern = patch.pattern.map(|p| required(Some(p), "pattern")).transpose()?;
        let answer = patch.answer.map(|a| required(Some(a), "answer")).transpose()?;

        if let Some(pattern) = pattern {
            entry.pattern = pattern;
        }
        if let Some(answer) = answer {
            entry.answer = answer;
        }
        if let Some(category) = patch.category {
            entry.category = category;
        }
        if let Some(tags) = patch.tags {
            entry.tags = tags;
        }
        log::info!("Updated knowledge entry {}", id);
        Ok(Some(entry.clone()))
    }

    pub fn delete(&mut self, id: &str) -> Option<KnowledgeEntry> {
        let idx = self.entries.iter().position(|e| e.id == id)?;
        let removed = self.entries.remove(idx);
        log::info!("Deleted knowledge entry {}", id);
        Some(removed)
    }

    pub fn get_by_id(&self, id: &str) -> Option<&KnowledgeEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Case-insensitive substring search over pattern, answer, category and tags.
    pub fn search(&self, query: &str) -> Vec<&KnowledgeEntry> {
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|e| {
                e.pattern.to_lowercase().contains(&needle)
                    || e.answer.to_lowercase().contains(&needle)
                    || e.category.to_lowercase().contains(&needle)
                    || e.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// All entries in insertion order.
    pub fn all(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds a store from a JSON-lines file of [`EntryDraft`]s.
    ///
    /// Lines that fail to parse or validate are logged and skipped.
    pub fn load_jsonl<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut store = Self::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let draft: EntryDraft = match serde_json::from_str(&line) {
                Ok(draft) => draft,
                Err(e) => {
                    log::warn!("Skipping malformed line #{} in {:?}: {}", i + 1, path, e);
                    continue;
                }
            };
            if let Err(e) = store.add(draft) {
                log::warn!("Skipping line #{} in {:?}: {}", i + 1, path, e);
            }
        }
        log::info!("Loaded {} knowledge entries from {:?}", store.len(), path);
        Ok(store)
    }
}
