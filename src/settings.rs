//! Service configuration.
//!
//! Read from an optional `Config.toml`, then overridden by `FAQMATCH__*`
//! environment variables (e.g. `FAQMATCH__MATCHING__THRESHOLD=0.4`).

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::composer::{
    ResponseComposer, DEFAULT_ESCALATION_THRESHOLD, DEFAULT_MAX_SUGGESTIONS, FALLBACK_CONFIDENCE,
};
use crate::embedding::EmbeddingScorer;
use crate::error::EngineError;
use crate::resolver::{IntentResolver, MatchPolicy, DEFAULT_CONTINUITY_BOOST, DEFAULT_THRESHOLD};
use crate::similarity::{Jaccard, KeywordOverlap, SimilarityScorer};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub data: DataSettings,
    pub matching: MatchingSettings,
    pub responses: ResponseSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// JSON-lines seed file for the knowledge store.
    pub knowledge_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    #[default]
    Keyword,
    Jaccard,
    Embedding,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddingSettings {
    pub config_file: PathBuf,
    pub embedding_file: PathBuf,
    pub vocab_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    pub threshold: f32,
    pub policy: MatchPolicy,
    pub scorer: ScorerKind,
    pub continuity_boost: f32,
    pub embedding: Option<EmbeddingSettings>,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            policy: MatchPolicy::FirstMatch,
            scorer: ScorerKind::Keyword,
            continuity_boost: DEFAULT_CONTINUITY_BOOST,
            embedding: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResponseSettings {
    pub fallback_confidence: f32,
    pub escalation_threshold: f32,
    /// Simulated thinking time before each reply.
    pub response_delay_ms: u64,
    pub max_suggestions: usize,
    pub category_suggestions: HashMap<String, Vec<String>>,
}

impl Default for ResponseSettings {
    fn default() -> Self {
        Self {
            fallback_confidence: FALLBACK_CONFIDENCE,
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
            response_delay_ms: 0,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            category_suggestions: HashMap::new(),
        }
    }
}

fn check_unit(name: &'static str, value: f32) -> Result<(), EngineError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EngineError::InvalidSetting {
            name,
            reason: format!("{} is outside [0, 1]", value),
        })
    }
}

impl Settings {
    /// Loads `<name>.toml` (if present) layered under the environment.
    pub fn load(name: &str) -> Result<Self, EngineError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::with_name(name).required(false))
            .add_source(
                config::Environment::with_prefix("FAQMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        check_unit("matching.threshold", self.matching.threshold)?;
        check_unit("matching.continuity_boost", self.matching.continuity_boost)?;
        check_unit("responses.fallback_confidence", self.responses.fallback_confidence)?;
        check_unit("responses.escalation_threshold", self.responses.escalation_threshold)?;
        if self.responses.escalation_threshold > self.matching.threshold {
            return Err(EngineError::InvalidSetting {
                name: "responses.escalation_threshold",
                reason: format!(
                    "{} is above matching.threshold {}",
                    self.responses.escalation_threshold, self.matching.threshold
                ),
            });
        }
        if self.matching.scorer == ScorerKind::Embedding && self.matching.embedding.is_none() {
            return Err(EngineError::InvalidSetting {
                name: "matching.embedding",
                reason: "required when matching.scorer = \"embedding\"".to_string(),
            });
        }
        Ok(())
    }

    pub fn response_delay(&self) -> Duration {
        Duration::from_millis(self.responses.response_delay_ms)
    }

    pub fn build_resolver(&self) -> Result<IntentResolver, EngineError> {
        let scorer: Arc<dyn SimilarityScorer> = match self.matching.scorer {
            ScorerKind::Keyword => Arc::new(KeywordOverlap),
            ScorerKind::Jaccard => Arc::new(Jaccard),
            ScorerKind::Embedding => {
                let paths = self.matching.embedding.as_ref().ok_or_else(|| {
                    EngineError::InvalidSetting {
                        name: "matching.embedding",
                        reason: "missing".to_string(),
                    }
                })?;
                Arc::new(EmbeddingScorer::load(
                    &paths.config_file,
                    &paths.embedding_file,
                    &paths.vocab_file,
                )?)
            }
        };
        Ok(IntentResolver::new(scorer)
            .with_threshold(self.matching.threshold)
            .with_policy(self.matching.policy)
            .with_continuity_boost(self.matching.continuity_boost))
    }

    pub fn build_composer(&self) -> ResponseComposer {
        ResponseComposer {
            fallback_confidence: self.responses.fallback_confidence,
            escalation_threshold: self.responses.escalation_threshold,
            max_suggestions: self.responses.max_suggestions,
            ..ResponseComposer::default()
        }
        .with_category_suggestions(self.responses.category_suggestions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    // Held by every test that reads the process environment through `load`.
    static ENV_LOCK: Mutex<()> = parking_lot::const_mutex(());

    fn write_config(dir: &tempfile::TempDir, body: &str) -> String {
        let path = dir.path().join("Config.toml");
        std::fs::write(&path, body).unwrap();
        path.with_extension("").to_str().unwrap().to_string()
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.server.port, 8080);
        assert_eq!(s.matching.threshold, 0.3);
        assert_eq!(s.matching.policy, MatchPolicy::FirstMatch);
        assert_eq!(s.responses.fallback_confidence, 0.7);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let _env = ENV_LOCK.lock();
        let dir = tempfile::tempdir().unwrap();
        let name = write_config(
            &dir,
            r#"
[server]
port = 9090

[matching]
threshold = 0.5
policy = "best_match"
scorer = "jaccard"

[responses]
response_delay_ms = 250

[responses.category_suggestions]
hours = ["Holiday hours"]
"#,
        );

        let s = Settings::load(&name).unwrap();
        assert_eq!(s.server.port, 9090);
        assert_eq!(s.server.host, "127.0.0.1");
        assert_eq!(s.matching.threshold, 0.5);
        assert_eq!(s.matching.policy, MatchPolicy::BestMatch);
        assert_eq!(s.matching.scorer, ScorerKind::Jaccard);
        assert_eq!(s.response_delay(), Duration::from_millis(250));
        assert_eq!(s.responses.category_suggestions["hours"], vec!["Holiday hours"]);

        let resolver = s.build_resolver().unwrap();
        assert_eq!(resolver.threshold(), 0.5);
        assert_eq!(resolver.policy(), MatchPolicy::BestMatch);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let _env = ENV_LOCK.lock();
        let s = Settings::load("/nonexistent/faqmatch/Config").unwrap();
        assert_eq!(s.server.port, 8080);
    }

    #[test]
    fn test_env_overrides_file() {
        let _env = ENV_LOCK.lock();
        let dir = tempfile::tempdir().unwrap();
        let name = write_config(&dir, "[matching]\nthreshold = 0.5\n\n[server]\nport = 9090\n");

        std::env::set_var("FAQMATCH__MATCHING__THRESHOLD", "0.45");
        let loaded = Settings::load(&name);
        std::env::remove_var("FAQMATCH__MATCHING__THRESHOLD");

        let s = loaded.unwrap();
        assert_eq!(s.matching.threshold, 0.45);
        assert_eq!(s.server.port, 9090);
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let mut s = Settings::default();
        s.matching.threshold = 1.5;
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("matching.threshold"));
    }

    #[test]
    fn test_escalation_above_match_threshold_rejected() {
        let mut s = Settings::default();
        assert!(s.responses.escalation_threshold < s.matching.threshold);
        s.responses.escalation_threshold = 0.4;
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("responses.escalation_threshold"));

        s.matching.threshold = 0.4;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_embedding_scorer_requires_paths() {
        let mut s = Settings::default();
        s.matching.scorer = ScorerKind::Embedding;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_build_composer() {
        let mut s = Settings::default();
        s.responses.max_suggestions = 1;
        s.responses
            .category_suggestions
            .insert("Billing".to_string(), vec!["Invoices".to_string()]);
        let composer = s.build_composer();
        assert_eq!(composer.max_suggestions, 1);
        assert!(composer.category_suggestions.contains_key("billing"));
    }
}
