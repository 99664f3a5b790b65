//! Layered configuration for the mindmap binary.
//!
//! Sources, later overriding earlier:
//! 1. Built-in defaults
//! 2. `~/.config/topic-mindmap/config.toml`
//! 3. File given with `--config`
//! 4. `MINDMAP_*` environment variables (`__` separates sections,
//!    e.g. `MINDMAP_GRAPH__THRESHOLD=0.5`)
//! 5. CLI flags, applied by the caller

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mindmap_embeddings::{ModelCache, DEFAULT_MODEL_REPO};
use mindmap_graph::MindmapConfig;
use mindmap_llm::{LlmConfig, DEFAULT_BASE_URL, DEFAULT_JUDGE_MODEL, DEFAULT_SUMMARIZER_MODEL};

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "TOGETHER_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("No API key configured; set llm.api_key or TOGETHER_API_KEY")]
    MissingApiKey,
}

/// Chat-completion service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_summarizer_model")]
    pub summarizer_model: String,

    #[serde(default = "default_judge_model")]
    pub judge_model: String,

    /// API key; falls back to `TOGETHER_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_summarizer_model() -> String {
    DEFAULT_SUMMARIZER_MODEL.to_string()
}

fn default_judge_model() -> String {
    DEFAULT_JUDGE_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            summarizer_model: default_summarizer_model(),
            judge_model: default_judge_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl LlmSettings {
    /// Configured key, else the environment's.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn client_config(&self) -> Result<LlmConfig, ConfigError> {
        let api_key = self.resolve_api_key().ok_or(ConfigError::MissingApiKey)?;
        Ok(LlmConfig::new(&self.base_url, api_key)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_retries(self.max_retries))
    }
}

/// Sentence encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_model_repo")]
    pub model_repo: String,

    /// Model cache directory; platform cache dir when unset
    #[serde(default)]
    pub cache_dir: Option<String>,
}

fn default_model_repo() -> String {
    DEFAULT_MODEL_REPO.to_string()
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_repo: default_model_repo(),
            cache_dir: None,
        }
    }
}

impl EmbeddingSettings {
    pub fn model_cache(&self) -> ModelCache {
        let cache_dir = self
            .cache_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| ModelCache::default().cache_dir);
        ModelCache::new(cache_dir, &self.model_repo)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Similarity method, threshold and output directory
    #[serde(default)]
    pub graph: MindmapConfig,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub embedding: EmbeddingSettings,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            graph: MindmapConfig::default(),
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            log_level: default_log_level(),
        }
    }
}

/// Directory holding the default `config.toml`.
pub fn config_dir() -> PathBuf {
    ProjectDirs::from("", "", "topic-mindmap")
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Settings {
    /// Load settings from defaults, config files and the environment.
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let default_config_path = config_dir().join("config");

        let mut builder = Config::builder()
            .set_default("graph.method", defaults.graph.method)?
            .set_default("graph.threshold", defaults.graph.threshold)?
            .set_default("graph.output_dir", defaults.graph.output_dir)?
            .set_default("llm.base_url", defaults.llm.base_url)?
            .set_default("llm.summarizer_model", defaults.llm.summarizer_model)?
            .set_default("llm.judge_model", defaults.llm.judge_model)?
            .set_default("embedding.model_repo", defaults.embedding.model_repo)?
            .set_default("log_level", defaults.log_level)?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("MINDMAP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.graph.method, "lexical");
        assert!((settings.graph.threshold - 0.3).abs() < f64::EPSILON);
        assert_eq!(settings.graph.output_dir, "llm");
        assert_eq!(settings.llm.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.embedding.model_repo, DEFAULT_MODEL_REPO);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "log_level = \"debug\"\n\n[graph]\nmethod = \"embedding\"\nthreshold = 0.55\n\n[llm]\njudge_model = \"small-judge\"\n"
        )
        .unwrap();

        let settings = Settings::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.graph.method, "embedding");
        assert!((settings.graph.threshold - 0.55).abs() < 1e-12);
        assert_eq!(settings.graph.output_dir, "llm");
        assert_eq!(settings.llm.judge_model, "small-judge");
        assert_eq!(settings.llm.summarizer_model, DEFAULT_SUMMARIZER_MODEL);
    }

    #[test]
    fn test_missing_explicit_config_file_fails() {
        let err = Settings::load(Some("/nonexistent/mindmap-config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_configured_api_key_wins() {
        let llm = LlmSettings {
            api_key: Some("from-config".to_string()),
            ..Default::default()
        };
        assert_eq!(llm.resolve_api_key().as_deref(), Some("from-config"));

        let config = llm.client_config().unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_model_cache_respects_override() {
        let embedding = EmbeddingSettings {
            model_repo: "org/encoder".to_string(),
            cache_dir: Some("/tmp/models".to_string()),
        };
        let cache = embedding.model_cache();
        assert_eq!(cache.cache_dir, PathBuf::from("/tmp/models"));
        assert_eq!(cache.repo_id, "org/encoder");
    }
}
