//! On-disk store for encoder files fetched from the HuggingFace Hub.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::EmbeddingError;

pub const DEFAULT_MODEL_REPO: &str = "sentence-transformers/paraphrase-MiniLM-L6-v2";

/// Files a BERT-style sentence encoder needs, in download order
pub const MODEL_FILES: &[&str] = &["config.json", "tokenizer.json", "model.safetensors"];

/// Resolved local paths of one encoder's files.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

/// A hub repository mirrored under a local directory.
///
/// Each repository gets its own subdirectory, named after the repo id with
/// `/` flattened to `_`.
#[derive(Debug, Clone)]
pub struct ModelCache {
    pub cache_dir: PathBuf,
    pub repo_id: String,
}

impl Default for ModelCache {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("topic-mindmap")
            .join("models");
        Self::new(cache_dir, DEFAULT_MODEL_REPO)
    }
}

impl ModelCache {
    pub fn new(cache_dir: impl Into<PathBuf>, repo_id: impl Into<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            repo_id: repo_id.into(),
        }
    }

    pub fn model_dir(&self) -> PathBuf {
        self.cache_dir.join(self.repo_id.replace('/', "_"))
    }

    /// Last path segment of the repo id, used as the model's display name.
    pub fn short_name(&self) -> &str {
        self.repo_id.rsplit('/').next().unwrap_or(&self.repo_id)
    }

    pub fn files(&self) -> EncoderFiles {
        let dir = self.model_dir();
        EncoderFiles {
            config: dir.join(MODEL_FILES[0]),
            tokenizer: dir.join(MODEL_FILES[1]),
            weights: dir.join(MODEL_FILES[2]),
        }
    }

    /// Required files not yet present locally.
    pub fn missing_files(&self) -> Vec<&'static str> {
        let dir = self.model_dir();
        MODEL_FILES
            .iter()
            .copied()
            .filter(|f| !dir.join(f).exists())
            .collect()
    }

    /// Local file paths, fetching whatever is missing first.
    pub fn resolve(&self) -> Result<EncoderFiles, EmbeddingError> {
        let missing = self.missing_files();
        if missing.is_empty() {
            debug!(dir = ?self.model_dir(), "Encoder files already cached");
        } else {
            info!(repo = %self.repo_id, files = ?missing, "Fetching encoder files");
            self.fetch(&missing)?;
        }
        Ok(self.files())
    }

    fn fetch(&self, files: &[&str]) -> Result<(), EmbeddingError> {
        use hf_hub::api::sync::Api;

        let api = Api::new().map_err(|e| EmbeddingError::Download {
            file: self.repo_id.clone(),
            reason: e.to_string(),
        })?;
        let repo = api.model(self.repo_id.clone());

        let dir = self.model_dir();
        std::fs::create_dir_all(&dir)?;

        for file in files {
            let fetched = repo.get(file).map_err(|e| EmbeddingError::Download {
                file: (*file).to_string(),
                reason: e.to_string(),
            })?;
            std::fs::copy(&fetched, dir.join(file))?;
            debug!(file, "Cached encoder file");
        }
        Ok(())
    }
}
