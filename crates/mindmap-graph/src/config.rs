//! Mindmap configuration.

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Similarity strategy used to weight edges between topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMethod {
    /// TF-IDF cosine over the topic registry
    #[serde(alias = "tfidf")]
    Lexical,
    /// Cosine of dense label encodings
    Embedding,
    /// Relatedness rated by an external service
    #[serde(alias = "llm")]
    Judged,
}

impl SimilarityMethod {
    /// Parse a method selector, accepting the legacy names `tfidf` and `llm`.
    ///
    /// Returns `None` for anything else.
    pub fn parse(selector: &str) -> Option<Self> {
        match selector.trim().to_ascii_lowercase().as_str() {
            "lexical" | "tfidf" => Some(SimilarityMethod::Lexical),
            "embedding" => Some(SimilarityMethod::Embedding),
            "judged" | "llm" => Some(SimilarityMethod::Judged),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMethod::Lexical => "lexical",
            SimilarityMethod::Embedding => "embedding",
            SimilarityMethod::Judged => "judged",
        }
    }
}

impl std::fmt::Display for SimilarityMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for one mindmap session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindmapConfig {
    /// Method selector (lexical, embedding, judged; tfidf and llm also accepted).
    ///
    /// Kept as a string so an unrecognised selector can still run, producing
    /// only unresolved scores and therefore no edges.
    #[serde(default = "default_method")]
    pub method: String,

    /// Minimum similarity for an edge to be created
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Directory receiving `graph_data_<context>.json` exports
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for MindmapConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            threshold: default_threshold(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_method() -> String {
    SimilarityMethod::Lexical.as_str().to_string()
}
fn default_threshold() -> f64 {
    0.3
}
fn default_output_dir() -> String {
    "llm".to_string()
}

impl MindmapConfig {
    /// Resolved method, or `None` for an unsupported selector.
    pub fn similarity_method(&self) -> Option<SimilarityMethod> {
        SimilarityMethod::parse(&self.method)
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        validate_threshold(self.threshold)?;
        if self.output_dir.trim().is_empty() {
            return Err(GraphError::InvalidConfig(
                "output_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Edge thresholds live on the same 0-1 scale as similarity weights.
pub(crate) fn validate_threshold(threshold: f64) -> Result<(), GraphError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(GraphError::InvalidConfig(format!(
            "threshold must be 0.0-1.0, got {threshold}"
        )))
    }
}
