//! Graph error types.

use thiserror::Error;

use crate::cache::FeatureKind;
use crate::summarizer::SummarizerError;

/// Errors that can occur while building or persisting the topic graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Export file could not be written or read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Export file could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Dense encoder failed
    #[error("Embedding error: {0}")]
    Embedding(#[from] mindmap_embeddings::EmbeddingError),

    /// Summarization service failed
    #[error("Summarizer error: {0}")]
    Summarizer(#[from] SummarizerError),

    /// No cached feature for this topic (not registered, or cache inactive)
    #[error("No {kind} feature cached for topic: {topic}")]
    MissingFeature { kind: FeatureKind, topic: String },

    /// Topic has no node in the graph
    #[error("Topic not found: {0}")]
    UnknownTopic(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
