//! Encoder error types.

use std::path::PathBuf;

use thiserror::Error;

/// Failures loading the sentence encoder or encoding a label.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// `config.json` could not be parsed as a BERT config
    #[error("Invalid model config at {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },

    /// A file could not be fetched from the hub
    #[error("Failed to download {file}: {reason}")]
    Download { file: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The label could not be encoded (e.g. it produced no tokens)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
