//! # mindmap-embeddings
//!
//! Dense encoder for topic labels.
//!
//! The embedding similarity strategy of the mindmap needs a fixed,
//! topic-independent encoder: the same label always maps to the same vector.
//! This crate provides that encoder as a trait plus a local Candle
//! implementation of `paraphrase-MiniLM-L6-v2`.
//!
//! ## Features
//! - Local inference via Candle (no Python, no API)
//! - Automatic model file caching from the HuggingFace Hub
//! - Unit-normalised output vectors

pub mod cache;
pub mod candle;
pub mod error;
pub mod model;

pub use crate::candle::CandleEmbedder;
pub use cache::{EncoderFiles, ModelCache, DEFAULT_MODEL_REPO, MODEL_FILES};
pub use error::EmbeddingError;
pub use model::{Embedding, EmbeddingModel, ModelInfo};
