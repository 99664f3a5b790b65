//! Candle-based sentence encoder.
//!
//! Runs `paraphrase-MiniLM-L6-v2` (a 6-layer BERT) on the CPU and mean-pools
//! the last hidden state into a 384-dimensional vector.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::cache::{EncoderFiles, ModelCache};
use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

/// Output dimension of the MiniLM-L6 family
pub const EMBEDDING_DIM: usize = 384;

/// Topic labels are short; anything past this is truncated
pub const MAX_SEQ_LENGTH: usize = 128;

/// Local BERT sentence encoder.
pub struct CandleEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    info: ModelInfo,
}

impl CandleEmbedder {
    /// Load the encoder from `cache`, downloading files on first use.
    pub fn load(cache: &ModelCache) -> Result<Self, EmbeddingError> {
        let files = cache.resolve()?;
        Self::load_from_files(cache.short_name().to_string(), &files)
    }

    pub fn load_default() -> Result<Self, EmbeddingError> {
        Self::load(&ModelCache::default())
    }

    pub fn load_from_files(name: String, files: &EncoderFiles) -> Result<Self, EmbeddingError> {
        info!(model = %name, "Loading sentence encoder");

        let device = Device::Cpu;

        let config_str = std::fs::read_to_string(&files.config)?;
        let config: BertConfig =
            serde_json::from_str(&config_str).map_err(|e| EmbeddingError::InvalidConfig {
                path: files.config.clone(),
                reason: e.to_string(),
            })?;

        let tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        // SAFETY: the weights file is owned by our cache directory and is not
        // modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights.clone()], DType::F32, &device)?
        };
        let model = BertModel::load(vb, &config)?;

        Ok(Self {
            model,
            tokenizer,
            device,
            info: ModelInfo {
                name,
                dimension: EMBEDDING_DIM,
                max_sequence_length: MAX_SEQ_LENGTH,
            },
        })
    }

    /// Tokenize and right-pad a batch into `(input_ids, attention_mask)`.
    fn encode_inputs(&self, texts: &[&str]) -> Result<(Tensor, Tensor), EmbeddingError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(MAX_SEQ_LENGTH);
        if seq_len == 0 {
            return Err(EmbeddingError::InvalidInput(
                "tokenizer produced no tokens".to_string(),
            ));
        }

        let mut ids = Vec::with_capacity(texts.len() * seq_len);
        let mut mask = Vec::with_capacity(texts.len() * seq_len);
        for encoding in &encodings {
            let len = encoding.get_ids().len().min(seq_len);
            ids.extend_from_slice(&encoding.get_ids()[..len]);
            mask.extend_from_slice(&encoding.get_attention_mask()[..len]);
            ids.extend(std::iter::repeat(0).take(seq_len - len));
            mask.extend(std::iter::repeat(0).take(seq_len - len));
        }

        let shape = (texts.len(), seq_len);
        Ok((
            Tensor::from_vec(ids, shape, &self.device)?,
            Tensor::from_vec(mask, shape, &self.device)?,
        ))
    }

    /// Average token states, ignoring padding positions.
    fn mean_pool(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor, EmbeddingError> {
        let mask = attention_mask
            .unsqueeze(2)?
            .broadcast_as(hidden.shape())?
            .to_dtype(DType::F32)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        Ok(summed.broadcast_div(&counts)?)
    }
}

impl EmbeddingModel for CandleEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidInput("empty batch result".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let (input_ids, attention_mask) = self.encode_inputs(texts)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled: Vec<Vec<f32>> = Self::mean_pool(&hidden, &attention_mask)?.to_vec2()?;

        debug!(count = texts.len(), "Encoded label batch");
        Ok(pooled.into_iter().map(Embedding::new).collect())
    }
}
