//! Topic registry and per-topic feature caches.
//!
//! The registry lists topic labels in first-seen order and is the source of
//! truth for every cache. After [`GraphCacheManager::register`] returns, each
//! active cache holds exactly one entry per registered topic.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use mindmap_embeddings::{Embedding, EmbeddingModel};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GraphError;
use crate::tfidf::{SparseVector, TfIdfCorpus};

/// Kind of feature a similarity strategy consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// Sparse TF-IDF vector
    Lexical,
    /// Dense encoder output
    Dense,
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureKind::Lexical => write!(f, "lexical"),
            FeatureKind::Dense => write!(f, "dense"),
        }
    }
}

/// A topic's feature, borrowed from a cache or computed on the fly.
#[derive(Debug, Clone)]
pub enum FeatureVector<'a> {
    Lexical(Cow<'a, SparseVector>),
    Dense(Cow<'a, Embedding>),
}

impl FeatureVector<'_> {
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureVector::Lexical(_) => FeatureKind::Lexical,
            FeatureVector::Dense(_) => FeatureKind::Dense,
        }
    }

    /// Cosine similarity, or `None` when the kinds differ.
    pub fn cosine(&self, other: &FeatureVector<'_>) -> Option<f64> {
        match (self, other) {
            (FeatureVector::Lexical(a), FeatureVector::Lexical(b)) => Some(a.cosine(b)),
            (FeatureVector::Dense(a), FeatureVector::Dense(b)) => {
                Some(f64::from(a.cosine_similarity(b)))
            }
            _ => None,
        }
    }
}

/// Topic labels in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct TopicRegistry {
    topics: Vec<String>,
    positions: HashMap<String, usize>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.positions.contains_key(topic)
    }

    /// Insertion position of a topic.
    pub fn position(&self, topic: &str) -> Option<usize> {
        self.positions.get(topic).copied()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.topics
    }

    /// Append a topic; returns `false` if it was already present.
    fn push(&mut self, topic: &str) -> bool {
        if self.contains(topic) {
            return false;
        }
        self.positions.insert(topic.to_string(), self.topics.len());
        self.topics.push(topic.to_string());
        true
    }
}

/// Owns the registry and keeps the lexical and dense caches in step with it.
///
/// Caches are opt-in: a manager built with [`new`](Self::new) only tracks
/// the registry. The lexical cache needs a full refit per new topic because
/// the vocabulary spans every label; the dense cache encodes only the new
/// topic since the encoder does not depend on other labels.
#[derive(Default)]
pub struct GraphCacheManager {
    registry: TopicRegistry,
    corpus: Option<TfIdfCorpus>,
    lexical: HashMap<String, SparseVector>,
    encoder: Option<Arc<dyn EmbeddingModel>>,
    dense: HashMap<String, Embedding>,
}

impl GraphCacheManager {
    /// Registry only, no feature caches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the lexical (TF-IDF) cache.
    pub fn with_lexical(mut self) -> Self {
        self.corpus = Some(TfIdfCorpus::new());
        self.refit_lexical();
        self
    }

    /// Enable the dense cache using `encoder`.
    ///
    /// Topics already in the registry are encoded immediately; if any of
    /// them fails the error is returned and the manager is dropped.
    pub fn with_encoder(mut self, encoder: Arc<dyn EmbeddingModel>) -> Result<Self, GraphError> {
        let mut dense = HashMap::with_capacity(self.registry.len());
        for topic in self.registry.iter() {
            dense.insert(topic.to_string(), encoder.embed(topic)?);
        }
        self.dense = dense;
        self.encoder = Some(encoder);
        Ok(self)
    }

    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    pub fn is_active(&self, kind: FeatureKind) -> bool {
        match kind {
            FeatureKind::Lexical => self.corpus.is_some(),
            FeatureKind::Dense => self.encoder.is_some(),
        }
    }

    /// Add a topic to the registry and bring every active cache up to date.
    ///
    /// Returns `false` without touching anything if the topic is already
    /// registered. If the encoder fails the registry is left unchanged.
    pub fn register(&mut self, topic: &str) -> Result<bool, GraphError> {
        self.register_with_embedding(topic, None)
    }

    /// Like [`register`](Self::register), reusing an encoding of `topic`
    /// produced by the active encoder instead of calling it again.
    ///
    /// `embedding` is ignored when the dense cache is inactive.
    pub fn register_with_embedding(
        &mut self,
        topic: &str,
        embedding: Option<Embedding>,
    ) -> Result<bool, GraphError> {
        if self.registry.contains(topic) {
            return Ok(false);
        }

        let embedding = match (&self.encoder, embedding) {
            (Some(_), Some(embedding)) => Some(embedding),
            (Some(encoder), None) => Some(encoder.embed(topic)?),
            (None, _) => None,
        };

        self.registry.push(topic);
        if let Some(embedding) = embedding {
            self.dense.insert(topic.to_string(), embedding);
        }
        if self.corpus.is_some() {
            self.refit_lexical();
        }

        debug!(
            topic = %topic,
            registry_size = self.registry.len(),
            "Registered topic"
        );
        Ok(true)
    }

    /// Refit the TF-IDF corpus over the registry and recompute every lexical
    /// vector. No-op when the lexical cache is inactive.
    pub fn refit_lexical(&mut self) {
        let Some(corpus) = self.corpus.as_mut() else {
            return;
        };
        corpus.refit(self.registry.as_slice());

        let corpus = &*corpus;
        self.lexical = self
            .registry
            .iter()
            .map(|topic| (topic.to_string(), corpus.transform(topic)))
            .collect();
    }

    /// Cached feature of a registered topic.
    pub fn vector_for(&self, kind: FeatureKind, topic: &str) -> Result<FeatureVector<'_>, GraphError> {
        let missing = || GraphError::MissingFeature {
            kind,
            topic: topic.to_string(),
        };
        match kind {
            FeatureKind::Lexical => self
                .lexical
                .get(topic)
                .map(|v| FeatureVector::Lexical(Cow::Borrowed(v)))
                .ok_or_else(missing),
            FeatureKind::Dense => self
                .dense
                .get(topic)
                .map(|e| FeatureVector::Dense(Cow::Borrowed(e)))
                .ok_or_else(missing),
        }
    }

    /// Feature for any label: the cached one if registered, otherwise
    /// computed against the current corpus or encoder.
    pub fn probe(&self, kind: FeatureKind, label: &str) -> Result<FeatureVector<'_>, GraphError> {
        if let Ok(cached) = self.vector_for(kind, label) {
            return Ok(cached);
        }
        match kind {
            FeatureKind::Lexical => {
                let corpus = self.corpus.as_ref().ok_or_else(|| GraphError::MissingFeature {
                    kind,
                    topic: label.to_string(),
                })?;
                Ok(FeatureVector::Lexical(Cow::Owned(corpus.transform(label))))
            }
            FeatureKind::Dense => {
                let encoder = self.encoder.as_ref().ok_or_else(|| GraphError::MissingFeature {
                    kind,
                    topic: label.to_string(),
                })?;
                Ok(FeatureVector::Dense(Cow::Owned(encoder.embed(label)?)))
            }
        }
    }

    /// Number of cached entries for a kind.
    pub fn cached_len(&self, kind: FeatureKind) -> usize {
        match kind {
            FeatureKind::Lexical => self.lexical.len(),
            FeatureKind::Dense => self.dense.len(),
        }
    }
}
