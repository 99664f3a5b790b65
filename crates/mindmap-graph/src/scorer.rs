//! Similarity strategies between topic labels.
//!
//! Every strategy returns a weight in [0, 1] or [`UNRESOLVED_WEIGHT`] when no
//! score could be produced. The sentinel is negative, so it never passes an
//! edge threshold.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use mindmap_embeddings::Embedding;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{FeatureKind, FeatureVector, GraphCacheManager};
use crate::config::SimilarityMethod;
use crate::error::GraphError;

/// Weight reported when a similarity could not be resolved.
pub const UNRESOLVED_WEIGHT: f64 = -1.0;

/// Errors from a relatedness judge.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// The service could not be reached or returned an error status
    #[error("Judge request failed: {0}")]
    Transport(String),

    /// The service answered but no score could be read from it
    #[error("Malformed judge response: {0}")]
    Malformed(String),
}

/// External service rating how related two topics are.
///
/// Implementations should return a value on the 0-1 scale, but callers treat
/// the result as untrusted.
#[async_trait]
pub trait RelatednessJudge: Send + Sync {
    async fn judge(&self, topic_a: &str, topic_b: &str) -> Result<f64, JudgeError>;
}

/// Similarity strategy, fixed for the lifetime of a graph.
#[derive(Clone)]
pub enum SimilarityScorer {
    /// TF-IDF cosine over the registry corpus
    Lexical,
    /// Cosine of dense encodings
    Embedding,
    /// External relatedness judge
    Judged(Arc<dyn RelatednessJudge>),
    /// Unrecognised selector; always unresolved
    Unsupported(String),
}

impl std::fmt::Debug for SimilarityScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimilarityScorer::Lexical => write!(f, "Lexical"),
            SimilarityScorer::Embedding => write!(f, "Embedding"),
            SimilarityScorer::Judged(_) => write!(f, "Judged"),
            SimilarityScorer::Unsupported(name) => write!(f, "Unsupported({name:?})"),
        }
    }
}

impl SimilarityScorer {
    /// Build the scorer for a supported method.
    ///
    /// `Judged` requires a judge.
    pub fn for_method(
        method: SimilarityMethod,
        judge: Option<Arc<dyn RelatednessJudge>>,
    ) -> Result<Self, GraphError> {
        match method {
            SimilarityMethod::Lexical => Ok(SimilarityScorer::Lexical),
            SimilarityMethod::Embedding => Ok(SimilarityScorer::Embedding),
            SimilarityMethod::Judged => judge.map(SimilarityScorer::Judged).ok_or_else(|| {
                GraphError::InvalidConfig("judged similarity requires a judge".to_string())
            }),
        }
    }

    /// Build the scorer for a selector string.
    ///
    /// Unknown selectors produce [`SimilarityScorer::Unsupported`].
    pub fn from_selector(
        selector: &str,
        judge: Option<Arc<dyn RelatednessJudge>>,
    ) -> Result<Self, GraphError> {
        match SimilarityMethod::parse(selector) {
            Some(method) => Self::for_method(method, judge),
            None => {
                warn!(
                    selector = %selector,
                    "Unsupported similarity method, no edges will be created"
                );
                Ok(SimilarityScorer::Unsupported(selector.to_string()))
            }
        }
    }

    pub fn method(&self) -> Option<SimilarityMethod> {
        match self {
            SimilarityScorer::Lexical => Some(SimilarityMethod::Lexical),
            SimilarityScorer::Embedding => Some(SimilarityMethod::Embedding),
            SimilarityScorer::Judged(_) => Some(SimilarityMethod::Judged),
            SimilarityScorer::Unsupported(_) => None,
        }
    }

    /// Feature cache this strategy reads, if any.
    pub fn feature_kind(&self) -> Option<FeatureKind> {
        match self {
            SimilarityScorer::Lexical => Some(FeatureKind::Lexical),
            SimilarityScorer::Embedding => Some(FeatureKind::Dense),
            SimilarityScorer::Judged(_) | SimilarityScorer::Unsupported(_) => None,
        }
    }

    /// Similarity of two labels.
    ///
    /// Labels need not be registered; unregistered ones are featurized
    /// against the current caches.
    pub async fn compute(&self, caches: &GraphCacheManager, label_a: &str, label_b: &str) -> f64 {
        match self {
            SimilarityScorer::Lexical | SimilarityScorer::Embedding => {
                let active = self.feature_kind().is_some_and(|kind| caches.is_active(kind));
                // a label with no usable tokens still matches itself
                if active && label_a == label_b && !label_a.trim().is_empty() {
                    return 1.0;
                }
                self.score_many(caches, label_a, &[label_b])
                    .await
                    .pop()
                    .unwrap_or(UNRESOLVED_WEIGHT)
            }
            SimilarityScorer::Judged(judge) => judged_score(judge.as_ref(), label_a, label_b).await,
            SimilarityScorer::Unsupported(_) => UNRESOLVED_WEIGHT,
        }
    }

    /// Similarity of `label` against each of `others`, in order.
    ///
    /// The label is featurized once for the whole batch. Comparisons that
    /// fail resolve to [`UNRESOLVED_WEIGHT`] without affecting the rest.
    pub async fn score_many(
        &self,
        caches: &GraphCacheManager,
        label: &str,
        others: &[&str],
    ) -> Vec<f64> {
        self.score_batch(caches, label, others).await.scores
    }

    /// [`score_many`](Self::score_many), also handing back the dense
    /// encoding computed for an unregistered `label` so it can be cached.
    pub async fn score_batch(
        &self,
        caches: &GraphCacheManager,
        label: &str,
        others: &[&str],
    ) -> ScoredBatch {
        match self {
            SimilarityScorer::Judged(judge) => {
                let mut scores = Vec::with_capacity(others.len());
                for other in others {
                    scores.push(judged_score(judge.as_ref(), label, other).await);
                }
                ScoredBatch::unencoded(scores)
            }
            SimilarityScorer::Unsupported(_) => {
                ScoredBatch::unencoded(vec![UNRESOLVED_WEIGHT; others.len()])
            }
            SimilarityScorer::Lexical | SimilarityScorer::Embedding => {
                let Some(kind) = self.feature_kind() else {
                    return ScoredBatch::unencoded(vec![UNRESOLVED_WEIGHT; others.len()]);
                };
                let probe = match caches.probe(kind, label) {
                    Ok(probe) => probe,
                    Err(e) => {
                        warn!(label = %label, error = %e, "Could not featurize label");
                        return ScoredBatch::unencoded(vec![UNRESOLVED_WEIGHT; others.len()]);
                    }
                };

                let scores = others
                    .iter()
                    .map(|other| {
                        let score = caches
                            .probe(kind, other)
                            .ok()
                            .and_then(|feature| probe.cosine(&feature))
                            .map(bounded)
                            .unwrap_or(UNRESOLVED_WEIGHT);
                        debug!(label = %label, other = %other, score, "Scored pair");
                        score
                    })
                    .collect();

                let embedding = match probe {
                    FeatureVector::Dense(Cow::Owned(embedding)) => Some(embedding),
                    _ => None,
                };
                ScoredBatch { scores, embedding }
            }
        }
    }
}

/// Scores of one label against a batch of others.
#[derive(Debug, Default)]
pub struct ScoredBatch {
    /// One weight per compared label, in order
    pub scores: Vec<f64>,
    /// Fresh dense encoding of the label, if one was computed
    pub embedding: Option<Embedding>,
}

impl ScoredBatch {
    fn unencoded(scores: Vec<f64>) -> Self {
        Self {
            scores,
            embedding: None,
        }
    }
}

/// Clamp a cosine into [0, 1]; non-finite values are unresolved.
fn bounded(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        UNRESOLVED_WEIGHT
    }
}

async fn judged_score(judge: &dyn RelatednessJudge, label_a: &str, label_b: &str) -> f64 {
    match judge.judge(label_a, label_b).await {
        Ok(score) if score.is_finite() => {
            let clamped = score.clamp(0.0, 1.0);
            debug!(label_a = %label_a, label_b = %label_b, score = clamped, "Judged pair");
            clamped
        }
        Ok(score) => {
            warn!(label_a = %label_a, label_b = %label_b, score, "Judge returned a non-finite score");
            UNRESOLVED_WEIGHT
        }
        Err(e) => {
            warn!(label_a = %label_a, label_b = %label_b, error = %e, "Judge failed, pair skipped");
            UNRESOLVED_WEIGHT
        }
    }
}
