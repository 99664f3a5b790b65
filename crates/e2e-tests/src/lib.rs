//! End-to-end test infrastructure for the topic mindmap.
//!
//! Provides a shared TestHarness plus deterministic stand-ins for the
//! summarizer, sentence encoder and relatedness judge.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use mindmap_embeddings::{Embedding, EmbeddingError, EmbeddingModel, ModelInfo};
use mindmap_graph::{
    GraphSerializer, JudgeError, MindmapConfig, MindmapPipeline, MockSummarizer, NodeLinkGraph,
    RelatednessJudge, Summarizer,
};

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Export directory handed to pipelines
    pub output_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let output_dir = temp_dir.path().join("exports");

        Self {
            _temp_dir: temp_dir,
            output_dir,
        }
    }

    pub fn config(&self, method: &str, threshold: f64) -> MindmapConfig {
        MindmapConfig {
            method: method.to_string(),
            threshold,
            output_dir: self.output_dir.to_string_lossy().to_string(),
        }
    }

    /// Pipeline with no encoder or judge.
    pub fn pipeline(
        &self,
        method: &str,
        threshold: f64,
        summarizer: Arc<dyn Summarizer>,
    ) -> MindmapPipeline {
        MindmapPipeline::new(&self.config(method, threshold), summarizer, None, None)
            .expect("Failed to build pipeline")
    }

    pub fn embedding_pipeline(
        &self,
        threshold: f64,
        summarizer: Arc<dyn Summarizer>,
        encoder: Arc<dyn EmbeddingModel>,
    ) -> MindmapPipeline {
        MindmapPipeline::new(
            &self.config("embedding", threshold),
            summarizer,
            Some(encoder),
            None,
        )
        .expect("Failed to build embedding pipeline")
    }

    pub fn judged_pipeline(
        &self,
        threshold: f64,
        summarizer: Arc<dyn Summarizer>,
        judge: Arc<dyn RelatednessJudge>,
    ) -> MindmapPipeline {
        MindmapPipeline::new(
            &self.config("judged", threshold),
            summarizer,
            None,
            Some(judge),
        )
        .expect("Failed to build judged pipeline")
    }

    pub fn export_path(&self, context_key: &str) -> PathBuf {
        GraphSerializer::new(&self.output_dir).path_for(context_key)
    }

    pub fn load_export(&self, context_key: &str) -> NodeLinkGraph {
        load_graph(&self.export_path(context_key))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_graph(path: &Path) -> NodeLinkGraph {
    GraphSerializer::load(path).expect("Failed to load export")
}

/// Summarizer mapping each passage to a fixed label.
pub fn scripted_summarizer(pairs: &[(&str, &str)]) -> Arc<dyn Summarizer> {
    let summarizer = pairs
        .iter()
        .fold(MockSummarizer::new(), |s, (passage, label)| {
            s.with_label(*passage, *label)
        });
    Arc::new(summarizer)
}

/// Encoder returning a fixed vector per label; unknown labels are rejected.
pub struct TableEncoder {
    info: ModelInfo,
    vectors: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl TableEncoder {
    pub fn new(dimension: usize) -> Self {
        Self {
            info: ModelInfo {
                name: "table".to_string(),
                dimension,
                max_sequence_length: 32,
            },
            vectors: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, label: &str, vector: Vec<f32>) -> Self {
        assert_eq!(vector.len(), self.info.dimension, "vector dimension");
        self.vectors.insert(label.to_string(), vector);
        self
    }

    /// Number of `embed` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingModel for TableEncoder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vectors
            .get(text)
            .map(|v| Embedding::new(v.clone()))
            .ok_or_else(|| EmbeddingError::InvalidInput(format!("no vector for {text}")))
    }
}

/// Judge answering from a symmetric table; unlisted pairs fail.
#[derive(Default)]
pub struct ScriptedJudge {
    scores: HashMap<(String, String), Result<f64, String>>,
    calls: AtomicUsize,
}

impl ScriptedJudge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, a: &str, b: &str, score: f64) -> Self {
        self.scores.insert(Self::key(a, b), Ok(score));
        self
    }

    /// The pair gets an unreadable answer.
    pub fn malformed(mut self, a: &str, b: &str) -> Self {
        self.scores
            .insert(Self::key(a, b), Err("not a score".to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }
}

#[async_trait]
impl RelatednessJudge for ScriptedJudge {
    async fn judge(&self, topic_a: &str, topic_b: &str) -> Result<f64, JudgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.scores.get(&Self::key(topic_a, topic_b)) {
            Some(Ok(score)) => Ok(*score),
            Some(Err(msg)) => Err(JudgeError::Malformed(msg.clone())),
            None => Err(JudgeError::Transport(format!(
                "no score for {topic_a} / {topic_b}"
            ))),
        }
    }
}
