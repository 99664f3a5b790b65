//! Passage ingestion: summarize, relate, insert, export.

use std::path::PathBuf;
use std::sync::Arc;

use mindmap_embeddings::EmbeddingModel;
use tracing::{info, instrument};

use crate::cache::{FeatureKind, GraphCacheManager};
use crate::config::{validate_threshold, MindmapConfig};
use crate::error::GraphError;
use crate::export::{GraphSerializer, NodeLinkGraph};
use crate::scorer::{RelatednessJudge, SimilarityScorer};
use crate::store::TopicGraphStore;
use crate::summarizer::{clean_label, Summarizer};
use crate::types::RelatedTopic;

/// What happened to one passage.
#[derive(Debug, Clone, PartialEq)]
pub struct PassageOutcome {
    /// Topic label, or `None` if the summarizer produced nothing
    pub topic: Option<String>,
    /// Whether the label created a new node
    pub new_topic: bool,
    /// Edges created for this passage
    pub edges_added: usize,
    /// Export written after the passage
    pub export_path: PathBuf,
}

impl PassageOutcome {
    pub fn is_dropped(&self) -> bool {
        self.topic.is_none()
    }
}

/// Builds a topic graph one passage at a time.
///
/// Each call to [`process_passage`](Self::process_passage) runs to
/// completion before the graph can be touched again (`&mut self`); share a
/// pipeline across tasks only behind one exclusive lock.
pub struct MindmapPipeline {
    summarizer: Arc<dyn Summarizer>,
    store: TopicGraphStore,
    serializer: GraphSerializer,
    threshold: f64,
}

impl MindmapPipeline {
    /// Assemble a pipeline from configuration.
    ///
    /// `encoder` is required for embedding similarity and `judge` for judged
    /// similarity; each is ignored otherwise.
    pub fn new(
        config: &MindmapConfig,
        summarizer: Arc<dyn Summarizer>,
        encoder: Option<Arc<dyn EmbeddingModel>>,
        judge: Option<Arc<dyn RelatednessJudge>>,
    ) -> Result<Self, GraphError> {
        config.validate()?;

        let scorer = SimilarityScorer::from_selector(&config.method, judge)?;
        let caches = match scorer.feature_kind() {
            Some(FeatureKind::Lexical) => GraphCacheManager::new().with_lexical(),
            Some(FeatureKind::Dense) => {
                let encoder = encoder.ok_or_else(|| {
                    GraphError::InvalidConfig("embedding similarity requires an encoder".to_string())
                })?;
                GraphCacheManager::new().with_encoder(encoder)?
            }
            None => GraphCacheManager::new(),
        };

        let store = TopicGraphStore::new(caches, scorer)?;
        Self::from_parts(
            store,
            summarizer,
            GraphSerializer::new(&config.output_dir),
            config.threshold,
        )
    }

    /// Assemble a pipeline around an existing store.
    ///
    /// `threshold` must lie in [0, 1].
    pub fn from_parts(
        store: TopicGraphStore,
        summarizer: Arc<dyn Summarizer>,
        serializer: GraphSerializer,
        threshold: f64,
    ) -> Result<Self, GraphError> {
        validate_threshold(threshold)?;
        Ok(Self {
            summarizer,
            store,
            serializer,
            threshold,
        })
    }

    pub fn store(&self) -> &TopicGraphStore {
        &self.store
    }

    pub fn serializer(&self) -> &GraphSerializer {
        &self.serializer
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Ingest one passage and rewrite the export for `context_key`.
    ///
    /// A passage that summarizes to nothing leaves the graph untouched. A
    /// summarizer failure or an export write failure is returned.
    #[instrument(skip(self, passage), fields(context = %context_key))]
    pub async fn process_passage(
        &mut self,
        passage: &str,
        context_key: &str,
    ) -> Result<PassageOutcome, GraphError> {
        let label = self
            .summarizer
            .summarize(passage)
            .await?
            .as_deref()
            .and_then(clean_label);

        let Some(label) = label else {
            info!("Summarizer produced no topic, passage dropped");
            let export_path = self.export(context_key)?;
            return Ok(PassageOutcome {
                topic: None,
                new_topic: false,
                edges_added: 0,
                export_path,
            });
        };

        let relation = self.store.relate_prepared(&label, self.threshold).await;
        // add_edge rejects these, so drop them before the node exists
        let related: Vec<RelatedTopic> = relation
            .related
            .into_iter()
            .filter(|candidate| candidate.weight.is_finite() && candidate.weight >= 0.0)
            .collect();

        let new_topic = self.store.add_node_prepared(&label, relation.embedding)?;
        let mut edges_added = 0;
        for candidate in &related {
            if self
                .store
                .add_edge(&label, &candidate.topic, candidate.weight)?
            {
                edges_added += 1;
            }
        }
        self.store.attach_passage(&label, passage)?;

        let export_path = self.export(context_key)?;

        info!(
            topic = %label,
            new_topic,
            edges_added,
            nodes = self.store.node_count(),
            edges = self.store.edge_count(),
            "Ingested passage"
        );

        Ok(PassageOutcome {
            topic: Some(label),
            new_topic,
            edges_added,
            export_path,
        })
    }

    /// Summary view as pretty JSON.
    pub fn summary_json(&self) -> Result<String, GraphError> {
        NodeLinkGraph::summary(&self.store).to_json_pretty()
    }

    fn export(&self, context_key: &str) -> Result<PathBuf, GraphError> {
        self.serializer
            .write(context_key, &NodeLinkGraph::summary(&self.store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::LetterEncoder;
    use crate::scorer::tests::TableJudge;
    use crate::summarizer::{MockSummarizer, SummarizerError};
    use async_trait::async_trait;
    use tempfile::TempDir;

    fn config(method: &str, threshold: f64, dir: &TempDir) -> MindmapConfig {
        MindmapConfig {
            method: method.to_string(),
            threshold,
            output_dir: dir.path().to_string_lossy().to_string(),
        }
    }

    struct DownSummarizer;

    #[async_trait]
    impl Summarizer for DownSummarizer {
        async fn summarize(&self, _passage: &str) -> Result<Option<String>, SummarizerError> {
            Err(SummarizerError::ApiError("HTTP 503".to_string()))
        }
    }

    #[tokio::test]
    async fn test_recurring_label_scenario() {
        let dir = TempDir::new().unwrap();
        let summarizer = MockSummarizer::new()
            .with_label("P1", "club finances")
            .with_label("P2", "stadium tours")
            .with_label("P3", "club finances");
        let mut pipeline =
            MindmapPipeline::new(&config("lexical", 0.3, &dir), Arc::new(summarizer), None, None)
                .unwrap();

        for passage in ["P1", "P2", "P3"] {
            pipeline.process_passage(passage, "news").await.unwrap();
        }

        let store = pipeline.store();
        assert_eq!(store.node_count(), 2);
        assert_eq!(
            store.passages("club finances").unwrap(),
            &["P1".to_string(), "P3".to_string()]
        );
        assert_eq!(store.passages("stadium tours").unwrap(), &["P2".to_string()]);
        // no shared vocabulary, so no edge at 0.3
        assert_eq!(store.edge_count(), 0);
    }

    #[tokio::test]
    async fn test_outcome_reports_new_topic_and_edges() {
        let dir = TempDir::new().unwrap();
        let summarizer = MockSummarizer::new()
            .with_label("P1", "club finances")
            .with_label("P2", "club finances report");
        let mut pipeline =
            MindmapPipeline::new(&config("tfidf", 0.3, &dir), Arc::new(summarizer), None, None)
                .unwrap();

        let first = pipeline.process_passage("P1", "news").await.unwrap();
        assert!(first.new_topic);
        assert_eq!(first.edges_added, 0);

        let second = pipeline.process_passage("P2", "news").await.unwrap();
        assert_eq!(second.topic.as_deref(), Some("club finances report"));
        assert!(second.new_topic);
        assert_eq!(second.edges_added, 1);
        assert_eq!(second.export_path, dir.path().join("graph_data_news.json"));

        let exported = GraphSerializer::load(&second.export_path).unwrap();
        assert_eq!(exported.nodes.len(), 2);
        assert_eq!(exported.edges.len(), 1);
        assert!(exported.nodes.iter().all(|n| n.passages.is_none()));
    }

    #[tokio::test]
    async fn test_empty_summary_drops_passage() {
        let dir = TempDir::new().unwrap();
        let summarizer = MockSummarizer::new().with_label("noise", "  ");
        let mut pipeline =
            MindmapPipeline::new(&config("lexical", 0.3, &dir), Arc::new(summarizer), None, None)
                .unwrap();

        let outcome = pipeline.process_passage("noise", "ctx").await.unwrap();
        assert!(outcome.is_dropped());
        assert_eq!(pipeline.store().node_count(), 0);
        assert!(pipeline.store().caches().registry().is_empty());
    }

    #[tokio::test]
    async fn test_summarizer_failure_is_returned() {
        let dir = TempDir::new().unwrap();
        let mut pipeline =
            MindmapPipeline::new(&config("lexical", 0.3, &dir), Arc::new(DownSummarizer), None, None)
                .unwrap();

        let err = pipeline.process_passage("text", "ctx").await.unwrap_err();
        assert!(matches!(err, GraphError::Summarizer(_)));
        assert_eq!(pipeline.store().node_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_threshold_links_every_pair() {
        let dir = TempDir::new().unwrap();
        let judge = TableJudge::new()
            .with("b", "a", 0.0)
            .with("c", "a", 0.2)
            .with("c", "b", 0.05);
        let summarizer = MockSummarizer::new()
            .with_label("1", "a")
            .with_label("2", "b")
            .with_label("3", "c");
        let mut pipeline = MindmapPipeline::new(
            &config("llm", 0.0, &dir),
            Arc::new(summarizer),
            None,
            Some(Arc::new(judge)),
        )
        .unwrap();

        for passage in ["1", "2", "3"] {
            pipeline.process_passage(passage, "ctx").await.unwrap();
        }
        assert_eq!(pipeline.store().edge_count(), 3);
    }

    #[tokio::test]
    async fn test_malformed_judgement_skips_only_that_pair() {
        let dir = TempDir::new().unwrap();
        let judge = TableJudge::new()
            .with("c", "a", 0.8)
            .failing("c", "b")
            .with("b", "a", 0.1);
        let summarizer = MockSummarizer::new()
            .with_label("1", "a")
            .with_label("2", "b")
            .with_label("3", "c");
        let mut pipeline = MindmapPipeline::new(
            &config("judged", 0.0, &dir),
            Arc::new(summarizer),
            None,
            Some(Arc::new(judge)),
        )
        .unwrap();

        for passage in ["1", "2", "3"] {
            pipeline.process_passage(passage, "ctx").await.unwrap();
        }
        let store = pipeline.store();
        assert_eq!(store.node_count(), 3);
        assert_eq!(store.edge_weight("c", "a"), Some(0.8));
        assert_eq!(store.edge_weight("c", "b"), None);
    }

    #[tokio::test]
    async fn test_high_threshold_blocks_dissimilar_pair() {
        let dir = TempDir::new().unwrap();
        let summarizer = MockSummarizer::new()
            .with_label("1", "abc")
            .with_label("2", "abd");
        let mut pipeline = MindmapPipeline::new(
            &config("embedding", 0.9, &dir),
            Arc::new(summarizer),
            Some(Arc::new(LetterEncoder::new())),
            None,
        )
        .unwrap();

        pipeline.process_passage("1", "ctx").await.unwrap();
        pipeline.process_passage("2", "ctx").await.unwrap();
        assert_eq!(pipeline.store().edge_count(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_method_never_links() {
        let dir = TempDir::new().unwrap();
        let summarizer = MockSummarizer::new()
            .with_label("1", "same")
            .with_label("2", "same topic");
        let mut pipeline =
            MindmapPipeline::new(&config("jaccard", 0.0, &dir), Arc::new(summarizer), None, None)
                .unwrap();

        pipeline.process_passage("1", "ctx").await.unwrap();
        pipeline.process_passage("2", "ctx").await.unwrap();
        assert_eq!(pipeline.store().node_count(), 2);
        assert_eq!(pipeline.store().edge_count(), 0);
    }

    #[test]
    fn test_embedding_without_encoder_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = MindmapPipeline::new(
            &config("embedding", 0.3, &dir),
            Arc::new(MockSummarizer::new()),
            None,
            None,
        );
        assert!(matches!(result, Err(GraphError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_threshold_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = MindmapPipeline::new(
            &config("lexical", 2.0, &dir),
            Arc::new(MockSummarizer::new()),
            None,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_assembled_pipeline_checks_threshold() {
        let dir = TempDir::new().unwrap();
        for threshold in [-2.0, 1.5, f64::NAN] {
            let store = TopicGraphStore::new(
                GraphCacheManager::new(),
                SimilarityScorer::Unsupported("jaccard".to_string()),
            )
            .unwrap();
            let result = MindmapPipeline::from_parts(
                store,
                Arc::new(MockSummarizer::new()),
                GraphSerializer::new(dir.path()),
                threshold,
            );
            assert!(matches!(result, Err(GraphError::InvalidConfig(_))));
        }
    }

    #[tokio::test]
    async fn test_unscored_candidates_never_reach_the_graph() {
        let dir = TempDir::new().unwrap();
        let store = TopicGraphStore::new(
            GraphCacheManager::new(),
            SimilarityScorer::Unsupported("jaccard".to_string()),
        )
        .unwrap();
        let summarizer = MockSummarizer::new()
            .with_label("1", "a")
            .with_label("2", "b");
        let mut pipeline = MindmapPipeline::from_parts(
            store,
            Arc::new(summarizer),
            GraphSerializer::new(dir.path()),
            0.0,
        )
        .unwrap();

        pipeline.process_passage("1", "ctx").await.unwrap();
        let outcome = pipeline.process_passage("2", "ctx").await.unwrap();
        assert_eq!(outcome.edges_added, 0);

        let store = pipeline.store();
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.edge_count(), 0);
        assert_eq!(store.passages("b").unwrap(), &["2".to_string()]);
        let exported = GraphSerializer::load(&outcome.export_path).unwrap();
        assert_eq!(exported.nodes.len(), 2);
    }

    #[tokio::test]
    async fn test_summary_json_matches_graph() {
        let dir = TempDir::new().unwrap();
        let summarizer = MockSummarizer::new()
            .with_label("P1", "club finances")
            .with_label("P2", "club finances report");
        let mut pipeline =
            MindmapPipeline::new(&config("lexical", 0.3, &dir), Arc::new(summarizer), None, None)
                .unwrap();
        pipeline.process_passage("P1", "news").await.unwrap();
        pipeline.process_passage("P2", "news").await.unwrap();

        let json = pipeline.summary_json().unwrap();
        let parsed: NodeLinkGraph = serde_json::from_str(&json).unwrap();
        let ids: Vec<&str> = parsed.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["club finances", "club finances report"]);
        assert_eq!(parsed.edges.len(), 1);
        assert!(!json.contains("P1"));
    }
}
