//! Topic graph storage.
//!
//! One authoritative set of nodes and edges plus a side-table of raw
//! passages per node. The summary view is the node/edge set; the detailed
//! view adds the passages. Because both views read the same sets they can
//! never disagree on labels or weights.

use std::collections::HashMap;

use mindmap_embeddings::Embedding;
use tracing::{debug, instrument};

use crate::cache::GraphCacheManager;
use crate::error::GraphError;
use crate::scorer::SimilarityScorer;
use crate::types::{RelatedTopic, TopicEdge, TopicNode};

/// Candidates for a label about to be inserted.
#[derive(Debug, Default)]
pub struct Relation {
    /// Topics at or above the threshold, in registry order
    pub related: Vec<RelatedTopic>,
    /// Dense encoding computed while scoring, for [`TopicGraphStore::add_node_prepared`]
    pub embedding: Option<Embedding>,
}

/// Order-independent key for an undirected edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct EdgeKey(usize, usize);

impl EdgeKey {
    fn canonical(a: usize, b: usize) -> Self {
        if a <= b {
            EdgeKey(a, b)
        } else {
            EdgeKey(b, a)
        }
    }
}

/// Topic graph with append-only edges and a passage side-table.
pub struct TopicGraphStore {
    caches: GraphCacheManager,
    scorer: SimilarityScorer,
    nodes: Vec<TopicNode>,
    node_index: HashMap<String, usize>,
    /// Edge indices incident to each node, in insertion order
    incident: Vec<Vec<usize>>,
    edges: Vec<TopicEdge>,
    edge_index: HashMap<EdgeKey, usize>,
    passages: Vec<Vec<String>>,
}

impl TopicGraphStore {
    /// Create an empty store.
    ///
    /// `caches` must have the feature cache `scorer` reads enabled.
    pub fn new(caches: GraphCacheManager, scorer: SimilarityScorer) -> Result<Self, GraphError> {
        if let Some(kind) = scorer.feature_kind() {
            if !caches.is_active(kind) {
                return Err(GraphError::InvalidConfig(format!(
                    "{:?} similarity needs the {} cache",
                    scorer, kind
                )));
            }
        }
        Ok(Self {
            caches,
            scorer,
            nodes: Vec::new(),
            node_index: HashMap::new(),
            incident: Vec::new(),
            edges: Vec::new(),
            edge_index: HashMap::new(),
            passages: Vec::new(),
        })
    }

    pub fn caches(&self) -> &GraphCacheManager {
        &self.caches
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    /// Add a topic node if it does not exist yet.
    ///
    /// The label is registered with the cache manager first, so the caches
    /// are consistent by the time the node becomes visible. Returns whether
    /// a node was created.
    pub fn add_node(&mut self, label: &str) -> Result<bool, GraphError> {
        self.add_node_prepared(label, None)
    }

    /// [`add_node`](Self::add_node) with the dense encoding from
    /// [`relate_prepared`](Self::relate_prepared), if there was one.
    #[instrument(skip(self, embedding))]
    pub fn add_node_prepared(
        &mut self,
        label: &str,
        embedding: Option<Embedding>,
    ) -> Result<bool, GraphError> {
        if self.node_index.contains_key(label) {
            return Ok(false);
        }

        self.caches.register_with_embedding(label, embedding)?;

        self.node_index.insert(label.to_string(), self.nodes.len());
        self.nodes.push(TopicNode::new(label));
        self.incident.push(Vec::new());
        self.passages.push(Vec::new());

        debug!(node_count = self.nodes.len(), "Added topic node");
        Ok(true)
    }

    /// Registered topics scoring at least `threshold` against `label`.
    ///
    /// `label` itself is never a candidate. Results keep registry order.
    pub async fn relate(&self, label: &str, threshold: f64) -> Vec<RelatedTopic> {
        self.relate_prepared(label, threshold).await.related
    }

    /// [`relate`](Self::relate), keeping the label's dense encoding so that
    /// inserting it afterwards does not run the encoder a second time.
    #[instrument(skip(self))]
    pub async fn relate_prepared(&self, label: &str, threshold: f64) -> Relation {
        let others: Vec<&str> = self
            .caches
            .registry()
            .iter()
            .filter(|topic| *topic != label)
            .collect();
        if others.is_empty() {
            return Relation::default();
        }

        let batch = self.scorer.score_batch(&self.caches, label, &others).await;

        let related: Vec<RelatedTopic> = others
            .into_iter()
            .zip(batch.scores)
            .filter(|(_, weight)| *weight >= threshold)
            .map(|(topic, weight)| RelatedTopic::new(topic, weight))
            .collect();

        debug!(candidates = related.len(), "Related topics found");
        Relation {
            related,
            embedding: batch.embedding,
        }
    }

    /// Add an undirected edge between two existing topics.
    ///
    /// A pair is stored once: repeating it keeps the first weight and returns
    /// `Ok(false)`. Self-loops, unknown endpoints and negative or non-finite
    /// weights are rejected.
    pub fn add_edge(&mut self, u: &str, v: &str, weight: f64) -> Result<bool, GraphError> {
        let a = self.require_node(u)?;
        let b = self.require_node(v)?;
        if a == b {
            return Err(GraphError::InvalidInput(format!("self-loop on topic: {u}")));
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(GraphError::InvalidInput(format!(
                "edge weight must be a non-negative number, got {weight}"
            )));
        }

        let key = EdgeKey::canonical(a, b);
        if self.edge_index.contains_key(&key) {
            debug!(source = %u, target = %v, "Edge already present, keeping first weight");
            return Ok(false);
        }

        let edge_idx = self.edges.len();
        self.edges.push(TopicEdge::new(u, v, weight));
        self.edge_index.insert(key, edge_idx);
        self.incident[a].push(edge_idx);
        self.incident[b].push(edge_idx);

        debug!(source = %u, target = %v, weight, "Added edge");
        Ok(true)
    }

    /// Append a raw passage to a topic's detailed record.
    pub fn attach_passage(&mut self, label: &str, passage: &str) -> Result<(), GraphError> {
        let idx = self.require_node(label)?;
        self.passages[idx].push(passage.to_string());
        Ok(())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.node_index.contains_key(label)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[TopicNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[TopicEdge] {
        &self.edges
    }

    /// Topic labels in insertion order.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.label.as_str())
    }

    /// Passages attached to a topic, oldest first.
    pub fn passages(&self, label: &str) -> Option<&[String]> {
        self.node_index
            .get(label)
            .map(|&idx| self.passages[idx].as_slice())
    }

    /// Neighbors of a topic with edge weights, in edge insertion order.
    pub fn neighbors(&self, label: &str) -> Vec<(&str, f64)> {
        let Some(&idx) = self.node_index.get(label) else {
            return Vec::new();
        };
        self.incident[idx]
            .iter()
            .filter_map(|&e| {
                let edge = &self.edges[e];
                edge.other(label).map(|other| (other, edge.weight))
            })
            .collect()
    }

    /// Weight of the edge joining two topics, in either direction.
    pub fn edge_weight(&self, u: &str, v: &str) -> Option<f64> {
        let a = *self.node_index.get(u)?;
        let b = *self.node_index.get(v)?;
        self.edge_index
            .get(&EdgeKey::canonical(a, b))
            .map(|&e| self.edges[e].weight)
    }

    fn require_node(&self, label: &str) -> Result<usize, GraphError> {
        self.node_index
            .get(label)
            .copied()
            .ok_or_else(|| GraphError::UnknownTopic(label.to_string()))
    }
}
