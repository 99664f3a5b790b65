//! Flat node-link export of the topic graph.
//!
//! The file layout is the common node-link JSON shape (`nodes` with `id`,
//! `edges` with `source`/`target`/`weight`) read by downstream analysis
//! tools. One file is written per context key and overwritten on each save.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GraphError;
use crate::store::TopicGraphStore;

/// One node of the export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Topic label
    pub id: String,
    /// Raw passages; only present in the detailed view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passages: Option<Vec<String>>,
}

/// One undirected edge of the export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

/// Node-link document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLinkGraph {
    #[serde(default)]
    pub directed: bool,
    #[serde(default)]
    pub multigraph: bool,
    #[serde(default)]
    pub graph: serde_json::Map<String, serde_json::Value>,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl NodeLinkGraph {
    /// Labels and edges only.
    pub fn summary(store: &TopicGraphStore) -> Self {
        Self::build(store, false)
    }

    /// Labels, edges and each node's passages.
    pub fn detailed(store: &TopicGraphStore) -> Self {
        Self::build(store, true)
    }

    fn build(store: &TopicGraphStore, with_passages: bool) -> Self {
        let nodes = store
            .topics()
            .map(|label| NodeRecord {
                id: label.to_string(),
                passages: with_passages
                    .then(|| store.passages(label).map(<[String]>::to_vec).unwrap_or_default()),
            })
            .collect();

        let edges = store
            .edges()
            .iter()
            .map(|edge| EdgeRecord {
                source: edge.source.clone(),
                target: edge.target.clone(),
                weight: edge.weight,
            })
            .collect();

        Self {
            directed: false,
            multigraph: false,
            graph: serde_json::Map::new(),
            nodes,
            edges,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Writes node-link exports into one directory, one file per context key.
#[derive(Debug, Clone)]
pub struct GraphSerializer {
    output_dir: PathBuf,
}

impl GraphSerializer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// File path for a context key: `graph_data_<key>.json`.
    ///
    /// Path separators in the key are replaced so the file always lands
    /// directly in the output directory.
    pub fn path_for(&self, context_key: &str) -> PathBuf {
        let safe: String = context_key
            .chars()
            .map(|c| match c {
                '/' | '\\' | '\0' => '_',
                c => c,
            })
            .collect();
        self.output_dir.join(format!("graph_data_{safe}.json"))
    }

    /// Write `graph` for `context_key`, replacing any earlier file.
    pub fn write(&self, context_key: &str, graph: &NodeLinkGraph) -> Result<PathBuf, GraphError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.path_for(context_key);
        let bytes = serde_json::to_vec(graph)?;
        std::fs::write(&path, bytes)?;

        debug!(
            path = ?path,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "Wrote graph export"
        );
        Ok(path)
    }

    /// Read an export back.
    pub fn load(path: impl AsRef<Path>) -> Result<NodeLinkGraph, GraphError> {
        let bytes = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::GraphCacheManager;
    use crate::scorer::SimilarityScorer;
    use tempfile::TempDir;

    fn sample_store() -> TopicGraphStore {
        let mut store =
            TopicGraphStore::new(GraphCacheManager::new().with_lexical(), SimilarityScorer::Lexical)
                .unwrap();
        for label in ["A", "B", "C"] {
            store.add_node(label).unwrap();
        }
        store.add_edge("B", "A", 0.123_456_789_012_345).unwrap();
        store.add_edge("C", "A", 1.0 / 3.0).unwrap();
        store.attach_passage("A", "passage one").unwrap();
        store
    }

    #[test]
    fn test_summary_has_no_passages() {
        let graph = NodeLinkGraph::summary(&sample_store());
        assert_eq!(graph.nodes.len(), 3);
        assert!(graph.nodes.iter().all(|n| n.passages.is_none()));

        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["nodes"][0], serde_json::json!({"id": "A"}));
        assert_eq!(json["directed"], serde_json::json!(false));
        assert_eq!(json["edges"][0]["source"], serde_json::json!("B"));
    }

    #[test]
    fn test_detailed_matches_summary_structure() {
        let store = sample_store();
        let summary = NodeLinkGraph::summary(&store);
        let detailed = NodeLinkGraph::detailed(&store);

        assert_eq!(summary.edges, detailed.edges);
        let ids = |g: &NodeLinkGraph| g.nodes.iter().map(|n| n.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&summary), ids(&detailed));
        assert_eq!(
            detailed.nodes[0].passages,
            Some(vec!["passage one".to_string()])
        );
        assert_eq!(detailed.nodes[1].passages, Some(vec![]));
    }

    #[test]
    fn test_write_then_load() {
        let temp = TempDir::new().unwrap();
        let serializer = GraphSerializer::new(temp.path().join("out"));
        let graph = NodeLinkGraph::summary(&sample_store());

        let path = serializer.write("Recent News", &graph).unwrap();
        assert_eq!(path.file_name().unwrap(), "graph_data_Recent News.json");

        let loaded = GraphSerializer::load(&path).unwrap();
        assert_eq!(loaded.nodes.len(), 3);
        assert_eq!(loaded.edges.len(), 2);
        for (a, b) in loaded.edges.iter().zip(graph.edges.iter()) {
            assert_eq!(a.source, b.source);
            assert!((a.weight - b.weight).abs() < 1e-9);
        }
    }

    #[test]
    fn test_write_overwrites_per_key() {
        let temp = TempDir::new().unwrap();
        let serializer = GraphSerializer::new(temp.path());
        let mut store = sample_store();
        serializer
            .write("topic", &NodeLinkGraph::summary(&store))
            .unwrap();

        store.add_node("D").unwrap();
        let path = serializer
            .write("topic", &NodeLinkGraph::summary(&store))
            .unwrap();

        assert_eq!(GraphSerializer::load(path).unwrap().nodes.len(), 4);
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_path_for_strips_separators() {
        let serializer = GraphSerializer::new("/tmp/llm");
        assert_eq!(
            serializer.path_for("a/b\\c"),
            PathBuf::from("/tmp/llm/graph_data_a_b_c.json")
        );
    }

    #[test]
    fn test_load_accepts_minimal_document() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("g.json");
        std::fs::write(
            &path,
            r#"{"nodes": [{"id": "x"}], "edges": [{"source": "x", "target": "x", "weight": 0.5}]}"#,
        )
        .unwrap();
        let graph = GraphSerializer::load(&path).unwrap();
        assert!(!graph.directed);
        assert_eq!(graph.nodes[0].id, "x");
    }

    #[test]
    fn test_write_failure_surfaces() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "not a dir").unwrap();
        let serializer = GraphSerializer::new(blocker.join("nested"));
        let graph = NodeLinkGraph::summary(&sample_store());
        assert!(matches!(
            serializer.write("k", &graph),
            Err(GraphError::Io(_))
        ));
    }
}
