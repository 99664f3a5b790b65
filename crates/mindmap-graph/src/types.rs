//! Topic graph data types.

use serde::{Deserialize, Serialize};

/// A topic in the graph, keyed by its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicNode {
    pub label: String,
}

impl TopicNode {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

/// Undirected weighted edge between two topics.
///
/// `source` is the topic that was being inserted when the edge was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicEdge {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

impl TopicEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, weight: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight,
        }
    }

    /// The endpoint opposite `topic`, if `topic` is an endpoint.
    pub fn other(&self, topic: &str) -> Option<&str> {
        if self.source == topic {
            Some(&self.target)
        } else if self.target == topic {
            Some(&self.source)
        } else {
            None
        }
    }
}

/// An existing topic that passed the threshold against a new label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedTopic {
    pub topic: String,
    pub weight: f64,
}

impl RelatedTopic {
    pub fn new(topic: impl Into<String>, weight: f64) -> Self {
        Self {
            topic: topic.into(),
            weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_other() {
        let edge = TopicEdge::new("a", "b", 0.5);
        assert_eq!(edge.other("a"), Some("b"));
        assert_eq!(edge.other("b"), Some("a"));
        assert_eq!(edge.other("c"), None);
    }

    #[test]
    fn test_related_topic_serialization() {
        let related = RelatedTopic::new("Stadium", 0.42);
        let json = serde_json::to_string(&related).unwrap();
        assert_eq!(json, r#"{"topic":"Stadium","weight":0.42}"#);
    }
}
