//! # mindmap-graph
//!
//! Incremental topic-relation graph.
//!
//! Passages are compressed to short topic labels by a [`Summarizer`]; each
//! label becomes a node and is linked to previously seen topics by
//! similarity-weighted edges. Similarity comes from one of three strategies
//! chosen once at construction:
//!
//! - **Lexical**: TF-IDF vectors over the registry of topics seen so far
//! - **Embedding**: cosine similarity of dense label encodings
//! - **Judged**: a 0-1 relatedness rating from an external service
//!
//! ## Features
//! - Registry-backed feature caches, rebuilt as topics arrive
//! - Append-only edges with first-seen weights
//! - Summary (labels + edges) and detailed (plus passages) views of one graph
//! - Flat node-link JSON export per context key

pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod scorer;
pub mod store;
pub mod summarizer;
pub mod tfidf;
pub mod types;

pub use cache::{FeatureKind, FeatureVector, GraphCacheManager, TopicRegistry};
pub use config::{MindmapConfig, SimilarityMethod};
pub use error::GraphError;
pub use export::{EdgeRecord, GraphSerializer, NodeLinkGraph, NodeRecord};
pub use pipeline::{MindmapPipeline, PassageOutcome};
pub use scorer::{JudgeError, RelatednessJudge, ScoredBatch, SimilarityScorer, UNRESOLVED_WEIGHT};
pub use store::{Relation, TopicGraphStore};
pub use summarizer::{clean_label, MockSummarizer, Summarizer, SummarizerError};
pub use tfidf::{SparseVector, TfIdfCorpus};
pub use types::{RelatedTopic, TopicEdge, TopicNode};
