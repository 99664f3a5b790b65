//! Passage summarization contract and an offline implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for summarization operations.
#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

/// Compresses a raw passage into a short topic label.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Topic label for `passage`, or `None` when the service produced nothing.
    async fn summarize(&self, passage: &str) -> Result<Option<String>, SummarizerError>;
}

/// Normalise a raw label: trim whitespace and surrounding quotes.
///
/// Returns `None` if nothing is left.
pub fn clean_label(raw: &str) -> Option<String> {
    let cleaned = raw.trim().trim_matches('"').trim_matches('\'').trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Deterministic summarizer for tests and offline runs.
///
/// Passages registered with [`with_label`](Self::with_label) map to their
/// label; any other passage is labelled by its first few words.
#[derive(Debug, Clone)]
pub struct MockSummarizer {
    labels: HashMap<String, String>,
    max_words: usize,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self {
            labels: HashMap::new(),
            max_words: 4,
        }
    }

    /// Number of leading words used for unmapped passages.
    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = max_words;
        self
    }

    /// Fixed label for an exact passage. An empty label makes the passage
    /// summarize to nothing.
    pub fn with_label(mut self, passage: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(passage.into(), label.into());
        self
    }
}

impl Default for MockSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, passage: &str) -> Result<Option<String>, SummarizerError> {
        if let Some(label) = self.labels.get(passage) {
            return Ok(clean_label(label));
        }

        let words: Vec<&str> = passage
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .take(self.max_words)
            .collect();
        Ok(clean_label(&words.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_label() {
        assert_eq!(clean_label("  \"Club Finances\" \n"), Some("Club Finances".to_string()));
        assert_eq!(clean_label("'Stadium'"), Some("Stadium".to_string()));
        assert_eq!(clean_label("   "), None);
        assert_eq!(clean_label("\"\""), None);
    }

    #[tokio::test]
    async fn test_mock_uses_table() {
        let summarizer = MockSummarizer::new().with_label("P1", "Topic A");
        assert_eq!(
            summarizer.summarize("P1").await.unwrap(),
            Some("Topic A".to_string())
        );
    }

    #[tokio::test]
    async fn test_mock_falls_back_to_leading_words() {
        let summarizer = MockSummarizer::new().with_max_words(3);
        let label = summarizer
            .summarize("The club, founded in 1878, plays at Old Trafford.")
            .await
            .unwrap();
        assert_eq!(label, Some("The club founded".to_string()));
    }

    #[tokio::test]
    async fn test_mock_empty_passage_yields_nothing() {
        let summarizer = MockSummarizer::new().with_label("blank", "");
        assert_eq!(summarizer.summarize("   ").await.unwrap(), None);
        assert_eq!(summarizer.summarize("blank").await.unwrap(), None);
    }
}
