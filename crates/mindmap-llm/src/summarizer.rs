//! Chat-completion backed passage summarizer.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use mindmap_graph::{clean_label, Summarizer, SummarizerError};

use crate::client::{ChatClient, ChatMessage};

pub const DEFAULT_SUMMARIZER_MODEL: &str = "meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo";

const SYSTEM_PROMPT: &str = "Summarize the passage into a key topic or concept.";

/// Summarizer that asks a chat model for a passage's key topic.
pub struct LlmSummarizer {
    client: Arc<ChatClient>,
    model: String,
}

impl LlmSummarizer {
    pub fn new(client: Arc<ChatClient>) -> Self {
        Self {
            client,
            model: DEFAULT_SUMMARIZER_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    #[instrument(skip(self, passage), fields(model = %self.model, len = passage.len()))]
    async fn summarize(&self, passage: &str) -> Result<Option<String>, SummarizerError> {
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(passage)];
        let content = self.client.complete(&self.model, &messages, None).await?;

        let label = content.as_deref().and_then(clean_label);
        debug!(label = ?label, "Summarized passage");
        Ok(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{client_for, completion_body};
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_summarize_cleans_label() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "model": DEFAULT_SUMMARIZER_MODEL,
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": "The club moved to Old Trafford in 1910."}
                ]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion_body("  \"Stadium history\"\n")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let summarizer = LlmSummarizer::new(Arc::new(client_for(&server)));
        let label = summarizer
            .summarize("The club moved to Old Trafford in 1910.")
            .await
            .unwrap();
        assert_eq!(label.as_deref(), Some("Stadium history"));
    }

    #[tokio::test]
    async fn test_blank_reply_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("   ")))
            .mount(&server)
            .await;

        let summarizer = LlmSummarizer::new(Arc::new(client_for(&server)));
        assert_eq!(summarizer.summarize("anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_server_error_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;

        let summarizer =
            LlmSummarizer::new(Arc::new(client_for(&server))).with_model("custom/model");
        assert_eq!(summarizer.model(), "custom/model");
        let err = summarizer.summarize("anything").await.unwrap_err();
        assert!(matches!(err, SummarizerError::ApiError(_)));
    }
}
