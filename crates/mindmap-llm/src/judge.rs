//! Chat-completion backed relatedness judge.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use mindmap_graph::{JudgeError, RelatednessJudge};

use crate::client::{extract_json, ChatClient, ChatMessage};

pub const DEFAULT_JUDGE_MODEL: &str = "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo";

const SYSTEM_PROMPT: &str = "Evaluate how related the two topics are on a scale of 0 to 1.";

/// Judge that asks a chat model for a `{"score": x}` relatedness rating.
///
/// Returns the raw score; range checks happen in the scorer.
pub struct LlmJudge {
    client: Arc<ChatClient>,
    model: String,
    response_format: Value,
}

impl LlmJudge {
    pub fn new(client: Arc<ChatClient>) -> Self {
        Self {
            client,
            model: DEFAULT_JUDGE_MODEL.to_string(),
            response_format: json!({
                "type": "json_object",
                "schema": {
                    "title": "WeightOutput",
                    "type": "object",
                    "properties": {
                        "score": {"type": "number", "title": "Score"}
                    },
                    "required": ["score"]
                }
            }),
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
impl RelatednessJudge for LlmJudge {
    #[instrument(skip(self), fields(model = %self.model))]
    async fn judge(&self, topic_a: &str, topic_b: &str) -> Result<f64, JudgeError> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!("Topic 1: {topic_a}\nTopic 2: {topic_b}")),
        ];
        let content = self
            .client
            .complete(&self.model, &messages, Some(&self.response_format))
            .await?
            .ok_or_else(|| JudgeError::Malformed("empty completion".to_string()))?;

        let score = parse_score(&content)?;
        debug!(score, "Judged pair");
        Ok(score)
    }
}

/// Read `score` from the model reply. Accepts a number or a numeric string.
fn parse_score(content: &str) -> Result<f64, JudgeError> {
    let value: Value = serde_json::from_str(extract_json(content))
        .map_err(|e| JudgeError::Malformed(format!("{e}: {content}")))?;

    match value.get("score") {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| JudgeError::Malformed(format!("score out of range: {n}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| JudgeError::Malformed(format!("non-numeric score: {s}"))),
        Some(other) => Err(JudgeError::Malformed(format!("unexpected score: {other}"))),
        None => Err(JudgeError::Malformed(format!("missing score: {content}"))),
    }
}
