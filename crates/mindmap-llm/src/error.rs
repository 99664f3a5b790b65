//! Chat client error types.

use mindmap_graph::{JudgeError, SummarizerError};
use thiserror::Error;

/// Errors from a chat-completion call.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    Request(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<LlmError> for SummarizerError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::RateLimited => SummarizerError::RateLimitExceeded,
            LlmError::Parse(msg) => SummarizerError::ParseError(msg),
            LlmError::Config(msg) => SummarizerError::ConfigError(msg),
            other => SummarizerError::ApiError(other.to_string()),
        }
    }
}

impl From<LlmError> for JudgeError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Parse(msg) => JudgeError::Malformed(msg),
            other => JudgeError::Transport(other.to_string()),
        }
    }
}
