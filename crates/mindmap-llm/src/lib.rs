//! # mindmap-llm
//!
//! OpenAI-compatible chat-completion adapters for the mindmap's external
//! collaborators:
//!
//! - [`LlmSummarizer`] compresses a passage into a topic label
//! - [`LlmJudge`] rates how related two topic labels are on a 0-1 scale
//!
//! Both share one [`ChatClient`], which retries failed requests with
//! exponential backoff. Defaults target Together's endpoint and Llama 3.1
//! instruct models.

pub mod client;
pub mod error;
pub mod judge;
pub mod summarizer;

pub use client::{ChatClient, ChatMessage, LlmConfig, DEFAULT_BASE_URL};
pub use error::LlmError;
pub use judge::{LlmJudge, DEFAULT_JUDGE_MODEL};
pub use summarizer::{LlmSummarizer, DEFAULT_SUMMARIZER_MODEL};
