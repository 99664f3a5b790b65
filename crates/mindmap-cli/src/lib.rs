//! Mindmap command-line library.
//!
//! # Modules
//!
//! - `cli`: argument parsing with clap
//! - `commands`: `ingest` and `inspect`
//! - `input`: passage file formats
//! - `settings`: layered configuration

pub mod cli;
pub mod commands;
pub mod input;
pub mod settings;

pub use cli::{Cli, Commands, Provider};
pub use commands::{
    apply_overrides, build_pipeline, describe_graph, ingest_passages, run_ingest, run_inspect,
    IngestOptions, IngestReport,
};
pub use input::{read_passages, InputError};
pub use settings::{ConfigError, EmbeddingSettings, LlmSettings, Settings};
