//! CLI argument parsing for the mindmap binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Topic Mindmap
///
/// Builds a graph of related topics from a stream of text passages.
#[derive(Parser, Debug)]
#[command(name = "mindmap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/topic-mindmap/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where topic labels come from
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Chat-completion service
    Llm,
    /// Offline summarizer labelling passages by their leading words
    Mock,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest passages from a file, exporting the graph after each one
    Ingest {
        /// Input file: blank-line separated paragraphs, or JSON Lines with --jsonl
        #[arg(short, long)]
        input: PathBuf,

        /// Context key naming the export file
        #[arg(long)]
        context: String,

        /// Similarity method (lexical, embedding, judged)
        #[arg(short, long)]
        method: Option<String>,

        /// Minimum similarity for an edge
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Export directory
        #[arg(short, long)]
        output_dir: Option<String>,

        /// Summarizer provider
        #[arg(long, value_enum, default_value_t = Provider::Llm)]
        provider: Provider,

        /// Read the input as JSON Lines
        #[arg(long)]
        jsonl: bool,

        /// Also write a detailed export including each topic's passages
        #[arg(long)]
        detailed: bool,
    },

    /// Print the nodes and neighbors of an exported graph
    Inspect {
        /// Export file to read
        path: PathBuf,
    },
}
