//! Topic Mindmap
//!
//! Builds a graph of related topics from text passages.
//!
//! # Usage
//!
//! ```bash
//! mindmap ingest --input notes.txt --context club [--method lexical|embedding|judged]
//! mindmap inspect llm/graph_data_club.json
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/topic-mindmap/config.toml)
//! 3. Environment variables (MINDMAP_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use mindmap_cli::{run_ingest, run_inspect, Cli, Commands, IngestOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            input,
            context,
            method,
            threshold,
            output_dir,
            provider,
            jsonl,
            detailed,
        } => {
            run_ingest(
                cli.config.as_deref(),
                cli.log_level.as_deref(),
                IngestOptions {
                    input,
                    context,
                    method,
                    threshold,
                    output_dir,
                    provider,
                    jsonl,
                    detailed,
                },
            )
            .await?;
        }
        Commands::Inspect { path } => {
            run_inspect(cli.config.as_deref(), cli.log_level.as_deref(), &path)?;
        }
    }

    Ok(())
}
