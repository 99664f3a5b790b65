//! Command implementations for the mindmap binary.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use mindmap_embeddings::{CandleEmbedder, EmbeddingModel};
use mindmap_graph::{
    GraphError, GraphSerializer, MindmapPipeline, MockSummarizer, NodeLinkGraph,
    RelatednessJudge, SimilarityMethod, Summarizer,
};
use mindmap_llm::{ChatClient, LlmJudge, LlmSummarizer};

use crate::cli::Provider;
use crate::input::read_passages;
use crate::settings::Settings;

/// Flags of the `ingest` command.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub input: PathBuf,
    pub context: String,
    pub method: Option<String>,
    pub threshold: Option<f64>,
    pub output_dir: Option<String>,
    pub provider: Provider,
    pub jsonl: bool,
    pub detailed: bool,
}

/// Totals for one ingest run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub passages: usize,
    pub dropped: usize,
    pub failed: usize,
    pub nodes: usize,
    pub edges: usize,
    pub export_path: Option<PathBuf>,
}

/// Load settings, apply the global log level override and install logging.
fn prepare(config_path: Option<&str>, log_level_override: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    Ok(settings)
}

/// CLI flags override everything else.
pub fn apply_overrides(settings: &mut Settings, opts: &IngestOptions) {
    if let Some(method) = &opts.method {
        settings.graph.method = method.clone();
    }
    if let Some(threshold) = opts.threshold {
        settings.graph.threshold = threshold;
    }
    if let Some(output_dir) = &opts.output_dir {
        settings.graph.output_dir = output_dir.clone();
    }
}

/// Assemble the pipeline and whichever collaborators the method needs.
pub async fn build_pipeline(settings: &Settings, provider: Provider) -> Result<MindmapPipeline> {
    let method = settings.graph.similarity_method();
    let needs_client =
        provider == Provider::Llm || method == Some(SimilarityMethod::Judged);

    let client = if needs_client {
        let config = settings
            .llm
            .client_config()
            .context("Chat-completion settings are incomplete")?;
        Some(Arc::new(
            ChatClient::new(config).context("Failed to build HTTP client")?,
        ))
    } else {
        None
    };

    let summarizer: Arc<dyn Summarizer> = match (provider, &client) {
        (Provider::Llm, Some(client)) => Arc::new(
            LlmSummarizer::new(Arc::clone(client)).with_model(&settings.llm.summarizer_model),
        ),
        _ => Arc::new(MockSummarizer::new()),
    };

    let judge: Option<Arc<dyn RelatednessJudge>> = match (method, &client) {
        (Some(SimilarityMethod::Judged), Some(client)) => Some(Arc::new(
            LlmJudge::new(Arc::clone(client)).with_model(&settings.llm.judge_model),
        )),
        _ => None,
    };

    let encoder: Option<Arc<dyn EmbeddingModel>> = if method == Some(SimilarityMethod::Embedding)
    {
        let cache = settings.embedding.model_cache();
        info!(repo = %cache.repo_id, "Loading sentence encoder");
        let embedder = tokio::task::spawn_blocking(move || CandleEmbedder::load(&cache))
            .await
            .context("Encoder loading task panicked")?
            .context("Failed to load sentence encoder")?;
        Some(Arc::new(embedder))
    } else {
        None
    };

    MindmapPipeline::new(&settings.graph, summarizer, encoder, judge)
        .context("Failed to build pipeline")
}

/// Feed passages through the pipeline in order.
///
/// A passage whose summarization fails is logged and skipped; any other
/// error ends the run.
pub async fn ingest_passages(
    pipeline: &mut MindmapPipeline,
    passages: &[String],
    context_key: &str,
) -> Result<IngestReport> {
    let mut report = IngestReport {
        passages: passages.len(),
        ..Default::default()
    };

    for (idx, passage) in passages.iter().enumerate() {
        match pipeline.process_passage(passage, context_key).await {
            Ok(outcome) => {
                if outcome.is_dropped() {
                    report.dropped += 1;
                }
                report.export_path = Some(outcome.export_path);
            }
            Err(GraphError::Summarizer(e)) => {
                warn!(passage = idx, error = %e, "Summarization failed, skipping passage");
                report.failed += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to ingest passage {idx}"));
            }
        }
    }

    report.nodes = pipeline.store().node_count();
    report.edges = pipeline.store().edge_count();
    Ok(report)
}

/// `ingest` command.
pub async fn run_ingest(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
    opts: IngestOptions,
) -> Result<()> {
    let mut settings = prepare(config_path, log_level_override)?;
    apply_overrides(&mut settings, &opts);

    info!(
        method = %settings.graph.method,
        threshold = settings.graph.threshold,
        output_dir = %settings.graph.output_dir,
        "Starting ingest"
    );

    let text = std::fs::read_to_string(&opts.input)
        .with_context(|| format!("Failed to read {}", opts.input.display()))?;
    let passages = read_passages(&text, opts.jsonl)
        .with_context(|| format!("Failed to parse {}", opts.input.display()))?;

    let mut pipeline = build_pipeline(&settings, opts.provider).await?;
    let report = ingest_passages(&mut pipeline, &passages, &opts.context).await?;

    if opts.detailed {
        let path = pipeline
            .serializer()
            .write(
                &format!("{}_detailed", opts.context),
                &NodeLinkGraph::detailed(pipeline.store()),
            )
            .context("Failed to write detailed export")?;
        info!(path = %path.display(), "Wrote detailed export");
    }

    println!(
        "Ingested {} passages ({} dropped, {} failed)",
        report.passages, report.dropped, report.failed
    );
    println!("Nodes: {}", report.nodes);
    println!("Edges: {}", report.edges);
    if let Some(path) = &report.export_path {
        println!("Export: {}", path.display());
    }

    Ok(())
}

/// Human-readable listing of an exported graph.
pub fn describe_graph(graph: &NodeLinkGraph) -> String {
    let mut adjacency: BTreeMap<&str, Vec<(&str, f64)>> = BTreeMap::new();
    for node in &graph.nodes {
        adjacency.entry(node.id.as_str()).or_default();
    }
    for edge in &graph.edges {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push((edge.target.as_str(), edge.weight));
        adjacency
            .entry(edge.target.as_str())
            .or_default()
            .push((edge.source.as_str(), edge.weight));
    }

    let mut out = String::new();
    let _ = writeln!(out, "Nodes: {}", graph.nodes.len());
    let _ = writeln!(out, "Edges: {}", graph.edges.len());
    for node in &graph.nodes {
        let neighbors = adjacency
            .get(node.id.as_str())
            .map(|n| {
                n.iter()
                    .map(|(other, weight)| format!("{other} ({weight:.3})"))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        if neighbors.is_empty() {
            let _ = writeln!(out, "  {}: (no neighbors)", node.id);
        } else {
            let _ = writeln!(out, "  {}: {}", node.id, neighbors);
        }
    }
    out
}

/// `inspect` command.
pub fn run_inspect(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
    path: &Path,
) -> Result<()> {
    prepare(config_path, log_level_override)?;

    let graph = GraphSerializer::load(path)
        .with_context(|| format!("Failed to load graph from {}", path.display()))?;
    print!("{}", describe_graph(&graph));
    Ok(())
}
