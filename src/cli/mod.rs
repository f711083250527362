//! Command-line interface.
//!
//! Wires the process-lifetime cache, conversation store, and index into
//! one engine per invocation and renders the run report.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};

use crate::domain::models::{ClassificationMode, RunReport, RunRequest};
use crate::domain::ports::{CompletionService, NullGuidance, TracingTelemetry};
use crate::infrastructure::classifier::CompletionClassifier;
use crate::infrastructure::completion::{AnthropicCompletion, AnthropicConfig};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::index::InMemoryIndex;
use crate::services::{
    CacheStats, InMemoryConversationStore, PipelineStages, RetrievalCache, RetrievalEngine,
    WorkflowEngine,
};

#[derive(Parser)]
#[command(name = "attest", version, about = "Audit and compliance question answering")]
pub struct Cli {
    /// Emit machine-readable JSON output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a question over an ingested document corpus
    Ask(AskArgs),
}

#[derive(Args)]
pub struct AskArgs {
    /// The question to answer
    pub question: String,

    /// YAML corpus file loaded into the in-memory index
    #[arg(long, default_value = ".attest/corpus.yaml")]
    pub corpus: PathBuf,

    /// Conversation id for multi-turn context
    #[arg(long)]
    pub conversation: Option<String>,

    /// Restrict retrieval to one document id
    #[arg(long)]
    pub document: Option<String>,

    /// Classify every retrieved chunk instead of only the top one
    #[arg(long)]
    pub multi_doc: bool,

    /// Override the configured retrieval limit
    #[arg(long)]
    pub limit: Option<usize>,
}

/// Run the `ask` command end to end.
pub async fn execute_ask(args: AskArgs, json: bool) -> Result<()> {
    let mut config = ConfigLoader::load()?;
    if let Some(limit) = args.limit {
        config.retrieval.limit = limit;
    }

    let index = Arc::new(
        InMemoryIndex::load_corpus(&args.corpus)
            .context("Could not load the document corpus")?,
    );
    let cache = Arc::new(RetrievalCache::new(
        config.cache.capacity,
        Duration::from_secs(config.cache.ttl_secs),
    ));
    let retrieval = Arc::new(RetrievalEngine::new(
        index.clone(),
        Some(index.clone()),
        cache.clone(),
        config.retrieval.clone(),
    ));

    let completion: Arc<dyn CompletionService> = Arc::new(AnthropicCompletion::new(
        AnthropicConfig::from_env(&config.completion)?,
    )?);
    let classifier = Arc::new(CompletionClassifier::new(completion.clone()));
    let conversations = Arc::new(InMemoryConversationStore::new());

    let stages = PipelineStages::new(
        completion,
        classifier,
        Arc::new(NullGuidance::new()),
        conversations.clone(),
        retrieval,
        config.clone(),
    );
    let engine = WorkflowEngine::new(
        stages,
        conversations,
        Arc::new(TracingTelemetry::new()),
        config,
    );

    let mut request = RunRequest::new(args.question);
    if let Some(conversation) = args.conversation {
        request = request.with_conversation(conversation);
    }
    if let Some(document) = args.document {
        request = request.with_document(document);
    }
    if args.multi_doc {
        request = request.with_classification_mode(ClassificationMode::MultiDocument);
    }

    let report = engine.run(request).await;
    render_report(&report, cache.stats(), json)
}

/// Print the run report, either as JSON or as a human-readable summary
/// with a per-stage timing table.
fn render_report(report: &RunReport, cache_stats: CacheStats, json: bool) -> Result<()> {
    if json {
        let payload = serde_json::json!({
            "report": report,
            "cache": {
                "hits": cache_stats.hits,
                "misses": cache_stats.misses,
                "evictions": cache_stats.evictions,
                "hit_rate": cache_stats.hit_rate(),
            },
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("{}\n", report.response);
    println!(
        "run {} | status {:?} | strategy {} | tokens {}",
        report.run_id,
        report.status,
        report.metadata.strategy.as_deref().unwrap_or("-"),
        report.metadata.token_usage.total(),
    );

    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("STAGE").set_alignment(CellAlignment::Left),
            Cell::new("DURATION (MS)").set_alignment(CellAlignment::Right),
        ]);
    for (stage, duration_ms) in &report.metadata.stage_timings {
        table.add_row(vec![
            Cell::new(stage),
            Cell::new(duration_ms.to_string()).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");

    if !report.errors.is_empty() {
        println!("\n{} stage error(s):", report.errors.len());
        for error in &report.errors {
            println!("  {}: {}", error.stage, error.message);
        }
    }

    Ok(())
}
