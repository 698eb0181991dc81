//! CLI entry point: run one debate, or summarize the session log.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use debate_coordination::{
    CostAggregator, DebateOrchestrator, DebateRequest, EngineConfig, HttpModelClient,
    JsonlSessionStore, ModelInvoker,
};

#[derive(Parser, Debug)]
#[command(name = "debate", about = "Tiered multi-role debate engine for trading analysis")]
struct Args {
    /// Topic to debate.
    topic: Option<String>,

    /// Additional context for the debate.
    #[arg(long)]
    context: Option<String>,

    /// Override the configured round cap.
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Session log path (overrides DEBATE_SESSION_LOG).
    #[arg(long)]
    session_log: Option<std::path::PathBuf>,

    /// Model endpoint base URL (overrides DEBATE_ENDPOINT_URL).
    #[arg(long)]
    endpoint: Option<String>,

    /// Print a cost summary of the session log instead of debating.
    #[arg(long)]
    summary: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = EngineConfig::from_env();
    if let Some(path) = args.session_log {
        config.session_log = path;
    }
    if let Some(endpoint) = args.endpoint {
        config.endpoint.base_url = endpoint;
    }

    let tiers = Arc::new(config.tiers.clone());
    let store = Arc::new(JsonlSessionStore::new(&config.session_log));

    if args.summary {
        let aggregator = CostAggregator::new(Arc::clone(&tiers));
        let summary = aggregator
            .summarize(store.as_ref())
            .await
            .context("failed to read session log")?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let topic = args
        .topic
        .context("a topic is required unless --summary is given")?;

    let client = HttpModelClient::new(
        &config.endpoint.base_url,
        config.endpoint.api_key.clone(),
        config.invoker.per_call_timeout,
    )
    .map_err(|e| anyhow::anyhow!("failed to build model client: {e}"))?;
    let invoker = ModelInvoker::new(Arc::new(client), Arc::clone(&tiers), config.invoker.clone());
    let orchestrator = DebateOrchestrator::new(invoker, store, tiers, config.debate.clone());

    let request = DebateRequest {
        topic,
        context: args.context,
        max_rounds: args.max_rounds,
    };
    let outcome = orchestrator.run(request).await;

    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }
    println!("{}", serde_json::to_string_pretty(&outcome.session)?);

    if !outcome.persisted {
        anyhow::bail!("session completed but was not persisted");
    }
    Ok(())
}
