//! Council CLI - Command-line front end for anonymized LLM cross-evaluation

mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use council_core::CouncilConfig;
use council_pipeline::{HttpStageClient, PipelineEvent, PipelineOrchestrator, PipelineState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "council")]
#[command(version)]
#[command(about = "Council - Anonymized cross-evaluation of LLM answers")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "council.toml")]
    config: PathBuf,

    /// Backend base URL (overrides config and COUNCIL_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Log filter when RUST_LOG is unset (overrides config)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Ask the council a question and print every stage
    Run {
        /// The question to evaluate
        question: String,

        /// Print the final run as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Check configuration validity
    Check,
    /// Show backend status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { question, json } => run(&config, &question, json).await,
        Commands::Check => {
            println!("Configuration OK: {}", cli.config.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Status => status(&config).await,
    }
}

/// Layers file, environment and flags, then validates.
fn load_config(cli: &Cli) -> anyhow::Result<CouncilConfig> {
    let mut config = CouncilConfig::load_or_default(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    config.apply_env()?;

    if let Some(url) = &cli.backend_url {
        config.backend.base_url = url.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn run(config: &CouncilConfig, question: &str, json: bool) -> anyhow::Result<()> {
    let client = HttpStageClient::new(&config.backend)?;
    let orchestrator = PipelineOrchestrator::new(Arc::new(client));

    let mut handle = orchestrator.start(question)?;
    info!(backend = %config.backend.base_url, "run started");

    let cancel = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling run");
            cancel.cancel();
        }
    });

    while let Some(event) = handle.next_event().await {
        if json {
            continue;
        }
        match event {
            PipelineEvent::StageStarted(stage) => eprintln!("[{stage}] {}...", stage.activity()),
            PipelineEvent::Stage1Ready { responses } => {
                println!("Stage 1: Individual Responses\n");
                print!("{}", render::responses(&responses));
            }
            PipelineEvent::Stage2Ready { evaluations, .. } => {
                println!("Stage 2: Peer Evaluations\n");
                print!("{}", render::evaluations(&evaluations));
            }
            PipelineEvent::Stage3Ready { scoreboard } => {
                println!("Stage 3: Final Scoreboard (lower is better)\n");
                print!("{}", render::scoreboard(&scoreboard));
            }
            PipelineEvent::StageFinished(_)
            | PipelineEvent::Failed { .. }
            | PipelineEvent::Cancelled { .. } => {}
        }
    }

    let run = handle.wait().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&render::run_json(&run))?);
    }

    match run.state() {
        PipelineState::Complete => Ok(()),
        PipelineState::Cancelled { stage } => bail!("run cancelled during {stage}"),
        other => bail!("{other}"),
    }
}

async fn status(config: &CouncilConfig) -> anyhow::Result<()> {
    let client = HttpStageClient::new(&config.backend)?;
    let health = client
        .health()
        .await
        .with_context(|| format!("backend at {} is unreachable", client.base_url()))?;

    if !health.is_ok() {
        bail!("backend reported status '{}'", health.status);
    }
    println!("Backend {}: {} ({})", client.base_url(), health.status, health.service);
    Ok(())
}
