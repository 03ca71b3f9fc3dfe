//! Deepscribe CLI — run the deep-research pipeline against a task and print
//! the resulting report to stdout.
//!
//! Progress and diagnostics go to stderr so the report stays pipeable.

use std::path::{Path, PathBuf};

use clap::Parser;
use deepscribe_core::orchestrator::{Orchestrator, PipelineObserver};
use deepscribe_core::providers::resolve_primary_key;
use deepscribe_core::state::{PipelineStage, PipelineState};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Deepscribe: multi-agent deep research with adversarial review
#[derive(Parser, Debug)]
#[command(name = "deepscribe", version, about, long_about = None)]
struct Cli {
    /// Research task to investigate
    task: String,

    /// LLM model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Write the report to a file as well as stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Workspace directory (searched for .deepscribe/config.toml)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

/// Map verbosity flags to a tracing filter directive.
fn log_filter(verbose: u8, quiet: bool) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Observer that narrates pipeline progress on stderr.
struct ProgressPrinter {
    quiet: bool,
}

impl PipelineObserver for ProgressPrinter {
    fn on_stage_started(&self, stage: PipelineStage, state: &PipelineState) {
        if self.quiet {
            return;
        }
        match stage {
            PipelineStage::Research => {
                eprintln!(
                    "\x1b[36m[research]\x1b[0m pass {}: gathering sources...",
                    state.iteration + 1
                );
            }
            PipelineStage::Critic => {
                eprintln!("\x1b[33m[critic]\x1b[0m reviewing claims...");
            }
            PipelineStage::Synthesize => {
                eprintln!("\x1b[35m[synthesize]\x1b[0m merging verified findings...");
            }
            PipelineStage::Write => {
                eprintln!("\x1b[32m[write]\x1b[0m drafting report...");
            }
            PipelineStage::Done => {}
        }
    }

    fn on_stage_completed(&self, stage: PipelineStage, state: &PipelineState) {
        if self.quiet {
            return;
        }
        match stage {
            PipelineStage::Research => {
                let claims = state.research_data.as_ref().map_or(0, |f| f.claims.len());
                eprintln!("\x1b[36m[research]\x1b[0m {} claim(s) gathered", claims);
            }
            PipelineStage::Critic => {
                let (verified, rejected) = state
                    .critique
                    .as_ref()
                    .map_or((0, 0), |c| (c.verified.len(), c.rejected.len()));
                eprintln!(
                    "\x1b[33m[critic]\x1b[0m {} verified, {} rejected, confidence {:.2}",
                    verified, rejected, state.confidence
                );
            }
            PipelineStage::Synthesize => {
                let facts = state
                    .synthesis
                    .as_ref()
                    .map_or(0, |s| s.consensus_facts.len());
                eprintln!("\x1b[35m[synthesize]\x1b[0m {} consensus fact(s)", facts);
            }
            PipelineStage::Write | PipelineStage::Done => {}
        }
    }
}

/// Write the finished report to `path`.
fn save_report(path: &Path, report: &str) -> anyhow::Result<()> {
    std::fs::write(path, report)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = log_filter(cli.verbose, cli.quiet);
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "deepscribe", "deepscribe")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "deepscribe.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    // Resolve workspace
    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    // Load configuration and apply CLI overrides
    let mut config = deepscribe_core::config::load_config(Some(&workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }
    for warning in config.llm.validate() {
        tracing::warn!("{}", warning);
    }
    if resolve_primary_key(&config.llm).is_none() {
        eprintln!(
            "Warning: no API key found in {} (or configured fallbacks). \
             Model calls will fail and the report will degrade.",
            config.llm.api_key_env
        );
    }

    let orchestrator = Orchestrator::from_config(&config)?;

    if !cli.quiet {
        eprintln!("Starting deep research for: {}\n", cli.task);
    }
    let observer = ProgressPrinter { quiet: cli.quiet };
    let run = orchestrator.run(&cli.task, &observer).await;

    if !cli.quiet {
        eprintln!("\n=== FINAL REPORT ===\n");
    }
    println!("{}", run.report());

    if let Some(path) = &cli.output {
        save_report(path, run.report())?;
        if !cli.quiet {
            eprintln!("\nReport saved to {}", path.display());
        }
    }

    if !cli.quiet {
        let elapsed = (run.finished_at - run.started_at).num_seconds();
        eprintln!(
            "\nRun {} finished: {} research pass(es), confidence {:.2}, {}s",
            run.id, run.state.iteration, run.state.confidence, elapsed
        );
    }

    Ok(())
}
