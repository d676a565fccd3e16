use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use babysitter::agent::{Evaluator, LlmEvaluator, LlmProposer, StaticEvaluator};
use babysitter::config::Config;
use babysitter::domain::{Decision, LoopEvent, LoopOutcome};
use babysitter::gateway::SandboxedExecutor;
use babysitter::llm::{AnthropicClient, AnthropicConfig, LlmClient, Usage};
use babysitter::runner::{ApprovalLoop, LoopConfig, SessionReport};
use babysitter::snapshot::{Snapshotter, TreeSnapshot};

mod cli;

use cli::Cli;
use cli::commands::{Commands, Gate};

fn setup_logging(level: &str) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("babysitter")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("babysitter.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Run {
            goal,
            repo_root,
            max_rounds,
            gate,
        } => {
            let max_rounds = max_rounds.unwrap_or(config.session.max_rounds);
            handle_run_command(goal, repo_root, max_rounds, *gate, config, cli.is_verbose()).await
        }
        Commands::Snapshot { repo_root, max_bytes } => {
            handle_snapshot_command(repo_root, max_bytes.unwrap_or(config.snapshot.max_bytes), config)
        }
    }
}

async fn handle_run_command(
    goal: &str,
    repo_root: &Path,
    max_rounds: u32,
    gate: Gate,
    config: &Config,
    verbose: bool,
) -> Result<()> {
    info!("Running goal '{}' in {} ({} rounds, {:?} gate)", goal, repo_root.display(), max_rounds, gate);

    let anthropic =
        Arc::new(AnthropicClient::new(AnthropicConfig::from(&config.llm)).context("Failed to create LLM client")?);
    if !anthropic.is_ready() {
        eyre::bail!("ANTHROPIC_API_KEY is empty");
    }
    info!("Using model {}", anthropic.model());
    let client: Arc<dyn LlmClient> = anthropic.clone();

    let proposer = LlmProposer::new(client.clone())
        .with_model(config.llm.proposer_model())
        .with_max_tokens(config.llm.max_tokens);
    let evaluator: Arc<dyn Evaluator> = match gate {
        Gate::Llm => Arc::new(LlmEvaluator::new(client).with_model(config.llm.evaluator_model())),
        Gate::Approve => Arc::new(StaticEvaluator::approve_all()),
        Gate::Decline => Arc::new(StaticEvaluator::decline_all()),
    };

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event, verbose);
        }
    });

    let runner = ApprovalLoop::new(Arc::new(proposer), evaluator)
        .with_executor(SandboxedExecutor::new(&config.executor))
        .with_snapshotter(Arc::new(TreeSnapshot::new(&config.snapshot)))
        .with_config(LoopConfig::from(config))
        .with_events(tx);

    let result = runner.run(goal, repo_root, max_rounds).await;
    drop(runner);
    printer.await.context("Event printer failed")?;

    let report = result.context("Failed to start session")?;
    print_report(&report);
    print_usage(&anthropic.total_usage());
    Ok(())
}

fn print_event(event: &LoopEvent, verbose: bool) {
    match event {
        LoopEvent::RoundStarted { round, .. } => {
            println!("\n{}", format!("── Round {} ──", round).bold());
        }
        LoopEvent::Proposed { proposal, .. } => {
            println!("{} {}", "Proposed:".cyan(), proposal);
            println!("  {}", proposal.rationale.dimmed());
            if verbose && !proposal.payload.is_empty() {
                println!("{}", proposal.payload);
            }
        }
        LoopEvent::ProposalFailed { error, .. } => {
            println!("{} {}", "Proposal failed:".red(), error);
        }
        LoopEvent::Decided { decision, .. } => {
            let label = match decision.decision {
                Decision::Approve => "APPROVE".green(),
                Decision::Decline => "DECLINE".red(),
            };
            println!("{} {} {}", "Decision:".cyan(), label, decision.rationale);
        }
        LoopEvent::Executed { result, .. } => {
            if result.ok {
                println!("{} {} {}", "Executed:".green(), result.action_type, result.target);
                if let (true, Some(content)) = (verbose, &result.content) {
                    println!("{}", content);
                }
            } else {
                println!(
                    "{} {} {}: {}",
                    "Failed:".red(),
                    result.action_type,
                    result.target,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        LoopEvent::Finished { .. } => {}
    }
}

fn print_report(report: &SessionReport) {
    println!();
    match report.outcome {
        LoopOutcome::Completed => println!(
            "{} after {} round(s), {} change(s) applied",
            "COMPLETED".green().bold(),
            report.rounds,
            report.mutations
        ),
        LoopOutcome::Exhausted => println!(
            "{} after {} round(s), {} change(s) applied; further action requires human review",
            "EXHAUSTED".yellow().bold(),
            report.rounds,
            report.mutations
        ),
    }
    println!("{} {}", "Session:".dimmed(), report.session_id.dimmed());
}

fn print_usage(usage: &Usage) {
    println!(
        "{} {} tokens ({} in, {} out)",
        "Usage:".dimmed(),
        usage.total(),
        usage.input_tokens,
        usage.output_tokens
    );
}

fn handle_snapshot_command(repo_root: &Path, max_bytes: usize, config: &Config) -> Result<()> {
    info!("Summarizing {} (max {} bytes)", repo_root.display(), max_bytes);
    if !repo_root.is_dir() {
        eyre::bail!("{} is not a directory", repo_root.display());
    }

    let summary = TreeSnapshot::new(&config.snapshot).summarize(repo_root, max_bytes);
    println!("{}", summary);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(config.log_level.as_deref().unwrap_or("info")).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
