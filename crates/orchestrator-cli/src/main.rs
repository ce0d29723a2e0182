//! CLI entry point for the workflow console.
//!
//! This binary provides the `orchestrator` command: an interactive terminal
//! console plus one-shot `generate`, `execute`, and `run` subcommands that
//! drive the same console session without a screen.

mod cli;
mod config;

use std::fs::OpenOptions;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use orchestrator_client::{ServiceClient, ServiceClientConfig, Workflow};
use orchestrator_console::{AutomationLevel, ConsoleSession, OperationState};

use crate::cli::{Cli, Commands};
use crate::config::{BASE_URL_ENV, ConsoleConfig};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine; anything it sets is picked up below.
    let _ = dotenvy::dotenv();

    let mut config = ConsoleConfig::load(&cli.config)?;
    config.apply_env(std::env::var(BASE_URL_ENV).ok());
    if let Some(url) = &cli.base_url {
        config.service.base_url = url.clone();
    }

    let command = cli.command();
    match &command {
        Commands::Tui { .. } => init_tracing(
            &config.console.log_level,
            Some(config.console.log_file.as_path()),
        )?,
        _ => init_tracing(&config.console.log_level, None)?,
    }

    info!(
        base_url = %config.service.base_url,
        policy = ?config.service.response_policy,
        "configuration loaded"
    );

    match command {
        Commands::Tui { automation } => cmd_tui(&config, automation).await,
        Commands::Generate {
            request,
            automation,
        } => cmd_generate(&config, request, automation).await,
        Commands::Execute { workflow_file } => cmd_execute(&config, &workflow_file).await,
        Commands::Run {
            request,
            automation,
        } => cmd_run(&config, request, automation).await,
        Commands::Status => cmd_status(&cli, &config),
    }
}

// ---------------------------------------------------------------------------
// Subcommand: tui
// ---------------------------------------------------------------------------

async fn cmd_tui(config: &ConsoleConfig, automation: Option<i64>) -> Result<()> {
    let client = build_client(config)?;
    let endpoint = client.base_url().to_string();
    let session = build_session(config, automation);

    orchestrator_tui::run_tui(Arc::new(client), session, endpoint)
        .await
        .context("terminal UI failed")?;

    info!("shutting down");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: generate
// ---------------------------------------------------------------------------

async fn cmd_generate(config: &ConsoleConfig, request: String, automation: Option<i64>) -> Result<()> {
    let client = build_client(config)?;
    let mut session = build_session(config, automation);
    session.set_request(request);

    session.generate(&client).await?;
    let workflow = generated_workflow(&session)?;

    println!("{}", workflow.to_pretty());
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: execute
// ---------------------------------------------------------------------------

async fn cmd_execute(config: &ConsoleConfig, workflow_file: &Path) -> Result<()> {
    let client = build_client(config)?;
    let mut session = build_session(config, None);

    // A `null` document means there is nothing to execute.
    let value = read_workflow(workflow_file)?;
    if !value.is_null() {
        session.load_workflow(Workflow::new(value));
    }

    session.execute(&client).await?;
    println!("{}", run_status(&session)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: run
// ---------------------------------------------------------------------------

async fn cmd_run(config: &ConsoleConfig, request: String, automation: Option<i64>) -> Result<()> {
    let client = build_client(config)?;
    let mut session = build_session(config, automation);
    session.set_request(request);

    session.generate(&client).await?;
    println!("Generated Workflow:");
    println!("{}", generated_workflow(&session)?.to_pretty());

    session.execute(&client).await?;
    println!();
    println!("Run Status: {}", run_status(&session)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

fn cmd_status(cli: &Cli, config: &ConsoleConfig) -> Result<()> {
    println!();
    println!("  Orchestrator Console Status");
    println!("  ===========================");
    println!();

    if cli.config.exists() {
        println!("  Config:             OK ({})", cli.config.display());
    } else {
        println!("  Config:             MISSING (using defaults)");
    }

    match ServiceClientConfig::new(&config.service.base_url) {
        Ok(c) => println!("  Service:            {}", c.base_url),
        Err(e) => println!("  Service:            INVALID ({e})"),
    }

    match config.service.request_timeout_secs {
        Some(secs) => println!("  Request timeout:    {secs}s"),
        None => println!("  Request timeout:    none"),
    }

    println!("  Response policy:    {:?}", config.service.response_policy);
    println!("  Default automation: {}", config.console.default_automation);
    println!("  TUI log file:       {}", config.console.log_file.display());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build the HTTP client from configuration.
fn build_client(config: &ConsoleConfig) -> Result<ServiceClient> {
    let client_config = ServiceClientConfig::new(&config.service.base_url)?
        .with_timeout(config.service.timeout());
    Ok(ServiceClient::new(client_config)?)
}

/// Build a fresh session, preferring an explicit automation level.
fn build_session(config: &ConsoleConfig, automation: Option<i64>) -> ConsoleSession {
    let automation = automation
        .map(AutomationLevel::new)
        .unwrap_or(config.console.default_automation);

    ConsoleSession::new()
        .with_policy(config.service.response_policy)
        .with_automation(automation)
}

/// The workflow from the last generate call, or why there is none.
fn generated_workflow(session: &ConsoleSession) -> Result<&Workflow> {
    match session.generate_state() {
        OperationState::Succeeded(workflow) => Ok(workflow),
        OperationState::Failed { reason } => bail!("workflow generation failed: {reason}"),
        _ => bail!("workflow generation did not complete"),
    }
}

/// The status from the last execute call, or why there is none.
fn run_status(session: &ConsoleSession) -> Result<&str> {
    match session.execute_state() {
        OperationState::Succeeded(status) => Ok(status.as_str()),
        OperationState::Failed { reason } => bail!("workflow execution failed: {reason}"),
        _ => bail!("workflow execution did not complete"),
    }
}

/// Read a workflow document from a file, or standard input for `-`.
fn read_workflow(path: &Path) -> Result<serde_json::Value> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read workflow from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read workflow file {}", path.display()))?
    };

    serde_json::from_str(&content).context("workflow file is not valid JSON")
}

/// Initialize the tracing subscriber with the given default log level.
///
/// The terminal UI owns stdout and stderr, so it logs to a file instead.
fn init_tracing(default_level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder.with_writer(Mutex::new(file)).with_ansi(false).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}
