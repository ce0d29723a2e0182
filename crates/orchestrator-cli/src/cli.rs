//! CLI argument definitions for the workflow console.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// AI Orchestrator workflow console.
#[derive(Parser, Debug)]
#[command(
    name = "orchestrator",
    version,
    about = "AI Orchestrator -- generate and execute workflows",
    long_about = "Describe an analysis in plain words, let the Orchestration Service turn it \
                  into a workflow, review it, and execute it."
)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Base URL of the Orchestration Service (overrides config and env).
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the interactive terminal console (default).
    Tui {
        /// Starting automation level (0-100).
        #[arg(long, short, allow_negative_numbers = true)]
        automation: Option<i64>,
    },

    /// Generate a workflow and print it as JSON.
    Generate {
        /// What the workflow should do.
        request: String,

        /// Automation level (0-100).
        #[arg(long, short, allow_negative_numbers = true)]
        automation: Option<i64>,
    },

    /// Execute a workflow read from a JSON file and print its status.
    Execute {
        /// Workflow file; `-` reads standard input.
        #[arg(long, short)]
        workflow_file: PathBuf,
    },

    /// Generate a workflow and execute it straight away.
    Run {
        /// What the workflow should do.
        request: String,

        /// Automation level (0-100).
        #[arg(long, short, allow_negative_numbers = true)]
        automation: Option<i64>,
    },

    /// Show the effective configuration.
    Status,
}

impl Cli {
    /// The subcommand to run, defaulting to the terminal console.
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Tui { automation: None })
    }
}
