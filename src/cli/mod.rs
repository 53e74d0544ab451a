//! CLI command definitions for gtd-triage
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod add;
pub mod import;

use crate::format::OutputFormat;
use crate::types::TaskStatus;
use add::{AddArgs, parse_status};
use clap::{Args, Parser, Subcommand};
use import::ImportArgs;

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_str(s)
        .ok_or_else(|| format!("Invalid format '{}'. Valid options: json, markdown", s))
}

/// Task prioritization, batching and dependency suggestions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format: markdown (default) or json
    #[arg(short, long, default_value = "markdown", value_parser = parse_format, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a task
    Add(AddArgs),

    /// List tasks
    List {
        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },

    /// Show one task
    Show {
        #[arg(value_name = "TASK_ID")]
        id: String,
    },

    /// Change a task's GTD status
    Status {
        #[arg(value_name = "TASK_ID")]
        id: String,
        #[arg(value_name = "STATUS", value_parser = parse_status)]
        status: TaskStatus,
    },

    /// Record (or remove) a dependency between two tasks
    Depend(DependArgs),

    /// Recompute priorities for open tasks
    Prioritize(RunArgs),

    /// Show the score breakdown for one task
    Explain {
        #[arg(value_name = "TASK_ID")]
        id: String,
    },

    /// Group similar open tasks into batches
    Batch(RunArgs),

    /// List batches
    Batches,

    /// Suggest dependencies for a task from its title
    Suggest {
        #[arg(value_name = "TASK_ID")]
        id: String,

        /// Remove repeated suggestions (overrides config)
        #[arg(long)]
        dedup: bool,
    },

    /// Import tasks from a JSON file
    Import(ImportArgs),
}

/// Arguments shared by the prioritize and batch subcommands
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Compute changes without writing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the depend subcommand
#[derive(Args, Debug)]
pub struct DependArgs {
    /// The dependent task
    #[arg(value_name = "TASK_ID")]
    pub task: String,

    /// The task it depends on
    #[arg(value_name = "DEPENDS_ON")]
    pub on: String,

    /// Remove the dependency instead of adding it
    #[arg(long)]
    pub remove: bool,
}
