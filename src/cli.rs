//! Command-line interface built on clap.
//!
//! [`Cli`] carries the subcommands in [`Command`] (run, status, history, demo)
//! and the global flags (--config, --model, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_OWNER: &str = "local";

/// Scriptorium: plans, researches, drafts and edits a report on any topic.
#[derive(Debug, Parser)]
#[command(name = "scriptorium", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a TOML config file (defaults to ./scriptorium.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Model identifier for every agent, overriding the config.
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a report on a topic and wait for it.
    Run {
        /// The report topic.
        topic: String,

        /// Owner recorded on the job.
        #[arg(long, default_value = DEFAULT_OWNER)]
        owner: String,

        /// Print the finished job as JSON instead of Markdown.
        #[arg(long)]
        json: bool,

        /// Run sections concurrently with independent agents.
        #[arg(long)]
        parallel: bool,
    },

    /// Show one stored job.
    Status {
        job_id: String,

        #[arg(long, default_value = DEFAULT_OWNER)]
        owner: String,
    },

    /// List stored jobs, newest first.
    History {
        #[arg(long, default_value = DEFAULT_OWNER)]
        owner: String,
    },

    /// Run the full pipeline offline with canned agents.
    Demo {
        #[arg(default_value = "The printing press")]
        topic: String,
    },
}
