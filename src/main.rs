mod cli;
mod ui;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::time::sleep;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use scriptorium::app::{self, Capabilities};
use scriptorium::{JobManager, ScriptoriumConfig, SectionMode};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = ScriptoriumConfig::load(cli.config.as_deref())?;
    if let Some(model) = cli.model {
        config.model = model;
    }

    match cli.command {
        Command::Run {
            topic,
            owner,
            json,
            parallel,
        } => {
            if parallel {
                config.section_mode = SectionMode::Parallel;
            }
            if config.api_key.is_empty() {
                warn!("No API key configured; every section will carry degraded text");
            }
            let manager = app::build_manager(&config, Capabilities::live(&config)?).await?;
            run_and_report(&manager, &topic, &owner, json).await
        }
        Command::Demo { topic } => {
            let manager = app::build_manager(&config, Capabilities::offline()).await?;
            run_and_report(&manager, &topic, cli::DEFAULT_OWNER, false).await
        }
        Command::Status { job_id, owner } => {
            let manager = stored_jobs(&config).await?;
            let job = manager.get(&job_id, &owner).await?;
            ui::print_job(&job);
            Ok(())
        }
        Command::History { owner } => {
            let manager = stored_jobs(&config).await?;
            ui::print_history(&manager.list(&owner).await?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "scriptorium=debug"
    } else {
        "scriptorium=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// A manager for reading jobs back; nothing is submitted through it.
async fn stored_jobs(config: &ScriptoriumConfig) -> Result<JobManager> {
    if config.store_dir.is_none() {
        warn!("No store_dir configured; only jobs from this process are visible");
    }
    Ok(app::build_manager(config, Capabilities::offline()).await?)
}

async fn run_and_report(manager: &JobManager, topic: &str, owner: &str, json: bool) -> Result<()> {
    let job_id = manager.submit(topic, owner).await?;

    if json {
        let job = manager.wait(&job_id, owner, POLL_INTERVAL).await?;
        println!("{}", serde_json::to_string_pretty(&job)?);
        return Ok(());
    }

    let progress = ui::JobProgress::start(topic);
    let job = loop {
        let job = manager.get(&job_id, owner).await?;
        if job.is_terminal() {
            break job;
        }
        progress.update(&job);
        sleep(POLL_INTERVAL).await;
    };
    progress.finish(&job);
    if let Some(report) = &job.result {
        println!();
        print!("{}", report.to_markdown());
    }
    Ok(())
}
