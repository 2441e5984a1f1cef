//! Terminal output: a spinner while a job runs and coloured summaries.
//!
//! Uses `indicatif` for the spinner and `console` for styling. Logs go to
//! stderr through `tracing`; everything here writes the user-facing result.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use scriptorium::state_machine::{Job, JobStatus, JobSummary};

/// Spinner that follows one job until it reaches a terminal status.
pub struct JobProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl JobProgress {
    pub fn start(topic: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("queued: {topic}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    pub fn update(&self, job: &Job) {
        self.pb.set_message(format!("{}: {}", job.status, job.topic));
    }

    /// Clear the spinner and print the job's outcome line.
    pub fn finish(&self, job: &Job) {
        self.pb.finish_and_clear();
        match (&job.status, &job.result) {
            (JobStatus::Completed, Some(report)) if report.is_degraded() => {
                println!(
                    "  {} Report completed with degraded sections",
                    self.yellow.apply_to("!")
                );
            }
            (JobStatus::Completed, _) => {
                println!("  {} Report completed", self.green.apply_to("✓"));
            }
            _ => {
                let error = job.error.as_deref().unwrap_or("unknown error");
                println!("  {} Report failed: {error}", self.red.apply_to("✗"));
            }
        }
    }
}

fn status_style(status: JobStatus) -> Style {
    match status {
        JobStatus::Completed => Style::new().green(),
        JobStatus::Failed => Style::new().red(),
        JobStatus::Queued | JobStatus::Processing => Style::new().yellow(),
    }
}

pub fn print_job(job: &Job) {
    println!("Job:     {}", job.id);
    println!("Topic:   {}", job.topic);
    println!("Status:  {}", status_style(job.status).apply_to(job.status));
    println!("Created: {}", job.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(error) = &job.error {
        println!("Error:   {error}");
    }
    if let Some(report) = &job.result {
        println!();
        print!("{}", report.to_markdown());
    }
}

pub fn print_history(summaries: &[JobSummary]) {
    if summaries.is_empty() {
        println!("No jobs found.");
        return;
    }
    for summary in summaries {
        println!(
            "{}  {:<10}  {}  {}",
            summary.created_at.format("%Y-%m-%d %H:%M"),
            status_style(summary.status).apply_to(summary.status),
            summary.id,
            summary.topic
        );
    }
}
