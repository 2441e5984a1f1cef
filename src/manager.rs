use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::error::{Result, ScriptoriumError};
use crate::orchestrator::ReportGenerator;
use crate::report::Report;
use crate::state_machine::{Job, JobEvent, JobSummary};
use crate::store::JobStore;

/// Owns the asynchronous job lifecycle: accepts topics, runs the report
/// generator detached from the caller and records every status change.
///
/// Jobs run to completion or failure; there is no cancellation.
pub struct JobManager {
    store: Arc<dyn JobStore>,
    generator: Arc<dyn ReportGenerator>,
    job_timeout: Option<Duration>,
}

impl JobManager {
    pub fn new(store: Arc<dyn JobStore>, generator: Arc<dyn ReportGenerator>) -> Self {
        Self {
            store,
            generator,
            job_timeout: None,
        }
    }

    /// Fail any run that takes longer than `timeout`.
    pub fn with_job_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Queue a report for `topic` and return its id without waiting for it.
    pub async fn submit(&self, topic: &str, owner: &str) -> Result<String> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ScriptoriumError::InvalidTopic);
        }

        let job = Job::new(topic, owner);
        let job_id = job.id.clone();
        self.store.insert(job).await?;
        info!(job_id = %job_id, owner, "Job queued");

        tokio::spawn(run_job(
            Arc::clone(&self.store),
            Arc::clone(&self.generator),
            job_id.clone(),
            topic.to_string(),
            self.job_timeout,
        ));

        Ok(job_id)
    }

    pub async fn get(&self, job_id: &str, requester: &str) -> Result<Job> {
        let job = self
            .store
            .get(job_id)
            .await?
            .ok_or_else(|| ScriptoriumError::NotFound(job_id.to_string()))?;
        if job.owner != requester {
            return Err(ScriptoriumError::Forbidden {
                job_id: job_id.to_string(),
            });
        }
        Ok(job)
    }

    /// Jobs owned by `requester`, newest first.
    pub async fn list(&self, requester: &str) -> Result<Vec<JobSummary>> {
        let jobs = self.store.list_by_owner(requester).await?;
        Ok(jobs.iter().map(Job::summary).collect())
    }

    /// Poll until the job reaches a terminal status.
    pub async fn wait(&self, job_id: &str, requester: &str, poll_interval: Duration) -> Result<Job> {
        loop {
            let job = self.get(job_id, requester).await?;
            if job.is_terminal() {
                return Ok(job);
            }
            sleep(poll_interval).await;
        }
    }
}

const RECORD_ATTEMPTS: u32 = 3;
const RECORD_BACKOFF: Duration = Duration::from_millis(50);

/// The detached unit of work behind one job.
async fn run_job(
    store: Arc<dyn JobStore>,
    generator: Arc<dyn ReportGenerator>,
    job_id: String,
    topic: String,
    timeout: Option<Duration>,
) {
    if let Err(e) = store.transition(&job_id, JobEvent::Start).await {
        error!(job_id = %job_id, error = %e, "Could not mark job as processing");
        mark_failed(store.as_ref(), &job_id, format!("failed to start job: {e}")).await;
        return;
    }
    info!(job_id = %job_id, "Job processing");

    let (event, failure) = match execute(generator, topic, timeout).await {
        Ok(report) => {
            info!(
                job_id = %job_id,
                sections = report.sections.len(),
                degraded = report.is_degraded(),
                "Job completed"
            );
            (JobEvent::Complete(report), None)
        }
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "Job failed");
            let message = e.to_string();
            (JobEvent::Fail(message.clone()), Some(message))
        }
    };

    if let Err(e) = store.transition(&job_id, event).await {
        error!(job_id = %job_id, error = %e, "Could not record job outcome");
        let reason = failure.unwrap_or_else(|| format!("failed to record result: {e}"));
        mark_failed(store.as_ref(), &job_id, reason).await;
    }
}

/// Drive a job to `failed` after the store rejected one of its writes.
async fn mark_failed(store: &dyn JobStore, job_id: &str, reason: String) {
    for attempt in 1..=RECORD_ATTEMPTS {
        match store.transition(job_id, JobEvent::Fail(reason.clone())).await {
            Ok(_) => return,
            Err(e @ ScriptoriumError::InvalidTransition { .. }) => {
                error!(job_id, error = %e, "Job already left the running state");
                return;
            }
            Err(e) => {
                warn!(job_id, attempt, error = %e, "Could not record job failure");
                if attempt < RECORD_ATTEMPTS {
                    sleep(RECORD_BACKOFF * attempt).await;
                }
            }
        }
    }
    error!(job_id, "Store kept rejecting writes, job left unfinished");
}

/// Run the generator in its own task so a panic or deadline becomes an error
/// instead of leaving the job in `processing`.
async fn execute(
    generator: Arc<dyn ReportGenerator>,
    topic: String,
    timeout: Option<Duration>,
) -> Result<Report> {
    let mut handle = tokio::spawn(async move { generator.generate(&topic).await });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                return Err(ScriptoriumError::Timeout(limit));
            }
        },
        None => handle.await,
    };

    joined.map_err(|e| ScriptoriumError::JobPanicked(e.to_string()))?
}
