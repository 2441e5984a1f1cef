use chrono::Utc;

use super::job::{Job, JobStatus};
use crate::error::{Result, ScriptoriumError};
use crate::report::Report;

/// Something that happened to a job's background run.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// The background unit picked the job up.
    Start,
    /// The orchestrator returned a report.
    Complete(Report),
    /// The run failed; carries the human-readable error.
    Fail(String),
}

impl JobEvent {
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::Start => "start",
            JobEvent::Complete(_) => "complete",
            JobEvent::Fail(_) => "fail",
        }
    }
}

/// Drives a [`Job`] through `queued → processing → completed | failed`.
pub struct StateMachine;

impl StateMachine {
    /// The status `event` leads to from `status`, if that move is allowed.
    ///
    /// Only forward moves exist; terminal statuses accept nothing. A queued
    /// job may fail directly when its run could not be started.
    pub fn next(status: JobStatus, event: &JobEvent) -> Option<JobStatus> {
        match (status, event) {
            (JobStatus::Queued, JobEvent::Start) => Some(JobStatus::Processing),
            (JobStatus::Queued, JobEvent::Fail(_)) => Some(JobStatus::Failed),
            (JobStatus::Processing, JobEvent::Complete(_)) => Some(JobStatus::Completed),
            (JobStatus::Processing, JobEvent::Fail(_)) => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Apply `event` to `job`, recording history, payload and timestamp.
    pub fn apply(job: &mut Job, event: JobEvent) -> Result<JobStatus> {
        let next = Self::next(job.status, &event).ok_or_else(|| {
            ScriptoriumError::InvalidTransition {
                job_id: job.id.clone(),
                from: job.status,
                event: event.name(),
            }
        })?;

        match event {
            JobEvent::Start => {}
            JobEvent::Complete(report) => job.result = Some(report),
            JobEvent::Fail(error) => job.error = Some(error),
        }

        job.status_history.push(job.status);
        job.status = next;
        job.updated_at = Utc::now();
        Ok(next)
    }
}
