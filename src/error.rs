use std::time::Duration;

use thiserror::Error;

use crate::llm::GenerationError;
use crate::state_machine::JobStatus;

#[derive(Debug, Error)]
pub enum ScriptoriumError {
    #[error("Topic must not be empty")]
    InvalidTopic,

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {job_id} belongs to another owner")]
    Forbidden { job_id: String },

    #[error("Job {job_id} cannot {event} while {from}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        event: &'static str,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Job store error: {0}")]
    Store(String),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Report run aborted: {0}")]
    JobPanicked(String),

    #[error("Report run exceeded its deadline of {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScriptoriumError>;
