mod job;
mod state;

pub use job::{Job, JobStatus, JobSummary};
pub use state::{JobEvent, StateMachine};
