//! Scriptorium turns a topic into a multi-section report by running a
//! pipeline of role agents (planner, researcher, writer, reviewer) as a
//! background job that callers submit and then poll.

pub mod agent;
pub mod app;
pub mod config;
pub mod error;
pub mod llm;
pub mod manager;
pub mod orchestrator;
pub mod pipeline;
pub mod report;
pub mod search;
pub mod state_machine;
pub mod store;

pub use config::ScriptoriumConfig;
pub use error::{Result, ScriptoriumError};
pub use manager::JobManager;
pub use orchestrator::{ReportGenerator, ReportOrchestrator, SectionMode};
pub use report::{Report, Section};
pub use state_machine::{Job, JobStatus, JobSummary};
