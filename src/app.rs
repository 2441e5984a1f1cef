//! Wiring from configuration to a ready [`JobManager`].

use std::sync::Arc;

use crate::agent::AgentFactory;
use crate::config::ScriptoriumConfig;
use crate::error::{Result, ScriptoriumError};
use crate::llm::{AnthropicClient, Generator, ScriptedGenerator};
use crate::manager::JobManager;
use crate::orchestrator::ReportOrchestrator;
use crate::search::{DuckDuckGoClient, Lookup, SearchHit, StaticLookup};
use crate::store::{JobStore, JsonFileJobStore, MemoryJobStore};

/// The two external capabilities a report run consumes.
#[derive(Clone)]
pub struct Capabilities {
    pub generator: Arc<dyn Generator>,
    pub lookup: Arc<dyn Lookup>,
}

impl Capabilities {
    /// Anthropic for generation, DuckDuckGo for lookup.
    pub fn live(config: &ScriptoriumConfig) -> Result<Self> {
        let generator = AnthropicClient::with_base_url(config.api_key.clone(), config.base_url.clone())?
            .with_max_tokens(config.max_tokens)
            .with_retry(config.retry_config());
        let lookup = DuckDuckGoClient::new()
            .map_err(|e| ScriptoriumError::Config(format!("search client: {e}")))?;
        Ok(Self {
            generator: Arc::new(generator),
            lookup: Arc::new(lookup),
        })
    }

    /// Canned capabilities that need no network.
    pub fn offline() -> Self {
        Self {
            generator: Arc::new(ScriptedGenerator::demo()),
            lookup: Arc::new(StaticLookup::new(vec![
                SearchHit::new("Overview", "A short encyclopedia-style summary."),
                SearchHit::new("History", "Key dates and people."),
                SearchHit::new("Analysis", "Commentary from recent sources."),
            ])),
        }
    }
}

pub async fn open_store(config: &ScriptoriumConfig) -> Result<Arc<dyn JobStore>> {
    match &config.store_dir {
        Some(dir) => Ok(Arc::new(JsonFileJobStore::open(dir).await?)),
        None => Ok(Arc::new(MemoryJobStore::new())),
    }
}

pub fn build_orchestrator(config: &ScriptoriumConfig, capabilities: Capabilities) -> ReportOrchestrator {
    let factory = AgentFactory::new(
        capabilities.generator,
        capabilities.lookup,
        config.agent_settings(),
    );
    ReportOrchestrator::new(factory).with_mode(config.section_mode, config.max_parallel_sections)
}

pub async fn build_manager(config: &ScriptoriumConfig, capabilities: Capabilities) -> Result<JobManager> {
    let store = open_store(config).await?;
    let orchestrator = build_orchestrator(config, capabilities);
    Ok(JobManager::new(store, Arc::new(orchestrator)).with_job_timeout(config.job_timeout()))
}
