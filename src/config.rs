//! Configuration loaded from `scriptorium.toml`.
//!
//! [`ScriptoriumConfig`] holds every tunable. Keys missing from the file fall
//! back to defaults. `ANTHROPIC_API_KEY` and `SCRIPTORIUM_STORE_DIR` take
//! precedence over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::agent::AgentSettings;
use crate::llm::{RetryConfig, client::API_URL};
use crate::orchestrator::SectionMode;

pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";
pub const DEFAULT_CONFIG_FILE: &str = "scriptorium.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptoriumConfig {
    /// Anthropic API key.
    #[serde(default)]
    pub api_key: String,

    /// Model identifier used by every agent.
    #[serde(default = "default_model")]
    pub model: String,

    /// Generation cap per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Messages endpoint; override for proxies.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Search hits handed to the Researcher.
    #[serde(default = "default_search_max_results")]
    pub search_max_results: usize,

    /// Exchanges each agent keeps in its history, 0 for unbounded.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default)]
    pub section_mode: SectionMode,

    #[serde(default = "default_max_parallel_sections")]
    pub max_parallel_sections: usize,

    /// Whole-job deadline in seconds, 0 for none.
    #[serde(default)]
    pub job_timeout_secs: u64,

    /// Retries for transient generation failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Directory for JSON job files; jobs stay in memory when unset.
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_base_url() -> String {
    API_URL.to_string()
}

fn default_search_max_results() -> usize {
    3
}

fn default_history_limit() -> usize {
    12
}

fn default_max_parallel_sections() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

impl Default for ScriptoriumConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            base_url: default_base_url(),
            search_max_results: default_search_max_results(),
            history_limit: default_history_limit(),
            section_mode: SectionMode::default(),
            max_parallel_sections: default_max_parallel_sections(),
            job_timeout_secs: 0,
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            store_dir: None,
        }
    }
}

impl ScriptoriumConfig {
    /// Load from `path`, or from `scriptorium.toml` in the current directory.
    /// A missing default file means defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            if !key.is_empty() {
                config.api_key = key;
            }
        }
        if let Ok(dir) = std::env::var("SCRIPTORIUM_STORE_DIR") {
            if !dir.is_empty() {
                config.store_dir = Some(PathBuf::from(dir));
            }
        }

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("invalid config in {}", path.display()))
    }

    pub fn agent_settings(&self) -> AgentSettings {
        AgentSettings {
            model: self.model.clone(),
            history_limit: self.history_limit,
            search_max_results: self.search_max_results,
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_delay_ms: self.base_delay_ms,
        }
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }
}
