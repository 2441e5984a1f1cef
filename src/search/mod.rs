//! Lookup capability used by the Researcher.
//!
//! [`Lookup`] returns up to N ranked `{title, snippet}` hits for a query.
//! [`DuckDuckGoClient`] is the network implementation; [`StaticLookup`] serves
//! a fixed result list for offline runs.

pub mod duckduckgo;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use duckduckgo::DuckDuckGoClient;

/// Errors raised by a lookup backend.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("search request failed: {0}")]
    RequestFailed(String),

    #[error("search transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to parse search results: {0}")]
    Parse(String),
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
        }
    }
}

#[async_trait]
pub trait Lookup: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, LookupError>;
}

/// Serves the same hits for every query.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    hits: Vec<SearchHit>,
}

impl StaticLookup {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self { hits }
    }
}

#[async_trait]
impl Lookup for StaticLookup {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchHit>, LookupError> {
        Ok(self.hits.iter().take(max_results).cloned().collect())
    }
}
