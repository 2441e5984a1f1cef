use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{Lookup, LookupError, SearchHit};

const API_URL: &str = "https://api.duckduckgo.com/";

/// Lookup backed by the DuckDuckGo Instant Answer API.
pub struct DuckDuckGoClient {
    client: Client,
    base_url: String,
}

/// Subset of the Instant Answer payload we read.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

/// Related topics are either entries or named groups of entries.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Entry {
        #[serde(rename = "Text")]
        text: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
}

impl DuckDuckGoClient {
    pub fn new() -> Result<Self, LookupError> {
        Self::with_base_url(API_URL.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(base_url: String) -> Result<Self, LookupError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl Lookup for DuckDuckGoClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, LookupError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::RequestFailed(format!("status {}", status.as_u16())));
        }

        let body = response.text().await?;
        let answer: InstantAnswer =
            serde_json::from_str(&body).map_err(|e| LookupError::Parse(e.to_string()))?;
        let hits = flatten_hits(answer, max_results);
        debug!(query, hits = hits.len(), "Search finished");
        Ok(hits)
    }
}

/// Abstract first, then related topics depth-first, capped at `max_results`.
fn flatten_hits(answer: InstantAnswer, max_results: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    if !answer.abstract_text.trim().is_empty() {
        hits.push(SearchHit::new(answer.heading.clone(), answer.abstract_text.trim()));
    }

    let mut stack: Vec<RelatedTopic> = answer.related_topics.into_iter().rev().collect();
    while let Some(topic) = stack.pop() {
        if hits.len() >= max_results {
            break;
        }
        match topic {
            RelatedTopic::Entry { text } => {
                if let Some(hit) = split_entry(&text, &answer.heading) {
                    hits.push(hit);
                }
            }
            RelatedTopic::Group { topics } => stack.extend(topics.into_iter().rev()),
        }
    }

    hits.truncate(max_results);
    hits
}

// Entries read "Title - snippet" when DuckDuckGo has both.
fn split_entry(text: &str, heading: &str) -> Option<SearchHit> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match text.split_once(" - ") {
        Some((title, snippet)) => Some(SearchHit::new(title.trim(), snippet.trim())),
        None => Some(SearchHit::new(heading, text)),
    }
}
