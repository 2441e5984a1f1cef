use std::sync::Arc;

use tracing::{info, warn};

use super::{Agent, Reply};
use crate::search::{Lookup, SearchHit};

pub const PLANNER_PERSONA: &str = "You are a research planner. Given a topic, break it down into 3-5 distinct sub-topics or sections for a report. Return ONLY the list of sections, one per line, without bullets or numbering.";

pub const RESEARCHER_PERSONA: &str = "You are a researcher. You will be given a topic and search results. Summarize the information relevant to the topic. Be concise and factual.";

pub const WRITER_PERSONA: &str = "You are a technical writer. Write a comprehensive section for a report based on the provided research notes. The style should be professional and informative.";

pub const REVIEWER_PERSONA: &str = "You are an editor. Review the provided draft for clarity, flow, and consistent tone. Provide a polished version of the text. Return ONLY the polished text.";

/// Split a planner reply into section titles: one per non-empty trimmed line,
/// order and duplicates preserved.
pub fn parse_sections(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct Planner {
    agent: Agent,
}

impl Planner {
    pub fn new(agent: Agent) -> Self {
        Self { agent }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Ask for an outline of `topic`. Any count is accepted, including zero.
    ///
    /// A degraded reply yields no sections rather than a section titled with
    /// the error text.
    pub async fn plan(&mut self, topic: &str) -> Vec<String> {
        match self.agent.extend(topic).await {
            Reply::Generated(text) => parse_sections(&text),
            Reply::Degraded { cause, .. } => {
                warn!(topic, error = %cause, "Planner failed, report will have no sections");
                Vec::new()
            }
        }
    }
}

pub struct Researcher {
    agent: Agent,
    lookup: Arc<dyn Lookup>,
    max_results: usize,
}

impl Researcher {
    pub fn new(agent: Agent, lookup: Arc<dyn Lookup>, max_results: usize) -> Self {
        Self {
            agent,
            lookup,
            max_results,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Look `query` up and have the agent summarize the hits.
    ///
    /// A lookup failure is folded into the prompt so the agent falls back to
    /// its own knowledge; this never fails.
    pub async fn research(&mut self, query: &str) -> Reply {
        info!(query, "Searching");
        let prompt = match self.lookup.search(query, self.max_results).await {
            Ok(hits) => research_prompt(query, &hits),
            Err(e) => {
                warn!(query, error = %e, "Search failed, using internal knowledge");
                format!(
                    "Topic: {query}\n\nSearch failed: {e}. Rely on your internal knowledge and summarize what you know."
                )
            }
        };
        self.agent.extend(&prompt).await
    }
}

fn research_prompt(query: &str, hits: &[SearchHit]) -> String {
    let context = if hits.is_empty() {
        "- No search results were returned.".to_string()
    } else {
        hits.iter()
            .map(|h| format!("- {}: {}", h.title, h.snippet))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!("Topic: {query}\n\nSearch Results:\n{context}\n\nSummarize these findings.")
}

pub struct Writer {
    agent: Agent,
}

impl Writer {
    pub fn new(agent: Agent) -> Self {
        Self { agent }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub async fn draft(&mut self, section: &str, notes: &str) -> Reply {
        self.agent
            .extend(&format!("Section: {section}\nNotes: {notes}"))
            .await
    }
}

pub struct Reviewer {
    agent: Agent,
}

impl Reviewer {
    pub fn new(agent: Agent) -> Self {
        Self { agent }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub async fn polish(&mut self, draft: &str) -> Reply {
        self.agent.extend(&format!("Draft:\n{draft}")).await
    }
}
