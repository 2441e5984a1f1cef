use tracing::debug;

use crate::agent::{AgentFactory, Researcher, Reviewer, Writer};

/// Polished content for one section, plus whether any stage degraded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionOutcome {
    pub content: String,
    pub degraded: bool,
}

/// The fixed research → draft → polish sequence for one section.
///
/// A pipeline keeps its three agents between calls, so running several
/// sections through the same pipeline accumulates context in each role.
pub struct SectionPipeline {
    researcher: Researcher,
    writer: Writer,
    reviewer: Reviewer,
}

impl SectionPipeline {
    pub fn new(factory: &AgentFactory) -> Self {
        Self {
            researcher: factory.researcher(),
            writer: factory.writer(),
            reviewer: factory.reviewer(),
        }
    }

    pub async fn run_section(&mut self, topic: &str, section_title: &str) -> SectionOutcome {
        let notes = self
            .researcher
            .research(&format!("{topic}: {section_title}"))
            .await;
        let draft = self.writer.draft(section_title, notes.text()).await;
        let polished = self.reviewer.polish(draft.text()).await;

        let degraded = notes.is_degraded() || draft.is_degraded() || polished.is_degraded();
        debug!(section = section_title, degraded, "Section finished");

        SectionOutcome {
            content: polished.into_text(),
            degraded,
        }
    }

    pub fn researcher(&self) -> &Researcher {
        &self.researcher
    }

    pub fn writer(&self) -> &Writer {
        &self.writer
    }

    pub fn reviewer(&self) -> &Reviewer {
        &self.reviewer
    }
}
