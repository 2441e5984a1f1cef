//! Conversational agents.
//!
//! An [`Agent`] owns one persona and its linear conversation with the
//! generation capability. The role wrappers in [`roles`] give each step of a
//! report run its fixed persona, and [`AgentFactory`] builds them from shared
//! capabilities.
//!
//! ```text
//!  topic ──► Planner ──► section titles
//!                            │ (per section)
//!                            ▼
//!               Researcher ──► Writer ──► Reviewer ──► section content
//! ```

pub mod roles;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::{ConversationTurn, Generator};
use crate::search::Lookup;

pub use roles::{Planner, Researcher, Reviewer, Writer, parse_sections};

/// Outcome of one [`Agent::extend`] call.
///
/// Failures never escape an agent: they come back as `Degraded` text so the
/// pipeline keeps going, while callers that care can still tell them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Generated(String),
    Degraded { text: String, cause: String },
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Generated(text) | Reply::Degraded { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Reply::Generated(text) | Reply::Degraded { text, .. } => text,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Reply::Degraded { .. })
    }
}

/// A persona-bound conversational unit.
///
/// The first turn is always the persona; every later turn comes as a
/// user/assistant pair.
pub struct Agent {
    name: String,
    model: String,
    conversation: Vec<ConversationTurn>,
    history_limit: usize,
    generator: Arc<dyn Generator>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        persona: impl Into<String>,
        model: impl Into<String>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            conversation: vec![ConversationTurn::system(persona)],
            history_limit: 0,
            generator,
        }
    }

    /// Keep at most `limit` user/assistant exchanges (0 keeps everything).
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn persona(&self) -> &str {
        &self.conversation[0].text
    }

    pub fn conversation(&self) -> &[ConversationTurn] {
        &self.conversation
    }

    /// Number of completed user/assistant exchanges in the history.
    pub fn exchanges(&self) -> usize {
        (self.conversation.len() - 1) / 2
    }

    /// Send `input`, record the reply and return it.
    ///
    /// On a generation failure the user turn is rolled back and a
    /// [`Reply::Degraded`] carrying `"Error encountered by <name>: <error>"`
    /// is returned instead.
    pub async fn extend(&mut self, input: &str) -> Reply {
        self.conversation.push(ConversationTurn::user(input));

        match self.generator.generate(&self.model, &self.conversation).await {
            Ok(text) => {
                self.conversation.push(ConversationTurn::assistant(text.clone()));
                self.trim_history();
                debug!(agent = %self.name, exchanges = self.exchanges(), "Reply recorded");
                Reply::Generated(text)
            }
            Err(e) => {
                self.conversation.pop();
                warn!(agent = %self.name, error = %e, "Generation failed, degrading reply");
                Reply::Degraded {
                    text: format!("Error encountered by {}: {e}", self.name),
                    cause: e.to_string(),
                }
            }
        }
    }

    fn trim_history(&mut self) {
        if self.history_limit == 0 {
            return;
        }
        let excess = self.exchanges().saturating_sub(self.history_limit);
        if excess > 0 {
            self.conversation.drain(1..1 + 2 * excess);
        }
    }
}

/// Settings shared by every agent of a report run.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub history_limit: usize,
    pub search_max_results: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: crate::config::DEFAULT_MODEL.to_string(),
            history_limit: 12,
            search_max_results: 3,
        }
    }
}

/// Builds role agents over shared capabilities. Every call returns a fresh
/// agent with an empty history.
#[derive(Clone)]
pub struct AgentFactory {
    generator: Arc<dyn Generator>,
    lookup: Arc<dyn Lookup>,
    settings: AgentSettings,
}

impl AgentFactory {
    pub fn new(
        generator: Arc<dyn Generator>,
        lookup: Arc<dyn Lookup>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            generator,
            lookup,
            settings,
        }
    }

    fn agent(&self, name: &str, persona: &str) -> Agent {
        Agent::new(
            name,
            persona,
            self.settings.model.clone(),
            Arc::clone(&self.generator),
        )
        .with_history_limit(self.settings.history_limit)
    }

    pub fn planner(&self) -> Planner {
        Planner::new(self.agent("Planner", roles::PLANNER_PERSONA))
    }

    pub fn researcher(&self) -> Researcher {
        Researcher::new(
            self.agent("Researcher", roles::RESEARCHER_PERSONA),
            Arc::clone(&self.lookup),
            self.settings.search_max_results,
        )
    }

    pub fn writer(&self) -> Writer {
        Writer::new(self.agent("Writer", roles::WRITER_PERSONA))
    }

    pub fn reviewer(&self) -> Reviewer {
        Reviewer::new(self.agent("Reviewer", roles::REVIEWER_PERSONA))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GenerationError, Role, ScriptedGenerator};

    fn agent_with(generator: ScriptedGenerator) -> Agent {
        Agent::new("Writer", "You are a writer.", "m", Arc::new(generator))
    }

    #[tokio::test]
    async fn extend_appends_user_and_assistant_turns() {
        let mut agent = agent_with(ScriptedGenerator::new().reply("writer", "A draft."));

        let reply = agent.extend("Section: Intro").await;

        assert_eq!(reply, Reply::Generated("A draft.".into()));
        let roles: Vec<Role> = agent.conversation().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(agent.conversation()[1].text, "Section: Intro");
        assert_eq!(agent.exchanges(), 1);
    }

    #[tokio::test]
    async fn failed_generation_rolls_back_user_turn() {
        let mut agent = agent_with(ScriptedGenerator::new().route("writer", |_| {
            Err(GenerationError::ApiError {
                status: 500,
                message: "boom".into(),
            })
        }));

        let reply = agent.extend("Section: Intro").await;

        assert!(reply.is_degraded());
        assert_eq!(
            reply.text(),
            "Error encountered by Writer: API error (status 500): boom"
        );
        assert_eq!(agent.conversation().len(), 1);
        assert_eq!(agent.conversation()[0].role, Role::System);
    }

    #[tokio::test]
    async fn history_limit_drops_oldest_exchanges_but_keeps_persona() {
        let generator = ScriptedGenerator::new().route("writer", |input| Ok(format!("re: {input}")));
        let mut agent = agent_with(generator).with_history_limit(2);

        for i in 0..5 {
            agent.extend(&format!("turn {i}")).await;
        }

        let conversation = agent.conversation();
        assert_eq!(conversation.len(), 5);
        assert_eq!(conversation[0].text, "You are a writer.");
        assert_eq!(conversation[1].text, "turn 3");
        assert_eq!(conversation[4].text, "re: turn 4");
    }

    #[tokio::test]
    async fn factory_builds_independent_agents() {
        let factory = AgentFactory::new(
            Arc::new(ScriptedGenerator::demo()),
            Arc::new(crate::search::StaticLookup::default()),
            AgentSettings::default(),
        );

        let mut first = factory.writer();
        first.draft("Intro", "notes").await;
        let second = factory.writer();

        assert_eq!(first.agent().exchanges(), 1);
        assert_eq!(second.agent().exchanges(), 0);
        assert_eq!(second.agent().model(), crate::config::DEFAULT_MODEL);
    }
}
