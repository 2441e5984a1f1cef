//! Offline generation capability driven by canned responders.
//!
//! Each route is keyed by a marker that must appear in the conversation's
//! system turn, so one [`ScriptedGenerator`] can stand in for every role of a
//! report run. Used by the `demo` command and by tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::error::GenerationError;
use super::types::{ConversationTurn, Role};
use super::Generator;

type Responder = dyn Fn(&str) -> Result<String, GenerationError> + Send + Sync;

pub struct ScriptedGenerator {
    routes: Vec<(String, Box<Responder>)>,
    calls: AtomicUsize,
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer conversations whose persona contains `marker` with `responder`,
    /// which receives the latest user turn.
    pub fn route<F>(mut self, marker: impl Into<String>, responder: F) -> Self
    where
        F: Fn(&str) -> Result<String, GenerationError> + Send + Sync + 'static,
    {
        let responder: Box<Responder> = Box::new(responder);
        self.routes.push((marker.into(), responder));
        self
    }

    /// Always answer `marker` conversations with `text`.
    pub fn reply(self, marker: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        self.route(marker, move |_| Ok(text.clone()))
    }

    /// Number of generation calls served so far, failures included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Canned answers for every built-in persona.
    pub fn demo() -> Self {
        Self::new()
            .route("research planner", |topic| {
                Ok(format!(
                    "Origins of {topic}\nHow {topic} works today\nOpen problems\nOutlook"
                ))
            })
            .route("You are a researcher", |query| {
                let topic = query.lines().next().unwrap_or_default();
                Ok(format!("Key findings for {topic}: several sources agree on the basics."))
            })
            .route("technical writer", |input| {
                let section = input
                    .lines()
                    .next()
                    .and_then(|l| l.strip_prefix("Section: "))
                    .unwrap_or("this section");
                Ok(format!(
                    "{section} is covered here in a professional tone, drawing on the research notes."
                ))
            })
            .route("You are an editor", |input| {
                Ok(input.strip_prefix("Draft:\n").unwrap_or(input).trim().to_string())
            })
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        _model: &str,
        conversation: &[ConversationTurn],
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let persona = conversation
            .iter()
            .find(|t| t.role == Role::System)
            .map(|t| t.text.as_str())
            .unwrap_or_default();
        let input = conversation
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.text.as_str())
            .unwrap_or_default();

        match self.routes.iter().find(|(marker, _)| persona.contains(marker.as_str())) {
            Some((_, responder)) => responder(input),
            None => Err(GenerationError::ApiError {
                status: 404,
                message: "no scripted route for persona".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn routes_by_persona_marker() {
        let generator = ScriptedGenerator::new()
            .reply("planner", "A\nB")
            .route("editor", |input| Ok(format!("polished {input}")));

        let planner = vec![
            ConversationTurn::system("You are a planner."),
            ConversationTurn::user("topic"),
        ];
        let editor = vec![
            ConversationTurn::system("You are an editor."),
            ConversationTurn::user("draft"),
        ];

        assert_eq!(generator.generate("m", &planner).await.unwrap(), "A\nB");
        assert_eq!(generator.generate("m", &editor).await.unwrap(), "polished draft");
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn unknown_persona_is_an_error() {
        let generator = ScriptedGenerator::new();
        let conversation = vec![ConversationTurn::system("nobody"), ConversationTurn::user("x")];
        assert!(generator.generate("m", &conversation).await.is_err());
    }
}
