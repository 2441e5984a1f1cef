use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::AgentFactory;
use crate::error::Result;
use crate::pipeline::SectionPipeline;
use crate::report::{Report, Section};

/// How sections of one report share agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionMode {
    /// One agent per role for the whole report; sections run one after another
    /// and each role sees the earlier sections in its history.
    #[default]
    Sequential,
    /// Fresh agents per section; sections run concurrently.
    Parallel,
}

/// Turns a topic into a report: plan, then one section pipeline per title.
pub struct ReportOrchestrator {
    factory: AgentFactory,
    mode: SectionMode,
    max_parallel: usize,
}

impl ReportOrchestrator {
    pub fn new(factory: AgentFactory) -> Self {
        Self {
            factory,
            mode: SectionMode::Sequential,
            max_parallel: 4,
        }
    }

    pub fn with_mode(mut self, mode: SectionMode, max_parallel: usize) -> Self {
        self.mode = mode;
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn mode(&self) -> SectionMode {
        self.mode
    }

    /// Generate a full report for `topic`. Never fails: capability errors end
    /// up as degraded section text, and an empty plan gives an empty report.
    pub async fn generate_report(&self, topic: &str) -> Report {
        info!(topic, mode = ?self.mode, "Starting report");

        let titles = self.factory.planner().plan(topic).await;
        info!(sections = titles.len(), "Plan ready");

        let sections = match self.mode {
            SectionMode::Sequential => self.run_sequential(topic, titles).await,
            SectionMode::Parallel => self.run_parallel(topic, titles).await,
        };

        Report::new(topic, sections)
    }

    async fn run_sequential(&self, topic: &str, titles: Vec<String>) -> Vec<Section> {
        let mut pipeline = SectionPipeline::new(&self.factory);
        let mut sections = Vec::with_capacity(titles.len());
        for title in titles {
            info!(section = %title, "Processing section");
            let outcome = pipeline.run_section(topic, &title).await;
            sections.push(Section::completed(title, outcome));
        }
        sections
    }

    async fn run_parallel(&self, topic: &str, titles: Vec<String>) -> Vec<Section> {
        stream::iter(titles)
            .map(|title| {
                let mut pipeline = SectionPipeline::new(&self.factory);
                async move {
                    info!(section = %title, "Processing section");
                    let outcome = pipeline.run_section(topic, &title).await;
                    Section::completed(title, outcome)
                }
            })
            .buffered(self.max_parallel)
            .collect::<Vec<_>>()
            .await
    }
}

/// What the job manager runs in the background for each job.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(&self, topic: &str) -> Result<Report>;
}

#[async_trait]
impl ReportGenerator for ReportOrchestrator {
    async fn generate(&self, topic: &str) -> Result<Report> {
        Ok(self.generate_report(topic).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::agent::AgentSettings;
    use crate::llm::{GenerationError, ScriptedGenerator};
    use crate::search::{Lookup, LookupError, SearchHit, StaticLookup};

    struct FailingLookup;

    #[async_trait]
    impl Lookup for FailingLookup {
        async fn search(&self, _query: &str, _max: usize) -> std::result::Result<Vec<SearchHit>, LookupError> {
            Err(LookupError::RequestFailed("offline".into()))
        }
    }

    fn role_tagged(plan: &'static str) -> ScriptedGenerator {
        ScriptedGenerator::new()
            .reply("research planner", plan)
            .route("You are a researcher", |input| Ok(format!("Research data linked to {input}")))
            .route("technical writer", |input| Ok(format!("Draft content for {input}")))
            .route("You are an editor", |input| Ok(format!("Polished content for {input}")))
    }

    fn orchestrator(generator: ScriptedGenerator, lookup: Arc<dyn Lookup>) -> ReportOrchestrator {
        ReportOrchestrator::new(AgentFactory::new(
            Arc::new(generator),
            lookup,
            AgentSettings::default(),
        ))
    }

    #[tokio::test]
    async fn report_follows_plan_order() {
        let orch = orchestrator(
            role_tagged("Introduction\nMain Body\nConclusion"),
            Arc::new(StaticLookup::default()),
        );

        let report = orch.generate_report("Test Topic").await;

        assert_eq!(report.topic, "Test Topic");
        assert_eq!(report.titles(), vec!["Introduction", "Main Body", "Conclusion"]);
        for section in &report.sections {
            let content = section.content.as_deref().unwrap();
            assert!(content.starts_with("Polished content for Draft:\nDraft content for Section: "));
            assert!(!section.degraded);
        }
    }

    #[tokio::test]
    async fn duplicate_titles_are_kept() {
        let orch = orchestrator(role_tagged("Intro\n\n  Intro  \nEnd"), Arc::new(StaticLookup::default()));

        let report = orch.generate_report("Dupes").await;
        assert_eq!(report.titles(), vec!["Intro", "Intro", "End"]);
    }

    #[tokio::test]
    async fn empty_plan_gives_empty_report() {
        let orch = orchestrator(role_tagged("\n   \n"), Arc::new(StaticLookup::default()));

        let report = orch.generate_report("Nothing").await;
        assert_eq!(report.topic, "Nothing");
        assert!(report.sections.is_empty());
    }

    #[tokio::test]
    async fn lookup_failure_still_completes_sections() {
        let orch = orchestrator(role_tagged("Only"), Arc::new(FailingLookup));

        let report = orch.generate_report("Offline").await;

        assert_eq!(report.sections.len(), 1);
        let content = report.sections[0].content.as_deref().unwrap();
        assert!(content.contains("Search failed"));
        assert!(!report.sections[0].degraded);
    }

    #[tokio::test]
    async fn generation_failures_mark_sections_degraded() {
        let generator = ScriptedGenerator::new()
            .reply("research planner", "A\nB")
            .route("You are a researcher", |_| {
                Err(GenerationError::ApiError {
                    status: 500,
                    message: "down".into(),
                })
            })
            .route("technical writer", |input| Ok(input.to_string()))
            .route("You are an editor", |input| Ok(input.to_string()));
        let orch = orchestrator(generator, Arc::new(StaticLookup::default()));

        let report = orch.generate_report("Flaky").await;

        assert_eq!(report.sections.len(), 2);
        assert!(report.is_degraded());
        assert!(
            report.sections[0]
                .content
                .as_deref()
                .unwrap()
                .contains("Error encountered by Researcher")
        );
    }

    #[tokio::test]
    async fn parallel_mode_preserves_order_with_isolated_agents() {
        let orch = orchestrator(
            role_tagged("First\nSecond\nThird"),
            Arc::new(StaticLookup::default()),
        )
        .with_mode(SectionMode::Parallel, 3);

        let report = orch.generate_report("Order").await;

        assert_eq!(report.titles(), vec!["First", "Second", "Third"]);
        for section in &report.sections {
            let content = section.content.as_deref().unwrap();
            let own = format!("Order: {}", section.title);
            assert!(content.contains(&own));
        }
    }

    #[tokio::test]
    async fn report_generator_trait_wraps_orchestrator() {
        let orch = orchestrator(role_tagged("One\nTwo"), Arc::new(StaticLookup::default()));
        let generator: &dyn ReportGenerator = &orch;

        let report = generator.generate("Trait").await.unwrap();
        assert_eq!(report.sections.len(), 2);
    }

    #[test]
    fn section_mode_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: SectionMode,
        }
        let w: Wrapper = toml::from_str(r#"mode = "parallel""#).unwrap();
        assert_eq!(w.mode, SectionMode::Parallel);
        assert_eq!(SectionMode::default(), SectionMode::Sequential);
    }
}
