use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::pipeline::SectionOutcome;

/// One planned section. `content` stays empty until its pipeline finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    /// Set when some stage produced recovered-error text instead of output.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

impl Section {
    pub fn completed(title: impl Into<String>, outcome: SectionOutcome) -> Self {
        Self {
            title: title.into(),
            content: Some(outcome.content),
            degraded: outcome.degraded,
        }
    }
}

/// A finished report. Sections keep the planner's order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub topic: String,
    pub sections: Vec<Section>,
}

impl Report {
    pub fn new(topic: impl Into<String>, sections: Vec<Section>) -> Self {
        Self {
            topic: topic.into(),
            sections,
        }
    }

    pub fn titles(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.title.as_str()).collect()
    }

    pub fn is_degraded(&self) -> bool {
        self.sections.iter().any(|s| s.degraded)
    }

    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}\n", self.topic);
        for section in &self.sections {
            let _ = write!(out, "\n## {}\n\n", section.title);
            if let Some(content) = &section.content {
                out.push_str(content.trim_end());
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> Report {
        Report::new(
            "Rust",
            vec![
                Section::completed(
                    "Intro",
                    SectionOutcome {
                        content: "Rust is fast.\n".into(),
                        degraded: false,
                    },
                ),
                Section {
                    title: "Outlook".into(),
                    content: None,
                    degraded: false,
                },
            ],
        )
    }

    #[test]
    fn markdown_lists_sections_in_order() {
        assert_eq!(
            report().to_markdown(),
            "# Rust\n\n## Intro\n\nRust is fast.\n\n## Outlook\n\n"
        );
    }

    #[test]
    fn degraded_flag_is_omitted_when_false() {
        let json = serde_json::to_string(&report()).unwrap();
        assert!(!json.contains("degraded"));
        assert!(json.contains(r#""content":null"#));
    }

    #[test]
    fn degraded_section_marks_report() {
        let mut report = report();
        assert!(!report.is_degraded());
        report.sections[1].degraded = true;
        assert!(report.is_degraded());
    }
}
