//! Final brief assembly.
//!
//! Turns ranked, synthesized clusters into the structured `Brief` and its
//! markdown rendering. Rendering is a pure function of its inputs; the
//! timestamp comes from the caller.

pub mod markdown;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::BriefConfig;
use crate::pipeline::types::ProjectCluster;
use crate::synthesis::{Engine, LlmUsage, SynthesisOutcome};

/// Run-level facts reported alongside the clusters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefMetadata {
    /// Correlates the brief with its log lines.
    pub run_id: Uuid,
    /// Valid messages processed.
    pub total_emails: usize,
    pub total_clusters: usize,
    pub generated_at: DateTime<Utc>,
    pub engine: Engine,
    /// Messages rejected by input validation.
    pub dropped_messages: usize,
    pub llm_usage: LlmUsage,
}

/// The assembled executive brief.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brief {
    /// Ranked, most urgent first. Recurring clusters included.
    pub clusters: Vec<ProjectCluster>,
    pub executive_summary: String,
    pub markdown: String,
    pub metadata: BriefMetadata,
    /// Set when the batch held no valid messages.
    pub no_data: bool,
}

impl Brief {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Non-recurring clusters in rank order.
    pub fn active_clusters(&self) -> impl Iterator<Item = &ProjectCluster> {
        self.clusters.iter().filter(|c| !c.recurring)
    }
}

/// Input counts the assembler cannot derive from clusters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStats {
    pub run_id: Uuid,
    pub total_emails: usize,
    pub dropped_messages: usize,
}

#[derive(Debug, Clone)]
pub struct BriefAssembler {
    max_projects: usize,
    urgency_threshold: f64,
}

impl BriefAssembler {
    pub fn new(config: &BriefConfig) -> Self {
        Self {
            max_projects: config.max_projects,
            urgency_threshold: config.urgency_threshold,
        }
    }

    pub fn assemble(
        &self,
        clusters: Vec<ProjectCluster>,
        outcome: SynthesisOutcome,
        stats: RunStats,
        generated_at: DateTime<Utc>,
    ) -> Brief {
        let markdown = markdown::render(&markdown::MarkdownInput {
            clusters: &clusters,
            executive_summary: &outcome.executive_summary,
            total_emails: stats.total_emails,
            generated_at,
            max_projects: self.max_projects,
            urgency_threshold: self.urgency_threshold,
        });

        info!(
            emails = stats.total_emails,
            clusters = clusters.len(),
            dropped = stats.dropped_messages,
            bytes = markdown.len(),
            "Brief assembled"
        );

        Brief {
            metadata: BriefMetadata {
                run_id: stats.run_id,
                total_emails: stats.total_emails,
                total_clusters: clusters.len(),
                generated_at,
                engine: outcome.engine,
                dropped_messages: stats.dropped_messages,
                llm_usage: outcome.usage,
            },
            clusters,
            executive_summary: outcome.executive_summary,
            markdown,
            no_data: false,
        }
    }

    /// Brief for a batch with no valid messages.
    pub fn no_data(&self, stats: RunStats, generated_at: DateTime<Utc>) -> Brief {
        info!(dropped = stats.dropped_messages, "No valid messages, emitting empty brief");
        Brief {
            clusters: Vec::new(),
            executive_summary: "No messages to process.".to_string(),
            markdown: markdown::render_no_data(generated_at, stats.dropped_messages),
            metadata: BriefMetadata {
                run_id: stats.run_id,
                total_emails: 0,
                total_clusters: 0,
                generated_at,
                engine: Engine::RuleBased,
                dropped_messages: stats.dropped_messages,
                llm_usage: LlmUsage::default(),
            },
            no_data: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{ProcessedMessage, StatusCounts, StatusFlags, SynthesisSource};
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 5, 8, 0, 0).unwrap()
    }

    fn msg(key: &str, subject: &str) -> ProcessedMessage {
        ProcessedMessage {
            id: subject.into(),
            subject: subject.into(),
            clean_text: String::new(),
            project_key: key.into(),
            financial_values: vec![],
            status_flags: StatusFlags::default(),
            entities: vec![],
            sender_name: "Ann Lee".into(),
            sender_email: "ann@x.com".into(),
            timestamp: None,
        }
    }

    fn active(key: &str, score: f64, money: Option<f64>) -> ProjectCluster {
        let mut c = ProjectCluster::new(key);
        for i in 0..4 {
            c.items.push(msg(key, &format!("{key} subject {i}")));
        }
        c.people.insert("Ann Lee".into());
        c.status_counts = StatusCounts {
            blocker: 1,
            decision: 1,
            achievement: 0,
        };
        c.urgency_score = score;
        if let Some(total) = money {
            c.financial_values = vec![total];
            c.financial_total = total;
            c.has_financial_mentions = true;
        }
        c.contextual_summary = format!("{key} summary.");
        c.action_items = vec![format!("Decision: provide guidance on {key}")];
        c.blockers = vec![format!("{key} subject 0")];
        c.synthesis_source = SynthesisSource::RuleBased;
        c
    }

    fn newsletter() -> ProjectCluster {
        let mut c = ProjectCluster::new("Newsletter - March");
        c.items.push(msg("Newsletter - March", "Newsletter - March edition"));
        c.recurring = true;
        c.contextual_summary = "Recurring informational content: 1 item.".into();
        c.synthesis_source = SynthesisSource::Informational;
        c
    }

    fn outcome() -> SynthesisOutcome {
        SynthesisOutcome {
            executive_summary: "Focus on Allied first.".into(),
            engine: Engine::RuleBased,
            usage: LlmUsage::default(),
            cancelled: false,
        }
    }

    fn assemble(clusters: Vec<ProjectCluster>, config: &BriefConfig) -> Brief {
        BriefAssembler::new(config).assemble(
            clusters,
            outcome(),
            RunStats {
                run_id: Uuid::nil(),
                total_emails: 9,
                dropped_messages: 1,
            },
            at(),
        )
    }

    #[test]
    fn markdown_has_all_sections() {
        let brief = assemble(
            vec![active("Allied - Ledet", 6.5, Some(40000.0)), newsletter()],
            &BriefConfig::default(),
        );
        let md = &brief.markdown;
        assert!(md.starts_with("# Executive Brief\n\n_Generated 2026-03-05 08:00 UTC_"));
        assert!(md.contains("## Executive Summary"));
        assert!(md.contains("- **Active projects:** 1"));
        assert!(md.contains("- **Needs attention:** 1 (urgency ≥ 5.0)"));
        assert!(md.contains("$40,000 across 1 project(s)"));
        assert!(md.contains("Focus on Allied first."));
        assert!(md.contains("## Project Deep Dive"));
        assert!(md.contains("### 1. Allied - Ledet"));
        assert!(md.contains("- **Status:** Blocked, Decision pending"));
        assert!(md.contains("- **Urgency:** High (6.5)"));
        assert!(md.contains("- **Financial impact:** $40,000"));
        assert!(md.contains("- Decision: provide guidance on Allied - Ledet"));
        assert!(md.contains("## Recurring Content"));
        assert!(md.contains("**Newsletter - March**"));
        assert!(md.trim_end().ends_with("_Processed 9 emails → 1 projects_"));
    }

    #[test]
    fn related_subjects_capped_at_three() {
        let brief = assemble(vec![active("A - b", 1.0, None)], &BriefConfig::default());
        assert!(brief.markdown.contains("- A - b subject 2"));
        assert!(!brief.markdown.contains("- A - b subject 3"));
    }

    #[test]
    fn financial_line_only_when_flagged() {
        let brief = assemble(vec![active("A - b", 5.0, None)], &BriefConfig::default());
        assert!(!brief.markdown.contains("**Financial impact:**"));
        assert!(brief.markdown.contains("- **Financial exposure:** none reported"));
        assert!(!brief.markdown.contains('$'));
    }

    #[test]
    fn deep_dive_respects_max_projects() {
        let config = BriefConfig {
            max_projects: 1,
            ..BriefConfig::default()
        };
        let brief = assemble(
            vec![active("A - b", 6.0, None), active("C - d", 2.0, None)],
            &config,
        );
        assert!(brief.markdown.contains("### 1. A - b"));
        assert!(!brief.markdown.contains("### 2. C - d"));
        assert!(brief.markdown.contains("_1 more project(s) not shown._"));
        assert_eq!(brief.clusters.len(), 2);
    }

    #[test]
    fn recurring_section_omitted_when_empty() {
        let brief = assemble(vec![active("A - b", 1.0, None)], &BriefConfig::default());
        assert!(!brief.markdown.contains("## Recurring Content"));
    }

    #[test]
    fn metadata_reports_counts() {
        let brief = assemble(
            vec![active("A - b", 1.0, None), newsletter()],
            &BriefConfig::default(),
        );
        assert_eq!(brief.metadata.total_emails, 9);
        assert_eq!(brief.metadata.total_clusters, 2);
        assert_eq!(brief.metadata.dropped_messages, 1);
        assert_eq!(brief.active_clusters().count(), 1);
        assert!(!brief.no_data);
    }

    #[test]
    fn rendering_is_deterministic() {
        let make = || {
            assemble(
                vec![active("A - b", 6.0, Some(10.0)), newsletter()],
                &BriefConfig::default(),
            )
        };
        assert_eq!(make().markdown, make().markdown);
    }

    #[test]
    fn no_data_brief() {
        let stats = RunStats {
            dropped_messages: 2,
            ..RunStats::default()
        };
        let brief = BriefAssembler::new(&BriefConfig::default()).no_data(stats, at());
        assert!(brief.no_data);
        assert!(brief.clusters.is_empty());
        assert!(brief.markdown.contains("No messages to process. 2 invalid message(s) were skipped."));
        assert!(brief.markdown.contains("_Processed 0 emails → 0 projects_"));
        assert_eq!(brief.metadata.dropped_messages, 2);
    }

    #[test]
    fn serializes_engine_label() {
        let brief = assemble(vec![active("A - b", 1.0, None)], &BriefConfig::default());
        let json = brief.to_json().unwrap();
        assert!(json.contains("\"engine\": \"rule-based\""));
        assert!(json.contains("\"no_data\": false"));
    }
}
