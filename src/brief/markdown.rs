//! Markdown rendering for the executive brief.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::pipeline::financial::format_currency;
use crate::pipeline::ranking::UrgencyLevel;
use crate::pipeline::status::Signal;
use crate::pipeline::types::ProjectCluster;

/// Related subjects listed per project.
const MAX_RELATED_SUBJECTS: usize = 3;

/// Everything the renderer reads.
pub struct MarkdownInput<'a> {
    pub clusters: &'a [ProjectCluster],
    pub executive_summary: &'a str,
    pub total_emails: usize,
    pub generated_at: DateTime<Utc>,
    pub max_projects: usize,
    pub urgency_threshold: f64,
}

pub fn render(input: &MarkdownInput<'_>) -> String {
    let active: Vec<&ProjectCluster> = input.clusters.iter().filter(|c| !c.recurring).collect();
    let recurring: Vec<&ProjectCluster> = input.clusters.iter().filter(|c| c.recurring).collect();

    let mut out = String::with_capacity(4096);
    header(&mut out, input.generated_at);
    executive_section(&mut out, &active, input);
    deep_dive_section(&mut out, &active, input.max_projects);
    if !recurring.is_empty() {
        recurring_section(&mut out, &recurring);
    }
    footer(&mut out, input.total_emails, active.len());
    out
}

/// Markdown for a batch with nothing to report.
pub fn render_no_data(generated_at: DateTime<Utc>, dropped: usize) -> String {
    let mut out = String::new();
    header(&mut out, generated_at);
    out.push_str("## Executive Summary\n\n");
    out.push_str("No messages to process.");
    if dropped > 0 {
        let _ = write!(out, " {dropped} invalid message(s) were skipped.");
    }
    out.push_str("\n\n");
    footer(&mut out, 0, 0);
    out
}

fn header(out: &mut String, generated_at: DateTime<Utc>) {
    let _ = writeln!(out, "# Executive Brief\n");
    let _ = writeln!(out, "_Generated {}_\n", generated_at.format("%Y-%m-%d %H:%M UTC"));
}

fn footer(out: &mut String, emails: usize, projects: usize) {
    let _ = writeln!(out, "---\n");
    let _ = writeln!(out, "_Processed {emails} emails → {projects} projects_");
}

fn executive_section(out: &mut String, active: &[&ProjectCluster], input: &MarkdownInput<'_>) {
    let urgent = active
        .iter()
        .filter(|c| c.urgency_score >= input.urgency_threshold)
        .count();
    let flagged: Vec<&&ProjectCluster> = active.iter().filter(|c| c.has_financial_mentions).collect();

    out.push_str("## Executive Summary\n\n");
    let _ = writeln!(out, "- **Active projects:** {}", active.len());
    let _ = writeln!(
        out,
        "- **Needs attention:** {urgent} (urgency ≥ {:.1})",
        input.urgency_threshold
    );
    if flagged.is_empty() {
        out.push_str("- **Financial exposure:** none reported\n");
    } else {
        let exposure: f64 = flagged.iter().map(|c| c.financial_total).sum();
        let _ = writeln!(
            out,
            "- **Financial exposure:** {} across {} project(s)",
            format_currency(exposure),
            flagged.len()
        );
    }
    let _ = writeln!(out, "\n{}\n", input.executive_summary);
}

fn status_line(cluster: &ProjectCluster) -> String {
    let labels: Vec<&str> = Signal::MESSAGE_SIGNALS
        .iter()
        .filter(|&&s| cluster.status_counts.count(s) > 0)
        .map(|s| s.label())
        .collect();
    if labels.is_empty() {
        "Active".to_string()
    } else {
        labels.join(", ")
    }
}

fn bullet_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "**{title}:**\n");
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
    out.push('\n');
}

fn deep_dive_section(out: &mut String, active: &[&ProjectCluster], max_projects: usize) {
    out.push_str("## Project Deep Dive\n\n");
    if active.is_empty() {
        out.push_str("_No active projects._\n\n");
        return;
    }

    for (rank, cluster) in active.iter().take(max_projects).enumerate() {
        let _ = writeln!(out, "### {}. {}\n", rank + 1, cluster.project_key);
        let _ = writeln!(out, "- **Status:** {}", status_line(cluster));
        let _ = writeln!(
            out,
            "- **Urgency:** {} ({:.1})",
            UrgencyLevel::from_score(cluster.urgency_score).label(),
            cluster.urgency_score
        );
        let _ = writeln!(out, "- **Messages:** {}", cluster.item_count());
        if !cluster.people.is_empty() {
            let people: Vec<&str> = cluster.people.iter().map(String::as_str).collect();
            let _ = writeln!(out, "- **Contributors:** {}", people.join(", "));
        }
        if cluster.has_financial_mentions {
            let _ = writeln!(
                out,
                "- **Financial impact:** {}",
                format_currency(cluster.financial_total)
            );
        }
        let _ = writeln!(out, "\n{}\n", cluster.contextual_summary);

        bullet_list(out, "Action items", &cluster.action_items);
        bullet_list(out, "Blockers", &cluster.blockers);

        let related: Vec<String> = cluster
            .subjects()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .take(MAX_RELATED_SUBJECTS)
            .map(String::from)
            .collect();
        bullet_list(out, "Related", &related);
    }

    let hidden = active.len().saturating_sub(max_projects);
    if hidden > 0 {
        let _ = writeln!(out, "_{hidden} more project(s) not shown._\n");
    }
}

fn recurring_section(out: &mut String, recurring: &[&ProjectCluster]) {
    out.push_str("## Recurring Content\n\n");
    for cluster in recurring {
        let _ = writeln!(
            out,
            "- **{}** ({} item(s)): {}",
            cluster.project_key,
            cluster.item_count(),
            cluster.contextual_summary
        );
    }
    out.push('\n');
}
