//! Deterministic rule-based narratives.
//!
//! Used whenever the LLM path is unavailable or fails. Output depends only
//! on cluster contents, so two runs over the same input agree exactly.

use crate::pipeline::financial::format_currency;
use crate::pipeline::status::Signal;
use crate::pipeline::types::ProjectCluster;
use crate::synthesis::ClusterNarrative;

/// Stakeholders named in a rule-based summary.
const MAX_NAMED_STAKEHOLDERS: usize = 3;

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn stakeholders(cluster: &ProjectCluster) -> Option<String> {
    if cluster.people.is_empty() {
        return None;
    }
    let named: Vec<&str> = cluster
        .people
        .iter()
        .take(MAX_NAMED_STAKEHOLDERS)
        .map(String::as_str)
        .collect();
    let extra = cluster.people.len().saturating_sub(MAX_NAMED_STAKEHOLDERS);
    Some(if extra > 0 {
        format!("{} and {extra} more", named.join(", "))
    } else {
        named.join(", ")
    })
}

/// Narrative for an active project cluster.
pub fn rule_based_narrative(cluster: &ProjectCluster) -> ClusterNarrative {
    let counts = &cluster.status_counts;
    let key = &cluster.project_key;

    let mut sentences = vec![format!(
        "{} about {key}.",
        plural(cluster.item_count(), "related message", "related messages")
    )];
    if counts.blocker > 0 {
        sentences.push(format!(
            "Progress impacted by active blockers ({} flagged).",
            plural(counts.blocker, "message", "messages")
        ));
    }
    if counts.decision > 0 {
        sentences.push("Decision pending from leadership.".to_string());
    }
    if counts.achievement > 0 {
        sentences.push("Recent milestone reached.".to_string());
    }
    if counts.blocker == 0 && counts.decision == 0 && counts.achievement == 0 {
        sentences.push("Routine activity with no blockers or pending decisions.".to_string());
    }
    if let Some(people) = stakeholders(cluster) {
        sentences.push(format!("Stakeholders: {people}."));
    }
    if cluster.has_financial_mentions {
        sentences.push(format!(
            "Financial impact: {} across {}.",
            format_currency(cluster.financial_total),
            plural(cluster.financial_values.len(), "figure", "figures")
        ));
    }

    let mut action_items = Vec::new();
    if counts.decision > 0 {
        action_items.push(format!("Decision: provide guidance on {key}"));
    }
    if counts.blocker > 0 {
        let owner = cluster
            .people
            .iter()
            .next()
            .map_or("the team", String::as_str);
        action_items.push(format!("Unblock: follow up with {owner} on {key} blockers"));
    }
    if cluster.has_financial_mentions && (counts.blocker > 0 || counts.decision > 0) {
        action_items.push(format!(
            "Review: financial exposure of {} on {key}",
            format_currency(cluster.financial_total)
        ));
    }

    ClusterNarrative {
        contextual_summary: sentences.join(" "),
        action_items,
        blockers: blocker_subjects(cluster),
    }
}

/// Member subjects that read as blockers, first occurrence only.
fn blocker_subjects(cluster: &ProjectCluster) -> Vec<String> {
    let mut subjects: Vec<String> = Vec::new();
    for message in &cluster.items {
        let flagged = message.status_flags.is_set(Signal::Blocker)
            || Signal::Blocker.matches(&message.subject);
        let subject = message.subject.trim();
        if flagged && !subject.is_empty() && !subjects.iter().any(|s| s == subject) {
            subjects.push(subject.to_string());
        }
    }
    subjects
}

/// Narrative for recurring content. Never carries action items or blockers.
pub fn informational_narrative(cluster: &ProjectCluster) -> ClusterNarrative {
    let mut summary = format!(
        "Recurring informational content: {}",
        plural(cluster.item_count(), "item", "items")
    );
    if let Some(people) = stakeholders(cluster) {
        summary.push_str(&format!(" from {people}"));
    }
    summary.push('.');
    if let Some(latest) = cluster.subjects().map(str::trim).find(|s| !s.is_empty()) {
        summary.push_str(&format!(" Latest: {latest}."));
    }

    ClusterNarrative {
        contextual_summary: summary,
        action_items: Vec::new(),
        blockers: Vec::new(),
    }
}

/// Cross-project narrative built from the top-ranked active clusters.
///
/// Never empty.
pub fn executive_fallback(top: &[&ProjectCluster], total_projects: usize) -> String {
    if top.is_empty() {
        return "No active project threads this period.".to_string();
    }

    let mut sentences = vec![format!(
        "{} this period.",
        plural(total_projects, "active project", "active projects")
    )];

    let priorities: Vec<String> = top
        .iter()
        .map(|c| {
            let labels: Vec<&str> = Signal::MESSAGE_SIGNALS
                .iter()
                .filter(|&&s| c.status_counts.count(s) > 0)
                .map(|s| s.label())
                .collect();
            if labels.is_empty() {
                format!("{} (routine)", c.project_key)
            } else {
                format!("{} ({})", c.project_key, labels.join(", ").to_lowercase())
            }
        })
        .collect();
    sentences.push(format!("Top priorities: {}.", priorities.join("; ")));

    let blocked = top.iter().filter(|c| c.status_counts.blocker > 0).count();
    if blocked > 0 {
        sentences.push(format!(
            "{} blocked and {} attention first.",
            plural(blocked, "priority project is", "priority projects are"),
            if blocked == 1 { "needs" } else { "need" }
        ));
    }

    let exposure: f64 = top
        .iter()
        .filter(|c| c.has_financial_mentions)
        .map(|c| c.financial_total)
        .sum();
    if top.iter().any(|c| c.has_financial_mentions) {
        sentences.push(format!(
            "{} in financial exposure across these priorities.",
            format_currency(exposure)
        ));
    }

    sentences.join(" ")
}
