//! Prompt construction and response parsing for narrative synthesis.

use serde::Deserialize;

use crate::pipeline::financial::format_currency;
use crate::pipeline::ranking::UrgencyLevel;
use crate::pipeline::types::ProjectCluster;
use crate::synthesis::ClusterNarrative;

/// Subjects listed in a cluster prompt.
const MAX_PROMPT_SUBJECTS: usize = 10;

/// Message excerpts included in a cluster prompt.
const MAX_PROMPT_EXCERPTS: usize = 3;

/// Characters per excerpt.
const EXCERPT_CHARS: usize = 300;

// ── Cluster prompts ─────────────────────────────────────────────────

pub fn build_cluster_system_prompt() -> String {
    "You are an executive briefing analyst. You receive a group of related emails about one \
     project and write a short status brief for a senior executive.\n\n\
     Respond with ONLY a JSON object:\n\
     {\"contextual_summary\": \"...\", \"action_items\": [\"...\"], \"blockers\": [\"...\"]}\n\n\
     Rules:\n\
     - contextual_summary: 2-3 sentences, plain language, lead with what matters most\n\
     - action_items: concrete asks for the executive, imperative mood, max 4\n\
     - blockers: what is stopping progress right now, max 4, empty list if none\n\
     - Only mention dollar amounts listed under \"Financial figures\". Never invent numbers\n\
     - Do not repeat the project name in every sentence"
        .to_string()
}

pub fn build_cluster_user_prompt(cluster: &ProjectCluster) -> String {
    let mut prompt = String::with_capacity(1024);

    prompt.push_str(&format!("Project: {}\n", cluster.project_key));
    prompt.push_str(&format!(
        "Urgency: {} ({:.1})\n",
        UrgencyLevel::from_score(cluster.urgency_score).label(),
        cluster.urgency_score
    ));
    prompt.push_str(&format!("Messages: {}\n", cluster.item_count()));

    let counts = &cluster.status_counts;
    prompt.push_str(&format!(
        "Status signals: {} blocker, {} decision, {} achievement\n",
        counts.blocker, counts.decision, counts.achievement
    ));

    if !cluster.people.is_empty() {
        let people: Vec<&str> = cluster.people.iter().map(String::as_str).collect();
        prompt.push_str(&format!("Stakeholders: {}\n", people.join(", ")));
    }

    if cluster.has_financial_mentions {
        let figures: Vec<String> = cluster
            .financial_values
            .iter()
            .map(|v| format_currency(*v))
            .collect();
        prompt.push_str(&format!(
            "Financial figures: {} total ({})\n",
            format_currency(cluster.financial_total),
            figures.join(", ")
        ));
    } else {
        prompt.push_str("Financial figures: none mentioned\n");
    }

    prompt.push_str("\nSubjects:\n");
    for subject in cluster.subjects().take(MAX_PROMPT_SUBJECTS) {
        prompt.push_str(&format!("- {subject}\n"));
    }

    let excerpts: Vec<_> = cluster
        .items
        .iter()
        .filter(|m| !m.clean_text.is_empty())
        .take(MAX_PROMPT_EXCERPTS)
        .collect();
    if !excerpts.is_empty() {
        prompt.push_str("\nExcerpts:\n");
        for (i, m) in excerpts.iter().enumerate() {
            let preview: String = m.clean_text.chars().take(EXCERPT_CHARS).collect();
            prompt.push_str(&format!("[{}] {}: {}\n", i + 1, m.sender_name, preview));
        }
    }

    prompt
}

// ── Executive prompts ───────────────────────────────────────────────

pub fn build_executive_system_prompt() -> String {
    "You are a chief of staff writing the opening paragraph of an executive brief. You receive \
     the highest-priority projects of the period.\n\n\
     Write 2-4 sentences of plain text (no JSON, no markdown, no bullet points) covering what \
     needs the executive's attention first and why. Only mention dollar amounts that appear in \
     the input."
        .to_string()
}

pub fn build_executive_user_prompt(top: &[&ProjectCluster], total_projects: usize) -> String {
    let mut prompt = format!("Active projects this period: {total_projects}\n\nTop priorities:\n");
    for (i, cluster) in top.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {} (urgency {:.1}; {} blocker, {} decision",
            i + 1,
            cluster.project_key,
            cluster.urgency_score,
            cluster.status_counts.blocker,
            cluster.status_counts.decision
        ));
        if cluster.has_financial_mentions {
            prompt.push_str(&format!("; {} at stake", format_currency(cluster.financial_total)));
        }
        prompt.push_str(")\n");
        if !cluster.contextual_summary.is_empty() {
            prompt.push_str(&format!("   {}\n", cluster.contextual_summary));
        }
    }
    prompt
}

// ── Response parsing ────────────────────────────────────────────────

/// LLM cluster response structure.
#[derive(Debug, Deserialize)]
struct ClusterResponse {
    #[serde(default, alias = "summary")]
    contextual_summary: String,
    #[serde(default)]
    action_items: Vec<String>,
    #[serde(default)]
    blockers: Vec<String>,
}

/// Parse the LLM cluster response into a narrative.
pub fn parse_cluster_response(raw: &str) -> Result<ClusterNarrative, String> {
    let json_str = extract_json_object(raw);
    let response: ClusterResponse =
        serde_json::from_str(&json_str).map_err(|e| format!("JSON parse error: {e}"))?;

    let contextual_summary = response.contextual_summary.trim().to_string();
    if contextual_summary.is_empty() {
        return Err("contextual_summary is empty".into());
    }

    Ok(ClusterNarrative {
        contextual_summary,
        action_items: clean_list(response.action_items),
        blockers: clean_list(response.blockers),
    })
}

/// Parse the executive narrative (plain text, possibly fenced).
pub fn parse_executive_response(raw: &str) -> Result<String, String> {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop an optional language tag on the fence line.
        let rest = rest.split_once('\n').map_or("", |(_, body)| body);
        text = rest.rsplit_once("```").map_or(rest, |(body, _)| body).trim();
    }
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        Err("executive narrative is empty".into())
    } else {
        Ok(text)
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extract a JSON object from LLM output (handles markdown wrapping).
pub(crate) fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    // Already a JSON object
    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    // Wrapped in markdown code block
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    // Try to find object bounds
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}
