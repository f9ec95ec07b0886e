//! Grouping processed messages into project clusters.

use std::collections::HashMap;

use tracing::debug;

use crate::pipeline::status::is_recurring_content;
use crate::pipeline::types::{ProcessedMessage, ProjectCluster};

/// Group messages by exact `project_key`.
///
/// Clusters come out in order of first appearance and keep their members in
/// input order. Financial totals computed here are provisional until
/// `constraints::enforce_financial_constraints` has run.
pub fn cluster_messages(messages: Vec<ProcessedMessage>) -> Vec<ProjectCluster> {
    let mut clusters: Vec<ProjectCluster> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for message in messages {
        let slot = *index
            .entry(message.project_key.clone())
            .or_insert_with(|| {
                clusters.push(ProjectCluster::new(message.project_key.clone()));
                clusters.len() - 1
            });
        add_member(&mut clusters[slot], message);
    }

    for cluster in &mut clusters {
        cluster.recurring = is_recurring_content(
            &cluster.project_key,
            cluster
                .items
                .iter()
                .flat_map(|m| [m.sender_name.as_str(), m.sender_email.as_str()]),
        );
        debug!(
            project = %cluster.project_key,
            items = cluster.item_count(),
            recurring = cluster.recurring,
            "Built cluster"
        );
    }

    clusters
}

fn add_member(cluster: &mut ProjectCluster, message: ProcessedMessage) {
    if !message.sender_name.is_empty() {
        cluster.people.insert(message.sender_name.clone());
    }
    cluster.status_counts.record(&message.status_flags);
    cluster
        .financial_values
        .extend(message.financial_values.iter().copied());
    cluster.financial_total += message.financial_values.iter().sum::<f64>();
    if !message.financial_values.is_empty() {
        cluster.has_financial_mentions = true;
    }
    if let Some(ts) = message.timestamp {
        cluster.latest_activity = Some(cluster.latest_activity.map_or(ts, |prev| prev.max(ts)));
    }
    cluster.items.push(message);
}
