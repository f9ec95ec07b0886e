//! Urgency scoring and ordering.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::pipeline::status::Signal;
use crate::pipeline::types::ProjectCluster;

/// Flat bonus for any cluster with money on the line, independent of amount.
pub const FINANCIAL_STAKE_WEIGHT: f64 = 1.5;

/// Per-message weight of a status signal in the urgency score.
pub fn signal_weight(signal: Signal) -> f64 {
    match signal {
        Signal::Blocker => 3.0,
        Signal::Decision => 2.0,
        Signal::Achievement | Signal::Newsletter => 0.0,
    }
}

/// Coarse urgency bucket for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    High,
    Medium,
    Low,
}

impl UrgencyLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 5.0 {
            Self::High
        } else if score >= 2.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

/// Urgency score for one cluster.
pub fn urgency_score(cluster: &ProjectCluster) -> f64 {
    let signals: f64 = Signal::MESSAGE_SIGNALS
        .iter()
        .map(|&s| cluster.status_counts.count(s) as f64 * signal_weight(s))
        .sum();
    let stake = if cluster.has_financial_mentions {
        FINANCIAL_STAKE_WEIGHT
    } else {
        0.0
    };
    signals + stake
}

/// Total order: score desc, item count desc, project key asc.
pub fn compare_clusters(a: &ProjectCluster, b: &ProjectCluster) -> Ordering {
    b.urgency_score
        .total_cmp(&a.urgency_score)
        .then_with(|| b.item_count().cmp(&a.item_count()))
        .then_with(|| a.project_key.cmp(&b.project_key))
}

/// Score every cluster and sort most urgent first.
pub fn rank_clusters(clusters: &mut [ProjectCluster]) {
    for cluster in clusters.iter_mut() {
        cluster.urgency_score = urgency_score(cluster);
    }
    clusters.sort_by(compare_clusters);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{ProcessedMessage, StatusCounts, StatusFlags};

    fn cluster(key: &str, blockers: usize, decisions: usize, money: bool, items: usize) -> ProjectCluster {
        let mut c = ProjectCluster::new(key);
        c.status_counts = StatusCounts {
            blocker: blockers,
            decision: decisions,
            achievement: 0,
        };
        c.has_financial_mentions = money;
        for i in 0..items {
            c.items.push(ProcessedMessage {
                id: format!("{key}-{i}"),
                subject: String::new(),
                clean_text: String::new(),
                project_key: key.into(),
                financial_values: vec![],
                status_flags: StatusFlags::default(),
                entities: vec![],
                sender_name: String::new(),
                sender_email: String::new(),
                timestamp: None,
            });
        }
        c
    }

    #[test]
    fn score_formula() {
        assert_eq!(urgency_score(&cluster("a", 2, 1, true, 1)), 2.0 * 3.0 + 2.0 + 1.5);
        assert_eq!(urgency_score(&cluster("a", 0, 0, false, 1)), 0.0);
    }

    #[test]
    fn more_blockers_rank_higher() {
        let low = urgency_score(&cluster("a", 1, 0, false, 1));
        let high = urgency_score(&cluster("a", 2, 0, false, 1));
        assert!(high > low);
    }

    #[test]
    fn financial_bonus_is_fixed() {
        let mut small = cluster("a", 0, 0, true, 1);
        small.financial_total = 1.0;
        let mut large = cluster("b", 0, 0, true, 1);
        large.financial_total = 1e9;
        assert_eq!(urgency_score(&small), urgency_score(&large));
    }

    #[test]
    fn sorted_descending_by_score() {
        let mut clusters = vec![
            cluster("low", 0, 0, false, 1),
            cluster("high", 2, 1, false, 1),
            cluster("mid", 0, 1, true, 1),
        ];
        rank_clusters(&mut clusters);
        let keys: Vec<&str> = clusters.iter().map(|c| c.project_key.as_str()).collect();
        assert_eq!(keys, vec!["high", "mid", "low"]);
    }

    #[test]
    fn ties_broken_by_item_count_then_key() {
        let mut clusters = vec![
            cluster("bravo", 1, 0, false, 1),
            cluster("alpha", 1, 0, false, 1),
            cluster("charlie", 1, 0, false, 3),
        ];
        rank_clusters(&mut clusters);
        let keys: Vec<&str> = clusters.iter().map(|c| c.project_key.as_str()).collect();
        assert_eq!(keys, vec!["charlie", "alpha", "bravo"]);
    }

    #[test]
    fn ranking_is_input_order_independent() {
        let make = || {
            vec![
                cluster("d", 0, 1, false, 2),
                cluster("b", 0, 1, false, 2),
                cluster("a", 1, 0, true, 1),
                cluster("c", 0, 0, false, 5),
            ]
        };
        let mut forward = make();
        let mut reversed = make();
        reversed.reverse();
        rank_clusters(&mut forward);
        rank_clusters(&mut reversed);
        let f: Vec<&str> = forward.iter().map(|c| c.project_key.as_str()).collect();
        let r: Vec<&str> = reversed.iter().map(|c| c.project_key.as_str()).collect();
        assert_eq!(f, r);
    }

    #[test]
    fn urgency_levels() {
        assert_eq!(UrgencyLevel::from_score(6.5), UrgencyLevel::High);
        assert_eq!(UrgencyLevel::from_score(2.0), UrgencyLevel::Medium);
        assert_eq!(UrgencyLevel::from_score(1.5), UrgencyLevel::Low);
    }
}
