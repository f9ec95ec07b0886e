//! Financial claim validation.
//!
//! A cluster may only report money that its own members mention. This pass
//! runs after clustering and before anything downstream reads the financial
//! fields, so synthesis never sees an unsupported total.

use tracing::{debug, warn};

use crate::pipeline::types::ProjectCluster;

/// What the enforcement pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnforcementReport {
    pub checked: usize,
    pub corrected: usize,
}

/// Make each cluster's financial fields agree with its members.
///
/// - No member carries a value: total is `0.0`, flag is `false`.
/// - Otherwise: flag is `true`, total is the sum of member values.
pub fn enforce_financial_constraints(clusters: &mut [ProjectCluster]) -> EnforcementReport {
    let mut report = EnforcementReport::default();

    for cluster in clusters.iter_mut() {
        report.checked += 1;

        let supported = cluster
            .items
            .iter()
            .any(|m| !m.financial_values.is_empty());

        if !supported {
            if cluster.financial_total != 0.0 || cluster.has_financial_mentions {
                warn!(
                    project = %cluster.project_key,
                    total = cluster.financial_total,
                    "Clearing unsupported financial total"
                );
                report.corrected += 1;
            }
            cluster.financial_total = 0.0;
            cluster.has_financial_mentions = false;
            cluster.financial_values.clear();
            continue;
        }

        let values: Vec<f64> = cluster
            .items
            .iter()
            .flat_map(|m| m.financial_values.iter().copied())
            .collect();
        let total: f64 = values.iter().sum();

        if cluster.financial_total != total
            || !cluster.has_financial_mentions
            || cluster.financial_values != values
        {
            warn!(
                project = %cluster.project_key,
                reported = cluster.financial_total,
                derived = total,
                "Financial total disagreed with members, re-deriving"
            );
            report.corrected += 1;
        }

        cluster.financial_values = values;
        cluster.financial_total = total;
        cluster.has_financial_mentions = true;
    }

    debug!(
        checked = report.checked,
        corrected = report.corrected,
        "Financial constraints enforced"
    );
    report
}
