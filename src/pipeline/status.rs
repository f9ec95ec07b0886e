//! Status signal detection.
//!
//! `Signal` is the single closed set of status categories. The classifier,
//! the urgency ranker, and the synthesizer all branch on it rather than on
//! ad hoc keyword checks.

use serde::{Deserialize, Serialize};

use crate::pipeline::types::StatusFlags;

/// A status category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Blocker,
    Decision,
    Achievement,
    /// Recurring informational content. Detected on clusters, not messages.
    Newsletter,
}

const BLOCKER_KEYWORDS: &[&str] = &[
    "stuck",
    "blocked",
    "blocker",
    "delay",
    "urgent",
    "issue",
    "problem",
    "escalat",
    "overdue",
    "at risk",
    "critical",
    "waiting on",
];

const DECISION_KEYWORDS: &[&str] = &[
    "approve",
    "approval",
    "decision",
    "decide",
    "sign off",
    "sign-off",
    "signoff",
    "authorize",
    "go/no-go",
    "your call",
];

const ACHIEVEMENT_KEYWORDS: &[&str] = &[
    "completed",
    "milestone",
    "success",
    "launched",
    "delivered",
    "shipped",
    "achieved",
    "closed the deal",
    "went live",
];

const NEWSLETTER_KEYWORDS: &[&str] = &[
    "newsletter",
    "digest",
    "bulletin",
    "roundup",
    "round-up",
    "unsubscribe",
    "noreply",
    "no-reply",
    "mailing list",
    "announcements",
    "weekly update",
    "monthly update",
];

impl Signal {
    /// Signals that can be set on an individual message.
    pub const MESSAGE_SIGNALS: [Signal; 3] = [Signal::Blocker, Signal::Decision, Signal::Achievement];

    /// Lower-case keywords for this signal.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Signal::Blocker => BLOCKER_KEYWORDS,
            Signal::Decision => DECISION_KEYWORDS,
            Signal::Achievement => ACHIEVEMENT_KEYWORDS,
            Signal::Newsletter => NEWSLETTER_KEYWORDS,
        }
    }

    /// Case-insensitive substring match against the keyword set.
    pub fn matches(self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.keywords().iter().any(|k| lower.contains(k))
    }

    /// Human-readable status label.
    pub fn label(self) -> &'static str {
        match self {
            Signal::Blocker => "Blocked",
            Signal::Decision => "Decision pending",
            Signal::Achievement => "Milestone reached",
            Signal::Newsletter => "Recurring",
        }
    }
}

/// Detect blocker/decision/achievement flags in cleaned text.
///
/// Flags are independent; any subset may be set.
pub fn detect_status_flags(text: &str) -> StatusFlags {
    let mut flags = StatusFlags::default();
    for signal in Signal::MESSAGE_SIGNALS {
        if signal.matches(text) {
            flags.set(signal);
        }
    }
    flags
}

/// Whether a project key or any of its senders looks like recurring content.
pub fn is_recurring_content<'a>(
    project_key: &str,
    senders: impl IntoIterator<Item = &'a str>,
) -> bool {
    Signal::Newsletter.matches(project_key)
        || senders.into_iter().any(|s| Signal::Newsletter.matches(s))
}
