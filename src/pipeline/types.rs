//! Shared types for the briefing pipeline.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::pipeline::status::Signal;

// ── Raw input ───────────────────────────────────────────────────────

/// Who sent a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl Sender {
    /// Display name, falling back to the address.
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            self.email.trim()
        } else {
            name
        }
    }
}

/// A raw email as supplied by the caller.
///
/// Every field defaults to empty on deserialization so that a record with a
/// missing field reaches `validate()` instead of failing the whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub sender: Sender,
    /// ISO-8601 timestamp.
    #[serde(default)]
    pub timestamp: String,
}

impl RawMessage {
    /// Check the fields the pipeline cannot do without.
    ///
    /// Required: a non-blank `id`, a sender name or address, and at least one
    /// of `subject` and `body`. `timestamp` is optional: a missing or
    /// unparsable value only leaves `ProcessedMessage::timestamp` empty. A
    /// blank subject with a body keys the message under `Untitled`.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.id.trim().is_empty() {
            return Err(InputError::MissingField {
                id: self.id.clone(),
                field: "id",
            });
        }
        if self.subject.trim().is_empty() && self.body.trim().is_empty() {
            return Err(InputError::MissingField {
                id: self.id.clone(),
                field: "body",
            });
        }
        if self.sender.display_name().is_empty() {
            return Err(InputError::MissingField {
                id: self.id.clone(),
                field: "sender",
            });
        }
        Ok(())
    }

    /// Parsed timestamp, if it is valid RFC 3339.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(self.timestamp.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

// ── Per-message analysis ────────────────────────────────────────────

/// Kind of extracted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Person,
    Organization,
}

/// A person or organization mentioned in a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub text: String,
}

impl Entity {
    pub fn person(text: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Person,
            text: text.into(),
        }
    }

    pub fn organization(text: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Organization,
            text: text.into(),
        }
    }
}

/// Status signals detected in a single message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlags {
    pub blocker: bool,
    pub decision: bool,
    pub achievement: bool,
}

impl StatusFlags {
    /// Whether the flag for `signal` is set. `Newsletter` is a cluster-level
    /// signal and never set on a message.
    pub fn is_set(&self, signal: Signal) -> bool {
        match signal {
            Signal::Blocker => self.blocker,
            Signal::Decision => self.decision,
            Signal::Achievement => self.achievement,
            Signal::Newsletter => false,
        }
    }

    pub fn set(&mut self, signal: Signal) {
        match signal {
            Signal::Blocker => self.blocker = true,
            Signal::Decision => self.decision = true,
            Signal::Achievement => self.achievement = true,
            Signal::Newsletter => {}
        }
    }
}

/// Per-flag counts across a cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub blocker: usize,
    pub decision: usize,
    pub achievement: usize,
}

impl StatusCounts {
    pub fn record(&mut self, flags: &StatusFlags) {
        self.blocker += usize::from(flags.blocker);
        self.decision += usize::from(flags.decision);
        self.achievement += usize::from(flags.achievement);
    }

    pub fn count(&self, signal: Signal) -> usize {
        match signal {
            Signal::Blocker => self.blocker,
            Signal::Decision => self.decision,
            Signal::Achievement => self.achievement,
            Signal::Newsletter => 0,
        }
    }
}

/// A validated, analyzed message. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedMessage {
    pub id: String,
    pub subject: String,
    pub clean_text: String,
    pub project_key: String,
    pub financial_values: Vec<f64>,
    pub status_flags: StatusFlags,
    pub entities: Vec<Entity>,
    pub sender_name: String,
    pub sender_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

// ── Clusters ────────────────────────────────────────────────────────

/// Which synthesis path produced a cluster's narrative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisSource {
    /// Not synthesized yet.
    #[default]
    Pending,
    Llm,
    RuleBased,
    /// Recurring/newsletter content; never carries action items.
    Informational,
}

/// A group of messages that concern the same project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCluster {
    pub project_key: String,
    pub items: Vec<ProcessedMessage>,
    pub people: BTreeSet<String>,
    pub status_counts: StatusCounts,
    pub financial_values: Vec<f64>,
    pub financial_total: f64,
    pub has_financial_mentions: bool,
    pub urgency_score: f64,
    pub recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_activity: Option<DateTime<Utc>>,
    pub contextual_summary: String,
    pub action_items: Vec<String>,
    pub blockers: Vec<String>,
    pub synthesis_source: SynthesisSource,
}

impl ProjectCluster {
    /// An empty cluster for `project_key`.
    pub fn new(project_key: impl Into<String>) -> Self {
        Self {
            project_key: project_key.into(),
            items: Vec::new(),
            people: BTreeSet::new(),
            status_counts: StatusCounts::default(),
            financial_values: Vec::new(),
            financial_total: 0.0,
            has_financial_mentions: false,
            urgency_score: 0.0,
            recurring: false,
            latest_activity: None,
            contextual_summary: String::new(),
            action_items: Vec::new(),
            blockers: Vec::new(),
            synthesis_source: SynthesisSource::Pending,
        }
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Member subjects in input order.
    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|m| m.subject.as_str())
    }
}
