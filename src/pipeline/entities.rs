//! Person and organization mention extraction.
//!
//! The default extractor is a capitalization heuristic, not NER. Anything
//! smarter plugs in through the `EntityExtractor` trait.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::types::{Entity, EntityKind};

/// Extracts entity mentions from cleaned text.
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<Entity>;
}

/// Runs of capitalized words, allowing initials and hyphenated surnames.
static CAPITALIZED_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][A-Za-z'\-]*\.?(?:[ \t]+[A-Z][A-Za-z'\-&]*\.?)+").unwrap()
});

const ORG_SUFFIXES: &[&str] = &[
    "inc", "llc", "ltd", "corp", "corporation", "co", "company", "group", "partners", "capital",
    "holdings", "bank", "ventures", "labs", "associates", "llp", "plc", "gmbh", "foundation",
    "technologies", "systems", "solutions",
];

/// Words that start sentences or name days/months rather than people.
const STOP_WORDS: &[&str] = &[
    "hi", "hello", "hey", "dear", "thanks", "thank", "regards", "best", "cheers", "the", "a", "an",
    "re", "fwd", "fw", "please", "per", "as", "and", "or", "but", "if", "so", "we", "i", "our",
    "this", "that", "these", "those", "it", "on", "in", "at", "for", "to", "from", "with", "by",
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "january",
    "february", "march", "april", "may", "june", "july", "august", "september", "october",
    "november", "december", "team", "all", "fyi", "urgent", "update", "subject", "mr", "mrs", "ms",
    "dr",
];

/// Capitalization-based extractor.
#[derive(Debug, Default, Clone)]
pub struct HeuristicEntityExtractor;

impl HeuristicEntityExtractor {
    pub fn new() -> Self {
        Self
    }

    fn classify(tokens: &[&str]) -> Option<Entity> {
        let last = tokens.last()?;
        let last_norm = last.trim_end_matches('.').to_lowercase();

        if ORG_SUFFIXES.contains(&last_norm.as_str()) {
            // Drop greeting/stop words in front of the organization name.
            let start = tokens
                .iter()
                .position(|t| !is_stop_word(t))
                .unwrap_or(tokens.len());
            // Need a name in front of the suffix.
            if tokens.len() - start < 2 {
                return None;
            }
            return Some(Entity::organization(tokens[start..].join(" ")));
        }

        let start = tokens.iter().position(|t| !is_stop_word(t))?;
        let end = tokens
            .iter()
            .rposition(|t| !is_stop_word(t))
            .map(|i| i + 1)
            .unwrap_or(start);
        let name = &tokens[start..end];
        if name.len() < 2 || name.len() > 4 {
            return None;
        }
        if name.iter().any(|t| is_stop_word(t)) {
            return None;
        }
        Some(Entity::person(name.join(" ")))
    }
}

fn is_stop_word(token: &str) -> bool {
    let norm = token.trim_end_matches(['.', ',', ':']).to_lowercase();
    STOP_WORDS.contains(&norm.as_str())
}

impl EntityExtractor for HeuristicEntityExtractor {
    fn extract(&self, text: &str) -> Vec<Entity> {
        let mut seen: HashSet<(EntityKind, String)> = HashSet::new();
        let mut entities = Vec::new();

        for line in text.lines() {
            for run in CAPITALIZED_RUN.find_iter(line) {
                let tokens: Vec<&str> = run.as_str().split_whitespace().collect();
                let Some(entity) = Self::classify(&tokens) else {
                    continue;
                };
                let key = (entity.kind, normalize(&entity.text));
                if seen.insert(key) {
                    entities.push(entity);
                }
            }
        }

        entities
    }
}

/// Lower-case, whitespace-collapsed form used for deduplication.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
