//! Project key inference from subject lines.
//!
//! String heuristic only: messages whose subjects open with the same two
//! words land in the same cluster even when unrelated.

use std::sync::LazyLock;

use regex::Regex;

/// Key used when a subject has no usable tokens.
pub const UNTITLED_KEY: &str = "Untitled";

static REPLY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(re|fwd?|fw)\s*:\s*").unwrap());

/// `Client - Project` style subjects: one capitalized token either side of a
/// free-standing dash.
static DASH_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][A-Za-z0-9&'.]*)\s+[-–—]\s+([A-Z][A-Za-z0-9&'.]*)").unwrap()
});

/// Remove any number of leading `Re:` / `Fwd:` / `Fw:` prefixes.
pub fn strip_reply_prefixes(subject: &str) -> &str {
    let mut rest = subject.trim();
    while let Some(m) = REPLY_PREFIX.find(rest) {
        rest = rest[m.end()..].trim_start();
    }
    rest
}

/// Derive the grouping key for a subject line.
///
/// 1. A `X - Y` pair of capitalized tokens wins, returned as `"X - Y"`.
/// 2. Otherwise the first two words joined with `" - "`.
pub fn infer_project_key(subject: &str) -> String {
    let subject = strip_reply_prefixes(subject);

    if let Some(caps) = DASH_PAIR.captures(subject) {
        return format!("{} - {}", &caps[1], &caps[2]);
    }

    let tokens: Vec<&str> = subject
        .split_whitespace()
        .map(|t| t.trim_end_matches([':', ',', ';']))
        .filter(|t| !t.is_empty() && *t != "-")
        .take(2)
        .collect();

    match tokens.as_slice() {
        [] => UNTITLED_KEY.to_string(),
        [only] => (*only).to_string(),
        [first, second, ..] => format!("{first} - {second}"),
    }
}
