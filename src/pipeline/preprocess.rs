//! Per-message preprocessing: validation, cleaning, and analysis.
//!
//! Body analysis is memoized in an `AnalysisCache` that belongs to a single
//! pipeline run (or is handed in by the caller). There is no process-wide
//! cache, so concurrent runs never see each other's data.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::InputError;
use crate::pipeline::cleaner::clean_text;
use crate::pipeline::entities::EntityExtractor;
use crate::pipeline::financial::extract_financial_values;
use crate::pipeline::project_key::infer_project_key;
use crate::pipeline::status::detect_status_flags;
use crate::pipeline::types::{Entity, ProcessedMessage, RawMessage, StatusFlags};

/// Everything derived from a message body alone.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyAnalysis {
    pub clean_text: String,
    pub financial_values: Vec<f64>,
    pub status_flags: StatusFlags,
    pub entities: Vec<Entity>,
}

/// Memo of body analyses keyed by raw body text.
#[derive(Debug, Default)]
pub struct AnalysisCache {
    entries: HashMap<String, Arc<BodyAnalysis>>,
    hits: usize,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lookups served from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }

    fn get_or_analyze(
        &mut self,
        body: &str,
        extractor: &dyn EntityExtractor,
    ) -> Arc<BodyAnalysis> {
        if let Some(hit) = self.entries.get(body) {
            self.hits += 1;
            return Arc::clone(hit);
        }
        let analysis = Arc::new(analyze_body(body, extractor));
        self.entries.insert(body.to_string(), Arc::clone(&analysis));
        analysis
    }
}

/// Clean a body and run the text analyzers over it.
pub fn analyze_body(body: &str, extractor: &dyn EntityExtractor) -> BodyAnalysis {
    let clean_text = clean_text(body);
    BodyAnalysis {
        financial_values: extract_financial_values(&clean_text),
        status_flags: detect_status_flags(&clean_text),
        entities: extractor.extract(&clean_text),
        clean_text,
    }
}

/// Turn one raw message into a processed one.
pub fn process_message(
    raw: &RawMessage,
    extractor: &dyn EntityExtractor,
    cache: &mut AnalysisCache,
) -> Result<ProcessedMessage, InputError> {
    raw.validate()?;

    let analysis = cache.get_or_analyze(&raw.body, extractor);
    let subject = raw.subject.trim().to_string();
    let timestamp = raw.parsed_timestamp();
    if timestamp.is_none() && !raw.timestamp.trim().is_empty() {
        debug!(id = %raw.id, timestamp = %raw.timestamp, "Unparsable timestamp, ignoring");
    }

    Ok(ProcessedMessage {
        id: raw.id.clone(),
        project_key: infer_project_key(&subject),
        subject,
        clean_text: analysis.clean_text.clone(),
        financial_values: analysis.financial_values.clone(),
        status_flags: analysis.status_flags,
        entities: analysis.entities.clone(),
        sender_name: raw.sender.display_name().to_string(),
        sender_email: raw.sender.email.trim().to_string(),
        timestamp,
    })
}

/// Output of the preprocessing stage.
#[derive(Debug, Default)]
pub struct Preprocessed {
    pub messages: Vec<ProcessedMessage>,
    pub dropped: Vec<InputError>,
}

/// Process a batch, dropping invalid messages.
///
/// Order of the surviving messages matches input order.
pub fn preprocess_batch(
    raw: &[RawMessage],
    extractor: &dyn EntityExtractor,
    cache: &mut AnalysisCache,
) -> Preprocessed {
    let mut out = Preprocessed {
        messages: Vec::with_capacity(raw.len()),
        dropped: Vec::new(),
    };

    for message in raw {
        match process_message(message, extractor, cache) {
            Ok(processed) => out.messages.push(processed),
            Err(e) => {
                warn!(error = %e, "Dropping invalid message");
                out.dropped.push(e);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::entities::HeuristicEntityExtractor;
    use crate::pipeline::types::Sender;

    fn raw(id: &str, subject: &str, body: &str) -> RawMessage {
        RawMessage {
            id: id.into(),
            subject: subject.into(),
            body: body.into(),
            sender: Sender {
                name: "Dana Reyes".into(),
                email: "dana@allied.com".into(),
            },
            timestamp: "2026-03-02T09:30:00Z".into(),
        }
    }

    #[test]
    fn process_message_fills_every_field() {
        let mut cache = AnalysisCache::new();
        let msg = raw(
            "m1",
            "Re: Allied - Ledet project update",
            "<p>Hi John Smith, the permit is blocked. Budget is $25K.</p>\n--\nDana",
        );
        let processed = process_message(&msg, &HeuristicEntityExtractor, &mut cache).unwrap();

        assert_eq!(processed.project_key, "Allied - Ledet");
        assert_eq!(processed.financial_values, vec![25000.0]);
        assert!(processed.status_flags.blocker);
        assert!(!processed.clean_text.contains("<p>"));
        assert!(!processed.clean_text.contains("Dana"));
        assert_eq!(processed.sender_name, "Dana Reyes");
        assert!(processed.timestamp.is_some());
        assert!(processed.entities.iter().any(|e| e.text == "John Smith"));
    }

    #[test]
    fn identical_bodies_hit_cache() {
        let mut cache = AnalysisCache::new();
        let extractor = HeuristicEntityExtractor;
        let batch = vec![
            raw("a", "Weekly sync", "Same body $10"),
            raw("b", "Weekly sync", "Same body $10"),
            raw("c", "Weekly sync", "Different body"),
        ];
        let out = preprocess_batch(&batch, &extractor, &mut cache);
        assert_eq!(out.messages.len(), 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.hits(), 1);
        assert_eq!(out.messages[0].financial_values, out.messages[1].financial_values);
    }

    #[test]
    fn invalid_messages_dropped_batch_continues() {
        let mut cache = AnalysisCache::new();
        let mut anonymous = raw("bad-2", "Hello", "Body");
        anonymous.sender = Sender::default();
        let batch = vec![
            raw("", "No id", "Body"),
            raw("ok-1", "Alpha launch", "Body"),
            anonymous,
        ];
        let out = preprocess_batch(&batch, &HeuristicEntityExtractor, &mut cache);
        assert_eq!(out.messages.len(), 1);
        assert_eq!(out.messages[0].id, "ok-1");
        assert_eq!(out.dropped.len(), 2);
    }

    #[test]
    fn input_order_preserved() {
        let mut cache = AnalysisCache::new();
        let batch: Vec<RawMessage> = (0..5)
            .map(|i| raw(&format!("m{i}"), "Order test", &format!("body {i}")))
            .collect();
        let out = preprocess_batch(&batch, &HeuristicEntityExtractor, &mut cache);
        let ids: Vec<&str> = out.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m0", "m1", "m2", "m3", "m4"]);
    }
}
