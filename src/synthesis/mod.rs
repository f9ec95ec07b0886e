//! Narrative synthesis for ranked clusters.
//!
//! Each active cluster gets one LLM call. Calls run concurrently behind a
//! semaphore and each is bounded by a timeout. Any failure (no provider,
//! request error, timeout, bad output, cancellation) falls back to the
//! rule-based narrative for that cluster alone. Recurring clusters never
//! reach the LLM.

pub mod fallback;
pub mod prompts;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::BriefConfig;
use crate::error::SynthesisError;
use crate::llm::{ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
use crate::pipeline::financial::{extract_financial_values, format_currency};
use crate::pipeline::types::{ProjectCluster, SynthesisSource};

/// Summary, action items and blockers for one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterNarrative {
    pub contextual_summary: String,
    pub action_items: Vec<String>,
    pub blockers: Vec<String>,
}

impl ClusterNarrative {
    fn apply(self, cluster: &mut ProjectCluster, source: SynthesisSource) {
        cluster.contextual_summary = self.contextual_summary;
        cluster.action_items = self.action_items;
        cluster.blockers = self.blockers;
        cluster.synthesis_source = source;
    }
}

/// Which path produced the brief.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Engine {
    Llm,
    RuleBased,
}

/// Token usage and estimated cost across one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmUsage {
    pub requests: u32,
    pub failures: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub estimated_cost_usd: Decimal,
}

impl LlmUsage {
    fn record(&mut self, response: &CompletionResponse, provider: &dyn LlmProvider) {
        let (input_rate, output_rate) = provider.cost_per_token();
        self.input_tokens += u64::from(response.input_tokens);
        self.output_tokens += u64::from(response.output_tokens);
        self.estimated_cost_usd += input_rate * Decimal::from(response.input_tokens)
            + output_rate * Decimal::from(response.output_tokens);
    }
}

/// Result of synthesizing a ranked cluster list.
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    pub executive_summary: String,
    pub engine: Engine,
    pub usage: LlmUsage,
    pub cancelled: bool,
}

/// Knobs read from `BriefConfig`.
#[derive(Debug, Clone)]
struct SynthesisSettings {
    enabled: bool,
    concurrency: usize,
    timeout: Duration,
    executive_top_n: usize,
}

/// Turns ranked clusters into narratives.
pub struct SynthesisEngine {
    llm: Option<Arc<dyn LlmProvider>>,
    settings: SynthesisSettings,
}

impl SynthesisEngine {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>, config: &BriefConfig) -> Self {
        Self {
            llm,
            settings: SynthesisSettings {
                enabled: config.use_narrative_synthesis,
                concurrency: config.synthesis_concurrency.max(1),
                timeout: config.synthesis_timeout,
                executive_top_n: config.executive_top_n,
            },
        }
    }

    /// An engine that never calls an LLM.
    pub fn rule_based(config: &BriefConfig) -> Self {
        Self::new(None, config)
    }

    fn provider(&self) -> Result<&Arc<dyn LlmProvider>, SynthesisError> {
        self.llm
            .as_ref()
            .filter(|_| self.settings.enabled)
            .ok_or(SynthesisError::Unavailable)
    }

    /// Fill narrative fields on every cluster and build the executive summary.
    ///
    /// `clusters` must already be ranked. When `cancel` resolves, in-flight
    /// calls are dropped and every cluster still pending gets the rule-based
    /// narrative. Every cluster leaves with a non-empty summary.
    pub async fn synthesize<F>(&self, clusters: &mut [ProjectCluster], cancel: F) -> SynthesisOutcome
    where
        F: Future<Output = ()> + Send,
    {
        let mut cancel = std::pin::pin!(cancel);
        let mut usage = LlmUsage::default();
        let mut cancelled = false;

        for cluster in clusters.iter_mut().filter(|c| c.recurring) {
            fallback::informational_narrative(cluster).apply(cluster, SynthesisSource::Informational);
        }

        match self.provider() {
            Ok(llm) => {
                let slots = self.run_cluster_calls(llm, clusters, cancel.as_mut()).await;
                cancelled = slots.cancelled;
                for (idx, slot) in slots.results.into_iter().enumerate() {
                    let Some(cluster) = clusters.get_mut(idx) else {
                        continue;
                    };
                    if cluster.recurring {
                        continue;
                    }
                    let result = slot.unwrap_or(Err(SynthesisError::Cancelled));
                    if let Ok(response) = &result {
                        usage.requests += 1;
                        usage.record(response, llm.as_ref());
                    }
                    match result.and_then(|r| validate_cluster_response(cluster, &r)) {
                        Ok(narrative) => {
                            debug!(project = %cluster.project_key, "LLM synthesis applied");
                            narrative.apply(cluster, SynthesisSource::Llm);
                        }
                        Err(e) => {
                            if !matches!(e, SynthesisError::Cancelled) {
                                usage.failures += 1;
                            }
                            warn!(
                                project = %cluster.project_key,
                                error = %e,
                                "Falling back to rule-based synthesis"
                            );
                            fallback::rule_based_narrative(cluster)
                                .apply(cluster, SynthesisSource::RuleBased);
                        }
                    }
                }
            }
            Err(reason) => {
                debug!(%reason, "Using rule-based synthesis");
                for cluster in clusters.iter_mut().filter(|c| !c.recurring) {
                    fallback::rule_based_narrative(cluster).apply(cluster, SynthesisSource::RuleBased);
                }
            }
        }

        let active: Vec<&ProjectCluster> = clusters.iter().filter(|c| !c.recurring).collect();
        let top: Vec<&ProjectCluster> = active
            .iter()
            .copied()
            .take(self.settings.executive_top_n)
            .collect();

        let mut executive_from_llm = false;
        let executive_summary = match self.provider() {
            Ok(llm) if !cancelled && !top.is_empty() => {
                match self
                    .executive_call(llm, &top, active.len(), cancel.as_mut(), &mut usage)
                    .await
                {
                    Ok(text) => {
                        executive_from_llm = true;
                        text
                    }
                    Err(e) => {
                        if matches!(e, SynthesisError::Cancelled) {
                            cancelled = true;
                        } else {
                            usage.failures += 1;
                        }
                        warn!(error = %e, "Falling back to rule-based executive summary");
                        fallback::executive_fallback(&top, active.len())
                    }
                }
            }
            _ => fallback::executive_fallback(&top, active.len()),
        };

        let engine = if executive_from_llm
            || clusters
                .iter()
                .any(|c| c.synthesis_source == SynthesisSource::Llm)
        {
            Engine::Llm
        } else {
            Engine::RuleBased
        };

        info!(
            clusters = clusters.len(),
            engine = ?engine,
            requests = usage.requests,
            failures = usage.failures,
            cancelled,
            "Synthesis complete"
        );

        SynthesisOutcome {
            executive_summary,
            engine,
            usage,
            cancelled,
        }
    }

    /// Issue one call per active cluster; results land in index-aligned slots.
    async fn run_cluster_calls(
        &self,
        llm: &Arc<dyn LlmProvider>,
        clusters: &[ProjectCluster],
        mut cancel: std::pin::Pin<&mut impl Future<Output = ()>>,
    ) -> CallSlots {
        let gate = Arc::new(Semaphore::new(self.settings.concurrency));
        let timeout = self.settings.timeout;
        let mut results: Vec<Option<Result<CompletionResponse, SynthesisError>>> =
            clusters.iter().map(|_| None).collect();

        let mut pending = FuturesUnordered::new();
        for (idx, cluster) in clusters.iter().enumerate().filter(|(_, c)| !c.recurring) {
            let request = CompletionRequest::new(vec![
                ChatMessage::system(prompts::build_cluster_system_prompt()),
                ChatMessage::user(prompts::build_cluster_user_prompt(cluster)),
            ])
            .with_temperature(0.2)
            .with_max_tokens(600);
            let llm = Arc::clone(llm);
            let gate = Arc::clone(&gate);
            pending.push(async move { (idx, bounded_call(llm, gate, timeout, request).await) });
        }

        debug!(
            calls = pending.len(),
            concurrency = self.settings.concurrency,
            "Dispatching cluster synthesis"
        );

        let mut cancelled = false;
        loop {
            tokio::select! {
                biased;
                _ = cancel.as_mut() => {
                    warn!(outstanding = pending.len(), "Synthesis cancelled");
                    cancelled = true;
                    break;
                }
                next = pending.next() => match next {
                    Some((idx, result)) => results[idx] = Some(result),
                    None => break,
                },
            }
        }

        CallSlots { results, cancelled }
    }

    async fn executive_call(
        &self,
        llm: &Arc<dyn LlmProvider>,
        top: &[&ProjectCluster],
        total_projects: usize,
        cancel: std::pin::Pin<&mut impl Future<Output = ()>>,
        usage: &mut LlmUsage,
    ) -> Result<String, SynthesisError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(prompts::build_executive_system_prompt()),
            ChatMessage::user(prompts::build_executive_user_prompt(top, total_projects)),
        ])
        .with_temperature(0.3)
        .with_max_tokens(400);

        let timeout = self.settings.timeout;
        let response = tokio::select! {
            biased;
            _ = cancel => return Err(SynthesisError::Cancelled),
            result = tokio::time::timeout(timeout, llm.complete(request)) => match result {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(SynthesisError::Request(e)),
                Err(_) => return Err(SynthesisError::Timeout(timeout)),
            },
        };
        usage.requests += 1;
        usage.record(&response, llm.as_ref());
        note_truncation(&response, "executive summary");

        let text = prompts::parse_executive_response(&response.content)
            .map_err(SynthesisError::Unparsable)?;

        let mut known: Vec<f64> = Vec::new();
        for cluster in top {
            known.extend(&cluster.financial_values);
            known.push(cluster.financial_total);
        }
        known.push(top.iter().map(|c| c.financial_total).sum());
        known.retain(|v| *v > 0.0);
        reject_unsupported_amounts(std::iter::once(&text), &known)?;
        Ok(text)
    }
}

struct CallSlots {
    results: Vec<Option<Result<CompletionResponse, SynthesisError>>>,
    cancelled: bool,
}

/// One completion, gated by `gate` and bounded by `timeout`.
async fn bounded_call(
    llm: Arc<dyn LlmProvider>,
    gate: Arc<Semaphore>,
    timeout: Duration,
    request: CompletionRequest,
) -> Result<CompletionResponse, SynthesisError> {
    let _permit = gate
        .acquire_owned()
        .await
        .map_err(|_| SynthesisError::Cancelled)?;
    match tokio::time::timeout(timeout, llm.complete(request)).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(e)) => Err(SynthesisError::Request(e)),
        Err(_) => Err(SynthesisError::Timeout(timeout)),
    }
}

fn note_truncation(response: &CompletionResponse, scope: &str) {
    if response.finish_reason == FinishReason::Length {
        debug!(scope, output_tokens = response.output_tokens, "Response hit the token limit");
    }
}

/// Parse a cluster response and reject dollar figures its members never stated.
fn validate_cluster_response(
    cluster: &ProjectCluster,
    response: &CompletionResponse,
) -> Result<ClusterNarrative, SynthesisError> {
    note_truncation(response, &cluster.project_key);
    let narrative =
        prompts::parse_cluster_response(&response.content).map_err(SynthesisError::Unparsable)?;

    let mut known = cluster.financial_values.clone();
    if cluster.has_financial_mentions {
        known.push(cluster.financial_total);
    }
    let texts = std::iter::once(&narrative.contextual_summary)
        .chain(&narrative.action_items)
        .chain(&narrative.blockers);
    reject_unsupported_amounts(texts, &known)?;
    Ok(narrative)
}

/// Every amount in `texts` must match one of `known` to within 5% (or $1).
///
/// With nothing known, any stated amount is rejected.
fn reject_unsupported_amounts<'a>(
    texts: impl IntoIterator<Item = &'a String>,
    known: &[f64],
) -> Result<(), SynthesisError> {
    for text in texts {
        for amount in extract_financial_values(text) {
            let supported = known
                .iter()
                .any(|k| (amount - k).abs() <= (k.abs() * 0.05).max(1.0));
            if !supported {
                return Err(SynthesisError::Unparsable(format!(
                    "dollar figure {} not found in source messages",
                    format_currency(amount)
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::pipeline::types::{ProcessedMessage, StatusCounts, StatusFlags};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProvider {
        reply: String,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for FixedProvider {
        fn model_name(&self) -> &str {
            "fixed"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::new(1, 6), Decimal::new(2, 6))
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CompletionResponse {
                content: self.reply.clone(),
                input_tokens: 100,
                output_tokens: 50,
                finish_reason: FinishReason::Stop,
            })
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        fn model_name(&self) -> &str {
            "failing"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            Err(LlmError::RequestFailed {
                provider: "failing".into(),
                reason: "connection refused".into(),
            })
        }
    }

    /// Tracks the peak number of concurrent calls.
    struct CountingProvider {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for CountingProvider {
        fn model_name(&self) -> &str {
            "counting"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(CompletionResponse {
                content: r#"{"contextual_summary": "Steady."}"#.into(),
                input_tokens: 1,
                output_tokens: 1,
                finish_reason: FinishReason::Stop,
            })
        }
    }

    /// Answers the executive prompt with `executive_reply` and hangs on any
    /// cluster prompt containing `stall_on`.
    struct ScriptedProvider {
        executive_reply: String,
        stall_on: Option<String>,
    }

    impl Default for ScriptedProvider {
        fn default() -> Self {
            Self {
                executive_reply: "Steady week.".into(),
                stall_on: None,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn model_name(&self) -> &str {
            "scripted"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let executive = request.system_prompt() == Some(prompts::build_executive_system_prompt());
            let prompt = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            if let Some(marker) = &self.stall_on
                && prompt.contains(marker.as_str())
            {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            let content = if executive {
                self.executive_reply.clone()
            } else {
                r#"{"contextual_summary": "On track."}"#.to_string()
            };
            Ok(CompletionResponse {
                content,
                input_tokens: 10,
                output_tokens: 5,
                finish_reason: FinishReason::Stop,
            })
        }
    }

    fn cluster(key: &str, blocker: bool, money: bool) -> ProjectCluster {
        let mut c = ProjectCluster::new(key);
        c.items.push(ProcessedMessage {
            id: key.into(),
            subject: format!("{key} update"),
            clean_text: "text".into(),
            project_key: key.into(),
            financial_values: if money { vec![1000.0] } else { vec![] },
            status_flags: StatusFlags {
                blocker,
                ..Default::default()
            },
            entities: vec![],
            sender_name: "Ann Lee".into(),
            sender_email: "ann@x.com".into(),
            timestamp: None,
        });
        c.status_counts = StatusCounts {
            blocker: usize::from(blocker),
            ..Default::default()
        };
        if money {
            c.financial_values = vec![1000.0];
            c.financial_total = 1000.0;
            c.has_financial_mentions = true;
        }
        c
    }

    fn config() -> BriefConfig {
        BriefConfig {
            synthesis_timeout: Duration::from_secs(5),
            ..BriefConfig::default()
        }
    }

    #[tokio::test]
    async fn no_provider_uses_rule_based() {
        let engine = SynthesisEngine::rule_based(&config());
        let mut clusters = vec![cluster("A - b", true, false)];
        let outcome = engine.synthesize(&mut clusters, std::future::pending()).await;
        assert_eq!(outcome.engine, Engine::RuleBased);
        assert_eq!(clusters[0].synthesis_source, SynthesisSource::RuleBased);
        assert!(!clusters[0].contextual_summary.is_empty());
        assert!(!outcome.executive_summary.is_empty());
    }

    #[tokio::test]
    async fn llm_reply_applied_and_usage_priced() {
        let llm = Arc::new(FixedProvider::new(
            r#"{"contextual_summary": "Vendor slip.", "action_items": ["Call vendor"], "blockers": []}"#,
        ));
        let engine = SynthesisEngine::new(Some(llm.clone()), &config());
        let mut clusters = vec![cluster("A - b", true, false), cluster("C - d", false, false)];
        let outcome = engine.synthesize(&mut clusters, std::future::pending()).await;

        assert_eq!(outcome.engine, Engine::Llm);
        for c in &clusters {
            assert_eq!(c.synthesis_source, SynthesisSource::Llm);
            assert_eq!(c.contextual_summary, "Vendor slip.");
        }
        // Two clusters plus the executive summary call.
        assert_eq!(llm.calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.usage.requests, 3);
        assert_eq!(outcome.usage.input_tokens, 300);
        assert_eq!(outcome.usage.estimated_cost_usd, Decimal::new(600, 6));
    }

    #[tokio::test]
    async fn disabled_synthesis_never_calls_provider() {
        let llm = Arc::new(FixedProvider::new(r#"{"contextual_summary": "x"}"#));
        let cfg = BriefConfig {
            use_narrative_synthesis: false,
            ..config()
        };
        let engine = SynthesisEngine::new(Some(llm.clone()), &cfg);
        let mut clusters = vec![cluster("A - b", false, false)];
        let outcome = engine.synthesize(&mut clusters, std::future::pending()).await;
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.engine, Engine::RuleBased);
    }

    #[tokio::test]
    async fn failures_fall_back_per_cluster() {
        let engine = SynthesisEngine::new(Some(Arc::new(FailingProvider)), &config());
        let mut clusters = vec![cluster("A - b", true, true), cluster("C - d", false, false)];
        let outcome = engine.synthesize(&mut clusters, std::future::pending()).await;
        assert_eq!(outcome.engine, Engine::RuleBased);
        assert_eq!(outcome.usage.failures, 3);
        for c in &clusters {
            assert_eq!(c.synthesis_source, SynthesisSource::RuleBased);
            assert!(!c.contextual_summary.is_empty());
        }
    }

    #[tokio::test]
    async fn unsupported_money_claim_rejected() {
        let llm = Arc::new(FixedProvider::new(
            r#"{"contextual_summary": "About $2M at risk."}"#,
        ));
        let engine = SynthesisEngine::new(Some(llm), &config());
        let mut clusters = vec![cluster("A - b", false, false), cluster("C - d", false, true)];
        engine.synthesize(&mut clusters, std::future::pending()).await;
        assert_eq!(clusters[0].synthesis_source, SynthesisSource::RuleBased);
        assert!(!clusters[0].contextual_summary.contains('$'));
        // C - d only ever mentions $1,000.
        assert_eq!(clusters[1].synthesis_source, SynthesisSource::RuleBased);
        assert!(!clusters[1].contextual_summary.contains("$2M"));
        assert!(clusters[1].contextual_summary.contains("$1,000"));
    }

    #[tokio::test]
    async fn amount_from_source_is_accepted() {
        let llm = Arc::new(FixedProvider::new(
            r#"{"contextual_summary": "A $1,000 overrun awaits sign-off.", "action_items": ["Approve the $1K overrun"]}"#,
        ));
        let engine = SynthesisEngine::new(Some(llm), &config());
        let mut clusters = vec![cluster("C - d", false, true)];
        engine.synthesize(&mut clusters, std::future::pending()).await;
        assert_eq!(clusters[0].synthesis_source, SynthesisSource::Llm);
        assert_eq!(clusters[0].contextual_summary, "A $1,000 overrun awaits sign-off.");
    }

    #[tokio::test]
    async fn executive_money_claim_checked_against_top_clusters() {
        let llm = Arc::new(ScriptedProvider {
            executive_reply: "C - d faces a $9M shortfall.".into(),
            ..ScriptedProvider::default()
        });
        let engine = SynthesisEngine::new(Some(llm), &config());
        let mut clusters = vec![cluster("C - d", true, true)];
        let outcome = engine.synthesize(&mut clusters, std::future::pending()).await;
        assert!(!outcome.executive_summary.contains("$9M"));
        assert!(!outcome.executive_summary.is_empty());
        assert_eq!(outcome.usage.failures, 1);

        let llm = Arc::new(ScriptedProvider {
            executive_reply: "Clear the $1,000 overrun on C - d first.".into(),
            ..ScriptedProvider::default()
        });
        let engine = SynthesisEngine::new(Some(llm), &config());
        let mut clusters = vec![cluster("C - d", true, true)];
        let outcome = engine.synthesize(&mut clusters, std::future::pending()).await;
        assert_eq!(outcome.executive_summary, "Clear the $1,000 overrun on C - d first.");
        assert_eq!(outcome.usage.failures, 0);
    }

    #[tokio::test]
    async fn cancel_keeps_finished_results() {
        let llm = Arc::new(ScriptedProvider {
            stall_on: Some("Slow - two".into()),
            ..ScriptedProvider::default()
        });
        let engine = SynthesisEngine::new(Some(llm), &config());
        let mut clusters = vec![cluster("Fast - one", false, false), cluster("Slow - two", true, false)];
        let outcome = engine
            .synthesize(&mut clusters, tokio::time::sleep(Duration::from_millis(100)))
            .await;

        assert!(outcome.cancelled);
        assert_eq!(outcome.engine, Engine::Llm);
        assert_eq!(clusters[0].synthesis_source, SynthesisSource::Llm);
        assert_eq!(clusters[0].contextual_summary, "On track.");
        assert_eq!(clusters[1].synthesis_source, SynthesisSource::RuleBased);
        assert!(!clusters[1].contextual_summary.is_empty());
        assert_eq!(outcome.usage.requests, 1);
        assert_eq!(outcome.usage.failures, 0);
    }

    #[tokio::test]
    async fn recurring_clusters_skip_the_llm() {
        let llm = Arc::new(FixedProvider::new(r#"{"contextual_summary": "x"}"#));
        let engine = SynthesisEngine::new(Some(llm.clone()), &config());
        let mut newsletter = cluster("Newsletter - March", true, false);
        newsletter.recurring = true;
        let mut clusters = vec![newsletter];
        let outcome = engine.synthesize(&mut clusters, std::future::pending()).await;
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
        assert_eq!(clusters[0].synthesis_source, SynthesisSource::Informational);
        assert!(clusters[0].action_items.is_empty());
        assert!(clusters[0].blockers.is_empty());
        assert_eq!(outcome.engine, Engine::RuleBased);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let llm = Arc::new(CountingProvider {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let cfg = BriefConfig {
            synthesis_concurrency: 2,
            ..config()
        };
        let engine = SynthesisEngine::new(Some(llm.clone()), &cfg);
        let mut clusters: Vec<ProjectCluster> =
            (0..6).map(|i| cluster(&format!("P{i} - x"), false, false)).collect();
        engine.synthesize(&mut clusters, std::future::pending()).await;
        assert!(llm.peak.load(Ordering::SeqCst) <= 2);
        assert!(clusters.iter().all(|c| c.synthesis_source == SynthesisSource::Llm));
    }

    #[tokio::test]
    async fn ready_cancel_falls_back_everywhere() {
        let llm = Arc::new(FixedProvider::new(r#"{"contextual_summary": "x"}"#));
        let engine = SynthesisEngine::new(Some(llm), &config());
        let mut clusters = vec![cluster("A - b", false, false), cluster("C - d", true, false)];
        let outcome = engine.synthesize(&mut clusters, std::future::ready(())).await;
        assert!(outcome.cancelled);
        assert_eq!(outcome.engine, Engine::RuleBased);
        assert!(clusters.iter().all(|c| c.synthesis_source == SynthesisSource::RuleBased));
        assert!(!outcome.executive_summary.is_empty());
    }
}
