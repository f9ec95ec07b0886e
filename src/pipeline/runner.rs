//! End-to-end brief pipeline.
//!
//! Each stage produces a value the next stage consumes, so stages cannot be
//! skipped or run out of order:
//!
//! `Preprocessed → Clustered → Constrained → Ranked → Synthesized → Brief`

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::brief::{Brief, BriefAssembler, RunStats};
use crate::config::BriefConfig;
use crate::llm::LlmProvider;
use crate::pipeline::cluster::cluster_messages;
use crate::pipeline::constraints::{EnforcementReport, enforce_financial_constraints};
use crate::pipeline::entities::{EntityExtractor, HeuristicEntityExtractor};
use crate::pipeline::preprocess::{AnalysisCache, Preprocessed, preprocess_batch};
use crate::pipeline::ranking::rank_clusters;
use crate::pipeline::types::{ProjectCluster, RawMessage};
use crate::synthesis::{SynthesisEngine, SynthesisOutcome};

/// Messages grouped by project key; financial fields not yet trusted.
#[derive(Debug)]
pub struct Clustered {
    clusters: Vec<ProjectCluster>,
    stats: RunStats,
}

impl Clustered {
    pub fn from_preprocessed(run_id: Uuid, pre: Preprocessed) -> Self {
        let stats = RunStats {
            run_id,
            total_emails: pre.messages.len(),
            dropped_messages: pre.dropped.len(),
        };
        Self {
            clusters: cluster_messages(pre.messages),
            stats,
        }
    }

    pub fn clusters(&self) -> &[ProjectCluster] {
        &self.clusters
    }

    pub fn enforce_constraints(mut self) -> Constrained {
        let report = enforce_financial_constraints(&mut self.clusters);
        Constrained {
            clusters: self.clusters,
            stats: self.stats,
            report,
        }
    }
}

/// Clusters whose financial fields agree with their members.
#[derive(Debug)]
pub struct Constrained {
    clusters: Vec<ProjectCluster>,
    stats: RunStats,
    report: EnforcementReport,
}

impl Constrained {
    pub fn report(&self) -> EnforcementReport {
        self.report
    }

    pub fn rank(mut self) -> Ranked {
        rank_clusters(&mut self.clusters);
        Ranked {
            clusters: self.clusters,
            stats: self.stats,
        }
    }
}

/// Scored clusters, most urgent first.
#[derive(Debug)]
pub struct Ranked {
    clusters: Vec<ProjectCluster>,
    stats: RunStats,
}

impl Ranked {
    pub fn clusters(&self) -> &[ProjectCluster] {
        &self.clusters
    }

    pub async fn synthesize<F>(mut self, engine: &SynthesisEngine, cancel: F) -> Synthesized
    where
        F: Future<Output = ()> + Send,
    {
        let outcome = engine.synthesize(&mut self.clusters, cancel).await;
        Synthesized {
            clusters: self.clusters,
            stats: self.stats,
            outcome,
        }
    }
}

/// Clusters with narratives filled in.
#[derive(Debug)]
pub struct Synthesized {
    clusters: Vec<ProjectCluster>,
    stats: RunStats,
    outcome: SynthesisOutcome,
}

impl Synthesized {
    pub fn assemble(self, assembler: &BriefAssembler, generated_at: DateTime<Utc>) -> Brief {
        assembler.assemble(self.clusters, self.outcome, self.stats, generated_at)
    }
}

/// Runs a batch of raw messages through every stage.
pub struct BriefPipeline {
    config: BriefConfig,
    extractor: Arc<dyn EntityExtractor>,
    synthesis: SynthesisEngine,
    assembler: BriefAssembler,
}

impl BriefPipeline {
    /// Rule-based pipeline with the heuristic entity extractor.
    pub fn new(config: BriefConfig) -> Self {
        Self {
            extractor: Arc::new(HeuristicEntityExtractor::new()),
            synthesis: SynthesisEngine::rule_based(&config),
            assembler: BriefAssembler::new(&config),
            config,
        }
    }

    /// Use `llm` for narrative synthesis.
    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.synthesis = SynthesisEngine::new(Some(llm), &self.config);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn EntityExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &BriefConfig {
        &self.config
    }

    /// Build a brief stamped with the current time.
    pub async fn run(&self, raw: &[RawMessage]) -> Brief {
        self.run_at(raw, Utc::now()).await
    }

    /// Build a brief stamped with `generated_at`.
    pub async fn run_at(&self, raw: &[RawMessage], generated_at: DateTime<Utc>) -> Brief {
        self.run_with_cancel(raw, generated_at, std::future::pending())
            .await
    }

    /// Build a brief, abandoning outstanding LLM calls once `cancel` resolves.
    ///
    /// Cancellation never fails the run: clusters still waiting on the LLM
    /// get rule-based narratives.
    pub async fn run_with_cancel<F>(
        &self,
        raw: &[RawMessage],
        generated_at: DateTime<Utc>,
        cancel: F,
    ) -> Brief
    where
        F: Future<Output = ()> + Send,
    {
        let run_id = Uuid::new_v4();
        self.execute(run_id, raw, generated_at, cancel)
            .instrument(info_span!("brief_run", %run_id))
            .await
    }

    async fn execute<F>(
        &self,
        run_id: Uuid,
        raw: &[RawMessage],
        generated_at: DateTime<Utc>,
        cancel: F,
    ) -> Brief
    where
        F: Future<Output = ()> + Send,
    {
        info!(messages = raw.len(), "Starting brief run");

        let mut cache = AnalysisCache::new();
        let pre = preprocess_batch(raw, self.extractor.as_ref(), &mut cache);
        info!(
            processed = pre.messages.len(),
            dropped = pre.dropped.len(),
            cache_hits = cache.hits(),
            "Preprocessing complete"
        );

        if pre.messages.is_empty() {
            let stats = RunStats {
                run_id,
                total_emails: 0,
                dropped_messages: pre.dropped.len(),
            };
            return self.assembler.no_data(stats, generated_at);
        }

        let clustered = Clustered::from_preprocessed(run_id, pre);
        info!(clusters = clustered.clusters().len(), "Clustering complete");

        let constrained = clustered.enforce_constraints();
        let report = constrained.report();
        info!(
            checked = report.checked,
            corrected = report.corrected,
            "Financial constraints enforced"
        );

        let ranked = constrained.rank();
        if let Some(top) = ranked.clusters().first() {
            info!(
                top = %top.project_key,
                score = top.urgency_score,
                "Ranking complete"
            );
        }

        ranked
            .synthesize(&self.synthesis, cancel)
            .await
            .assemble(&self.assembler, generated_at)
    }
}
