//! Orchestrator: wires the six stages together for one run.
//!
//! collect → clean → enrich → classify → score → summarise
//!
//! The orchestrator owns no persistence. It returns summaries plus run
//! metrics; the caller decides what to store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use pulsewatch_common::types::TrendSummary;
use pulsewatch_common::FileConfig;
use pulsewatch_connectors::Connector;

use crate::classifier::Classifier;
use crate::cleaner::{Cleaner, DedupContext};
use crate::collector::{merge_items, successful_sources, Collector};
use crate::enricher::{Enricher, EntityTagger};
use crate::scorer::Scorer;
use crate::stats::PipelineStats;
use crate::summariser::Summariser;

/// Timing and throughput for one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageMetrics {
    pub duration_seconds: f64,
    pub input_items: usize,
    pub output_items: usize,
}

/// Metrics for the whole run, persisted as the pipeline_runs payload.
#[derive(Debug, Serialize)]
pub struct RunMetrics {
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_duration_seconds: f64,
    pub sources_successful: usize,
    pub sources_total: usize,
    pub stages: BTreeMap<String, StageMetrics>,
}

/// Everything a run produced.
pub struct PipelineOutcome {
    pub success: bool,
    pub message: String,
    pub summaries: Vec<TrendSummary>,
    pub stats: PipelineStats,
    pub metrics: RunMetrics,
}

impl PipelineOutcome {
    /// Items that entered the pipeline, for the run record.
    pub fn items_collected(&self) -> usize {
        self.metrics
            .stages
            .get("collect")
            .map(|s| s.output_items)
            .unwrap_or(0)
    }
}

pub struct Orchestrator {
    collector: Collector,
    cleaner: Cleaner,
    enricher: Enricher,
    classifier: Classifier,
    scorer: Scorer,
    summariser: Summariser,
    default_markets: Vec<String>,
    default_keywords: Vec<String>,
}

impl Orchestrator {
    pub fn new(
        file_config: &FileConfig,
        connectors: Vec<Box<dyn Connector>>,
        tagger: Option<Box<dyn EntityTagger>>,
    ) -> Self {
        Self {
            collector: Collector::new(connectors),
            cleaner: Cleaner::new(&file_config.cleaning),
            enricher: Enricher::new(&file_config.entities, tagger),
            classifier: Classifier::new(&file_config.topics),
            scorer: Scorer::new(file_config),
            summariser: Summariser::new(file_config),
            default_markets: file_config.market_codes(),
            default_keywords: file_config.all_keywords(),
        }
    }

    /// Run the complete pipeline. Market/keyword arguments override the
    /// configured defaults when non-empty.
    pub async fn run_full_pipeline(
        &self,
        markets: &[String],
        keywords: &[String],
    ) -> PipelineOutcome {
        let started_at = Utc::now();
        let mut stages: BTreeMap<String, StageMetrics> = BTreeMap::new();

        let markets = if markets.is_empty() {
            &self.default_markets
        } else {
            markets
        };
        let keywords = if keywords.is_empty() {
            &self.default_keywords
        } else {
            keywords
        };

        info!("Pipeline starting");

        // Stage 1: collect
        let stage_start = Utc::now();
        let results = self.collector.collect_all(markets, keywords).await;
        let all_items = merge_items(&results);
        let sources_successful = successful_sources(&results);
        stages.insert(
            "collect".to_string(),
            stage_metrics(stage_start, results.len(), all_items.len()),
        );
        info!(items = all_items.len(), "Collection complete");

        if all_items.is_empty() {
            warn!("No items collected from any source");
            let metrics = finish_metrics(started_at, sources_successful, results.len(), stages);
            return PipelineOutcome {
                success: false,
                message: "No items collected from any source".to_string(),
                summaries: Vec::new(),
                stats: PipelineStats::default(),
                metrics,
            };
        }

        // Stage 2: clean
        let stage_start = Utc::now();
        let input_count = all_items.len();
        let mut ctx = DedupContext::new();
        let cleaned = self.cleaner.clean_batch(&mut ctx, all_items);
        let cleaned = self.cleaner.dedupe_across_sources(cleaned);
        stages.insert(
            "clean".to_string(),
            stage_metrics(stage_start, input_count, cleaned.len()),
        );

        // Stage 3: enrich
        let stage_start = Utc::now();
        let mut enriched = cleaned;
        self.enricher.enrich_batch(&mut enriched);
        stages.insert(
            "enrich".to_string(),
            stage_metrics(stage_start, enriched.len(), enriched.len()),
        );

        // Stage 4: classify
        let stage_start = Utc::now();
        self.classifier.classify_batch(&mut enriched);
        stages.insert(
            "classify".to_string(),
            stage_metrics(stage_start, enriched.len(), enriched.len()),
        );

        // Stage 5: score
        let stage_start = Utc::now();
        let scored = self.scorer.score_batch(enriched);
        stages.insert(
            "score".to_string(),
            stage_metrics(stage_start, scored.len(), scored.len()),
        );

        // Stage 6: summarise
        let stage_start = Utc::now();
        let summaries = self.summariser.summarise_batch(&scored);
        stages.insert(
            "summarise".to_string(),
            stage_metrics(stage_start, scored.len(), summaries.len()),
        );

        let stats = PipelineStats::from_summaries(&summaries);
        let metrics = finish_metrics(started_at, sources_successful, results.len(), stages);
        info!(
            trends = summaries.len(),
            duration_seconds = metrics.total_duration_seconds,
            "Pipeline complete"
        );

        PipelineOutcome {
            success: true,
            message: format!("Produced {} trend cards", summaries.len()),
            summaries,
            stats,
            metrics,
        }
    }

    /// Collection stage only, for diagnostics.
    pub async fn run_collection_only(
        &self,
        markets: &[String],
        keywords: &[String],
    ) -> Vec<pulsewatch_common::types::ConnectorResult> {
        let markets = if markets.is_empty() {
            &self.default_markets
        } else {
            markets
        };
        let keywords = if keywords.is_empty() {
            &self.default_keywords
        } else {
            keywords
        };
        self.collector.collect_all(markets, keywords).await
    }

    pub async fn health_check(&self) -> BTreeMap<String, bool> {
        self.collector.health_check_all().await
    }
}

fn stage_metrics(started: DateTime<Utc>, input: usize, output: usize) -> StageMetrics {
    StageMetrics {
        duration_seconds: (Utc::now() - started).num_milliseconds() as f64 / 1000.0,
        input_items: input,
        output_items: output,
    }
}

fn finish_metrics(
    started_at: DateTime<Utc>,
    sources_successful: usize,
    sources_total: usize,
    stages: BTreeMap<String, StageMetrics>,
) -> RunMetrics {
    let completed_at = Utc::now();
    RunMetrics {
        started_at,
        completed_at: Some(completed_at),
        total_duration_seconds: (completed_at - started_at).num_milliseconds() as f64 / 1000.0,
        sources_successful,
        sources_total,
        stages,
    }
}
