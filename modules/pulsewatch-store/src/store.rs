// ---------------------------------------------------------------------------
// TrendStore — the persistence seam
// ---------------------------------------------------------------------------
//
// The pipeline talks to storage only through this trait. Production uses
// Postgres; tests use the in-memory store. Storage errors propagate — a
// run that cannot persist its output has failed.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pulsewatch_common::types::{RiskLevel, TrendRecord};

use crate::error::Result;

/// Filters for the trend query surface. Defaults return the top 50 by
/// total score.
#[derive(Debug, Clone)]
pub struct TrendFilters {
    pub limit: i64,
    pub offset: i64,
    pub market: Option<String>,
    pub topic: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub min_score: Option<f64>,
    pub since: Option<DateTime<Utc>>,
}

impl Default for TrendFilters {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            market: None,
            topic: None,
            risk_level: None,
            min_score: None,
            since: None,
        }
    }
}

/// One daily snapshot of a trend's scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSnapshot {
    pub snapshot_date: NaiveDate,
    pub total_score: f64,
    pub velocity_score: f64,
    pub reach_score: f64,
    pub risk_score: f64,
}

/// Aggregate metrics over recent trends, scoped by optional market/topic.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Baselines {
    pub avg_total_score: f64,
    pub avg_velocity_score: f64,
    pub avg_reach_score: f64,
    pub sample_size: i64,
}

/// Persisted record of one pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRunRecord {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub success: bool,
    pub total_items: i32,
    pub metrics: serde_json::Value,
}

#[async_trait]
pub trait TrendStore: Send + Sync {
    /// Upsert trend records by id, and write today's history snapshot for
    /// each. Returns the number of records saved. `first_seen` is set on
    /// insert and never overwritten.
    async fn save_trends(&self, records: &[TrendRecord]) -> Result<usize>;

    /// Query trends ordered by total score descending.
    async fn get_trends(&self, filters: &TrendFilters) -> Result<Vec<TrendRecord>>;

    async fn get_trend_by_id(&self, trend_id: &str) -> Result<Option<TrendRecord>>;

    /// Daily snapshots for a trend over the last `days` days, oldest first.
    async fn get_trend_history(&self, trend_id: &str, days: i64) -> Result<Vec<TrendSnapshot>>;

    /// Averages over trends updated in the last 7 days.
    async fn get_baselines(&self, market: Option<&str>, topic: Option<&str>) -> Result<Baselines>;

    async fn save_pipeline_run(&self, run: &PipelineRunRecord) -> Result<Uuid>;

    async fn get_last_run(&self) -> Result<Option<PipelineRunRecord>>;

    /// Delete trends, history, and runs older than the retention window.
    /// Returns the number of rows removed.
    async fn cleanup_old_data(&self, days: u32) -> Result<u64>;
}
