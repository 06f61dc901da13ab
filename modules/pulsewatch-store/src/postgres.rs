// Postgres implementation of TrendStore.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, QueryBuilder, Row};
use tracing::info;
use uuid::Uuid;

use pulsewatch_common::types::{
    Confidence, PriorityLevel, RiskLevel, SuggestedAction, TrendRecord,
};

use crate::error::Result;
use crate::store::{Baselines, PipelineRunRecord, TrendFilters, TrendSnapshot, TrendStore};

pub struct PgTrendStore {
    pool: PgPool,
}

/// Raw row shape; enums travel as TEXT and JSON as JSONB.
#[derive(Debug, sqlx::FromRow)]
struct TrendRow {
    id: String,
    title: String,
    source: String,
    topic: Option<String>,
    subtopic: Option<String>,
    market: Option<String>,
    language: Option<String>,
    total_score: f64,
    velocity_score: f64,
    reach_score: f64,
    market_impact_score: f64,
    spotify_adjacency_score: f64,
    risk_score: f64,
    risk_level: String,
    suggested_action: String,
    confidence: String,
    priority_level: String,
    source_url: Option<String>,
    entities: serde_json::Value,
    whats_happening: String,
    why_it_matters: serde_json::Value,
    if_goes_wrong: String,
    first_seen: Option<DateTime<Utc>>,
    last_updated: DateTime<Utc>,
}

impl From<TrendRow> for TrendRecord {
    fn from(row: TrendRow) -> Self {
        let entities: BTreeMap<String, Vec<String>> =
            serde_json::from_value(row.entities).unwrap_or_default();
        let why_it_matters: Vec<String> =
            serde_json::from_value(row.why_it_matters).unwrap_or_default();
        Self {
            id: row.id,
            title: row.title,
            source: row.source,
            topic: row.topic,
            subtopic: row.subtopic,
            market: row.market,
            language: row.language,
            total_score: row.total_score,
            velocity_score: row.velocity_score,
            reach_score: row.reach_score,
            market_impact_score: row.market_impact_score,
            spotify_adjacency_score: row.spotify_adjacency_score,
            risk_score: row.risk_score,
            risk_level: RiskLevel::from_str_loose(&row.risk_level),
            suggested_action: SuggestedAction::from_str_loose(&row.suggested_action),
            confidence: Confidence::from_str_loose(&row.confidence),
            priority_level: PriorityLevel::from_str_loose(&row.priority_level),
            source_url: row.source_url,
            entities,
            whats_happening: row.whats_happening,
            why_it_matters,
            if_goes_wrong: row.if_goes_wrong,
            first_seen: row.first_seen,
            last_updated: row.last_updated,
        }
    }
}

const SELECT_TREND: &str = r#"
    SELECT id, title, source, topic, subtopic, market, language,
           total_score, velocity_score, reach_score, market_impact_score,
           spotify_adjacency_score, risk_score, risk_level, suggested_action,
           confidence, priority_level, source_url, entities, whats_happening,
           why_it_matters, if_goes_wrong, first_seen, last_updated
    FROM trends
"#;

impl PgTrendStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(2)
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl TrendStore for PgTrendStore {
    async fn save_trends(&self, records: &[TrendRecord]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let today = Utc::now().date_naive();

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO trends (
                    id, title, source, topic, subtopic, market, language,
                    total_score, velocity_score, reach_score, market_impact_score,
                    spotify_adjacency_score, risk_score, risk_level, suggested_action,
                    confidence, priority_level, source_url, entities, whats_happening,
                    why_it_matters, if_goes_wrong, first_seen, last_updated
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                          $13, $14, $15, $16, $17, $18, $19, $20, $21, $22,
                          COALESCE($23, now()), $24)
                ON CONFLICT (id) DO UPDATE SET
                    title = EXCLUDED.title,
                    topic = EXCLUDED.topic,
                    subtopic = EXCLUDED.subtopic,
                    market = EXCLUDED.market,
                    language = EXCLUDED.language,
                    total_score = EXCLUDED.total_score,
                    velocity_score = EXCLUDED.velocity_score,
                    reach_score = EXCLUDED.reach_score,
                    market_impact_score = EXCLUDED.market_impact_score,
                    spotify_adjacency_score = EXCLUDED.spotify_adjacency_score,
                    risk_score = EXCLUDED.risk_score,
                    risk_level = EXCLUDED.risk_level,
                    suggested_action = EXCLUDED.suggested_action,
                    confidence = EXCLUDED.confidence,
                    priority_level = EXCLUDED.priority_level,
                    source_url = EXCLUDED.source_url,
                    entities = EXCLUDED.entities,
                    whats_happening = EXCLUDED.whats_happening,
                    why_it_matters = EXCLUDED.why_it_matters,
                    if_goes_wrong = EXCLUDED.if_goes_wrong,
                    last_updated = EXCLUDED.last_updated
                "#,
            )
            .bind(&record.id)
            .bind(&record.title)
            .bind(&record.source)
            .bind(&record.topic)
            .bind(&record.subtopic)
            .bind(&record.market)
            .bind(&record.language)
            .bind(record.total_score)
            .bind(record.velocity_score)
            .bind(record.reach_score)
            .bind(record.market_impact_score)
            .bind(record.spotify_adjacency_score)
            .bind(record.risk_score)
            .bind(record.risk_level.to_string())
            .bind(record.suggested_action.to_string())
            .bind(record.confidence.to_string())
            .bind(record.priority_level.to_string())
            .bind(&record.source_url)
            .bind(serde_json::to_value(&record.entities)?)
            .bind(&record.whats_happening)
            .bind(serde_json::to_value(&record.why_it_matters)?)
            .bind(&record.if_goes_wrong)
            .bind(record.first_seen)
            .bind(record.last_updated)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO trend_history
                    (trend_id, snapshot_date, total_score, velocity_score, reach_score, risk_score)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (trend_id, snapshot_date) DO UPDATE SET
                    total_score = EXCLUDED.total_score,
                    velocity_score = EXCLUDED.velocity_score,
                    reach_score = EXCLUDED.reach_score,
                    risk_score = EXCLUDED.risk_score
                "#,
            )
            .bind(&record.id)
            .bind(today)
            .bind(record.total_score)
            .bind(record.velocity_score)
            .bind(record.reach_score)
            .bind(record.risk_score)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(records.len())
    }

    async fn get_trends(&self, filters: &TrendFilters) -> Result<Vec<TrendRecord>> {
        let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(SELECT_TREND);
        qb.push(" WHERE 1=1");

        if let Some(market) = &filters.market {
            qb.push(" AND market = ").push_bind(market.clone());
        }
        if let Some(topic) = &filters.topic {
            qb.push(" AND topic = ").push_bind(topic.clone());
        }
        if let Some(risk_level) = filters.risk_level {
            qb.push(" AND risk_level = ").push_bind(risk_level.to_string());
        }
        if let Some(min_score) = filters.min_score {
            qb.push(" AND total_score >= ").push_bind(min_score);
        }
        if let Some(since) = filters.since {
            qb.push(" AND last_updated >= ").push_bind(since);
        }

        qb.push(" ORDER BY total_score DESC, id ASC LIMIT ")
            .push_bind(filters.limit)
            .push(" OFFSET ")
            .push_bind(filters.offset);

        let rows: Vec<TrendRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(TrendRecord::from).collect())
    }

    async fn get_trend_by_id(&self, trend_id: &str) -> Result<Option<TrendRecord>> {
        let row: Option<TrendRow> =
            sqlx::query_as(&format!("{SELECT_TREND} WHERE id = $1"))
                .bind(trend_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(TrendRecord::from))
    }

    async fn get_trend_history(&self, trend_id: &str, days: i64) -> Result<Vec<TrendSnapshot>> {
        let since = Utc::now().date_naive() - Duration::days(days);
        let rows = sqlx::query(
            r#"
            SELECT snapshot_date, total_score, velocity_score, reach_score, risk_score
            FROM trend_history
            WHERE trend_id = $1 AND snapshot_date >= $2
            ORDER BY snapshot_date ASC
            "#,
        )
        .bind(trend_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TrendSnapshot {
                snapshot_date: row.get("snapshot_date"),
                total_score: row.get("total_score"),
                velocity_score: row.get("velocity_score"),
                reach_score: row.get("reach_score"),
                risk_score: row.get("risk_score"),
            })
            .collect())
    }

    async fn get_baselines(&self, market: Option<&str>, topic: Option<&str>) -> Result<Baselines> {
        let since = Utc::now() - Duration::days(7);

        let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            r#"
            SELECT AVG(total_score) AS avg_total_score,
                   AVG(velocity_score) AS avg_velocity_score,
                   AVG(reach_score) AS avg_reach_score,
                   COUNT(*) AS sample_size
            FROM trends
            WHERE last_updated >= "#,
        );
        qb.push_bind(since);
        if let Some(market) = market {
            qb.push(" AND market = ").push_bind(market.to_string());
        }
        if let Some(topic) = topic {
            qb.push(" AND topic = ").push_bind(topic.to_string());
        }

        let row = qb.build().fetch_one(&self.pool).await?;
        Ok(Baselines {
            avg_total_score: row.get::<Option<f64>, _>("avg_total_score").unwrap_or(0.0),
            avg_velocity_score: row
                .get::<Option<f64>, _>("avg_velocity_score")
                .unwrap_or(0.0),
            avg_reach_score: row.get::<Option<f64>, _>("avg_reach_score").unwrap_or(0.0),
            sample_size: row.get("sample_size"),
        })
    }

    async fn save_pipeline_run(&self, run: &PipelineRunRecord) -> Result<Uuid> {
        sqlx::query(
            r#"
            INSERT INTO pipeline_runs (id, started_at, completed_at, success, total_items, metrics)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(run.id)
        .bind(run.started_at)
        .bind(run.completed_at)
        .bind(run.success)
        .bind(run.total_items)
        .bind(&run.metrics)
        .execute(&self.pool)
        .await?;
        Ok(run.id)
    }

    async fn get_last_run(&self) -> Result<Option<PipelineRunRecord>> {
        let row = sqlx::query(
            "SELECT id, started_at, completed_at, success, total_items, metrics
             FROM pipeline_runs ORDER BY started_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| PipelineRunRecord {
            id: row.get("id"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
            success: row.get("success"),
            total_items: row.get("total_items"),
            metrics: row
                .get::<Option<serde_json::Value>, _>("metrics")
                .unwrap_or(serde_json::Value::Null),
        }))
    }

    async fn cleanup_old_data(&self, days: u32) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(days as i64);
        let mut removed = 0u64;

        removed += sqlx::query("DELETE FROM trends WHERE last_updated < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();
        removed += sqlx::query("DELETE FROM trend_history WHERE snapshot_date < $1")
            .bind(cutoff.date_naive())
            .execute(&self.pool)
            .await?
            .rows_affected();
        removed += sqlx::query("DELETE FROM pipeline_runs WHERE started_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        info!(removed, days, "Cleaned up expired data");
        Ok(removed)
    }
}
