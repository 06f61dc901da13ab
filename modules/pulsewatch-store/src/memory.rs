//! In-memory TrendStore for tests and local runs without Postgres.
//! Mirrors the Postgres semantics: upsert by id, first_seen preserved,
//! one history snapshot per trend per day.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use pulsewatch_common::types::TrendRecord;

use crate::error::Result;
use crate::store::{Baselines, PipelineRunRecord, TrendFilters, TrendSnapshot, TrendStore};

#[derive(Default)]
pub struct MemoryTrendStore {
    trends: RwLock<HashMap<String, TrendRecord>>,
    history: RwLock<HashMap<(String, NaiveDate), TrendSnapshot>>,
    runs: RwLock<Vec<PipelineRunRecord>>,
}

impl MemoryTrendStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrendStore for MemoryTrendStore {
    async fn save_trends(&self, records: &[TrendRecord]) -> Result<usize> {
        let today = Utc::now().date_naive();
        let mut trends = self.trends.write().await;
        let mut history = self.history.write().await;

        for record in records {
            let mut record = record.clone();
            if let Some(existing) = trends.get(&record.id) {
                record.first_seen = existing.first_seen;
            } else if record.first_seen.is_none() {
                record.first_seen = Some(Utc::now());
            }
            history.insert(
                (record.id.clone(), today),
                TrendSnapshot {
                    snapshot_date: today,
                    total_score: record.total_score,
                    velocity_score: record.velocity_score,
                    reach_score: record.reach_score,
                    risk_score: record.risk_score,
                },
            );
            trends.insert(record.id.clone(), record);
        }
        Ok(records.len())
    }

    async fn get_trends(&self, filters: &TrendFilters) -> Result<Vec<TrendRecord>> {
        let trends = self.trends.read().await;
        let mut matching: Vec<TrendRecord> = trends
            .values()
            .filter(|t| {
                filters.market.as_ref().map_or(true, |m| t.market.as_deref() == Some(m.as_str()))
                    && filters.topic.as_ref().map_or(true, |c| t.topic.as_deref() == Some(c.as_str()))
                    && filters.risk_level.map_or(true, |r| t.risk_level == r)
                    && filters.min_score.map_or(true, |s| t.total_score >= s)
                    && filters.since.map_or(true, |s| t.last_updated >= s)
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            b.total_score
                .partial_cmp(&a.total_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(matching
            .into_iter()
            .skip(filters.offset.max(0) as usize)
            .take(filters.limit.max(0) as usize)
            .collect())
    }

    async fn get_trend_by_id(&self, trend_id: &str) -> Result<Option<TrendRecord>> {
        Ok(self.trends.read().await.get(trend_id).cloned())
    }

    async fn get_trend_history(&self, trend_id: &str, days: i64) -> Result<Vec<TrendSnapshot>> {
        let since = Utc::now().date_naive() - Duration::days(days);
        let history = self.history.read().await;
        let mut snapshots: Vec<TrendSnapshot> = history
            .iter()
            .filter(|((id, date), _)| id == trend_id && *date >= since)
            .map(|(_, snapshot)| snapshot.clone())
            .collect();
        snapshots.sort_by_key(|s| s.snapshot_date);
        Ok(snapshots)
    }

    async fn get_baselines(&self, market: Option<&str>, topic: Option<&str>) -> Result<Baselines> {
        let since = Utc::now() - Duration::days(7);
        let trends = self.trends.read().await;
        let matching: Vec<&TrendRecord> = trends
            .values()
            .filter(|t| {
                t.last_updated >= since
                    && market.map_or(true, |m| t.market.as_deref() == Some(m))
                    && topic.map_or(true, |c| t.topic.as_deref() == Some(c))
            })
            .collect();

        if matching.is_empty() {
            return Ok(Baselines::default());
        }
        let n = matching.len() as f64;
        Ok(Baselines {
            avg_total_score: matching.iter().map(|t| t.total_score).sum::<f64>() / n,
            avg_velocity_score: matching.iter().map(|t| t.velocity_score).sum::<f64>() / n,
            avg_reach_score: matching.iter().map(|t| t.reach_score).sum::<f64>() / n,
            sample_size: matching.len() as i64,
        })
    }

    async fn save_pipeline_run(&self, run: &PipelineRunRecord) -> Result<Uuid> {
        self.runs.write().await.push(run.clone());
        Ok(run.id)
    }

    async fn get_last_run(&self) -> Result<Option<PipelineRunRecord>> {
        let runs = self.runs.read().await;
        Ok(runs
            .iter()
            .max_by_key(|r| r.started_at)
            .cloned())
    }

    async fn cleanup_old_data(&self, days: u32) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(days as i64);
        let cutoff_date = cutoff.date_naive();
        let mut removed = 0u64;

        let mut trends = self.trends.write().await;
        let before = trends.len();
        trends.retain(|_, t| t.last_updated >= cutoff);
        removed += (before - trends.len()) as u64;

        let mut history = self.history.write().await;
        let before = history.len();
        history.retain(|(_, date), _| *date >= cutoff_date);
        removed += (before - history.len()) as u64;

        let mut runs = self.runs.write().await;
        let before = runs.len();
        runs.retain(|r| r.started_at >= cutoff);
        removed += (before - runs.len()) as u64;

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsewatch_common::types::{Confidence, PriorityLevel, RiskLevel, SuggestedAction};
    use std::collections::BTreeMap;

    fn record(id: &str, score: f64, market: Option<&str>) -> TrendRecord {
        TrendRecord {
            id: id.to_string(),
            title: format!("Trend {id}"),
            source: "reddit".to_string(),
            topic: Some("music_audio".to_string()),
            subtopic: None,
            market: market.map(|m| m.to_string()),
            language: None,
            total_score: score,
            velocity_score: 40.0,
            reach_score: 30.0,
            market_impact_score: 50.0,
            spotify_adjacency_score: 70.0,
            risk_score: 10.0,
            risk_level: RiskLevel::Low,
            suggested_action: SuggestedAction::Monitor,
            confidence: Confidence::Medium,
            priority_level: PriorityLevel::Low,
            source_url: None,
            entities: BTreeMap::new(),
            whats_happening: String::new(),
            why_it_matters: vec![],
            if_goes_wrong: String::new(),
            first_seen: None,
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_is_an_upsert_that_preserves_first_seen() {
        let store = MemoryTrendStore::new();
        store.save_trends(&[record("a", 50.0, None)]).await.unwrap();
        let first = store.get_trend_by_id("a").await.unwrap().unwrap();
        assert!(first.first_seen.is_some());

        store.save_trends(&[record("a", 80.0, None)]).await.unwrap();
        let second = store.get_trend_by_id("a").await.unwrap().unwrap();
        assert_eq!(second.total_score, 80.0);
        assert_eq!(second.first_seen, first.first_seen);

        let all = store.get_trends(&TrendFilters::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn get_trends_filters_and_orders_by_score() {
        let store = MemoryTrendStore::new();
        store
            .save_trends(&[
                record("a", 30.0, Some("NG")),
                record("b", 90.0, Some("NG")),
                record("c", 60.0, Some("KE")),
            ])
            .await
            .unwrap();

        let all = store.get_trends(&TrendFilters::default()).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        let ng = store
            .get_trends(&TrendFilters {
                market: Some("NG".to_string()),
                min_score: Some(50.0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ng.len(), 1);
        assert_eq!(ng[0].id, "b");
    }

    #[tokio::test]
    async fn history_keeps_one_snapshot_per_day() {
        let store = MemoryTrendStore::new();
        store.save_trends(&[record("a", 50.0, None)]).await.unwrap();
        store.save_trends(&[record("a", 70.0, None)]).await.unwrap();

        let history = store.get_trend_history("a", 7).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].total_score, 70.0);
    }

    #[tokio::test]
    async fn baselines_average_recent_trends() {
        let store = MemoryTrendStore::new();
        store
            .save_trends(&[record("a", 40.0, Some("NG")), record("b", 60.0, Some("NG"))])
            .await
            .unwrap();

        let baselines = store.get_baselines(Some("NG"), None).await.unwrap();
        assert_eq!(baselines.sample_size, 2);
        assert!((baselines.avg_total_score - 50.0).abs() < 1e-9);

        let empty = store.get_baselines(Some("KE"), None).await.unwrap();
        assert_eq!(empty.sample_size, 0);
    }

    #[tokio::test]
    async fn last_run_returns_most_recent() {
        let store = MemoryTrendStore::new();
        let older = PipelineRunRecord {
            id: Uuid::new_v4(),
            started_at: Utc::now() - Duration::hours(2),
            completed_at: Some(Utc::now() - Duration::hours(1)),
            success: false,
            total_items: 3,
            metrics: serde_json::json!({}),
        };
        let newer = PipelineRunRecord {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            completed_at: None,
            success: true,
            total_items: 12,
            metrics: serde_json::json!({}),
        };
        store.save_pipeline_run(&older).await.unwrap();
        store.save_pipeline_run(&newer).await.unwrap();

        let last = store.get_last_run().await.unwrap().unwrap();
        assert_eq!(last.id, newer.id);
        assert!(last.success);
    }

    #[tokio::test]
    async fn cleanup_removes_expired_rows() {
        let store = MemoryTrendStore::new();
        let mut stale = record("old", 20.0, None);
        stale.last_updated = Utc::now() - Duration::days(120);
        // Bypass save_trends so last_updated stays stale.
        store
            .trends
            .write()
            .await
            .insert(stale.id.clone(), stale);
        store.save_trends(&[record("fresh", 50.0, None)]).await.unwrap();

        let removed = store.cleanup_old_data(90).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_trend_by_id("old").await.unwrap().is_none());
        assert!(store.get_trend_by_id("fresh").await.unwrap().is_some());
    }
}
