//! Wikipedia pageviews connector. Tracks attention spikes for seed
//! entities (artists, genres, platforms) via the Wikimedia REST API.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use pulsewatch_common::types::{ConnectorResult, SourceStatus, TrendItem};

use crate::connector::Connector;

const WIKIMEDIA_API: &str = "https://wikimedia.org/api/rest_v1";

/// Pages below this 7-day view total are ignored unless they are spiking.
const PAGEVIEW_THRESHOLD: u64 = 10_000;
const SPIKE_VELOCITY: f64 = 0.5;

pub struct WikipediaConnector {
    client: Client,
    /// Page titles to track, usually seed entity names.
    pages: Vec<String>,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct PageviewsResponse {
    #[serde(default)]
    items: Vec<PageviewsDay>,
}

#[derive(Debug, Deserialize)]
struct PageviewsDay {
    #[serde(default)]
    views: u64,
}

impl WikipediaConnector {
    pub fn new(client: Client, pages: Vec<String>, limit: usize) -> Self {
        Self {
            client,
            pages,
            limit,
        }
    }

    async fn fetch_pageviews(&self, page_title: &str) -> Result<Option<TrendItem>> {
        let end = Utc::now();
        let start = end - Duration::days(7);
        let page_url = page_title.replace(' ', "_");
        let url = format!(
            "{WIKIMEDIA_API}/metrics/pageviews/per-article/en.wikipedia/all-access/all-agents/{page_url}/daily/{}/{}",
            start.format("%Y%m%d"),
            end.format("%Y%m%d"),
        );

        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            // No article for this name.
            return Ok(None);
        }
        let response: PageviewsResponse = response.error_for_status()?.json().await?;

        let views: Vec<u64> = response.items.iter().map(|d| d.views).collect();
        if views.is_empty() {
            return Ok(None);
        }
        let (item, keep) = build_pageview_item(page_title, &page_url, &views);
        Ok(keep.then_some(item))
    }
}

/// Build an item from a daily view series and decide whether it clears the
/// volume threshold or spike gate.
fn build_pageview_item(page_title: &str, page_url: &str, views: &[u64]) -> (TrendItem, bool) {
    let total: u64 = views.iter().sum();
    let latest = *views.last().unwrap_or(&0);

    // Velocity compares the latest day against the trailing baseline.
    let baseline = if views.len() > 1 {
        views[..views.len() - 1].iter().sum::<u64>() as f64 / (views.len() - 1) as f64
    } else {
        total as f64 / views.len().max(1) as f64
    };
    let velocity = if baseline > 0.0 {
        (latest as f64 - baseline) / baseline
    } else {
        0.0
    };

    let article_url = format!("https://en.wikipedia.org/wiki/{page_url}");
    let mut item = TrendItem::new("wikipedia", page_title, Some(&article_url));
    item.description = format!("Wikipedia page with {total} views in 7 days");
    item.raw_text = page_title.to_string();
    item.volume = total;
    item.velocity = velocity;
    item.metadata
        .insert("type".to_string(), "wikipedia_pageviews".into());
    item.metadata
        .insert("latest_daily".to_string(), latest.into());
    item.metadata
        .insert("average_daily".to_string(), (baseline.round() as u64).into());
    item.metadata.insert(
        "spike_detected".to_string(),
        (velocity > SPIKE_VELOCITY).into(),
    );

    let keep = total >= PAGEVIEW_THRESHOLD || velocity >= SPIKE_VELOCITY;
    (item, keep)
}

#[async_trait]
impl Connector for WikipediaConnector {
    fn name(&self) -> &str {
        "wikipedia"
    }

    async fn fetch(&self, _markets: &[String], keywords: &[String]) -> Result<ConnectorResult> {
        let mut result = ConnectorResult::new(self.name(), SourceStatus::Active);

        // Track configured pages plus any run-scoped keywords.
        let mut pages: Vec<&str> = self.pages.iter().map(|p| p.as_str()).collect();
        for keyword in keywords {
            if !pages.contains(&keyword.as_str()) {
                pages.push(keyword);
            }
        }
        pages.truncate(self.limit);

        if pages.is_empty() {
            result.status = SourceStatus::Degraded;
            result.warnings.push("No pages to track".to_string());
            result.completed_at = Utc::now();
            return Ok(result);
        }

        let fetches = pages.iter().map(|page| self.fetch_pageviews(page));
        let outcomes = join_all(fetches).await;
        result.requests_made = pages.len() as u32;

        for (page, outcome) in pages.iter().zip(outcomes) {
            match outcome {
                Ok(Some(item)) => result.items.push(item),
                Ok(None) => {}
                Err(e) => {
                    warn!(page = %page, error = %e, "Pageview fetch failed");
                    result.errors.push(format!("{page}: {e}"));
                }
            }
        }

        if result.errors.len() == pages.len() {
            result.status = SourceStatus::Unavailable;
        } else if result.items.is_empty() {
            result.status = SourceStatus::Degraded;
        }
        result.completed_at = Utc::now();
        Ok(result)
    }

    async fn health_check(&self) -> bool {
        let url = format!(
            "{WIKIMEDIA_API}/metrics/pageviews/top/en.wikipedia/all-access/2024/01/01"
        );
        self.client
            .get(&url)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
