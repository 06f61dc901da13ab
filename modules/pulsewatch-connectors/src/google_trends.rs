//! Google Trends connector, built on the public dailytrends endpoint.
//!
//! The endpoint is unofficial: responses carry an XSSI guard prefix that
//! must be stripped before JSON parsing, and the shape occasionally shifts.
//! Parse failures degrade the source instead of failing the run.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::warn;

use pulsewatch_common::types::{ConnectorResult, SourceStatus, TrendItem};

use crate::connector::Connector;

const DAILY_TRENDS_URL: &str = "https://trends.google.com/trends/api/dailytrends";

pub struct GoogleTrendsConnector {
    client: Client,
    limit: usize,
}

impl GoogleTrendsConnector {
    pub fn new(client: Client, limit: usize) -> Self {
        Self { client, limit }
    }

    async fn fetch_daily_trends(&self, geo: &str) -> Result<Vec<TrendItem>> {
        let body = self
            .client
            .get(DAILY_TRENDS_URL)
            .query(&[("hl", "en"), ("tz", "0"), ("geo", geo), ("ns", "15")])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let json: serde_json::Value = serde_json::from_str(strip_xssi_prefix(&body))
            .context("dailytrends response is not valid JSON")?;

        let days = json
            .pointer("/default/trendingSearchesDays")
            .and_then(|v| v.as_array())
            .context("dailytrends response missing trendingSearchesDays")?;

        let mut items = Vec::new();
        for day in days {
            let searches = day
                .get("trendingSearches")
                .and_then(|v| v.as_array())
                .map(|a| a.as_slice())
                .unwrap_or_default();

            for search in searches {
                if items.len() >= self.limit {
                    return Ok(items);
                }
                let query = match search.pointer("/title/query").and_then(|v| v.as_str()) {
                    Some(q) if !q.is_empty() => q,
                    _ => continue,
                };
                let rank = items.len();
                let share_url = search.get("shareUrl").and_then(|v| v.as_str());

                let mut item = TrendItem::new("google_trends", query, share_url);
                item.description = format!("Trending search in {geo}");
                item.raw_text = query.to_string();
                item.market = Some(geo.to_string());
                // The endpoint exposes rank order, not absolute counts.
                // Map rank to a descending volume proxy.
                item.volume = 100u64.saturating_sub(rank as u64 * 5);
                item.metadata.insert("type".to_string(), "daily_trend".into());
                item.metadata.insert("rank".to_string(), (rank + 1).into());
                item.metadata.insert("geo".to_string(), geo.into());
                if let Some(traffic) = search.get("formattedTraffic").and_then(|v| v.as_str()) {
                    item.metadata
                        .insert("formatted_traffic".to_string(), traffic.into());
                }
                if let Some(related) = search.get("relatedQueries").and_then(|v| v.as_array()) {
                    let queries: Vec<serde_json::Value> = related
                        .iter()
                        .filter_map(|r| r.get("query").cloned())
                        .collect();
                    item.metadata
                        .insert("related_queries".to_string(), queries.into());
                }
                items.push(item);
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl Connector for GoogleTrendsConnector {
    fn name(&self) -> &str {
        "google_trends"
    }

    async fn fetch(&self, markets: &[String], _keywords: &[String]) -> Result<ConnectorResult> {
        let mut result = ConnectorResult::new(self.name(), SourceStatus::Active);

        for market in markets {
            result.requests_made += 1;
            match self.fetch_daily_trends(market).await {
                Ok(items) => result.items.extend(items),
                Err(e) => {
                    warn!(market = %market, error = %e, "Daily trends fetch failed");
                    result.errors.push(format!("{market}: {e}"));
                }
            }
        }

        if !result.errors.is_empty() || result.items.is_empty() {
            result.status = if result.items.is_empty() && !result.errors.is_empty() {
                SourceStatus::Unavailable
            } else {
                SourceStatus::Degraded
            };
        }
        result.completed_at = Utc::now();
        Ok(result)
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(DAILY_TRENDS_URL)
            .query(&[("hl", "en"), ("tz", "0"), ("geo", "NG"), ("ns", "15")])
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

/// Strip the `)]}',` XSSI guard Google prepends to JSON endpoints.
fn strip_xssi_prefix(body: &str) -> &str {
    body.trim_start_matches(")]}',").trim_start()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xssi_prefix_is_stripped() {
        let body = ")]}',\n{\"default\": {}}";
        assert_eq!(strip_xssi_prefix(body), "{\"default\": {}}");
        assert_eq!(strip_xssi_prefix("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn stripped_body_parses_as_json() {
        let body = ")]}',\n{\"default\":{\"trendingSearchesDays\":[{\"trendingSearches\":[{\"title\":{\"query\":\"asake\"},\"formattedTraffic\":\"200K+\"}]}]}}";
        let json: serde_json::Value = serde_json::from_str(strip_xssi_prefix(body)).unwrap();
        let query = json
            .pointer("/default/trendingSearchesDays/0/trendingSearches/0/title/query")
            .and_then(|v| v.as_str());
        assert_eq!(query, Some("asake"));
    }
}
