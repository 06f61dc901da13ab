//! RSS news connector. Polls configured African news and music feeds and
//! keeps entries that mention a tracked keyword.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use reqwest::Client;
use tracing::warn;

use pulsewatch_common::file_config::FeedEntry;
use pulsewatch_common::types::{ConnectorResult, SourceStatus, TrendItem};

use crate::connector::Connector;

pub struct NewsRssConnector {
    client: Client,
    feeds: Vec<FeedEntry>,
    limit: usize,
}

impl NewsRssConnector {
    pub fn new(client: Client, feeds: Vec<FeedEntry>, limit: usize) -> Self {
        Self {
            client,
            feeds,
            limit,
        }
    }

    async fn fetch_feed(&self, feed: &FeedEntry, keywords: &[String]) -> Result<Vec<TrendItem>> {
        let bytes = self
            .client
            .get(&feed.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let parsed = feed_rs::parser::parse(bytes.as_ref())?;

        let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        let mut items = Vec::new();

        for entry in parsed.entries.into_iter().take(self.limit) {
            let title = match entry.title {
                Some(t) if !t.content.trim().is_empty() => t.content,
                _ => continue,
            };
            let summary = entry.summary.map(|s| s.content).unwrap_or_default();

            // Keyword gate: general news feeds carry plenty of content we
            // do not track. An empty keyword list keeps everything.
            let haystack = format!("{} {}", title, summary).to_lowercase();
            if !lowered.is_empty() && !lowered.iter().any(|k| haystack.contains(k.as_str())) {
                continue;
            }

            let link = entry.links.first().map(|l| l.href.clone());
            let mut item = TrendItem::new("news_rss", &title, link.as_deref());
            item.description = summary.clone();
            item.raw_text = format!("{} {}", title, summary);
            item.published_at = entry.published.or(entry.updated);
            item.metadata
                .insert("type".to_string(), "news_article".into());
            item.metadata
                .insert("feed_name".to_string(), feed.name.clone().into());
            items.push(item);
        }

        Ok(items)
    }
}

#[async_trait]
impl Connector for NewsRssConnector {
    fn name(&self) -> &str {
        "news_rss"
    }

    async fn fetch(&self, _markets: &[String], keywords: &[String]) -> Result<ConnectorResult> {
        let mut result = ConnectorResult::new(self.name(), SourceStatus::Active);

        if self.feeds.is_empty() {
            result.status = SourceStatus::Degraded;
            result.warnings.push("No feeds configured".to_string());
            result.completed_at = Utc::now();
            return Ok(result);
        }

        let fetches = self.feeds.iter().map(|feed| self.fetch_feed(feed, keywords));
        let outcomes = join_all(fetches).await;
        result.requests_made = self.feeds.len() as u32;

        for (feed, outcome) in self.feeds.iter().zip(outcomes) {
            match outcome {
                Ok(items) => result.items.extend(items),
                Err(e) => {
                    warn!(feed = %feed.url, error = %e, "Feed fetch failed");
                    result.errors.push(format!("{}: {e}", feed.name));
                }
            }
        }

        // All feeds down means unavailable; partial failures just degrade.
        if result.errors.len() == self.feeds.len() {
            result.status = SourceStatus::Unavailable;
        } else if !result.errors.is_empty() || result.items.is_empty() {
            result.status = SourceStatus::Degraded;
        }
        result.completed_at = Utc::now();
        Ok(result)
    }

    async fn health_check(&self) -> bool {
        match self.feeds.first() {
            Some(feed) => self
                .client
                .get(&feed.url)
                .send()
                .await
                .map(|r| r.status().is_success())
                .unwrap_or(false),
            None => false,
        }
    }
}
