//! YouTube Data API v3 connector. Pulls the Music trending chart per
//! market region. Needs an API key; without one the source reports
//! requires_auth and the run continues on the other sources.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use pulsewatch_common::types::{ConnectorResult, SourceStatus, TrendItem};

use crate::connector::Connector;

const VIDEOS_URL: &str = "https://www.googleapis.com/youtube/v3/videos";
const MUSIC_CATEGORY_ID: &str = "10";

pub struct YouTubeConnector {
    client: Client,
    api_key: Option<String>,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    id: String,
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: String,
    published_at: Option<DateTime<Utc>>,
}

// The API returns counters as strings.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    #[serde(default)]
    view_count: Option<String>,
    #[serde(default)]
    like_count: Option<String>,
    #[serde(default)]
    comment_count: Option<String>,
}

impl Statistics {
    fn count(field: &Option<String>) -> u64 {
        field
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }
}

impl YouTubeConnector {
    pub fn new(client: Client, api_key: Option<String>, limit: usize) -> Self {
        Self {
            client,
            api_key,
            limit,
        }
    }

    async fn fetch_trending(&self, api_key: &str, region: &str) -> Result<Vec<TrendItem>> {
        let max_results = self.limit.to_string();
        let response: VideoListResponse = self
            .client
            .get(VIDEOS_URL)
            .query(&[
                ("part", "snippet,statistics"),
                ("chart", "mostPopular"),
                ("regionCode", region),
                ("videoCategoryId", MUSIC_CATEGORY_ID),
                ("maxResults", max_results.as_str()),
                ("key", api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut items = Vec::new();
        for video in response.items {
            let url = format!("https://youtube.com/watch?v={}", video.id);
            let views = Statistics::count(&video.statistics.view_count);
            let likes = Statistics::count(&video.statistics.like_count);
            let comments = Statistics::count(&video.statistics.comment_count);

            let mut item = TrendItem::new("youtube", &video.snippet.title, Some(&url));
            item.description = truncate(&video.snippet.description, 500);
            item.raw_text = format!("{} {}", video.snippet.title, item.description);
            item.market = Some(region.to_string());
            item.volume = views;
            item.engagement = likes + comments;
            item.published_at = video.snippet.published_at;
            item.metadata
                .insert("type".to_string(), "youtube_trending".into());
            item.metadata.insert(
                "channel_title".to_string(),
                video.snippet.channel_title.clone().into(),
            );
            item.metadata.insert("region".to_string(), region.into());
            item.metadata.insert("view_count".to_string(), views.into());
            item.metadata.insert("like_count".to_string(), likes.into());
            item.metadata
                .insert("comment_count".to_string(), comments.into());
            items.push(item);
        }
        Ok(items)
    }
}

#[async_trait]
impl Connector for YouTubeConnector {
    fn name(&self) -> &str {
        "youtube"
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn fetch(&self, markets: &[String], _keywords: &[String]) -> Result<ConnectorResult> {
        let Some(api_key) = self.api_key.as_deref() else {
            let mut result = ConnectorResult::new(self.name(), SourceStatus::RequiresAuth);
            result
                .warnings
                .push("YOUTUBE_API_KEY not configured".to_string());
            result.completed_at = Utc::now();
            return Ok(result);
        };

        let mut result = ConnectorResult::new(self.name(), SourceStatus::Active);
        for market in markets {
            result.requests_made += 1;
            match self.fetch_trending(api_key, market).await {
                Ok(items) => result.items.extend(items),
                Err(e) => {
                    warn!(market = %market, error = %e, "YouTube trending fetch failed");
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
        self.api_key.is_some()
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}
