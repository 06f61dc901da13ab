//! Reddit connector using the public JSON listing API. No credentials
//! needed; rate limits apply, so subreddit lists should stay short.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use pulsewatch_common::types::{ConnectorResult, SourceStatus, TrendItem};

use crate::connector::Connector;

pub struct RedditConnector {
    client: Client,
    subreddits: Vec<String>,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: RedditPost,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    title: String,
    #[serde(default)]
    selftext: String,
    permalink: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    upvote_ratio: f64,
    subreddit: String,
}

impl RedditConnector {
    pub fn new(client: Client, subreddits: Vec<String>, limit: usize) -> Self {
        Self {
            client,
            subreddits,
            limit,
        }
    }

    async fn fetch_subreddit(&self, subreddit: &str, keywords: &[String]) -> Result<Vec<TrendItem>> {
        let url = format!("https://www.reddit.com/r/{subreddit}/hot.json");
        let listing: Listing = self
            .client
            .get(&url)
            .query(&[("limit", self.limit.to_string())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        let mut items = Vec::new();

        for child in listing.data.children {
            let post = child.data;
            let haystack = format!("{} {}", post.title, post.selftext).to_lowercase();
            if !lowered.is_empty() && !lowered.iter().any(|k| haystack.contains(k.as_str())) {
                continue;
            }

            let url = format!("https://www.reddit.com{}", post.permalink);
            let mut item = TrendItem::new("reddit", &post.title, Some(&url));
            item.description = truncate(&post.selftext, 500);
            item.raw_text = format!("{} {}", post.title, post.selftext);
            item.volume = post.score.max(0) as u64;
            item.engagement = (post.score.max(0) + post.num_comments.max(0)) as u64;
            item.published_at = DateTime::from_timestamp(post.created_utc as i64, 0);
            item.metadata.insert("type".to_string(), "reddit_post".into());
            item.metadata
                .insert("subreddit".to_string(), post.subreddit.clone().into());
            item.metadata
                .insert("num_comments".to_string(), post.num_comments.into());
            item.metadata
                .insert("upvote_ratio".to_string(), post.upvote_ratio.into());
            items.push(item);
        }

        Ok(items)
    }
}

#[async_trait]
impl Connector for RedditConnector {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn fetch(&self, _markets: &[String], keywords: &[String]) -> Result<ConnectorResult> {
        let mut result = ConnectorResult::new(self.name(), SourceStatus::Active);

        if self.subreddits.is_empty() {
            result.status = SourceStatus::Degraded;
            result.warnings.push("No subreddits configured".to_string());
            result.completed_at = Utc::now();
            return Ok(result);
        }

        let fetches = self
            .subreddits
            .iter()
            .map(|sub| self.fetch_subreddit(sub, keywords));
        let outcomes = join_all(fetches).await;
        result.requests_made = self.subreddits.len() as u32;

        for (sub, outcome) in self.subreddits.iter().zip(outcomes) {
            match outcome {
                Ok(items) => result.items.extend(items),
                Err(e) => {
                    warn!(subreddit = %sub, error = %e, "Subreddit fetch failed");
                    result.errors.push(format!("r/{sub}: {e}"));
                }
            }
        }

        if result.errors.len() == self.subreddits.len() {
            result.status = SourceStatus::Unavailable;
        } else if !result.errors.is_empty() || result.items.is_empty() {
            result.status = SourceStatus::Degraded;
        }
        result.completed_at = Utc::now();
        Ok(result)
    }

    async fn health_check(&self) -> bool {
        self.client
            .get("https://www.reddit.com/r/Africa/hot.json?limit=1")
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    // Cut on a char boundary at or below the byte limit.
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_parses_and_maps_engagement() {
        let body = r#"{
            "data": {
                "children": [
                    {
                        "data": {
                            "title": "Amapiano is taking over",
                            "selftext": "discussion",
                            "permalink": "/r/southafrica/comments/abc/amapiano/",
                            "score": 120,
                            "num_comments": 45,
                            "created_utc": 1700000000.0,
                            "subreddit": "southafrica"
                        }
                    }
                ]
            }
        }"#;
        let listing: Listing = serde_json::from_str(body).unwrap();
        let post = &listing.data.children[0].data;
        assert_eq!(post.score + post.num_comments, 165);
        assert_eq!(post.subreddit, "southafrica");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "café culture everywhere";
        let cut = truncate(s, 4);
        assert!(cut.len() <= 4);
        assert!(s.starts_with(&cut));
    }
}
