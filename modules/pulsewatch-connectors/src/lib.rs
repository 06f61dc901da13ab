//! Source connectors: one module per upstream signal source, all behind
//! the [`Connector`] trait.
//!
//! The registry is closed: a source named in config must match one of the
//! connectors below, otherwise it gets an always-unavailable placeholder
//! so the gap shows up in run reports. There is no dynamic lookup by name
//! beyond this match.

use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tracing::{info, warn};

pub mod connector;
pub mod google_trends;
pub mod news_rss;
pub mod reddit;
pub mod wikipedia;
pub mod youtube;

pub use connector::{Connector, StubConnector, UnsupportedConnector};

use pulsewatch_common::{Config, FileConfig};

const USER_AGENT: &str = concat!("pulsewatch/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Names this build knows how to construct, in collection order.
const KNOWN_SOURCES: &[&str] = &[
    "news_rss",
    "google_trends",
    "reddit",
    "youtube",
    "wikipedia",
];

/// Build the enabled connectors for a run.
pub fn build_connectors(
    config: &Config,
    file_config: &FileConfig,
) -> Result<Vec<Box<dyn Connector>>> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    let mut connectors: Vec<Box<dyn Connector>> = Vec::new();

    for name in KNOWN_SOURCES {
        let source = file_config.source(name);
        if !source.enabled {
            continue;
        }
        let connector: Box<dyn Connector> = match *name {
            "news_rss" => Box::new(news_rss::NewsRssConnector::new(
                client.clone(),
                source.feeds,
                source.limit,
            )),
            "google_trends" => Box::new(google_trends::GoogleTrendsConnector::new(
                client.clone(),
                source.limit,
            )),
            "reddit" => Box::new(reddit::RedditConnector::new(
                client.clone(),
                source.subreddits,
                source.limit,
            )),
            "youtube" => Box::new(youtube::YouTubeConnector::new(
                client.clone(),
                config.youtube_api_key.clone(),
                source.limit,
            )),
            "wikipedia" => {
                let pages: Vec<String> = file_config
                    .entities
                    .values()
                    .flatten()
                    .cloned()
                    .collect();
                Box::new(wikipedia::WikipediaConnector::new(
                    client.clone(),
                    pages,
                    source.limit,
                ))
            }
            _ => unreachable!("KNOWN_SOURCES covers every arm"),
        };
        connectors.push(connector);
    }

    // Sources enabled in config but not implemented here get a placeholder
    // that reports unavailable, so the gap is visible in run reports.
    for name in file_config.sources.keys() {
        if file_config.source(name).enabled && !KNOWN_SOURCES.contains(&name.as_str()) {
            warn!(source = %name, "Enabled source has no connector in this build");
            connectors.push(Box::new(connector::UnsupportedConnector::new(name.clone())));
        }
    }

    info!(
        connectors = connectors.len(),
        "Built connector registry"
    );
    Ok(connectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_config() -> Config {
        Config {
            database_url: "postgres://localhost/test".to_string(),
            youtube_api_key: None,
            data_retention_days: 90,
            run_interval_hours: 6,
        }
    }

    #[test]
    fn builtin_config_builds_enabled_connectors_in_order() {
        let connectors = build_connectors(&env_config(), &FileConfig::builtin()).unwrap();
        let names: Vec<&str> = connectors.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec!["news_rss", "google_trends", "reddit", "youtube", "wikipedia"]
        );
    }

    #[test]
    fn disabled_sources_are_not_built() {
        let mut file_config = FileConfig::builtin();
        if let Some(source) = file_config.sources.get_mut("reddit") {
            source.enabled = false;
        }
        let connectors = build_connectors(&env_config(), &file_config).unwrap();
        assert!(connectors.iter().all(|c| c.name() != "reddit"));
    }

    #[tokio::test]
    async fn enabled_unknown_source_becomes_unsupported_placeholder() {
        let mut file_config = FileConfig::builtin();
        if let Some(source) = file_config.sources.get_mut("twitter") {
            source.enabled = true;
        }
        let connectors = build_connectors(&env_config(), &file_config).unwrap();
        let twitter = connectors
            .iter()
            .find(|c| c.name() == "twitter")
            .expect("placeholder built for enabled unknown source");

        let result = twitter.fetch(&[], &[]).await.unwrap();
        assert_eq!(result.status, pulsewatch_common::types::SourceStatus::Unavailable);
        assert!(!result.warnings.is_empty());
        assert!(!twitter.health_check().await);
    }

    #[test]
    fn youtube_reports_requiring_auth() {
        let connectors = build_connectors(&env_config(), &FileConfig::builtin()).unwrap();
        let youtube = connectors
            .iter()
            .find(|c| c.name() == "youtube")
            .expect("youtube enabled by default");
        assert!(youtube.requires_auth());
        assert!(!connectors
            .iter()
            .find(|c| c.name() == "reddit")
            .unwrap()
            .requires_auth());
    }
}
