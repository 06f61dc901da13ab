//! End-to-end pipeline tests: stub connectors in, trend cards out, with
//! the in-memory store standing in for Postgres.

use pulsewatch_common::types::{
    Confidence, RiskLevel, SuggestedAction, TrendItem, TrendRecord,
};
use pulsewatch_common::FileConfig;
use pulsewatch_connectors::{Connector, StubConnector};
use pulsewatch_pipeline::Orchestrator;
use pulsewatch_store::{MemoryTrendStore, TrendFilters, TrendStore};

fn orchestrator(connectors: Vec<Box<dyn Connector>>) -> Orchestrator {
    Orchestrator::new(&FileConfig::builtin(), connectors, None)
}

fn item(source: &str, title: &str, url: &str) -> TrendItem {
    TrendItem::new(source, title, Some(url))
}

#[tokio::test]
async fn high_risk_spotify_story_escalates() {
    let mut story = item(
        "news_rss",
        "Spotify outage scandal hits Nigeria",
        "https://news.example/outage",
    );
    story.volume = 10_000;
    story.engagement = 5_000;

    let outcome = orchestrator(vec![Box::new(StubConnector::new("news_rss", vec![story]))])
        .run_full_pipeline(&[], &[])
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.summaries.len(), 1);

    let card = &outcome.summaries[0];
    assert_eq!(card.market.as_deref(), Some("NG"));
    assert_eq!(card.topic, "spotify_specific");
    assert_eq!(card.subtopic.as_deref(), Some("mentions"));
    assert_eq!(card.risk_level, RiskLevel::High);
    assert_eq!(card.suggested_action, SuggestedAction::Escalate);
    // velocity 10 * .25 + reach 60 * .20 + market 75 * .20
    // + adjacency 100 * .20 + risk 100 * .15
    assert_eq!(card.total_score, 64.5);
    assert_eq!(card.why_it_matters.len(), 2);
    assert!(card.why_it_matters[1].contains("HIGH SENSITIVITY"));
    assert!(card.if_goes_wrong.contains("scandal"));
}

#[tokio::test]
async fn benign_artist_story_is_monitored_with_low_confidence() {
    let mut story = item(
        "reddit",
        "Burna Boy releases new single",
        "https://reddit.example/r/afrobeats/1",
    );
    story.volume = 150;
    story.engagement = 300;

    let outcome = orchestrator(vec![Box::new(StubConnector::new("reddit", vec![story]))])
        .run_full_pipeline(&[], &[])
        .await;

    let card = &outcome.summaries[0];
    assert_eq!(card.topic, "music_audio");
    assert_eq!(card.subtopic.as_deref(), Some("songs"));
    assert_eq!(card.market, None);
    assert_eq!(card.key_entities["artists"], vec!["Burna Boy".to_string()]);
    assert_eq!(card.risk_level, RiskLevel::Low);
    assert_eq!(card.suggested_action, SuggestedAction::Monitor);
    assert_eq!(card.confidence, Confidence::Low);
    assert_eq!(card.total_score, 30.0);
}

#[tokio::test]
async fn same_story_across_sources_becomes_one_card() {
    let title = "Amapiano festival announced in Johannesburg";
    let mut from_reddit = item("reddit", title, "https://reddit.example/r/za/9");
    from_reddit.engagement = 500;
    let mut from_news = item("news_rss", title, "https://news.example/festival");
    from_news.engagement = 10;

    let outcome = orchestrator(vec![
        Box::new(StubConnector::new("reddit", vec![from_reddit])),
        Box::new(StubConnector::new("news_rss", vec![from_news])),
    ])
    .run_full_pipeline(&[], &[])
    .await;

    assert_eq!(outcome.summaries.len(), 1);
    let card = &outcome.summaries[0];
    assert_eq!(
        card.sources,
        vec!["reddit".to_string(), "news_rss".to_string()]
    );
    assert_eq!(card.market.as_deref(), Some("ZA"));
    assert_eq!(card.topic, "music_audio");
    assert_eq!(card.subtopic.as_deref(), Some("genres"));
    // Two corroborating sources plus an entity and a market.
    assert_eq!(card.confidence, Confidence::Medium);
    assert_eq!(card.total_score, 41.0);
}

#[tokio::test]
async fn empty_collection_is_reported_not_panicked() {
    let outcome = orchestrator(vec![Box::new(StubConnector::new("reddit", vec![]))])
        .run_full_pipeline(&[], &[])
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, "No items collected from any source");
    assert!(outcome.summaries.is_empty());
    assert_eq!(outcome.stats.total_trends, 0);
}

#[tokio::test]
async fn one_failing_source_does_not_sink_the_run() {
    let story = item(
        "reddit",
        "Uncle Waffles announces Nairobi show",
        "https://reddit.example/r/kenya/4",
    );

    let outcome = orchestrator(vec![
        Box::new(StubConnector::failing("news_rss")),
        Box::new(StubConnector::new("reddit", vec![story])),
    ])
    .run_full_pipeline(&[], &[])
    .await;

    assert!(outcome.success);
    assert_eq!(outcome.summaries.len(), 1);
    assert_eq!(outcome.metrics.sources_successful, 1);
    assert_eq!(outcome.metrics.sources_total, 2);
    assert_eq!(outcome.summaries[0].market.as_deref(), Some("KE"));
}

#[tokio::test]
async fn run_metrics_cover_every_stage() {
    let story = item("reddit", "Tyla tops another chart", "https://reddit.example/r/music/7");
    let outcome = orchestrator(vec![Box::new(StubConnector::new("reddit", vec![story]))])
        .run_full_pipeline(&[], &[])
        .await;

    for stage in ["collect", "clean", "enrich", "classify", "score", "summarise"] {
        assert!(
            outcome.metrics.stages.contains_key(stage),
            "missing stage metrics for {stage}"
        );
    }
    assert_eq!(outcome.items_collected(), 1);
    assert!(outcome.metrics.completed_at.is_some());
}

#[tokio::test]
async fn summaries_persist_and_read_back_ranked() {
    let mut hot = item(
        "news_rss",
        "Spotify outage scandal hits Nigeria",
        "https://news.example/outage",
    );
    hot.volume = 10_000;
    hot.engagement = 5_000;
    let quiet = item(
        "reddit",
        "Burna Boy releases new single",
        "https://reddit.example/r/afrobeats/1",
    );

    let outcome = orchestrator(vec![
        Box::new(StubConnector::new("news_rss", vec![hot])),
        Box::new(StubConnector::new("reddit", vec![quiet])),
    ])
    .run_full_pipeline(&[], &[])
    .await;
    assert_eq!(outcome.summaries.len(), 2);

    let records: Vec<TrendRecord> = outcome.summaries.iter().map(TrendRecord::from).collect();
    let store = MemoryTrendStore::new();
    store.save_trends(&records).await.unwrap();

    let stored = store.get_trends(&TrendFilters::default()).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].total_score, 64.5);
    assert!(stored[0].total_score > stored[1].total_score);
    assert_eq!(stored[0].suggested_action, SuggestedAction::Escalate);
    assert_eq!(stored[0].spotify_adjacency_score, 100.0);

    let by_id = store.get_trend_by_id(&stored[0].id).await.unwrap().unwrap();
    assert_eq!(by_id.market.as_deref(), Some("NG"));
    assert!(by_id.first_seen.is_some());
}
