//! Summarisation stage: turns scored items into comms-ready cards.
//!
//! Every card answers four questions: what's happening, why it matters
//! (exactly two bullets), what to do, and what the downside looks like.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::info;

use pulsewatch_common::file_config::{FileConfig, Thresholds, TopicConfig};
use pulsewatch_common::types::{
    PriorityLevel, RiskLevel, ScoreBreakdown, TrendItem, TrendSummary,
};

/// Downside scenario per topic, used when no acute risk signal was found.
const TOPIC_RISKS: &[(&str, &str)] = &[
    (
        "current_affairs",
        "If Spotify appears to take sides or misreads public sentiment, risk of boycott calls or backlash in market.",
    ),
    (
        "brand_comms",
        "Misstep could amplify negative conversation and associate Spotify with controversy.",
    ),
    (
        "music_audio",
        "Artist-related controversy could impact playlist partnerships and creator relations.",
    ),
    (
        "culture",
        "Tone-deaf engagement could damage youth/cultural credibility.",
    ),
    (
        "fashion_beauty",
        "Brand association with wrong influencer could affect perception.",
    ),
    (
        "spotify_specific",
        "Direct brand issue requires immediate comms response; delay increases reputational risk.",
    ),
];

pub struct Summariser {
    topics: BTreeMap<String, TopicConfig>,
    thresholds: Thresholds,
}

impl Summariser {
    pub fn new(config: &FileConfig) -> Self {
        Self {
            topics: config.topics.clone(),
            thresholds: config.scoring.thresholds.clone(),
        }
    }

    pub fn summarise_batch(
        &self,
        scored: &[(TrendItem, ScoreBreakdown)],
    ) -> Vec<TrendSummary> {
        let summaries: Vec<TrendSummary> = scored
            .iter()
            .map(|(item, breakdown)| self.summarise_item(item, breakdown))
            .collect();
        info!(count = summaries.len(), "Summarisation complete");
        summaries
    }

    pub fn summarise_item(&self, item: &TrendItem, breakdown: &ScoreBreakdown) -> TrendSummary {
        let topic = item.topic.clone().unwrap_or_else(|| "unknown".to_string());
        let topic_display = self
            .topics
            .get(&topic)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| topic.clone());

        TrendSummary {
            trend_id: item.id.clone(),
            title: item.title.clone(),
            whats_happening: whats_happening(item, breakdown),
            why_it_matters: why_it_matters(item, breakdown),
            suggested_action: breakdown.suggested_action,
            if_goes_wrong: risk_scenario(item, breakdown),
            topic,
            topic_display,
            subtopic: item.subtopic.clone(),
            market: item.market.clone(),
            language: item.language.clone(),
            total_score: (breakdown.total_score * 10.0).round() / 10.0,
            priority_level: self.priority_level(breakdown.total_score),
            risk_level: breakdown.risk_level,
            confidence: breakdown.confidence,
            score_breakdown: breakdown.to_json(),
            sources: item.merged_sources(),
            source_url: item.source_url.clone(),
            key_entities: item.entities.clone(),
            first_seen: item.published_at,
            last_updated: Utc::now(),
        }
    }

    fn priority_level(&self, score: f64) -> PriorityLevel {
        if score >= self.thresholds.high_priority {
            PriorityLevel::High
        } else if score >= self.thresholds.medium_priority {
            PriorityLevel::Medium
        } else {
            PriorityLevel::Low
        }
    }
}

fn whats_happening(item: &TrendItem, breakdown: &ScoreBreakdown) -> String {
    let title: String = item.title.chars().take(100).collect();
    let mut parts = vec![if title.is_empty() {
        "Unidentified trend".to_string()
    } else {
        title
    }];

    let mut context = Vec::new();
    if let Some(market) = &item.market {
        context.push(format!("trending in {market}"));
    }
    if breakdown.velocity_score >= 60.0 {
        context.push("gaining momentum".to_string());
    }
    if let Some(artists) = item.entities.get("artists") {
        if !artists.is_empty() {
            let named: Vec<&str> = artists.iter().take(2).map(|a| a.as_str()).collect();
            context.push(format!("featuring {}", named.join(", ")));
        }
    }
    if !context.is_empty() {
        parts.push(format!("({})", context.join(", ")));
    }
    parts.join(" ")
}

/// Exactly two bullets: one on Spotify relevance, one on impact/risk.
fn why_it_matters(item: &TrendItem, breakdown: &ScoreBreakdown) -> Vec<String> {
    let mut bullets = Vec::with_capacity(2);

    if breakdown.spotify_adjacency_score >= 80.0 {
        if item.title.to_lowercase().contains("spotify") {
            bullets.push(
                "Direct Spotify mention - requires monitoring for brand impact and response opportunity."
                    .to_string(),
            );
        } else {
            bullets.push(
                "Highly relevant to music/audio culture - strong opportunity for brand alignment."
                    .to_string(),
            );
        }
    } else if breakdown.spotify_adjacency_score >= 50.0 {
        match item.entities.get("artists").filter(|a| !a.is_empty()) {
            Some(artists) => {
                let named: Vec<&str> = artists.iter().take(2).map(|a| a.as_str()).collect();
                bullets.push(format!(
                    "Involves key artists ({}) - potential partnership or content opportunity.",
                    named.join(", ")
                ));
            }
            None => bullets.push(
                "Connected to youth culture and entertainment - contextual relevance for campaigns."
                    .to_string(),
            ),
        }
    } else {
        bullets.push("Tangential to core music audience - monitor for cultural context only.".to_string());
    }

    match breakdown.risk_level {
        RiskLevel::High => bullets.push(format!(
            "HIGH SENSITIVITY: {}. Avoid association, prepare holding statement.",
            breakdown.risk_reason
        )),
        RiskLevel::Medium => bullets.push(
            "Moderate sensitivity detected. Monitor closely before any engagement.".to_string(),
        ),
        RiskLevel::Low => {
            if breakdown.total_score >= 70.0 {
                let market = item.market.as_deref().unwrap_or("multiple markets");
                bullets.push(format!(
                    "High visibility trend in {market}. Good timing for relevant content or creator collaboration."
                ));
            } else if breakdown.velocity_score >= 60.0 {
                bullets.push(
                    "Rapidly growing - early engagement could establish brand presence.".to_string(),
                );
            } else {
                bullets.push("Standard trend velocity. No urgent action required.".to_string());
            }
        }
    }

    bullets
}

fn risk_scenario(item: &TrendItem, breakdown: &ScoreBreakdown) -> String {
    if breakdown.risk_level == RiskLevel::High {
        let keywords = breakdown
            .risk_keywords_found
            .iter()
            .take(2)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        return format!(
            "Serious reputational risk due to {keywords}. Any association could trigger backlash and media scrutiny."
        );
    }

    let topic_risk = item
        .topic
        .as_deref()
        .and_then(|topic| TOPIC_RISKS.iter().find(|(key, _)| *key == topic))
        .map(|(_, scenario)| scenario.to_string());

    if breakdown.risk_level == RiskLevel::Medium {
        return topic_risk.unwrap_or_else(|| {
            "Engagement without proper context could appear opportunistic or insensitive."
                .to_string()
        });
    }

    topic_risk.unwrap_or_else(|| {
        "Minimal downside if approached authentically. Main risk is appearing irrelevant or late."
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsewatch_common::types::{Confidence, SuggestedAction};

    fn summariser() -> Summariser {
        Summariser::new(&FileConfig::builtin())
    }

    fn breakdown(total: f64, adjacency: f64, risk_level: RiskLevel) -> ScoreBreakdown {
        ScoreBreakdown {
            total_score: total,
            spotify_adjacency_score: adjacency,
            risk_level,
            risk_reason: "Medium risk: backlash".to_string(),
            suggested_action: SuggestedAction::Monitor,
            confidence: Confidence::Medium,
            ..Default::default()
        }
    }

    #[test]
    fn why_it_matters_always_has_exactly_two_bullets() {
        let mut item = TrendItem::new("reddit", "Some trend", None);
        for (total, adjacency, level) in [
            (85.0, 95.0, RiskLevel::Low),
            (55.0, 60.0, RiskLevel::Medium),
            (20.0, 20.0, RiskLevel::High),
            (72.0, 40.0, RiskLevel::Low),
        ] {
            let b = breakdown(total, adjacency, level);
            assert_eq!(why_it_matters(&item, &b).len(), 2);
        }
        item.entities
            .insert("artists".to_string(), vec!["Tems".to_string()]);
        let b = breakdown(55.0, 60.0, RiskLevel::Low);
        let bullets = why_it_matters(&item, &b);
        assert_eq!(bullets.len(), 2);
        assert!(bullets[0].contains("Tems"));
    }

    #[test]
    fn whats_happening_includes_market_and_artists() {
        let mut item = TrendItem::new("youtube", "Asake sells out arena", None);
        item.market = Some("NG".to_string());
        item.entities
            .insert("artists".to_string(), vec!["Asake".to_string()]);
        let mut b = breakdown(70.0, 80.0, RiskLevel::Low);
        b.velocity_score = 80.0;

        let line = whats_happening(&item, &b);
        assert!(line.starts_with("Asake sells out arena"));
        assert!(line.contains("trending in NG"));
        assert!(line.contains("gaining momentum"));
        assert!(line.contains("featuring Asake"));
    }

    #[test]
    fn high_risk_scenario_names_keywords() {
        let item = TrendItem::new("news_rss", "Scandal erupts", None);
        let mut b = breakdown(50.0, 20.0, RiskLevel::High);
        b.risk_keywords_found = vec!["scandal".to_string(), "lawsuit".to_string()];
        let scenario = risk_scenario(&item, &b);
        assert!(scenario.contains("scandal, lawsuit"));
    }

    #[test]
    fn low_risk_scenario_uses_topic_table() {
        let mut item = TrendItem::new("youtube", "New album charts", None);
        item.topic = Some("music_audio".to_string());
        let b = breakdown(40.0, 70.0, RiskLevel::Low);
        let scenario = risk_scenario(&item, &b);
        assert!(scenario.contains("playlist partnerships"));
    }

    #[test]
    fn summary_carries_classification_and_rounded_score() {
        let mut item = TrendItem::new("reddit", "Amapiano weekend", Some("https://r/x"));
        item.topic = Some("music_audio".to_string());
        item.subtopic = Some("genres".to_string());
        item.market = Some("ZA".to_string());
        let b = breakdown(63.27, 70.0, RiskLevel::Low);

        let summary = summariser().summarise_item(&item, &b);
        assert_eq!(summary.topic, "music_audio");
        assert_eq!(summary.topic_display, "Music & Audio");
        assert_eq!(summary.total_score, 63.3);
        assert_eq!(summary.priority_level, PriorityLevel::Medium);
        assert_eq!(summary.sources, vec!["reddit".to_string()]);
        assert!(summary.score_breakdown.get("components").is_some());
    }

    #[test]
    fn priority_bands_use_configured_thresholds() {
        let s = summariser();
        assert_eq!(s.priority_level(80.0), PriorityLevel::High);
        assert_eq!(s.priority_level(50.0), PriorityLevel::Medium);
        assert_eq!(s.priority_level(49.9), PriorityLevel::Low);
    }
}
