//! Scoring stage: the comms relevance score.
//!
//! Five weighted components, each 0-100 with a one-line reason:
//! velocity (25%), reach (20%), market impact (20%), Spotify adjacency
//! (20%), risk factor (15%). Every number shown to a comms team must be
//! traceable to a reason string produced here.

use std::collections::BTreeMap;

use tracing::info;

use pulsewatch_common::file_config::{FileConfig, RiskKeywords, ScoreWeights, Thresholds};
use pulsewatch_common::types::{
    Confidence, PriorityLevel, RiskLevel, ScoreBreakdown, SuggestedAction, TrendItem,
};

const COMPETITORS: &[&str] = &["apple music", "boomplay", "audiomack", "youtube music", "deezer"];
const MUSIC_KEYWORDS: &[&str] = &["song", "music", "album", "track", "playlist", "stream", "listen"];

pub struct Scorer {
    weights: ScoreWeights,
    market_weights: BTreeMap<String, f64>,
    risk_keywords: RiskKeywords,
    /// Topic key → risk multiplier from the taxonomy. Sensitive topics
    /// (current_affairs, brand_comms) carry weights above 1.0.
    topic_risk_weights: BTreeMap<String, f64>,
    thresholds: Thresholds,
}

impl Scorer {
    pub fn new(config: &FileConfig) -> Self {
        let market_weights = config
            .markets
            .priority
            .iter()
            .map(|m| (m.code.clone(), m.weight))
            .collect();
        let topic_risk_weights = config
            .topics
            .iter()
            .map(|(key, topic)| (key.clone(), topic.risk_weight))
            .collect();
        Self {
            weights: config.scoring.weights.clone(),
            market_weights,
            risk_keywords: config.scoring.risk_keywords.clone(),
            topic_risk_weights,
            thresholds: config.scoring.thresholds.clone(),
        }
    }

    /// Score a batch and return it sorted by total score descending.
    pub fn score_batch(&self, items: Vec<TrendItem>) -> Vec<(TrendItem, ScoreBreakdown)> {
        let mut scored: Vec<(TrendItem, ScoreBreakdown)> = items
            .into_iter()
            .map(|item| {
                let breakdown = self.score_item(&item);
                (item, breakdown)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.total_score
                .partial_cmp(&a.1.total_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });

        if !scored.is_empty() {
            let scores: Vec<f64> = scored.iter().map(|(_, b)| b.total_score).collect();
            info!(
                count = scored.len(),
                avg_score = scores.iter().sum::<f64>() / scores.len() as f64,
                max_score = scores.iter().cloned().fold(f64::MIN, f64::max),
                min_score = scores.iter().cloned().fold(f64::MAX, f64::min),
                "Scoring complete"
            );
        }
        scored
    }

    pub fn score_item(&self, item: &TrendItem) -> ScoreBreakdown {
        let mut breakdown = ScoreBreakdown::default();

        let (velocity_score, velocity_reason) = score_velocity(item);
        let (reach_score, reach_reason) = score_reach(item);
        let (market_score, market_reason) = self.score_market_impact(item);
        let (adjacency_score, adjacency_reason) = score_spotify_adjacency(item);
        let (risk_score, risk_reason, risk_level, risk_keywords_found) = self.score_risk(item);

        breakdown.velocity_score = velocity_score;
        breakdown.velocity_reason = velocity_reason;
        breakdown.reach_score = reach_score;
        breakdown.reach_reason = reach_reason;
        breakdown.market_impact_score = market_score;
        breakdown.market_reason = market_reason;
        breakdown.spotify_adjacency_score = adjacency_score;
        breakdown.adjacency_reason = adjacency_reason;
        breakdown.risk_score = risk_score;
        breakdown.risk_reason = risk_reason;
        breakdown.risk_level = risk_level;
        breakdown.risk_keywords_found = risk_keywords_found;

        breakdown.total_score = breakdown.velocity_score * self.weights.velocity
            + breakdown.reach_score * self.weights.reach
            + breakdown.market_impact_score * self.weights.market_impact
            + breakdown.spotify_adjacency_score * self.weights.spotify_adjacency
            + breakdown.risk_score * self.weights.risk_factor;

        breakdown.suggested_action = determine_action(&breakdown);
        breakdown.confidence = determine_confidence(item);
        breakdown
    }

    fn score_market_impact(&self, item: &TrendItem) -> (f64, String) {
        let Some(market) = &item.market else {
            return (30.0, "Market not identified".to_string());
        };
        let weight = self.market_weights.get(market).copied().unwrap_or(1.0);
        let score = (weight * 50.0).min(100.0);

        let reason = if weight >= 1.5 {
            format!("Priority market ({market}, weight {weight}x)")
        } else if weight >= 1.2 {
            format!("Important market ({market})")
        } else if weight >= 1.0 {
            format!("Standard market ({market})")
        } else {
            format!("Secondary market ({market})")
        };
        (score, reason)
    }

    fn score_risk(&self, item: &TrendItem) -> (f64, String, RiskLevel, Vec<String>) {
        let text = format!("{} {} {}", item.title, item.description, item.raw_text).to_lowercase();

        let mut found = Vec::new();
        let mut level = RiskLevel::Low;

        for kw in &self.risk_keywords.high {
            if text.contains(&kw.to_lowercase()) {
                found.push(kw.clone());
                level = RiskLevel::High;
            }
        }
        for kw in &self.risk_keywords.medium {
            if text.contains(&kw.to_lowercase()) {
                found.push(kw.clone());
                if level != RiskLevel::High {
                    level = RiskLevel::Medium;
                }
            }
        }
        for kw in &self.risk_keywords.low {
            if text.contains(&kw.to_lowercase()) {
                found.push(kw.clone());
            }
        }

        let topic_multiplier = item
            .topic
            .as_ref()
            .and_then(|topic| self.topic_risk_weights.get(topic))
            .copied()
            .unwrap_or(1.0);

        let sample = found
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        let (score, reason) = match level {
            RiskLevel::High => (100.0 * topic_multiplier, format!("High risk detected: {sample}")),
            RiskLevel::Medium => (60.0 * topic_multiplier, format!("Medium risk: {sample}")),
            RiskLevel::Low if !found.is_empty() => {
                (30.0, format!("Low risk signals: {sample}"))
            }
            RiskLevel::Low => (10.0, "No significant risk signals".to_string()),
        };
        (score.min(100.0), reason, level, found)
    }

    /// Priority band for a total score.
    pub fn priority_level(&self, score: f64) -> PriorityLevel {
        if score >= self.thresholds.high_priority {
            PriorityLevel::High
        } else if score >= self.thresholds.medium_priority {
            PriorityLevel::Medium
        } else {
            PriorityLevel::Low
        }
    }
}

fn score_velocity(item: &TrendItem) -> (f64, String) {
    let velocity = item.velocity;
    if velocity >= 2.0 {
        (100.0, format!("Explosive growth ({velocity:.1}x above baseline)"))
    } else if velocity >= 1.0 {
        (80.0, format!("Strong growth ({velocity:.1}x above baseline)"))
    } else if velocity >= 0.5 {
        (60.0, format!("Moderate growth ({velocity:.1}x above baseline)"))
    } else if velocity >= 0.2 {
        (40.0, format!("Slight uptick ({velocity:.1}x above baseline)"))
    } else if velocity > 0.0 {
        (20.0, "Minimal change".to_string())
    } else {
        (10.0, "Stable or declining".to_string())
    }
}

fn score_reach(item: &TrendItem) -> (f64, String) {
    let volume = item.volume;
    let engagement = item.engagement;
    // Engagement is a stronger signal than raw volume.
    let combined = volume + engagement * 2;

    if combined >= 1_000_000 {
        (100.0, format!("Massive reach ({volume} volume, {engagement} engagement)"))
    } else if combined >= 100_000 {
        (80.0, format!("High reach ({volume} volume, {engagement} engagement)"))
    } else if combined >= 10_000 {
        (60.0, format!("Moderate reach ({volume} volume)"))
    } else if combined >= 1_000 {
        (40.0, format!("Growing reach ({volume} volume)"))
    } else if combined >= 100 {
        (20.0, format!("Limited reach ({volume} volume)"))
    } else {
        (10.0, "Minimal reach".to_string())
    }
}

fn score_spotify_adjacency(item: &TrendItem) -> (f64, String) {
    let text = format!("{} {}", item.title, item.description).to_lowercase();

    if text.contains("spotify") {
        return (100.0, "Direct Spotify mention".to_string());
    }
    for competitor in COMPETITORS {
        if text.contains(competitor) {
            return (90.0, format!("Competitor mention ({competitor})"));
        }
    }
    if let Some(artists) = item.entities.get("artists") {
        if !artists.is_empty() {
            let count = artists.len();
            let score = (70.0 + count as f64 * 10.0).min(95.0);
            return (score, format!("Artist-related ({count} artists detected)"));
        }
    }
    if item.topic.as_deref() == Some("music_audio") {
        return (70.0, "Music/audio topic".to_string());
    }
    for kw in MUSIC_KEYWORDS {
        if text.contains(kw) {
            return (60.0, format!("Music-related ({kw} mentioned)"));
        }
    }
    if item.topic.as_deref() == Some("culture") {
        return (40.0, "Culture/entertainment topic".to_string());
    }
    (20.0, "Limited audio/music connection".to_string())
}

/// Action decision table. High risk dominates; below that, total score
/// and adjacency pick between engage/partner/monitor.
fn determine_action(breakdown: &ScoreBreakdown) -> SuggestedAction {
    if breakdown.risk_level == RiskLevel::High {
        if breakdown.spotify_adjacency_score >= 80.0 {
            return SuggestedAction::Escalate;
        }
        return SuggestedAction::Avoid;
    }

    if breakdown.total_score >= 80.0 {
        if breakdown.spotify_adjacency_score >= 70.0 {
            return SuggestedAction::Engage;
        }
        return SuggestedAction::Monitor;
    }

    if breakdown.total_score >= 60.0 {
        if breakdown.spotify_adjacency_score >= 80.0 {
            return SuggestedAction::Partner;
        }
        if breakdown.risk_level == RiskLevel::Medium {
            return SuggestedAction::Monitor;
        }
        return SuggestedAction::Engage;
    }

    SuggestedAction::Monitor
}

/// Confidence from data quality: source coverage, entity richness,
/// velocity signal, and market attribution.
fn determine_confidence(item: &TrendItem) -> Confidence {
    let source_count = item.merged_sources().len();
    let entity_count = item.entity_count();

    let mut points = 0u32;
    points += match source_count {
        n if n >= 3 => 3,
        2 => 2,
        _ => 1,
    };
    points += match entity_count {
        n if n >= 3 => 2,
        n if n >= 1 => 1,
        _ => 0,
    };
    if item.velocity > 0.0 {
        points += 2;
    }
    if item.market.is_some() {
        points += 1;
    }

    if points >= 6 {
        Confidence::High
    } else if points >= 3 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}
