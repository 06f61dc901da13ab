//! Classification stage: assigns each item a topic and subtopic from the
//! configured taxonomy.
//!
//! Pure keyword scoring. Topics are iterated in lexicographic key order
//! and only a strictly higher score replaces the current best, so equal
//! scores resolve deterministically.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::info;

use pulsewatch_common::file_config::TopicConfig;
use pulsewatch_common::types::TrendItem;

/// Source → topic key affinity bonus. A source's native topic gets +5.
const SOURCE_AFFINITY: &[(&str, &str)] = &[
    ("youtube", "music_audio"),
    ("wikipedia", "music_audio"),
    ("news_rss", "current_affairs"),
    ("reddit", "culture"),
];

/// Fallback (topic, subtopic) per source when no topic keyword matches.
const SOURCE_DEFAULTS: &[(&str, (&str, Option<&str>))] = &[
    ("google_trends", ("culture", Some("memes"))),
    ("youtube", ("music_audio", Some("streaming_moments"))),
    ("news_rss", ("current_affairs", None)),
    ("reddit", ("culture", None)),
    ("twitter", ("culture", Some("memes"))),
    ("wikipedia", ("music_audio", Some("artists"))),
];

/// Keyword cues per subtopic. A subtopic without an entry falls back to
/// its own key with underscores as spaces.
const SUBTOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    // music_audio
    ("artists", &["artist", "singer", "rapper", "musician", "dj"]),
    ("genres", &["afrobeats", "amapiano", "gqom", "hip hop", "rap", "r&b", "genre"]),
    ("songs", &["song", "track", "single", "hit"]),
    ("playlists", &["playlist", "mix", "compilation"]),
    ("live_events", &["concert", "festival", "tour", "show", "performance", "live"]),
    ("streaming_moments", &["stream", "views", "plays", "viral"]),
    ("industry_issues", &["label", "contract", "royalties", "industry"]),
    // culture
    ("memes", &["meme", "viral", "trending"]),
    ("youth_culture", &["gen z", "youth", "young"]),
    ("identity", &["identity", "pride", "community"]),
    ("tv_film", &["nollywood", "movie", "film", "series", "show"]),
    ("sport", &["football", "soccer", "afcon", "sport", "player"]),
    ("internet_slang", &["slang", "lingo"]),
    // fashion_beauty
    ("drops", &["drop", "release", "launch", "new"]),
    ("designers", &["designer", "design", "fashion"]),
    ("runway", &["runway", "fashion week", "model"]),
    ("streetwear", &["streetwear", "street style"]),
    ("beauty_trends", &["makeup", "beauty", "skincare"]),
    // current_affairs
    ("elections", &["election", "vote", "ballot", "campaign"]),
    ("protests", &["protest", "demonstration", "march"]),
    ("conflict", &["conflict", "war", "violence", "attack"]),
    ("public_safety", &["safety", "security", "crime"]),
    ("policy", &["policy", "law", "government", "minister"]),
    // brand_comms
    ("trust_safety", &["trust", "safety", "policy"]),
    ("misinformation", &["fake", "misinformation", "disinformation"]),
    ("creator_economy", &["creator", "influencer", "monetization"]),
    ("ai_debates", &["ai", "artificial intelligence", "deepfake"]),
    ("sponsorship", &["sponsor", "partnership", "brand deal"]),
    // spotify_specific
    ("mentions", &["spotify"]),
    ("competitors", &["apple music", "boomplay", "audiomack", "youtube music"]),
    ("features", &["wrapped", "blend", "discover weekly"]),
    ("app_issues", &["bug", "crash", "issue", "not working"]),
    ("pricing", &["price", "premium", "subscription", "free"]),
    ("partnerships", &["partner", "collab", "deal"]),
    ("artist_relations", &["artist", "label", "release"]),
];

struct CompiledTopic {
    name: String,
    pattern: Option<Regex>,
    subtopics: Vec<String>,
}

pub struct Classifier {
    topics: BTreeMap<String, CompiledTopic>,
}

impl Classifier {
    pub fn new(topics: &BTreeMap<String, TopicConfig>) -> Self {
        let topics = topics
            .iter()
            .map(|(key, topic)| {
                let pattern = if topic.keywords.is_empty() {
                    None
                } else {
                    let alternatives: Vec<String> =
                        topic.keywords.iter().map(|k| regex::escape(k)).collect();
                    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|"))).ok()
                };
                (
                    key.clone(),
                    CompiledTopic {
                        name: topic.name.clone(),
                        pattern,
                        subtopics: topic.subtopics.clone(),
                    },
                )
            })
            .collect();
        Self { topics }
    }

    pub fn classify_batch(&self, items: &mut [TrendItem]) {
        for item in items.iter_mut() {
            self.classify_item(item);
        }

        let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
        for item in items.iter() {
            let topic = item.topic.clone().unwrap_or_else(|| "unknown".to_string());
            *distribution.entry(topic).or_default() += 1;
        }
        info!(count = items.len(), ?distribution, "Classification complete");
    }

    pub fn classify_item(&self, item: &mut TrendItem) {
        let text = format!("{} {} {}", item.title, item.description, item.raw_text).to_lowercase();

        let mut topic_scores: BTreeMap<String, f64> = BTreeMap::new();
        let mut best: Option<(&str, f64)> = None;

        for (key, topic) in &self.topics {
            let score = self.score_topic(&text, key, topic, item);
            if score > 0.0 {
                topic_scores.insert(key.clone(), score);
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((key, score));
                }
            }
        }

        match best {
            Some((key, _)) => {
                item.subtopic = self.determine_subtopic(&text, key);
                item.topic = Some(key.to_string());
            }
            None => {
                let (topic, subtopic) = default_classification(&item.source);
                item.topic = Some(topic.to_string());
                item.subtopic = subtopic.map(|s| s.to_string());
            }
        }

        item.metadata.insert(
            "topic_scores".to_string(),
            serde_json::to_value(&topic_scores).unwrap_or_default(),
        );
        let display = item
            .topic
            .as_ref()
            .and_then(|t| self.topics.get(t))
            .map(|t| t.name.clone())
            .unwrap_or_else(|| item.topic.clone().unwrap_or_default());
        item.metadata.insert("topic_name".to_string(), display.into());
    }

    fn score_topic(&self, text: &str, key: &str, topic: &CompiledTopic, item: &TrendItem) -> f64 {
        let mut score = 0.0;

        if let Some(pattern) = &topic.pattern {
            score += pattern.find_iter(text).count() as f64 * 10.0;
        }

        // Artist entities strongly imply the music topic.
        if key == "music_audio" {
            if let Some(artists) = item.entities.get("artists") {
                score += artists.len() as f64 * 15.0;
            }
        }

        for (source, affinity_topic) in SOURCE_AFFINITY {
            if *source == item.source && *affinity_topic == key {
                score += 5.0;
            }
        }

        score.min(100.0)
    }

    fn determine_subtopic(&self, text: &str, topic_key: &str) -> Option<String> {
        let topic = self.topics.get(topic_key)?;
        if topic.subtopics.is_empty() {
            return None;
        }

        for subtopic in &topic.subtopics {
            let fallback = subtopic.replace('_', " ");
            let keywords: Vec<&str> = SUBTOPIC_KEYWORDS
                .iter()
                .find(|(key, _)| key == subtopic)
                .map(|(_, kws)| kws.to_vec())
                .unwrap_or_else(|| vec![fallback.as_str()]);
            if keywords.iter().any(|kw| text.contains(kw)) {
                return Some(subtopic.clone());
            }
        }
        topic.subtopics.first().cloned()
    }

    /// Display name for a topic key.
    pub fn topic_display(&self, topic_key: &str) -> String {
        self.topics
            .get(topic_key)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| topic_key.to_string())
    }
}

fn default_classification(source: &str) -> (&'static str, Option<&'static str>) {
    SOURCE_DEFAULTS
        .iter()
        .find(|(s, _)| *s == source)
        .map(|(_, default)| *default)
        .unwrap_or(("culture", None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsewatch_common::FileConfig;

    fn classifier() -> Classifier {
        Classifier::new(&FileConfig::builtin().topics)
    }

    fn classify(source: &str, title: &str) -> TrendItem {
        let mut item = TrendItem::new(source, title, None);
        classifier().classify_item(&mut item);
        item
    }

    #[test]
    fn music_keywords_classify_as_music_audio() {
        let item = classify("reddit", "New amapiano track drops from the festival stage");
        assert_eq!(item.topic.as_deref(), Some("music_audio"));
    }

    #[test]
    fn artist_entities_outweigh_single_culture_keyword() {
        let mut item = TrendItem::new("reddit", "Viral moment at the show", None);
        item.entities
            .insert("artists".to_string(), vec!["Tyla".to_string(), "Asake".to_string()]);
        classifier().classify_item(&mut item);
        // 2 artists x 15 beats "viral" + "show" keyword hits.
        assert_eq!(item.topic.as_deref(), Some("music_audio"));
    }

    #[test]
    fn unmatched_items_fall_back_to_source_default() {
        let item = classify("news_rss", "Quiet day with nothing notable reported");
        assert_eq!(item.topic.as_deref(), Some("current_affairs"));
        assert_eq!(item.subtopic, None);

        let item = classify("wikipedia", "Quiet day with nothing notable reported");
        assert_eq!(item.topic.as_deref(), Some("music_audio"));
        assert_eq!(item.subtopic.as_deref(), Some("artists"));

        let item = classify("unknown_source", "Quiet day with nothing notable reported");
        assert_eq!(item.topic.as_deref(), Some("culture"));
    }

    #[test]
    fn subtopic_keyword_match_wins_over_first_configured() {
        let item = classify("reddit", "This single is a massive hit track");
        assert_eq!(item.topic.as_deref(), Some("music_audio"));
        assert_eq!(item.subtopic.as_deref(), Some("songs"));
    }

    #[test]
    fn election_news_lands_in_current_affairs() {
        let item = classify("news_rss", "Election results spark protest outside parliament");
        assert_eq!(item.topic.as_deref(), Some("current_affairs"));
        assert_eq!(item.subtopic.as_deref(), Some("elections"));
    }

    #[test]
    fn topic_scores_are_recorded_in_metadata() {
        let item = classify("reddit", "New amapiano track from the festival");
        let scores = item.metadata.get("topic_scores").unwrap();
        assert!(scores.get("music_audio").is_some());
        assert_eq!(
            item.metadata.get("topic_name"),
            Some(&serde_json::Value::String("Music & Audio".to_string()))
        );
    }
}
