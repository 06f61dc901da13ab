use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::PulseWatchError;

/// TOML-backed taxonomy and scoring configuration.
/// Keyword/topic tables are plain data so the classifier and scorer stay
/// data-driven and testable independent of the text corpus.
/// Secrets (API keys, DB URL) stay as env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub markets: MarketsConfig,
    /// Topic key → taxonomy entry. BTreeMap: classification iterates
    /// topics in lexicographic key order, so equal scores break
    /// deterministically.
    #[serde(default)]
    pub topics: BTreeMap<String, TopicConfig>,
    /// Seed entity type → names (e.g. "artists" → ["Burna Boy", ...]).
    #[serde(default)]
    pub entities: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
    /// Source name → connector settings.
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MarketsConfig {
    #[serde(default)]
    pub priority: Vec<MarketEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketEntry {
    /// 2-letter country code (e.g. "NG", "ZA").
    pub code: String,
    pub name: String,
    /// Relevance multiplier; priority markets are >= 1.5.
    #[serde(default = "default_market_weight")]
    pub weight: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicConfig {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub subtopics: Vec<String>,
    #[serde(default = "default_risk_weight")]
    pub risk_weight: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ScoreWeights,
    #[serde(default)]
    pub risk_keywords: RiskKeywords,
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            risk_keywords: RiskKeywords::default(),
            thresholds: Thresholds::default(),
        }
    }
}

/// Component weights for the total score. Must sum to 1.0.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreWeights {
    #[serde(default = "default_w_velocity")]
    pub velocity: f64,
    #[serde(default = "default_w_reach")]
    pub reach: f64,
    #[serde(default = "default_w_market")]
    pub market_impact: f64,
    #[serde(default = "default_w_adjacency")]
    pub spotify_adjacency: f64,
    #[serde(default = "default_w_risk")]
    pub risk_factor: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            velocity: default_w_velocity(),
            reach: default_w_reach(),
            market_impact: default_w_market(),
            spotify_adjacency: default_w_adjacency(),
            risk_factor: default_w_risk(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RiskKeywords {
    #[serde(default)]
    pub high: Vec<String>,
    #[serde(default)]
    pub medium: Vec<String>,
    #[serde(default)]
    pub low: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_high_priority")]
    pub high_priority: f64,
    #[serde(default = "default_medium_priority")]
    pub medium_priority: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high_priority: default_high_priority(),
            medium_priority: default_medium_priority(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleaningConfig {
    /// Jaccard title-token similarity at or above which two items from
    /// different sources are considered the same trend.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SourceConfig {
    #[serde(default)]
    pub enabled: bool,
    /// RSS feeds (news_rss only).
    #[serde(default)]
    pub feeds: Vec<FeedEntry>,
    /// Subreddits to poll (reddit only).
    #[serde(default)]
    pub subreddits: Vec<String>,
    /// Max items fetched per market/feed.
    #[serde(default = "default_source_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedEntry {
    pub name: String,
    pub url: String,
}

impl FileConfig {
    /// Load and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, PulseWatchError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PulseWatchError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            PulseWatchError::Config(format!("Failed to parse config file {}: {e}", path.display()))
        })?;
        Ok(config)
    }

    /// Priority market codes in configured order.
    pub fn market_codes(&self) -> Vec<String> {
        self.markets.priority.iter().map(|m| m.code.clone()).collect()
    }

    /// Relevance multiplier for a market; unknown markets get 1.0.
    pub fn market_weight(&self, code: &str) -> f64 {
        self.markets
            .priority
            .iter()
            .find(|m| m.code == code)
            .map(|m| m.weight)
            .unwrap_or(1.0)
    }

    /// Union of all topic keywords and seed entity names, used as the
    /// default search keyword set for collection.
    pub fn all_keywords(&self) -> Vec<String> {
        let mut keywords = BTreeSet::new();
        for topic in self.topics.values() {
            for kw in &topic.keywords {
                keywords.insert(kw.clone());
            }
        }
        for names in self.entities.values() {
            for name in names {
                keywords.insert(name.clone());
            }
        }
        keywords.into_iter().collect()
    }

    pub fn source(&self, name: &str) -> SourceConfig {
        self.sources.get(name).cloned().unwrap_or_default()
    }

    /// Built-in taxonomy used when no config file is given.
    pub fn builtin() -> Self {
        toml::from_str(DEFAULT_TAXONOMY).expect("built-in taxonomy must parse")
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

fn default_market_weight() -> f64 {
    1.0
}
fn default_risk_weight() -> f64 {
    1.0
}
fn default_w_velocity() -> f64 {
    0.25
}
fn default_w_reach() -> f64 {
    0.20
}
fn default_w_market() -> f64 {
    0.20
}
fn default_w_adjacency() -> f64 {
    0.20
}
fn default_w_risk() -> f64 {
    0.15
}
fn default_high_priority() -> f64 {
    75.0
}
fn default_medium_priority() -> f64 {
    50.0
}
fn default_similarity_threshold() -> f64 {
    0.8
}
fn default_source_limit() -> usize {
    50
}

const DEFAULT_TAXONOMY: &str = include_str!("../default_taxonomy.toml");
