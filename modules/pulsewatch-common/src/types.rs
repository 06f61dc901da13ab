use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// --- Enums ---

/// Status of a data source connector after a fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Active,
    Degraded,
    Unavailable,
    RequiresAuth,
    Disabled,
}

impl SourceStatus {
    /// A source counts as successful if it produced a usable result,
    /// even with partial errors.
    pub fn success(&self) -> bool {
        matches!(self, SourceStatus::Active | SourceStatus::Degraded)
    }
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceStatus::Active => write!(f, "active"),
            SourceStatus::Degraded => write!(f, "degraded"),
            SourceStatus::Unavailable => write!(f, "unavailable"),
            SourceStatus::RequiresAuth => write!(f, "requires_auth"),
            SourceStatus::Disabled => write!(f, "disabled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

impl RiskLevel {
    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "high" => RiskLevel::High,
            "medium" => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    #[default]
    Monitor,
    Engage,
    Partner,
    Avoid,
    Escalate,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::Monitor => write!(f, "monitor"),
            SuggestedAction::Engage => write!(f, "engage"),
            SuggestedAction::Partner => write!(f, "partner"),
            SuggestedAction::Avoid => write!(f, "avoid"),
            SuggestedAction::Escalate => write!(f, "escalate"),
        }
    }
}

impl SuggestedAction {
    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "engage" => SuggestedAction::Engage,
            "partner" => SuggestedAction::Partner,
            "avoid" => SuggestedAction::Avoid,
            "escalate" => SuggestedAction::Escalate,
            _ => SuggestedAction::Monitor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

impl Confidence {
    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "high" => Confidence::High,
            "low" => Confidence::Low,
            _ => Confidence::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl std::fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriorityLevel::Low => write!(f, "low"),
            PriorityLevel::Medium => write!(f, "medium"),
            PriorityLevel::High => write!(f, "high"),
        }
    }
}

impl PriorityLevel {
    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "high" => PriorityLevel::High,
            "medium" => PriorityLevel::Medium,
            _ => PriorityLevel::Low,
        }
    }
}

// --- TrendItem ---

/// A single raw signal collected from a source. Mutated in place through
/// clean → enrich → classify; paired with a ScoreBreakdown at score time.
/// Run-scoped: never persisted directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendItem {
    pub id: String,
    pub source: String,
    pub source_url: Option<String>,

    pub title: String,
    pub description: String,
    pub raw_text: String,

    // Populated by the classifier
    pub topic: Option<String>,
    pub subtopic: Option<String>,

    // Locale
    pub market: Option<String>,
    pub language: Option<String>,

    // Metrics
    pub volume: u64,
    pub engagement: u64,
    /// Ratio vs historical baseline; >1.0 is above-baseline growth.
    pub velocity: f64,

    /// Entity type → ordered list of names. BTreeMap keeps iteration
    /// deterministic across runs.
    pub entities: BTreeMap<String, Vec<String>>,

    pub published_at: Option<DateTime<Utc>>,
    pub collected_at: DateTime<Utc>,

    /// Free-form source-specific context (ranks, related queries,
    /// merge provenance).
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl TrendItem {
    /// Create an item with a content-addressed id derived from
    /// `(source, title, source_url)`. Identical triples always yield the
    /// same id — this underlies deduplication and idempotent upserts.
    pub fn new(source: &str, title: &str, source_url: Option<&str>) -> Self {
        Self {
            id: derive_trend_id(source, title, source_url),
            source: source.to_string(),
            source_url: source_url.map(|s| s.to_string()),
            title: title.to_string(),
            description: String::new(),
            raw_text: String::new(),
            topic: None,
            subtopic: None,
            market: None,
            language: None,
            volume: 0,
            engagement: 0,
            velocity: 0.0,
            entities: BTreeMap::new(),
            published_at: None,
            collected_at: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Total extracted entity count across all types.
    pub fn entity_count(&self) -> usize {
        self.entities.values().map(|v| v.len()).sum()
    }

    /// Source names this item was merged from, including its own.
    pub fn merged_sources(&self) -> Vec<String> {
        match self.metadata.get("merged_sources") {
            Some(serde_json::Value::Array(arr)) => arr
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect(),
            _ => vec![self.source.clone()],
        }
    }
}

/// Stable 16-hex-char id for a `(source, title, source_url)` triple.
pub fn derive_trend_id(source: &str, title: &str, source_url: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b":");
    hasher.update(title.as_bytes());
    hasher.update(b":");
    hasher.update(source_url.unwrap_or("").as_bytes());
    hex::encode(&hasher.finalize()[..8])
}

// --- ConnectorResult ---

/// Result of a single connector fetch. Connector failures are captured
/// here as status + error strings; they never propagate to the collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorResult {
    pub source: String,
    pub status: SourceStatus,
    pub items: Vec<TrendItem>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub requests_made: u32,
}

impl ConnectorResult {
    pub fn new(source: &str, status: SourceStatus) -> Self {
        let now = Utc::now();
        Self {
            source: source.to_string(),
            status,
            items: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            started_at: now,
            completed_at: now,
            requests_made: 0,
        }
    }

    /// A failed result carrying the connector's error message.
    pub fn unavailable(source: &str, error: impl Into<String>) -> Self {
        let mut result = Self::new(source, SourceStatus::Unavailable);
        result.errors.push(error.into());
        result
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.completed_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

// --- ScoreBreakdown ---

/// Per-item scoring output. Every component carries a one-line reason —
/// explainability is a hard requirement of the scoring contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub velocity_score: f64,
    pub reach_score: f64,
    pub market_impact_score: f64,
    pub spotify_adjacency_score: f64,
    pub risk_score: f64,

    pub total_score: f64,

    pub velocity_reason: String,
    pub reach_reason: String,
    pub market_reason: String,
    pub adjacency_reason: String,
    pub risk_reason: String,

    pub risk_level: RiskLevel,
    pub risk_keywords_found: Vec<String>,

    pub suggested_action: SuggestedAction,
    pub confidence: Confidence,
}

impl ScoreBreakdown {
    /// Component-by-component JSON projection for storage and dashboards.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "total_score": round1(self.total_score),
            "components": {
                "velocity": { "score": round1(self.velocity_score), "reason": self.velocity_reason },
                "reach": { "score": round1(self.reach_score), "reason": self.reach_reason },
                "market_impact": { "score": round1(self.market_impact_score), "reason": self.market_reason },
                "spotify_adjacency": { "score": round1(self.spotify_adjacency_score), "reason": self.adjacency_reason },
                "risk": {
                    "score": round1(self.risk_score),
                    "reason": self.risk_reason,
                    "level": self.risk_level.to_string(),
                    "keywords": self.risk_keywords_found,
                },
            },
            "suggested_action": self.suggested_action.to_string(),
            "confidence": self.confidence.to_string(),
        })
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

// --- TrendSummary ---

/// Comms-ready card for one surviving trend. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSummary {
    pub trend_id: String,
    pub title: String,

    /// 1-2 line description of what's happening.
    pub whats_happening: String,
    /// Exactly two bullets.
    pub why_it_matters: Vec<String>,
    pub suggested_action: SuggestedAction,
    /// One sentence on the downside scenario.
    pub if_goes_wrong: String,

    pub topic: String,
    pub topic_display: String,
    pub subtopic: Option<String>,
    pub market: Option<String>,
    pub language: Option<String>,

    pub total_score: f64,
    pub priority_level: PriorityLevel,
    pub risk_level: RiskLevel,
    pub confidence: Confidence,

    /// Full component breakdown, for transparency.
    pub score_breakdown: serde_json::Value,

    pub sources: Vec<String>,
    pub source_url: Option<String>,
    pub key_entities: BTreeMap<String, Vec<String>>,

    pub first_seen: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

// --- TrendRecord ---

/// Flattened storage projection of a TrendSummary. The only entity that
/// survives a run; writes are idempotent upserts keyed by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendRecord {
    pub id: String,
    pub title: String,
    pub source: String,

    pub topic: Option<String>,
    pub subtopic: Option<String>,
    pub market: Option<String>,
    pub language: Option<String>,

    pub total_score: f64,
    pub velocity_score: f64,
    pub reach_score: f64,
    pub market_impact_score: f64,
    pub spotify_adjacency_score: f64,
    pub risk_score: f64,

    pub risk_level: RiskLevel,
    pub suggested_action: SuggestedAction,
    pub confidence: Confidence,
    pub priority_level: PriorityLevel,

    pub source_url: Option<String>,
    pub entities: BTreeMap<String, Vec<String>>,

    pub whats_happening: String,
    pub why_it_matters: Vec<String>,
    pub if_goes_wrong: String,

    pub first_seen: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

impl From<&TrendSummary> for TrendRecord {
    fn from(summary: &TrendSummary) -> Self {
        let component = |name: &str| {
            summary
                .score_breakdown
                .get("components")
                .and_then(|c| c.get(name))
                .and_then(|c| c.get("score"))
                .and_then(|s| s.as_f64())
                .unwrap_or(0.0)
        };

        Self {
            id: summary.trend_id.clone(),
            title: summary.title.clone(),
            source: summary
                .sources
                .first()
                .cloned()
                .unwrap_or_else(|| "unknown".to_string()),
            topic: Some(summary.topic.clone()),
            subtopic: summary.subtopic.clone(),
            market: summary.market.clone(),
            language: summary.language.clone(),
            total_score: summary.total_score,
            velocity_score: component("velocity"),
            reach_score: component("reach"),
            market_impact_score: component("market_impact"),
            spotify_adjacency_score: component("spotify_adjacency"),
            risk_score: component("risk"),
            risk_level: summary.risk_level,
            suggested_action: summary.suggested_action,
            confidence: summary.confidence,
            priority_level: summary.priority_level,
            source_url: summary.source_url.clone(),
            entities: summary.key_entities.clone(),
            whats_happening: summary.whats_happening.clone(),
            why_it_matters: summary.why_it_matters.clone(),
            if_goes_wrong: summary.if_goes_wrong.clone(),
            first_seen: summary.first_seen,
            last_updated: summary.last_updated,
        }
    }
}
