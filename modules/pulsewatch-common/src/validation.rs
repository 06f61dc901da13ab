//! Risk factor consistency checks, run after scoring as a QA gate.
//!
//! Level/score mismatches are warnings, not errors: the scorer's topic
//! multiplier can legitimately push a medium-level score above its band.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{RiskLevel, TrendRecord};

/// Inclusive score band expected for each risk level.
pub const RISK_SCORE_RANGES: [(RiskLevel, f64, f64); 3] = [
    (RiskLevel::Low, 0.0, 33.0),
    (RiskLevel::Medium, 34.0, 66.0),
    (RiskLevel::High, 67.0, 100.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub message: String,
    pub severity: Severity,
    pub field: Option<String>,
    pub trend_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationSummary {
    pub total_records: usize,
    pub total_checks: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<ValidationResult>,
}

impl ValidationSummary {
    pub fn is_valid(&self) -> bool {
        self.errors == 0
    }
}

/// Expected risk level for a score.
pub fn risk_level_for_score(score: f64) -> RiskLevel {
    if score >= 67.0 {
        RiskLevel::High
    } else if score >= 34.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Check risk_score is within [0, 100].
pub fn validate_risk_score(score: f64) -> ValidationResult {
    if !(0.0..=100.0).contains(&score) {
        return ValidationResult {
            is_valid: false,
            message: format!("risk_score {score} out of range, must be 0-100"),
            severity: Severity::Error,
            field: Some("risk_score".to_string()),
            trend_id: None,
        };
    }
    ValidationResult {
        is_valid: true,
        message: "risk_score is valid".to_string(),
        severity: Severity::Info,
        field: Some("risk_score".to_string()),
        trend_id: None,
    }
}

/// Check that the declared risk level matches the score band.
pub fn validate_risk_consistency(level: RiskLevel, score: f64) -> ValidationResult {
    let in_band = RISK_SCORE_RANGES
        .iter()
        .any(|(l, min, max)| *l == level && (*min..=*max).contains(&score));

    if in_band {
        return ValidationResult {
            is_valid: true,
            message: format!("risk_level '{level}' consistent with score {score}"),
            severity: Severity::Info,
            field: None,
            trend_id: None,
        };
    }

    let expected = risk_level_for_score(score);
    ValidationResult {
        is_valid: false,
        message: format!(
            "Inconsistency: risk_level '{level}' but score {score} suggests '{expected}'"
        ),
        severity: Severity::Warning,
        field: Some("risk_consistency".to_string()),
        trend_id: None,
    }
}

/// Warn when a record has not been updated within the freshness window.
pub fn validate_freshness(last_updated: DateTime<Utc>, threshold_hours: i64) -> ValidationResult {
    let age_hours = (Utc::now() - last_updated).num_minutes() as f64 / 60.0;
    if age_hours <= threshold_hours as f64 {
        ValidationResult {
            is_valid: true,
            message: format!("Data is fresh ({age_hours:.1} hours old)"),
            severity: Severity::Info,
            field: Some("freshness".to_string()),
            trend_id: None,
        }
    } else {
        ValidationResult {
            is_valid: false,
            message: format!(
                "Data may be stale ({age_hours:.1} hours old, threshold: {threshold_hours}h)"
            ),
            severity: Severity::Warning,
            field: Some("freshness".to_string()),
            trend_id: None,
        }
    }
}

/// Run all checks across a batch of records.
pub fn validate_batch(records: &[TrendRecord]) -> ValidationSummary {
    let mut summary = ValidationSummary {
        total_records: records.len(),
        ..Default::default()
    };

    for record in records {
        let mut checks = vec![
            validate_risk_score(record.risk_score),
            validate_risk_consistency(record.risk_level, record.risk_score),
            validate_freshness(record.last_updated, 24),
        ];
        for check in &mut checks {
            check.trend_id = Some(record.id.clone());
            if !check.is_valid {
                match check.severity {
                    Severity::Error => summary.errors += 1,
                    Severity::Warning => summary.warnings += 1,
                    Severity::Info => {}
                }
            }
        }
        summary.total_checks += checks.len();
        summary.results.extend(checks);
    }

    summary
}
