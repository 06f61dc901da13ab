use std::collections::BTreeMap;

use serde::Serialize;

use pulsewatch_common::types::TrendSummary;

/// Aggregate stats for one pipeline run.
#[derive(Debug, Default, Serialize)]
pub struct PipelineStats {
    pub total_trends: usize,
    pub avg_score: f64,
    pub max_score: f64,
    pub min_score: f64,
    /// [high, medium, low]
    pub by_priority: [usize; 3],
    /// [high, medium, low]
    pub by_risk: [usize; 3],
    pub by_action: BTreeMap<String, usize>,
    pub by_market: BTreeMap<String, usize>,
    pub by_topic: BTreeMap<String, usize>,
}

impl PipelineStats {
    pub fn from_summaries(summaries: &[TrendSummary]) -> Self {
        let mut stats = Self {
            total_trends: summaries.len(),
            ..Default::default()
        };
        if summaries.is_empty() {
            return stats;
        }

        let scores: Vec<f64> = summaries.iter().map(|s| s.total_score).collect();
        stats.avg_score = scores.iter().sum::<f64>() / scores.len() as f64;
        stats.max_score = scores.iter().cloned().fold(f64::MIN, f64::max);
        stats.min_score = scores.iter().cloned().fold(f64::MAX, f64::min);

        for summary in summaries {
            use pulsewatch_common::types::{PriorityLevel, RiskLevel};
            match summary.priority_level {
                PriorityLevel::High => stats.by_priority[0] += 1,
                PriorityLevel::Medium => stats.by_priority[1] += 1,
                PriorityLevel::Low => stats.by_priority[2] += 1,
            }
            match summary.risk_level {
                RiskLevel::High => stats.by_risk[0] += 1,
                RiskLevel::Medium => stats.by_risk[1] += 1,
                RiskLevel::Low => stats.by_risk[2] += 1,
            }
            *stats
                .by_action
                .entry(summary.suggested_action.to_string())
                .or_default() += 1;
            let market = summary.market.clone().unwrap_or_else(|| "unknown".to_string());
            *stats.by_market.entry(market).or_default() += 1;
            *stats.by_topic.entry(summary.topic_display.clone()).or_default() += 1;
        }
        stats
    }
}

impl std::fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Pipeline Run Complete ===")?;
        writeln!(f, "Trends produced:  {}", self.total_trends)?;
        writeln!(
            f,
            "Scores:           avg {:.1}, max {:.1}, min {:.1}",
            self.avg_score, self.max_score, self.min_score
        )?;
        writeln!(f, "\nBy priority:")?;
        writeln!(f, "  High:   {}", self.by_priority[0])?;
        writeln!(f, "  Medium: {}", self.by_priority[1])?;
        writeln!(f, "  Low:    {}", self.by_priority[2])?;
        writeln!(f, "\nBy risk:")?;
        writeln!(f, "  High:   {}", self.by_risk[0])?;
        writeln!(f, "  Medium: {}", self.by_risk[1])?;
        writeln!(f, "  Low:    {}", self.by_risk[2])?;
        if !self.by_action.is_empty() {
            writeln!(f, "\nBy action:")?;
            for (action, count) in &self.by_action {
                writeln!(f, "  {action}: {count}")?;
            }
        }
        if !self.by_market.is_empty() {
            writeln!(f, "\nBy market:")?;
            for (market, count) in &self.by_market {
                writeln!(f, "  {market}: {count}")?;
            }
        }
        if !self.by_topic.is_empty() {
            writeln!(f, "\nBy topic:")?;
            for (topic, count) in &self.by_topic {
                writeln!(f, "  {topic}: {count}")?;
            }
        }
        Ok(())
    }
}
