//! Cleaning stage: text normalization, dedup, and spam filtering.
//!
//! Dedup state lives in a per-run [`DedupContext`], created fresh by the
//! orchestrator for every pipeline execution. Nothing here is shared
//! across runs.

use std::collections::HashSet;

use regex::Regex;
use tracing::{debug, info};

use pulsewatch_common::file_config::CleaningConfig;
use pulsewatch_common::types::{derive_trend_id, TrendItem};

const SPAM_PATTERNS: &[&str] = &[
    r"(?i)click here",
    r"(?i)buy now",
    r"(?i)limited offer",
    r"(?i)act fast",
    r"(?i)[0-9]{4,}\s*followers",
];

/// Per-run dedup state. URL matches and content-hash matches both count
/// as duplicates; first occurrence wins.
#[derive(Default)]
pub struct DedupContext {
    seen_urls: HashSet<String>,
    seen_hashes: HashSet<String>,
}

impl DedupContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_duplicate(&mut self, item: &TrendItem) -> bool {
        if let Some(url) = &item.source_url {
            let normalized = url.to_lowercase().trim().to_string();
            if !self.seen_urls.insert(normalized) {
                return true;
            }
        }
        let hash = content_hash(item);
        !self.seen_hashes.insert(hash)
    }
}

pub struct Cleaner {
    spam_patterns: Vec<Regex>,
    similarity_threshold: f64,
}

impl Cleaner {
    pub fn new(config: &CleaningConfig) -> Self {
        let spam_patterns = SPAM_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("spam pattern must compile"))
            .collect();
        Self {
            spam_patterns,
            similarity_threshold: config.similarity_threshold,
        }
    }

    /// Normalize, dedupe, and quality-filter a batch.
    pub fn clean_batch(&self, ctx: &mut DedupContext, items: Vec<TrendItem>) -> Vec<TrendItem> {
        let input_count = items.len();
        let mut duplicates = 0usize;
        let mut filtered = 0usize;
        let mut cleaned = Vec::new();

        for mut item in items {
            normalize_item(&mut item);

            if ctx.is_duplicate(&item) {
                duplicates += 1;
                continue;
            }
            if !self.passes_quality_check(&item) {
                filtered += 1;
                continue;
            }
            cleaned.push(item);
        }

        info!(
            input_count,
            output_count = cleaned.len(),
            duplicates,
            filtered,
            "Cleaning complete"
        );
        cleaned
    }

    /// Cross-source pass: group items with near-identical titles and keep
    /// the strongest one, recording the merged sources in its metadata.
    pub fn dedupe_across_sources(&self, items: Vec<TrendItem>) -> Vec<TrendItem> {
        if items.len() <= 1 {
            return items;
        }

        let input_count = items.len();
        let mut used = vec![false; items.len()];
        let mut groups: Vec<Vec<usize>> = Vec::new();

        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            let mut group = vec![i];
            for j in (i + 1)..items.len() {
                if used[j] {
                    continue;
                }
                if jaccard_similarity(&items[i].title, &items[j].title)
                    >= self.similarity_threshold
                {
                    used[j] = true;
                    group.push(j);
                }
            }
            groups.push(group);
        }

        let group_count = groups.len();
        let mut result = Vec::with_capacity(group_count);
        for group in groups {
            if group.len() == 1 {
                result.push(items[group[0]].clone());
                continue;
            }
            // Strongest item carries the card: engagement first, then the
            // one with the most descriptive text.
            let best = group
                .iter()
                .copied()
                .max_by_key(|&idx| (items[idx].engagement, items[idx].description.len()))
                .unwrap_or(group[0]);
            let mut merged = items[best].clone();
            let sources: Vec<serde_json::Value> = group
                .iter()
                .map(|&idx| items[idx].source.clone().into())
                .collect();
            merged
                .metadata
                .insert("merged_sources".to_string(), sources.into());
            result.push(merged);
        }

        info!(
            input_count,
            groups = group_count,
            output_count = result.len(),
            "Cross-source dedupe complete"
        );
        result
    }

    fn passes_quality_check(&self, item: &TrendItem) -> bool {
        if item.title.len() < 3 {
            return false;
        }
        let text = format!("{} {}", item.title, item.description).to_lowercase();
        for pattern in &self.spam_patterns {
            if pattern.is_match(&text) {
                debug!(title = %item.title, "Spam filtered");
                return false;
            }
        }
        true
    }
}

fn normalize_item(item: &mut TrendItem) {
    item.title = normalize_text(&item.title);
    item.description = normalize_text(&item.description);
    item.raw_text = normalize_text(&item.raw_text);
    if let Some(market) = &item.market {
        item.market = Some(market.trim().to_uppercase());
    }
}

/// Collapse whitespace and drop non-ASCII codepoints. Dropping non-ASCII
/// is lossy for non-Latin titles; dedup hashing and keyword matching both
/// depend on this canonical form.
fn normalize_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().filter(|c| c.is_ascii()).collect::<String>().trim().to_string()
}

/// Content hash for dedup: source plus lowercased title.
fn content_hash(item: &TrendItem) -> String {
    derive_trend_id(&item.source, item.title.to_lowercase().trim(), None)
}

/// Token-set Jaccard similarity of two titles.
fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let lower_a = a.to_lowercase();
    let lower_b = b.to_lowercase();
    let set_a: HashSet<&str> = lower_a.split_whitespace().collect();
    let set_b: HashSet<&str> = lower_b.split_whitespace().collect();

    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaner() -> Cleaner {
        Cleaner::new(&CleaningConfig::default())
    }

    fn item(source: &str, title: &str, url: Option<&str>) -> TrendItem {
        TrendItem::new(source, title, url)
    }

    #[test]
    fn normalization_collapses_whitespace() {
        let mut it = item("reddit", "  Burna   Boy\n\twins   again  ", None);
        normalize_item(&mut it);
        assert_eq!(it.title, "Burna Boy wins again");
    }

    #[test]
    fn market_code_is_uppercased() {
        let mut it = item("youtube", "Title", None);
        it.market = Some(" ng ".to_string());
        normalize_item(&mut it);
        assert_eq!(it.market.as_deref(), Some("NG"));
    }

    #[test]
    fn duplicate_urls_are_dropped() {
        let mut ctx = DedupContext::new();
        let a = item("news_rss", "Story one", Some("https://example.com/a"));
        let b = item("news_rss", "Story one updated", Some("HTTPS://EXAMPLE.COM/A"));
        let cleaned = cleaner().clean_batch(&mut ctx, vec![a, b]);
        assert_eq!(cleaned.len(), 1);
    }

    #[test]
    fn same_title_same_source_is_a_duplicate() {
        let mut ctx = DedupContext::new();
        let a = item("reddit", "Amapiano Everywhere", Some("https://r/a"));
        let b = item("reddit", "amapiano everywhere", Some("https://r/b"));
        let cleaned = cleaner().clean_batch(&mut ctx, vec![a, b]);
        assert_eq!(cleaned.len(), 1);
    }

    #[test]
    fn dedup_state_is_per_context() {
        let c = cleaner();
        let mut ctx = DedupContext::new();
        let first = c.clean_batch(&mut ctx, vec![item("reddit", "Same title", None)]);
        assert_eq!(first.len(), 1);

        // Fresh context, same content: not a duplicate.
        let mut fresh = DedupContext::new();
        let second = c.clean_batch(&mut fresh, vec![item("reddit", "Same title", None)]);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn spam_and_short_titles_are_filtered() {
        let mut ctx = DedupContext::new();
        let mut spam = item("reddit", "Click here for 10000 followers", None);
        spam.description = "buy now".to_string();
        let short = item("reddit", "ab", None);
        let good = item("reddit", "Tyla announces tour", None);
        let cleaned = cleaner().clean_batch(&mut ctx, vec![spam, short, good]);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].title, "Tyla announces tour");
    }

    #[test]
    fn cross_source_merge_keeps_strongest_and_records_sources() {
        let mut a = item("reddit", "Amapiano festival announced in Johannesburg", Some("https://r/x"));
        a.engagement = 500;
        let mut b = item(
            "news_rss",
            "Amapiano festival announced in Johannesburg",
            Some("https://news/x"),
        );
        b.engagement = 10;
        b.description = "A much longer description from the newsroom".to_string();

        let merged = cleaner().dedupe_across_sources(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, "reddit");
        assert_eq!(
            merged[0].merged_sources(),
            vec!["reddit".to_string(), "news_rss".to_string()]
        );
    }

    #[test]
    fn dissimilar_titles_are_not_merged() {
        let a = item("reddit", "Amapiano festival announced", None);
        let b = item("news_rss", "Election results disputed in parliament", None);
        let merged = cleaner().dedupe_across_sources(vec![a, b]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn jaccard_similarity_bounds() {
        assert_eq!(jaccard_similarity("a b c", "a b c"), 1.0);
        assert_eq!(jaccard_similarity("a b", "c d"), 0.0);
        assert_eq!(jaccard_similarity("", "a"), 0.0);
    }
}
