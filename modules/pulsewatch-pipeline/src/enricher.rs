//! Enrichment stage: entity extraction, language detection, and market
//! inference.
//!
//! Seed-list matching always runs. A full NER tagger is an optional
//! capability: when none is wired in, enrichment proceeds with seed
//! entities only.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::info;

use pulsewatch_common::types::TrendItem;

/// Optional NER capability. Implementations tag free text with
/// entity-type → names; results are merged into the seed matches.
pub trait EntityTagger: Send + Sync {
    fn tag(&self, text: &str) -> BTreeMap<String, Vec<String>>;
}

/// Market inference keywords, checked against lowercased text. Order is
/// the tie-break: the first market with the top match count wins.
const MARKET_KEYWORDS: &[(&str, &[&str])] = &[
    ("ZA", &["south africa", "johannesburg", "cape town", "pretoria", "durban", "soweto", "mzansi"]),
    ("NG", &["nigeria", "lagos", "abuja", "naija", "nigerians"]),
    ("KE", &["kenya", "nairobi", "mombasa", "kenyan"]),
    ("GH", &["ghana", "accra", "kumasi", "ghanaian"]),
    ("TZ", &["tanzania", "dar es salaam", "dodoma", "tanzanian", "bongo"]),
    ("UG", &["uganda", "kampala", "ugandan"]),
    ("CI", &["ivory coast", "cote d'ivoire", "abidjan", "ivorian"]),
    ("SN", &["senegal", "dakar", "senegalese"]),
    ("EG", &["egypt", "cairo", "alexandria", "egyptian"]),
    ("MA", &["morocco", "rabat", "casablanca", "marrakech", "moroccan"]),
];

const FRENCH_WORDS: &[&str] = &["le", "la", "les", "de", "du", "des", "est", "sont", "avec", "pour"];
const PORTUGUESE_WORDS: &[&str] = &["nao", "que", "para", "com", "uma", "sao", "esta"];
const SWAHILI_WORDS: &[&str] = &["na", "kwa", "wa", "ya", "ni", "kutoka", "kwamba"];

pub struct Enricher {
    /// Entity type → (name, word-boundary pattern) pairs.
    entity_patterns: Vec<(String, Vec<(String, Regex)>)>,
    tagger: Option<Box<dyn EntityTagger>>,
}

impl Enricher {
    pub fn new(
        seed_entities: &BTreeMap<String, Vec<String>>,
        tagger: Option<Box<dyn EntityTagger>>,
    ) -> Self {
        let entity_patterns = seed_entities
            .iter()
            .map(|(entity_type, names)| {
                let patterns = names
                    .iter()
                    .filter_map(|name| {
                        Regex::new(&format!(r"(?i)\b{}\b", regex::escape(name)))
                            .ok()
                            .map(|p| (name.clone(), p))
                    })
                    .collect();
                (entity_type.clone(), patterns)
            })
            .collect();
        Self {
            entity_patterns,
            tagger,
        }
    }

    pub fn enrich_batch(&self, items: &mut [TrendItem]) {
        for item in items.iter_mut() {
            self.enrich_item(item);
        }
        info!(count = items.len(), "Enrichment complete");
    }

    pub fn enrich_item(&self, item: &mut TrendItem) {
        let text = format!("{} {} {}", item.title, item.description, item.raw_text);

        // Merge into whatever the connector already tagged.
        for (entity_type, names) in self.extract_seed_entities(&text) {
            let existing = item.entities.entry(entity_type).or_default();
            for name in names {
                if !existing.contains(&name) {
                    existing.push(name);
                }
            }
        }

        if let Some(tagger) = &self.tagger {
            for (entity_type, names) in tagger.tag(&text) {
                let existing = item.entities.entry(entity_type).or_default();
                for name in names {
                    if !existing.contains(&name) {
                        existing.push(name);
                    }
                }
            }
        }

        if item.language.is_none() {
            item.language = detect_language(&text);
        }
        if item.market.is_none() {
            item.market = infer_market(&text);
        }
    }

    fn extract_seed_entities(&self, text: &str) -> BTreeMap<String, Vec<String>> {
        let mut extracted = BTreeMap::new();
        for (entity_type, patterns) in &self.entity_patterns {
            let matches: Vec<String> = patterns
                .iter()
                .filter(|(_, pattern)| pattern.is_match(text))
                .map(|(name, _)| name.clone())
                .collect();
            if !matches.is_empty() {
                extracted.insert(entity_type.clone(), matches);
            }
        }
        extracted
    }
}

/// Keyword-heuristic language detection. Returns an ISO 639-1 code, or
/// None when the text is too short to judge.
pub fn detect_language(text: &str) -> Option<String> {
    if text.trim().len() < 20 {
        return None;
    }
    let lower = format!(" {} ", text.to_lowercase());

    if text.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c)) {
        return Some("ar".to_string());
    }

    let french = FRENCH_WORDS
        .iter()
        .filter(|w| lower.contains(&format!(" {w} ")))
        .count();
    if french >= 3 {
        return Some("fr".to_string());
    }

    let portuguese = PORTUGUESE_WORDS
        .iter()
        .filter(|w| lower.contains(*w))
        .count();
    if portuguese >= 2 {
        return Some("pt".to_string());
    }

    let swahili = SWAHILI_WORDS
        .iter()
        .filter(|w| lower.contains(&format!(" {w} ")))
        .count();
    if swahili >= 2 {
        return Some("sw".to_string());
    }

    Some("en".to_string())
}

/// Infer a market code from content keywords. The highest match count
/// wins; ties go to the earlier entry in MARKET_KEYWORDS.
pub fn infer_market(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let mut best: Option<(&str, usize)> = None;

    for (market, keywords) in MARKET_KEYWORDS {
        let count = keywords.iter().filter(|kw| lower.contains(*kw)).count();
        if count > 0 && best.map_or(true, |(_, c)| count > c) {
            best = Some((market, count));
        }
    }
    best.map(|(market, _)| market.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enricher() -> Enricher {
        let mut seeds = BTreeMap::new();
        seeds.insert(
            "artists".to_string(),
            vec!["Burna Boy".to_string(), "Tyla".to_string()],
        );
        seeds.insert("genres".to_string(), vec!["amapiano".to_string()]);
        Enricher::new(&seeds, None)
    }

    #[test]
    fn seed_entities_match_case_insensitively() {
        let mut item = TrendItem::new("reddit", "BURNA BOY drops amapiano remix", None);
        enricher().enrich_item(&mut item);
        assert_eq!(item.entities["artists"], vec!["Burna Boy".to_string()]);
        assert_eq!(item.entities["genres"], vec!["amapiano".to_string()]);
    }

    #[test]
    fn seed_matching_respects_word_boundaries() {
        // "Tylade" must not match "Tyla".
        let mut item = TrendItem::new("reddit", "Tylade is a different word entirely", None);
        enricher().enrich_item(&mut item);
        assert!(item.entities.get("artists").is_none());
    }

    #[test]
    fn tagger_entities_are_merged_without_duplicates() {
        struct FixedTagger;
        impl EntityTagger for FixedTagger {
            fn tag(&self, _text: &str) -> BTreeMap<String, Vec<String>> {
                let mut out = BTreeMap::new();
                out.insert(
                    "artists".to_string(),
                    vec!["Burna Boy".to_string(), "Wizkid".to_string()],
                );
                out.insert("places".to_string(), vec!["Lagos".to_string()]);
                out
            }
        }
        let mut seeds = BTreeMap::new();
        seeds.insert("artists".to_string(), vec!["Burna Boy".to_string()]);
        let enricher = Enricher::new(&seeds, Some(Box::new(FixedTagger)));

        let mut item = TrendItem::new("reddit", "Burna Boy live in Lagos", None);
        enricher.enrich_item(&mut item);
        assert_eq!(
            item.entities["artists"],
            vec!["Burna Boy".to_string(), "Wizkid".to_string()]
        );
        assert_eq!(item.entities["places"], vec!["Lagos".to_string()]);
    }

    #[test]
    fn connector_supplied_entities_survive_enrichment() {
        let mut item = TrendItem::new("youtube", "Tyla tops the chart again", None);
        item.entities
            .insert("artists".to_string(), vec!["Uncle Waffles".to_string()]);
        item.entities
            .insert("platforms".to_string(), vec!["Spotify".to_string()]);
        enricher().enrich_item(&mut item);
        assert_eq!(
            item.entities["artists"],
            vec!["Uncle Waffles".to_string(), "Tyla".to_string()]
        );
        assert_eq!(item.entities["platforms"], vec!["Spotify".to_string()]);
    }

    #[test]
    fn market_inferred_from_city_names() {
        assert_eq!(
            infer_market("huge crowds in Lagos tonight for the show"),
            Some("NG".to_string())
        );
        assert_eq!(
            infer_market("Johannesburg and Cape Town both sold out"),
            Some("ZA".to_string())
        );
        assert_eq!(infer_market("a trend with no location at all"), None);
    }

    #[test]
    fn language_detection_heuristics() {
        assert_eq!(
            detect_language("le concert est complet avec des milliers de fans pour la soiree"),
            Some("fr".to_string())
        );
        assert_eq!(
            detect_language("a normal english sentence about music trends"),
            Some("en".to_string())
        );
        assert_eq!(detect_language("too short"), None);
    }

    #[test]
    fn arabic_script_detected() {
        assert_eq!(
            detect_language("أغنية جديدة تتصدر المخططات في مصر هذا الأسبوع"),
            Some("ar".to_string())
        );
    }

    #[test]
    fn existing_market_and_language_are_preserved() {
        let mut item = TrendItem::new("youtube", "Concert announced in Lagos Nigeria today", None);
        item.market = Some("ZA".to_string());
        item.language = Some("fr".to_string());
        enricher().enrich_item(&mut item);
        assert_eq!(item.market.as_deref(), Some("ZA"));
        assert_eq!(item.language.as_deref(), Some("fr"));
    }
}
