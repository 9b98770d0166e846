//! Lightweight bag-of-words model built from vocabulary example phrases.
//!
//! Intent scores are the best cosine similarity between the utterance's
//! content words and any example of the intent. The entity pass finds
//! lowercase contact names after a recipient preposition and search queries,
//! the two spans rule extraction cannot see.

use std::collections::HashSet;

use async_trait::async_trait;
use regex::Regex;

use super::{count_f64, ModelError, StatisticalModel};
use crate::text::{tokens, NormalizedText};
use crate::types::{Entity, EntityKind, EntityOrigin, Span};
use crate::vocabulary::Vocabulary;

const STOP_WORDS: &[&str] = &[
    "a", "au", "aux", "avec", "ce", "cette", "de", "des", "du", "en", "et", "il", "je", "la", "le",
    "les", "ma", "me", "mes", "moi", "mon", "pour", "s'il", "sur", "te", "tu", "un", "une", "plait",
    "an", "for", "me", "my", "please", "the", "to", "with",
];

/// Words that follow a preposition but are never names.
const NOT_NAMES: &[&str] = &[
    "demain", "aujourd'hui", "midi", "minuit", "lundi", "mardi", "mercredi", "jeudi", "vendredi",
    "samedi", "dimanche", "propos", "tous", "toutes", "quelqu'un", "personne", "tomorrow", "today",
    "everyone", "nobody", "you",
];

const CONTACT_CONFIDENCE: f64 = 0.55;
const QUERY_CONFIDENCE: f64 = 0.6;

type Bag = HashSet<String>;

/// Example-overlap intent model. Built once per vocabulary.
#[derive(Debug, Clone)]
pub struct ExampleOverlapModel {
    intents: Vec<(String, Vec<Bag>)>,
    contact: Option<Regex>,
    query: Option<Regex>,
}

impl ExampleOverlapModel {
    /// Index every example phrase of the vocabulary.
    pub fn new(vocabulary: &Vocabulary) -> Self {
        let intents = vocabulary
            .intents()
            .iter()
            .map(|spec| {
                let bags = spec
                    .examples()
                    .iter()
                    .map(|e| bag(NormalizedText::new(e).as_str()))
                    .filter(|b| !b.is_empty())
                    .collect();
                (spec.intent().to_string(), bags)
            })
            .collect();
        Self {
            intents,
            contact: Regex::new(r"\b(?:a|pour|avec|to|for|with)\s+([a-z][a-z'-]{2,})\b").ok(),
            query: Regex::new(r"^(?:re)?cherche(?:r)?\s+(?:sur (?:google|internet|le web)\s+)?(.+)$|^search(?: for)?\s+(.+)$").ok(),
        }
    }

    fn score(&self, utterance: &Bag) -> Vec<(String, f64)> {
        if utterance.is_empty() {
            return Vec::new();
        }
        self.intents
            .iter()
            .filter_map(|(label, bags)| {
                let best = bags
                    .iter()
                    .map(|b| cosine(utterance, b))
                    .fold(0.0_f64, f64::max);
                (best > 0.0).then(|| (label.clone(), best))
            })
            .collect()
    }

    fn entities(&self, raw: &str) -> Vec<Entity> {
        let normalized = NormalizedText::new(raw);
        let text = normalized.as_str();
        let mut found = Vec::new();

        if let Some(re) = &self.contact {
            for caps in re.captures_iter(text) {
                let Some(m) = caps.get(1) else { continue };
                let word = m.as_str();
                if STOP_WORDS.contains(&word) || NOT_NAMES.contains(&word) {
                    continue;
                }
                if let Some(entity) = span_entity(raw, &normalized, m.start(), m.end(), EntityKind::Contact, CONTACT_CONFIDENCE) {
                    found.push(entity);
                }
            }
        }

        if let Some(re) = &self.query {
            if let Some(m) = re.captures(text).and_then(|c| c.get(1).or_else(|| c.get(2))) {
                if let Some(entity) = span_entity(raw, &normalized, m.start(), m.end(), EntityKind::FreeText, QUERY_CONFIDENCE) {
                    found.push(entity);
                }
            }
        }
        found
    }
}

fn span_entity(
    raw: &str,
    normalized: &NormalizedText,
    start: usize,
    end: usize,
    kind: EntityKind,
    confidence: f64,
) -> Option<Entity> {
    let (s, e) = normalized.to_raw(start, end);
    let value = raw.get(s..e)?.trim();
    if value.is_empty() {
        return None;
    }
    Some(Entity::new(kind, value, Span::new(s, e), confidence, EntityOrigin::Model))
}

fn bag(normalized: &str) -> Bag {
    tokens(normalized)
        .map(strip_elision)
        .filter(|t| !STOP_WORDS.contains(t))
        .map(str::to_owned)
        .collect()
}

/// `l'ordinateur` → `ordinateur`, `qu'est-ce` → `est-ce`.
fn strip_elision(token: &str) -> &str {
    match token.split_once('\'') {
        Some((head, tail)) if head.len() <= 3 && !tail.is_empty() && head != "s" => tail,
        _ => token,
    }
}

fn cosine(a: &Bag, b: &Bag) -> f64 {
    let shared = a.intersection(b).count();
    if shared == 0 {
        return 0.0;
    }
    let denominator = (count_f64(a.len()) * count_f64(b.len())).sqrt();
    if denominator > 0.0 {
        count_f64(shared) / denominator
    } else {
        0.0
    }
}

#[async_trait]
impl StatisticalModel for ExampleOverlapModel {
    fn model_id(&self) -> &str {
        "example-overlap"
    }

    async fn classify(&self, text: &str) -> Result<Vec<(String, f64)>, ModelError> {
        Ok(self.score(&bag(NormalizedText::new(text).as_str())))
    }

    async fn extract_entities(&self, text: &str) -> Result<Vec<Entity>, ModelError> {
        Ok(self.entities(text))
    }
}
