//! Completion suggestions for a partially typed utterance.
//!
//! Candidates are the vocabulary's example phrases. Matching is done on
//! folded text, so "verifie" finds "vérifie mes mails".

use crate::text::fold;
use crate::types::Intent;
use crate::vocabulary::Vocabulary;

/// Default number of suggestions returned.
pub const DEFAULT_LIMIT: usize = 5;

/// A suggested completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// Example phrase, as written in the vocabulary.
    pub phrase: String,
    /// Intent the phrase illustrates.
    pub intent: Intent,
}

#[derive(Debug, Clone)]
struct Entry {
    folded: String,
    suggestion: Suggestion,
}

/// Precomputed index over vocabulary examples.
#[derive(Debug, Clone)]
pub struct Suggester {
    entries: Vec<Entry>,
}

impl Suggester {
    /// Index every example phrase of `vocabulary`.
    pub fn new(vocabulary: &Vocabulary) -> Self {
        let entries = vocabulary
            .intents()
            .iter()
            .flat_map(|spec| {
                spec.examples().iter().map(move |phrase| Entry {
                    folded: fold(phrase),
                    suggestion: Suggestion {
                        phrase: phrase.clone(),
                        intent: spec.intent().clone(),
                    },
                })
            })
            .collect();
        Self { entries }
    }

    /// Up to `limit` phrases containing `partial`.
    ///
    /// Phrases starting with `partial` come first, then phrases where it
    /// starts a word, then any other occurrence; shorter phrases first
    /// within each group. Blank input yields nothing.
    pub fn suggest(&self, partial: &str, limit: usize) -> Vec<Suggestion> {
        let needle = fold(partial);
        let needle = needle.trim();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut ranked: Vec<(u8, &Entry)> = self
            .entries
            .iter()
            .filter_map(|entry| rank(&entry.folded, needle).map(|r| (r, entry)))
            .collect();
        ranked.sort_by(|(ra, a), (rb, b)| {
            ra.cmp(rb)
                .then_with(|| a.folded.len().cmp(&b.folded.len()))
                .then_with(|| a.folded.cmp(&b.folded))
        });
        ranked.dedup_by(|(_, a), (_, b)| a.folded == b.folded);

        ranked
            .into_iter()
            .take(limit)
            .map(|(_, entry)| entry.suggestion.clone())
            .collect()
    }
}

fn rank(haystack: &str, needle: &str) -> Option<u8> {
    if haystack.starts_with(needle) {
        return Some(0);
    }
    let at = haystack.find(needle)?;
    let word_start = haystack[..at]
        .chars()
        .next_back()
        .is_none_or(|c| !c.is_alphanumeric());
    Some(if word_start { 1 } else { 2 })
}
