//! Candidate fusion and deterministic ranking.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::types::{Intent, IntentCandidate, Recognizer};

/// A fused candidate with the score used for ranking.
///
/// `score` may be lower than `candidate.confidence` when the candidate is
/// penalized for unmet requirements; the raw confidence is kept so later
/// stages can re-score once context supplies entities.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    /// Fused candidate with its raw confidence.
    pub candidate: IntentCandidate,
    /// Ranking score.
    pub score: f64,
}

/// Whether pattern output is too thin or too close to call without the
/// statistical classifier.
pub fn needs_classifier(pattern: &[IntentCandidate], margin: f64) -> bool {
    let mut scores: Vec<f64> = pattern.iter().map(|c| c.confidence).collect();
    scores.sort_by(|a, b| b.total_cmp(a));
    match scores.as_slice() {
        [] => true,
        [_] => false,
        [first, second, ..] => first - second < margin,
    }
}

/// Group by intent and keep the highest confidence per intent.
///
/// On equal confidence the pattern candidate wins. Bound entities from a
/// losing pattern candidate are carried over so capture groups are never
/// lost to a statistical duplicate.
pub fn merge(
    pattern: Vec<IntentCandidate>,
    statistical: Vec<IntentCandidate>,
) -> Vec<IntentCandidate> {
    let mut by_intent: BTreeMap<Intent, IntentCandidate> = BTreeMap::new();
    for candidate in pattern.into_iter().chain(statistical) {
        match by_intent.remove(&candidate.intent) {
            None => {
                by_intent.insert(candidate.intent.clone(), candidate);
            }
            Some(existing) => {
                let (mut winner, loser) = if beats(&candidate, &existing) {
                    (candidate, existing)
                } else {
                    (existing, candidate)
                };
                if winner.entities.is_empty() {
                    winner.entities = loser.entities;
                }
                by_intent.insert(winner.intent.clone(), winner);
            }
        }
    }
    by_intent.into_values().collect()
}

fn beats(challenger: &IntentCandidate, holder: &IntentCandidate) -> bool {
    match challenger.confidence.total_cmp(&holder.confidence) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => {
            challenger.recognizer == Recognizer::Pattern
                && holder.recognizer != Recognizer::Pattern
        }
    }
}

/// Sort best first: score, then position in `priority`, then label.
///
/// Intents absent from `priority` rank after every listed intent.
pub fn rank(mut scored: Vec<Scored>, priority: &[Intent]) -> Vec<Scored> {
    let position = |intent: &Intent| {
        priority
            .iter()
            .position(|p| p == intent)
            .unwrap_or(priority.len())
    };
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| position(&a.candidate.intent).cmp(&position(&b.candidate.intent)))
            .then_with(|| a.candidate.intent.as_str().cmp(b.candidate.intent.as_str()))
    });
    scored
}

/// Intents sharing the top score, when more than one does.
pub fn ties(ranked: &[Scored]) -> Vec<&Intent> {
    let Some(top) = ranked.first() else {
        return Vec::new();
    };
    let tied: Vec<&Intent> = ranked
        .iter()
        .take_while(|s| s.score.total_cmp(&top.score) == Ordering::Equal)
        .map(|s| &s.candidate.intent)
        .collect();
    if tied.len() > 1 {
        tied
    } else {
        Vec::new()
    }
}
