//! Deterministic, rule-based intent recognizer.
//!
//! Walks the vocabulary in declaration order. For each intent the first
//! matching pattern wins and fixes the candidate's confidence; later
//! patterns of the same intent are not tried. Several intents may match one
//! utterance and are all reported.

use std::sync::Arc;

use crate::text::NormalizedText;
use crate::types::{Entity, EntityKind, EntityOrigin, IntentCandidate, Recognizer, Span};
use crate::vocabulary::Vocabulary;

/// Confidence of an entity bound by a named capture group.
const CAPTURE_CONFIDENCE: f64 = 0.8;

/// Pattern-based intent recognizer. Immutable and cheap to share.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    vocabulary: Arc<Vocabulary>,
    default_confidence: f64,
}

impl PatternMatcher {
    /// Build a matcher over a vocabulary with the global pattern confidence.
    pub fn new(vocabulary: Arc<Vocabulary>, default_confidence: f64) -> Self {
        Self {
            vocabulary,
            default_confidence,
        }
    }

    /// All intents whose patterns match, in vocabulary order.
    pub fn matches(&self, raw: &str) -> Vec<IntentCandidate> {
        let normalized = NormalizedText::new(raw);
        self.matches_normalized(raw, &normalized)
    }

    /// Same as [`PatternMatcher::matches`] on an already-normalized utterance.
    pub fn matches_normalized(&self, raw: &str, normalized: &NormalizedText) -> Vec<IntentCandidate> {
        let text = normalized.as_str();
        let mut candidates = Vec::new();

        for spec in self.vocabulary.intents() {
            let Some((pattern, caps)) = spec
                .patterns()
                .iter()
                .find_map(|re| re.captures(text).map(|c| (re, c)))
            else {
                continue;
            };

            let confidence = spec.confidence().unwrap_or(self.default_confidence);
            let mut candidate =
                IntentCandidate::new(spec.intent().clone(), confidence, Recognizer::Pattern);

            for name in pattern.capture_names().flatten() {
                let (Some(kind), Some(m)) = (EntityKind::from_group_name(name), caps.name(name))
                else {
                    continue;
                };
                let (start, end) = normalized.to_raw(m.start(), m.end());
                let Some(slice) = raw.get(start..end) else {
                    continue;
                };
                let (value, span) = capture_value(kind, slice, start);
                if value.is_empty() {
                    continue;
                }
                candidate.entities.push(Entity::new(
                    kind,
                    value,
                    span,
                    CAPTURE_CONFIDENCE,
                    EntityOrigin::Pattern,
                ));
            }

            tracing::debug!(
                intent = %candidate.intent,
                pattern = pattern.as_str(),
                bound = candidate.entities.len(),
                "pattern matched"
            );
            candidates.push(candidate);
        }

        candidates
    }
}

/// Trim whitespace and trailing punctuation off a capture, keeping the span exact.
fn capture_value(kind: EntityKind, slice: &str, offset: usize) -> (String, Span) {
    let leading = slice.len().saturating_sub(slice.trim_start().len());
    let trimmed = slice
        .trim()
        .trim_end_matches(|c: char| matches!(c, '?' | '!' | '.' | ','))
        .trim_end();
    let start = offset.saturating_add(leading);
    let span = Span::new(start, start.saturating_add(trimmed.len()));
    let value = match kind {
        EntityKind::Email => trimmed.to_lowercase(),
        _ => trimmed.to_owned(),
    };
    (value, span)
}
