//! Entity extraction: typed spans pulled out of an utterance.
//!
//! Two sources report independently and are merged once:
//! - rules:    regex and gazetteer extractors for structured kinds
//! - datetime: French/English date and clock expressions (used by rules)
//! - the statistical model behind `ClassifierAdapter` (CONTACT, FREE_TEXT)
//!
//! Extraction never fails. When the model is missing, errors or times out,
//! rule output is returned alone and FREE_TEXT spans are marked unresolved.

pub mod datetime;
pub mod rules;

use std::cmp::Ordering;
use std::sync::Arc;

use crate::applications::ApplicationRegistry;
use crate::classifier::ClassifierAdapter;
use crate::text::NormalizedText;
use crate::types::{Degradation, Entity, EntityKind};

/// Output of one extraction pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Non-overlapping entities ordered by start offset.
    pub entities: Vec<Entity>,
    /// Set when the statistical model could not contribute.
    pub degradation: Option<Degradation>,
}

/// Rule + model entity extractor. Immutable; shared across sessions.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    registry: Arc<ApplicationRegistry>,
    model: Option<ClassifierAdapter>,
}

impl EntityExtractor {
    /// Extractor backed by rules and a statistical model.
    pub fn new(registry: Arc<ApplicationRegistry>, model: ClassifierAdapter) -> Self {
        Self {
            registry,
            model: Some(model),
        }
    }

    /// Extractor with rules only; every extraction is degraded.
    pub fn rule_only(registry: Arc<ApplicationRegistry>) -> Self {
        Self {
            registry,
            model: None,
        }
    }

    /// Extract entities from raw utterance text.
    pub async fn extract(&self, raw: &str) -> Extraction {
        let normalized = NormalizedText::new(raw);
        let mut entities = rules::extract_all(raw, &normalized, &self.registry);

        let model_entities = match &self.model {
            Some(model) => model.extract_entities(raw).await,
            None => None,
        };

        let degradation = match model_entities {
            Some(found) => {
                entities.extend(found);
                None
            }
            None => {
                for entity in entities.iter_mut().filter(|e| e.kind == EntityKind::FreeText) {
                    entity.resolved = false;
                }
                Some(Degradation::ExtractionDegraded)
            }
        };

        let entities = resolve_overlaps(entities);
        tracing::debug!(
            entities = entities.len(),
            degraded = degradation.is_some(),
            "entity extraction"
        );
        Extraction {
            entities,
            degradation,
        }
    }
}

/// Drop overlapping spans deterministically.
///
/// Preference: higher confidence, then longer span, then earlier span, then
/// kind order. Entities without a span never conflict. The result is
/// ordered by start offset; span-less entities come last, in input order.
pub fn resolve_overlaps(mut entities: Vec<Entity>) -> Vec<Entity> {
    entities.sort_by(precedence);
    let mut kept: Vec<Entity> = Vec::with_capacity(entities.len());
    for entity in entities {
        let conflicts = entity.span.is_some_and(|span| {
            kept.iter()
                .filter_map(|k| k.span)
                .any(|other| other.overlaps(&span))
        });
        let duplicate = kept.iter().any(|k| {
            k.span == entity.span && k.kind == entity.kind && k.value == entity.value
        });
        if !conflicts && !duplicate {
            kept.push(entity);
        }
    }
    kept.sort_by(|a, b| match (a.span, b.span) {
        (Some(x), Some(y)) => x.start.cmp(&y.start).then(x.end.cmp(&y.end)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    kept
}

fn precedence(a: &Entity, b: &Entity) -> Ordering {
    let len = |e: &Entity| e.span.map_or(0, |s| s.len());
    let start = |e: &Entity| e.span.map_or(usize::MAX, |s| s.start);
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| len(b).cmp(&len(a)))
        .then_with(|| start(a).cmp(&start(b)))
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| a.value.cmp(&b.value))
}
