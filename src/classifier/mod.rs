//! Statistical intent classification behind a narrow async trait.
//!
//! The model itself is an opaque oracle ([`StatisticalModel`]). The
//! [`ClassifierAdapter`] owns everything around it: the time budget, the
//! discount applied relative to pattern matches, clamping, label parsing,
//! and turning failures into empty results.
//!
//! Implementations shipped with the crate:
//! - [`overlap::ExampleOverlapModel`]: bag-of-words over vocabulary examples
//! - [`stub::FixedScoreModel`]: deterministic scores for tests and embedding
//! - [`stub::UnavailableModel`]: always fails, forces degraded mode

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::types::{clamp_unit, Degradation, Entity, EntityOrigin, Intent, IntentCandidate, Recognizer};

pub mod overlap;
pub mod stub;

/// Errors reported by a statistical model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// The model is not loaded or cannot be reached.
    #[error("model unavailable: {0}")]
    Unavailable(String),
    /// The model ran but failed.
    #[error("model inference failed: {0}")]
    Inference(String),
}

/// Opaque statistical model.
///
/// Must be `Send + Sync`: one instance is shared by every session.
#[async_trait]
pub trait StatisticalModel: Send + Sync {
    /// Identifier used in logs.
    fn model_id(&self) -> &str;

    /// Score intent labels for an utterance. Order is not significant.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] when the model cannot produce scores.
    async fn classify(&self, text: &str) -> Result<Vec<(String, f64)>, ModelError>;

    /// Named-entity spans (CONTACT, FREE_TEXT) with byte offsets into `text`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] when the model cannot run.
    async fn extract_entities(&self, text: &str) -> Result<Vec<Entity>, ModelError>;
}

/// Result of one adapter classification call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Discounted candidates, descending confidence.
    pub candidates: Vec<IntentCandidate>,
    /// Set when the model timed out or failed.
    pub degradation: Option<Degradation>,
}

/// Wraps a [`StatisticalModel`] with timeouts and score fusion policy.
#[derive(Clone)]
pub struct ClassifierAdapter {
    model: Arc<dyn StatisticalModel>,
    timeout: Duration,
    discount: f64,
}

impl std::fmt::Debug for ClassifierAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierAdapter")
            .field("model", &self.model.model_id())
            .field("timeout", &self.timeout)
            .field("discount", &self.discount)
            .finish()
    }
}

impl ClassifierAdapter {
    /// Wrap a model.
    pub fn new(model: Arc<dyn StatisticalModel>, timeout: Duration, discount: f64) -> Self {
        Self {
            model,
            timeout,
            discount: clamp_unit(discount),
        }
    }

    /// Identifier of the wrapped model.
    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Classify within the time budget. Never fails.
    pub async fn classify(&self, text: &str) -> Classification {
        let scores = match tokio::time::timeout(self.timeout, self.model.classify(text)).await {
            Ok(Ok(scores)) => scores,
            Ok(Err(e)) => {
                tracing::warn!(model = self.model_id(), error = %e, "classifier failed, using patterns only");
                return Classification {
                    candidates: Vec::new(),
                    degradation: Some(Degradation::ClassificationFailed),
                };
            }
            Err(_) => {
                tracing::warn!(
                    model = self.model_id(),
                    timeout_ms = self.timeout.as_millis(),
                    "classifier timed out, using patterns only"
                );
                return Classification {
                    candidates: Vec::new(),
                    degradation: Some(Degradation::ClassificationTimeout),
                };
            }
        };

        let mut candidates: Vec<IntentCandidate> = scores
            .into_iter()
            .filter(|(label, _)| !label.trim().is_empty())
            .map(|(label, score)| {
                IntentCandidate::new(
                    Intent::parse(&label),
                    clamp_unit(clamp_unit(score) * self.discount),
                    Recognizer::Statistical,
                )
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.intent.cmp(&b.intent))
        });
        tracing::debug!(
            model = self.model_id(),
            candidates = candidates.len(),
            top = ?candidates.first().map(|c| (c.intent.as_str(), c.confidence)),
            "statistical classification"
        );
        Classification {
            candidates,
            degradation: None,
        }
    }

    /// Model entities within the time budget.
    ///
    /// Returns `None` when the model failed or timed out. Spans that do not
    /// lie on char boundaries of `text` are dropped.
    pub async fn extract_entities(&self, text: &str) -> Option<Vec<Entity>> {
        match tokio::time::timeout(self.timeout, self.model.extract_entities(text)).await {
            Ok(Ok(entities)) => Some(
                entities
                    .into_iter()
                    .filter(|e| {
                        e.span.is_some_and(|s| {
                            !s.is_empty() && text.get(s.start..s.end).is_some()
                        })
                    })
                    .map(|mut e| {
                        e.origin = EntityOrigin::Model;
                        e.confidence = clamp_unit(e.confidence);
                        e
                    })
                    .collect(),
            ),
            Ok(Err(e)) => {
                tracing::warn!(model = self.model_id(), error = %e, "entity model failed");
                None
            }
            Err(_) => {
                tracing::warn!(model = self.model_id(), "entity model timed out");
                None
            }
        }
    }
}

/// Lossless-enough conversion of a small count to `f64`.
pub(crate) fn count_f64(n: usize) -> f64 {
    f64::from(u32::try_from(n).unwrap_or(u32::MAX))
}
