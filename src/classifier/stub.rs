//! Deterministic model stand-ins.

use std::time::Duration;

use async_trait::async_trait;

use super::{ModelError, StatisticalModel};
use crate::types::Entity;

/// Returns the configured scores and entities for every input.
#[derive(Debug, Clone, Default)]
pub struct FixedScoreModel {
    scores: Vec<(String, f64)>,
    entities: Vec<Entity>,
    delay: Option<Duration>,
}

impl FixedScoreModel {
    /// Fixed `(label, score)` pairs.
    pub fn new(scores: Vec<(String, f64)>) -> Self {
        Self {
            scores,
            entities: Vec::new(),
            delay: None,
        }
    }

    /// A model that recognizes nothing.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Entities returned by every `extract_entities` call.
    #[must_use]
    pub fn with_entities(mut self, entities: Vec<Entity>) -> Self {
        self.entities = entities;
        self
    }

    /// Sleep this long inside `classify` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl StatisticalModel for FixedScoreModel {
    fn model_id(&self) -> &str {
        "fixed-score"
    }

    async fn classify(&self, _text: &str) -> Result<Vec<(String, f64)>, ModelError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.scores.clone())
    }

    async fn extract_entities(&self, text: &str) -> Result<Vec<Entity>, ModelError> {
        Ok(self
            .entities
            .iter()
            .filter(|e| e.span.is_some_and(|s| s.end <= text.len()))
            .cloned()
            .collect())
    }
}

/// A model that is never available.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableModel;

#[async_trait]
impl StatisticalModel for UnavailableModel {
    fn model_id(&self) -> &str {
        "unavailable"
    }

    async fn classify(&self, _text: &str) -> Result<Vec<(String, f64)>, ModelError> {
        Err(ModelError::Unavailable("no model loaded".to_owned()))
    }

    async fn extract_entities(&self, _text: &str) -> Result<Vec<Entity>, ModelError> {
        Err(ModelError::Unavailable("no model loaded".to_owned()))
    }
}
