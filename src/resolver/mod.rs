//! Intent resolution pipeline.
//!
//! One call turns an [`Utterance`] into a sealed [`Decision`]:
//!
//! 1. entity extraction joined with recognition (pattern matching, then the
//!    statistical classifier when patterns are absent or too close to call)
//! 2. fusion: max per intent, requirement penalty, deterministic ranking
//! 3. context rules (confirmation, slot filling, ellipsis, reference)
//! 4. re-scoring against the final entity set, transcription cap, verdict
//!
//! The resolver holds no per-session state. The caller owns the
//! [`ConversationContext`] and passes it in; [`IntentResolver::resolve`]
//! is the only place that writes to it.

pub mod fusion;
pub mod policy;

use std::sync::Arc;

use crate::applications::ApplicationRegistry;
use crate::classifier::overlap::ExampleOverlapModel;
use crate::classifier::{Classification, ClassifierAdapter, StatisticalModel};
use crate::config::{AssistantConfig, ConfigError, ContextConfig, ResolverConfig};
use crate::context::{with_bound, ContextManager, ContextResolution, ConversationContext};
use crate::extractors::EntityExtractor;
use crate::patterns::PatternMatcher;
use crate::text::NormalizedText;
use crate::types::{
    ConversationTurn, Decision, DecisionDraft, Degradation, Entity, Intent, IntentCandidate,
    Recognizer, Utterance, Verdict,
};
use crate::vocabulary::{Vocabulary, VocabularyError};

use self::fusion::Scored;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures while building a resolver. Resolution itself never fails.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// Thresholds or limits are inconsistent.
    #[error("invalid resolver configuration: {0}")]
    Config(#[from] ConfigError),

    /// The intent vocabulary could not be loaded.
    #[error("invalid intent vocabulary: {0}")]
    Vocabulary(#[from] VocabularyError),
}

// ---------------------------------------------------------------------------
// IntentResolver
// ---------------------------------------------------------------------------

/// Orchestrates recognition, context and policy. Immutable; share it
/// behind an `Arc` across sessions.
#[derive(Debug)]
pub struct IntentResolver {
    matcher: PatternMatcher,
    extractor: EntityExtractor,
    classifier: Option<ClassifierAdapter>,
    context: ContextManager,
    vocabulary: Arc<Vocabulary>,
    config: ResolverConfig,
    context_config: ContextConfig,
}

impl IntentResolver {
    /// Build a resolver from validated configuration.
    ///
    /// Without a `model`, classification is pattern-only and every
    /// extraction is rule-only (degraded).
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Config`] if the configuration is invalid.
    pub fn new(
        config: &AssistantConfig,
        vocabulary: Arc<Vocabulary>,
        model: Option<Arc<dyn StatisticalModel>>,
    ) -> Result<Self, ResolverError> {
        config.validate()?;
        let resolver = &config.resolver;

        let registry = Arc::new(ApplicationRegistry::new(
            &config.applications,
            &config.application_aliases,
        ));
        let classifier = model.map(|m| {
            ClassifierAdapter::new(m, resolver.classifier_timeout(), resolver.statistical_discount)
        });
        let extractor = match &classifier {
            Some(adapter) => EntityExtractor::new(registry, adapter.clone()),
            None => EntityExtractor::rule_only(registry),
        };

        tracing::info!(
            intents = vocabulary.len(),
            applications = config.applications.len(),
            model = classifier.as_ref().map_or("none", ClassifierAdapter::model_id),
            execute_threshold = resolver.execute_threshold,
            confirm_threshold = resolver.confirm_threshold,
            "intent resolver ready"
        );

        Ok(Self {
            matcher: PatternMatcher::new(Arc::clone(&vocabulary), resolver.pattern_confidence),
            extractor,
            classifier,
            context: ContextManager::new(
                Arc::clone(&vocabulary),
                config.context.carryover,
                resolver.pattern_confidence,
                resolver.confirm_threshold,
            ),
            vocabulary,
            config: resolver.clone(),
            context_config: config.context.clone(),
        })
    }

    /// Build a resolver with the configured vocabulary and the built-in
    /// example-overlap model.
    ///
    /// # Errors
    ///
    /// Returns an error if the vocabulary cannot be loaded or the
    /// configuration is invalid.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, ResolverError> {
        let vocabulary = match &config.vocabulary.path {
            Some(path) => Vocabulary::load_from_file(path)?,
            None => Vocabulary::builtin()?,
        };
        let model: Arc<dyn StatisticalModel> = Arc::new(ExampleOverlapModel::new(&vocabulary));
        Self::new(config, Arc::new(vocabulary), Some(model))
    }

    /// The intent vocabulary in use.
    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    /// The scoring policy in use.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// A fresh, empty conversation context sized from configuration.
    pub fn new_context(&self) -> ConversationContext {
        ConversationContext::from_config(&self.context_config)
    }

    /// Resolve an utterance and record the turn in `context`.
    ///
    /// An expired context is cleared first, so stale turns never influence
    /// the decision.
    pub async fn resolve(&self, utterance: Utterance, context: &mut ConversationContext) -> Decision {
        context.expire_if_stale(utterance.timestamp());
        let decision = self.decide(&utterance, context).await;
        context.record(ConversationTurn::new(utterance, decision.clone()));
        decision
    }

    /// Resolve an utterance against `context` without recording it.
    pub async fn decide(&self, utterance: &Utterance, context: &ConversationContext) -> Decision {
        let raw = utterance.text();
        let normalized = NormalizedText::new(raw);

        // Recognition and extraction are independent; the classifier only
        // follows patterns that are missing or too close to call.
        let recognize = async {
            let pattern = self.matcher.matches_normalized(raw, &normalized);
            let consult =
                fusion::needs_classifier(&pattern, self.config.statistical_margin_threshold);
            let classification = match &self.classifier {
                Some(adapter) if consult => adapter.classify(raw).await,
                _ => Classification::default(),
            };
            tracing::debug!(
                patterns = pattern.len(),
                consulted = consult,
                statistical = classification.candidates.len(),
                "recognition done"
            );
            (pattern, classification)
        };
        let (extraction, (pattern, classification)) =
            tokio::join!(self.extractor.extract(raw), recognize);

        let degradations: Vec<Degradation> = extraction
            .degradation
            .into_iter()
            .chain(classification.degradation)
            .collect();

        let ranked = self.rank(
            fusion::merge(pattern, classification.candidates),
            &extraction.entities,
        );
        let candidates = ranked.into_iter().map(|s| s.candidate).collect();
        let resolution = self.context.resolve(
            &normalized,
            candidates,
            extraction.entities,
            context,
            utterance.timestamp(),
        );
        self.seal(utterance, resolution, degradations)
    }

    /// Penalize candidates with unmet requirements and sort best first.
    fn rank(&self, candidates: Vec<IntentCandidate>, extracted: &[Entity]) -> Vec<Scored> {
        let scored = candidates
            .into_iter()
            .map(|candidate| {
                let entities = with_bound(extracted, &candidate);
                let score = if self.context.unmet(&candidate.intent, &entities).is_empty() {
                    candidate.confidence
                } else {
                    policy::incomplete_cap(&self.config, candidate.confidence)
                };
                Scored { candidate, score }
            })
            .collect();
        let ranked = fusion::rank(scored, &self.config.intent_priority);

        let tied = fusion::ties(&ranked);
        if !tied.is_empty() {
            tracing::debug!(
                tied = ?tied.iter().map(|i| i.as_str()).collect::<Vec<_>>(),
                winner = %tied[0],
                "ambiguous intent, tie broken by priority"
            );
        }
        ranked
    }

    fn seal(
        &self,
        utterance: &Utterance,
        resolution: ContextResolution,
        degradations: Vec<Degradation>,
    ) -> Decision {
        let ContextResolution {
            candidates,
            entities,
            rule,
            pending_decision,
        } = resolution;

        let draft = match candidates.into_iter().next() {
            Some(top) => {
                let missing = self.context.unmet(&top.intent, &entities);
                let mut confidence = top.confidence;
                if !missing.is_empty() {
                    confidence = policy::incomplete_cap(&self.config, confidence);
                }
                confidence *= utterance.transcription_cap();
                let verdict = policy::verdict(&self.config, &top.intent, confidence, &missing);
                DecisionDraft {
                    utterance_id: utterance.id(),
                    intent: top.intent,
                    entities,
                    confidence,
                    verdict,
                    recognizer: top.recognizer,
                    missing_entities: missing,
                    pending_decision,
                    context_rule: rule,
                    degradations,
                }
            }
            None => DecisionDraft {
                utterance_id: utterance.id(),
                intent: Intent::Unknown,
                entities,
                confidence: 0.0,
                verdict: Verdict::Reject,
                recognizer: Recognizer::Fallback,
                missing_entities: Vec::new(),
                pending_decision: None,
                context_rule: None,
                degradations,
            },
        };

        let decision = Decision::from(draft);
        tracing::info!(
            utterance = %decision.utterance_id(),
            intent = %decision.intent(),
            confidence = decision.confidence(),
            verdict = %decision.verdict(),
            recognizer = ?decision.recognizer(),
            rule = ?decision.context_rule(),
            entities = decision.entities().len(),
            missing = decision.missing_entities().len(),
            "decision"
        );
        decision
    }
}
