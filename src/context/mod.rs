//! Conversation memory and context-dependent reinterpretation.
//!
//! [`ConversationContext`] is the bounded, per-session turn history. It is
//! owned by exactly one session and passed around by reference; nothing here
//! is global.
//!
//! [`ContextManager`] applies the context rules to a ranked candidate list,
//! in order, first applicable wins:
//!
//! 1. scoping: an empty or expired context changes nothing
//! 2. confirmation: a short yes/no after a `CONFIRM` verdict
//! 3. slot filling: a short answer supplying what the last turn was missing
//! 4. ellipsis: an entity-only follow-up re-uses the previous intent
//! 5. reference: "annule-le" borrows entities from an antecedent turn
//!
//! The manager never fails a turn; when no rule applies the input passes
//! through unchanged.

pub mod cues;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::config::ContextConfig;
use crate::extractors::resolve_overlaps;
use crate::text::NormalizedText;
use crate::types::{
    ContextRule, ConversationTurn, Entity, EntityRequirement, Intent, IntentCandidate, Recognizer,
    Verdict,
};
use crate::vocabulary::Vocabulary;

use self::cues::Reply;

/// Longest utterance, in tokens, read as a confirmation reply.
const CONFIRMATION_MAX_TOKENS: usize = 4;
/// Longest utterance, in tokens, read as a slot-filling answer.
const SLOT_FILLING_MAX_TOKENS: usize = 6;
/// Longest marker-less utterance read as an ellipsis.
const ELLIPSIS_MAX_TOKENS: usize = 4;
/// Longest marker-less utterance read as a reference.
const REFERENCE_MAX_TOKENS: usize = 3;

// ---------------------------------------------------------------------------
// ConversationContext
// ---------------------------------------------------------------------------

/// Bounded turn history of one session, most recent first.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    turns: VecDeque<ConversationTurn>,
    capacity: usize,
    timeout: TimeDelta,
}

impl ConversationContext {
    /// Empty context. A zero capacity is raised to one.
    ///
    /// Storage grows with recorded turns, not with `capacity`.
    pub fn new(capacity: usize, timeout: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::new(),
            capacity,
            timeout: TimeDelta::from_std(timeout).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Empty context sized from configuration.
    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(config.capacity, config.timeout())
    }

    /// Maximum number of turns kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of turns held.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turn is held.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Turns, most recent first.
    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    /// The most recent turn.
    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.front()
    }

    /// Whether the context has been idle longer than its timeout at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.last().is_some_and(|turn| {
            now.signed_duration_since(turn.recorded_at()) > self.timeout
        })
    }

    /// Clear the history if it expired. Returns whether it was cleared.
    pub fn expire_if_stale(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_expired(now) {
            tracing::debug!(turns = self.turns.len(), "context expired, clearing");
            self.turns.clear();
            true
        } else {
            false
        }
    }

    /// Record a resolved turn, evicting the oldest turns beyond capacity.
    pub fn record(&mut self, turn: ConversationTurn) {
        self.expire_if_stale(turn.recorded_at());
        self.turns.push_front(turn);
        while self.turns.len() > self.capacity {
            self.turns.pop_back();
        }
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

fn is_new_command(candidate: &IntentCandidate) -> bool {
    candidate.recognizer == Recognizer::Pattern
        && !candidate.intent.is_meta()
        && !matches!(candidate.intent, Intent::Greeting | Intent::Farewell)
}

// ---------------------------------------------------------------------------
// ContextManager
// ---------------------------------------------------------------------------

/// Outcome of the context rules for one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextResolution {
    /// Ranked candidates; a single context candidate when a rule applied.
    pub candidates: Vec<IntentCandidate>,
    /// Entity set for the winning candidate.
    pub entities: Vec<Entity>,
    /// Rule that fired, if any.
    pub rule: Option<ContextRule>,
    /// For confirmation replies: utterance id of the decision being answered.
    pub pending_decision: Option<Uuid>,
}

/// Applies context rules. Immutable; shared across sessions.
#[derive(Debug, Clone)]
pub struct ContextManager {
    vocabulary: Arc<Vocabulary>,
    carryover: f64,
    confirmation_confidence: f64,
    confirm_threshold: f64,
}

impl ContextManager {
    /// Build a manager.
    ///
    /// `carryover` scores intents re-applied from context,
    /// `confirmation_confidence` scores yes/no replies, and
    /// `confirm_threshold` separates weak statistical guesses from real ones.
    pub fn new(
        vocabulary: Arc<Vocabulary>,
        carryover: f64,
        confirmation_confidence: f64,
        confirm_threshold: f64,
    ) -> Self {
        Self {
            vocabulary,
            carryover,
            confirmation_confidence,
            confirm_threshold,
        }
    }

    /// Run the rules over ranked `candidates` and `extracted` entities.
    ///
    /// `candidates` are ranked best first with their unpenalized confidence;
    /// pattern candidates carry their own bound entities.
    pub fn resolve(
        &self,
        normalized: &NormalizedText,
        candidates: Vec<IntentCandidate>,
        extracted: Vec<Entity>,
        context: &ConversationContext,
        now: DateTime<Utc>,
    ) -> ContextResolution {
        let Some(previous) = context.last().filter(|_| !context.is_expired(now)) else {
            return passthrough(candidates, extracted);
        };
        let text = normalized.as_str();
        let token_count = normalized.token_count();

        if let Some(resolution) = self.confirmation(text, token_count, &candidates, previous) {
            return resolution;
        }
        if let Some(resolution) =
            self.slot_filling(token_count, &candidates, &extracted, previous)
        {
            return resolution;
        }
        if let Some(resolution) =
            self.ellipsis(text, token_count, &candidates, &extracted, previous)
        {
            return resolution;
        }
        if let Some(resolution) =
            self.reference(text, token_count, &candidates, &extracted, context)
        {
            return resolution;
        }
        passthrough(candidates, extracted)
    }

    fn confirmation(
        &self,
        text: &str,
        token_count: usize,
        candidates: &[IntentCandidate],
        previous: &ConversationTurn,
    ) -> Option<ContextResolution> {
        let pending = previous.decision();
        if pending.verdict() != Verdict::Confirm || token_count > CONFIRMATION_MAX_TOKENS {
            return None;
        }
        // "ok ouvre chrome" is a new command, not an answer.
        if candidates.iter().any(is_new_command) {
            return None;
        }
        let intent = match cues::confirmation_reply(text)? {
            Reply::Yes => Intent::ConfirmYes,
            Reply::No => Intent::ConfirmNo,
        };
        let source = previous.utterance().id();
        let entities = pending
            .entities()
            .iter()
            .map(|e| e.inherited_from(source))
            .collect();
        tracing::debug!(intent = %intent, pending = %source, "confirmation reply");
        Some(ContextResolution {
            candidates: vec![IntentCandidate::new(
                intent,
                self.confirmation_confidence,
                Recognizer::Context,
            )],
            entities,
            rule: Some(ContextRule::Confirmation),
            pending_decision: Some(source),
        })
    }

    fn slot_filling(
        &self,
        token_count: usize,
        candidates: &[IntentCandidate],
        extracted: &[Entity],
        previous: &ConversationTurn,
    ) -> Option<ContextResolution> {
        let decision = previous.decision();
        if token_count > SLOT_FILLING_MAX_TOKENS
            || decision.verdict() == Verdict::Execute
            || decision.intent().is_meta()
            || decision.missing_entities().is_empty()
        {
            return None;
        }
        let confident_pattern = candidates.iter().any(|c| {
            c.recognizer == Recognizer::Pattern
                && self.unmet(&c.intent, &with_bound(extracted, c)).is_empty()
        });
        if confident_pattern {
            return None;
        }
        let supplies_missing = decision
            .missing_entities()
            .iter()
            .any(|req| req.is_met(extracted));
        if !supplies_missing {
            return None;
        }
        let entities = inherit_missing_kinds(extracted, decision.entities(), previous.utterance().id());
        tracing::debug!(intent = %decision.intent(), "slot filled from context");
        Some(self.carried(decision.intent().clone(), entities, ContextRule::SlotFilling))
    }

    fn ellipsis(
        &self,
        text: &str,
        token_count: usize,
        candidates: &[IntentCandidate],
        extracted: &[Entity],
        previous: &ConversationTurn,
    ) -> Option<ContextResolution> {
        let decision = previous.decision();
        if extracted.is_empty() || decision.intent().is_meta() {
            return None;
        }
        let has_pattern = candidates.iter().any(|c| c.recognizer == Recognizer::Pattern);
        let weak_statistics = candidates
            .first()
            .is_none_or(|c| c.confidence < self.confirm_threshold);
        if has_pattern || !weak_statistics {
            return None;
        }
        if !(cues::has_ellipsis_marker(text) || token_count <= ELLIPSIS_MAX_TOKENS) {
            return None;
        }
        let entities = inherit_missing_kinds(extracted, decision.entities(), previous.utterance().id());
        tracing::debug!(intent = %decision.intent(), "ellipsis resolved from context");
        Some(self.carried(decision.intent().clone(), entities, ContextRule::Ellipsis))
    }

    fn reference(
        &self,
        text: &str,
        token_count: usize,
        candidates: &[IntentCandidate],
        extracted: &[Entity],
        context: &ConversationContext,
    ) -> Option<ContextResolution> {
        let top = candidates.first()?;
        let current = with_bound(extracted, top);
        let missing = self.unmet(&top.intent, &current);
        if missing.is_empty() {
            return None;
        }
        if !(cues::has_anaphora(text) || token_count <= REFERENCE_MAX_TOKENS) {
            return None;
        }

        let allowed = self.vocabulary.antecedents(&top.intent);
        let antecedent = context.turns().find(|turn| {
            let decision = turn.decision();
            !decision.intent().is_meta()
                && (allowed.is_empty() || allowed.contains(decision.intent()))
                && missing.iter().any(|req| req.is_met(decision.entities()))
        });
        let Some(antecedent) = antecedent else {
            tracing::debug!(intent = %top.intent, "no antecedent for reference");
            return None;
        };

        let source = antecedent.utterance().id();
        let entities = inherit_missing_kinds(&current, antecedent.decision().entities(), source);
        tracing::debug!(
            intent = %top.intent,
            antecedent = %antecedent.decision().intent(),
            "reference resolved"
        );
        Some(ContextResolution {
            candidates: candidates.to_vec(),
            entities,
            rule: Some(ContextRule::Reference),
            pending_decision: None,
        })
    }

    fn carried(&self, intent: Intent, entities: Vec<Entity>, rule: ContextRule) -> ContextResolution {
        ContextResolution {
            candidates: vec![IntentCandidate::new(intent, self.carryover, Recognizer::Context)],
            entities,
            rule: Some(rule),
            pending_decision: None,
        }
    }

    /// Requirements of `intent` that `entities` leave unmet.
    pub fn unmet(&self, intent: &Intent, entities: &[Entity]) -> Vec<EntityRequirement> {
        self.vocabulary
            .requirements(intent)
            .iter()
            .filter(|req| !req.is_met(entities))
            .cloned()
            .collect()
    }
}

fn passthrough(candidates: Vec<IntentCandidate>, extracted: Vec<Entity>) -> ContextResolution {
    let entities = match candidates.first() {
        Some(top) => with_bound(&extracted, top),
        None => extracted,
    };
    ContextResolution {
        candidates,
        entities,
        rule: None,
        pending_decision: None,
    }
}

/// Extracted entities plus the candidate's own capture-group entities.
pub(crate) fn with_bound(extracted: &[Entity], candidate: &IntentCandidate) -> Vec<Entity> {
    if candidate.entities.is_empty() {
        return extracted.to_vec();
    }
    let mut all = extracted.to_vec();
    all.extend(candidate.entities.iter().cloned());
    resolve_overlaps(all)
}

/// `current` plus every entity of `donor` whose kind `current` lacks, so
/// current entities replace same-kind entries of the donor.
fn inherit_missing_kinds(current: &[Entity], donor: &[Entity], source: Uuid) -> Vec<Entity> {
    let mut merged = current.to_vec();
    for entity in donor {
        if !merged.iter().any(|e| e.kind == entity.kind) {
            merged.push(entity.inherited_from(source));
        }
    }
    resolve_overlaps(merged)
}
