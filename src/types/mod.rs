//! Core value types shared by every stage of the intent pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Utterance
// ---------------------------------------------------------------------------

/// Channel an utterance arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtteranceSource {
    /// Transcribed by the external speech collaborator.
    Voice,
    /// Typed by the user.
    Typed,
}

/// A single user input. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    id: Uuid,
    text: String,
    timestamp: DateTime<Utc>,
    source: UtteranceSource,
    transcription_confidence: Option<f64>,
}

impl Utterance {
    /// A typed utterance stamped with the current time.
    pub fn typed(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            timestamp: Utc::now(),
            source: UtteranceSource::Typed,
            transcription_confidence: None,
        }
    }

    /// A voice utterance with the transcriber's confidence, clamped to `[0, 1]`.
    pub fn voice(text: impl Into<String>, transcription_confidence: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            timestamp: Utc::now(),
            source: UtteranceSource::Voice,
            transcription_confidence: Some(clamp_unit(transcription_confidence)),
        }
    }

    /// Override the timestamp (replays and tests).
    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Unique id of this utterance; decisions refer back to it.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Raw text as delivered.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// When the utterance was captured.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Voice or typed.
    pub fn source(&self) -> UtteranceSource {
        self.source
    }

    /// Transcriber confidence, if any.
    pub fn transcription_confidence(&self) -> Option<f64> {
        self.transcription_confidence
    }

    /// Multiplicative ceiling imposed by the transcription.
    ///
    /// Typed input and voice input without a reported confidence are not capped.
    pub fn transcription_cap(&self) -> f64 {
        match (self.source, self.transcription_confidence) {
            (UtteranceSource::Voice, Some(c)) => clamp_unit(c),
            _ => 1.0,
        }
    }
}

/// Clamp to `[0, 1]`, mapping NaN to zero.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Closed set of entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    /// An application from the registry.
    Application,
    /// A date, a time or both.
    Datetime,
    /// An email address.
    Email,
    /// A person name.
    Contact,
    /// A filesystem path.
    Path,
    /// Free-form text (titles, subjects, queries).
    FreeText,
}

impl EntityKind {
    /// All kinds in declaration order.
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Application,
        EntityKind::Datetime,
        EntityKind::Email,
        EntityKind::Contact,
        EntityKind::Path,
        EntityKind::FreeText,
    ];

    /// Wire label, e.g. `FREE_TEXT`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Application => "APPLICATION",
            Self::Datetime => "DATETIME",
            Self::Email => "EMAIL",
            Self::Contact => "CONTACT",
            Self::Path => "PATH",
            Self::FreeText => "FREE_TEXT",
        }
    }

    /// Kind bound by a regex capture group of the same (lowercase) name.
    pub fn from_group_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_group_name(s.trim()).ok_or_else(|| format!("unknown entity kind: {s}"))
    }
}

/// Byte range into the utterance text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

impl Span {
    /// Build a span; `end` is raised to `start` if smaller.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether two spans share at least one byte.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Which producer reported an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum EntityOrigin {
    /// Rule or gazetteer extractor.
    Rule,
    /// Statistical named-entity model.
    Model,
    /// Named capture group of an intent pattern.
    Pattern,
    /// Inherited from an earlier turn.
    Context {
        /// Utterance the entity was first extracted from.
        turn: Uuid,
    },
}

/// A typed, normalized span extracted from an utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity kind.
    pub kind: EntityKind,
    /// Normalized value (e.g. `"demain 14h"`, `"bloc-notes"`).
    pub value: String,
    /// Offsets in the utterance text; `None` for entities inherited from context.
    pub span: Option<Span>,
    /// Extraction confidence in `[0, 1]`.
    pub confidence: f64,
    /// Producer of this entity.
    pub origin: EntityOrigin,
    /// `false` for free text that could not be confirmed by the statistical model.
    pub resolved: bool,
    /// External identifier, e.g. an application's launch identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Entity {
    /// A resolved entity with no external reference.
    pub fn new(
        kind: EntityKind,
        value: impl Into<String>,
        span: Span,
        confidence: f64,
        origin: EntityOrigin,
    ) -> Self {
        Self {
            kind,
            value: value.into(),
            span: Some(span),
            confidence: clamp_unit(confidence),
            origin,
            resolved: true,
            reference: None,
        }
    }

    /// Attach an external reference.
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Copy of this entity re-homed into a later turn.
    pub fn inherited_from(&self, turn: Uuid) -> Self {
        let origin = match self.origin {
            EntityOrigin::Context { turn } => EntityOrigin::Context { turn },
            _ => EntityOrigin::Context { turn },
        };
        Self {
            span: None,
            origin,
            ..self.clone()
        }
    }
}

/// An entity requirement: satisfied by any one of the listed kinds.
///
/// Written `CONTACT|EMAIL` in vocabularies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityRequirement {
    any_of: Vec<EntityKind>,
}

impl EntityRequirement {
    /// Requirement satisfied by a single kind.
    pub fn single(kind: EntityKind) -> Self {
        Self { any_of: vec![kind] }
    }

    /// Accepted kinds.
    pub fn kinds(&self) -> &[EntityKind] {
        &self.any_of
    }

    /// Whether a kind satisfies this requirement.
    pub fn accepts(&self, kind: EntityKind) -> bool {
        self.any_of.contains(&kind)
    }

    /// Whether any entity in the set satisfies this requirement.
    pub fn is_met(&self, entities: &[Entity]) -> bool {
        entities.iter().any(|e| self.accepts(e.kind))
    }
}

impl fmt::Display for EntityRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.any_of.iter().map(|k| k.as_str()).collect();
        f.write_str(&labels.join("|"))
    }
}

impl FromStr for EntityRequirement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let any_of = s
            .split('|')
            .map(str::parse)
            .collect::<Result<Vec<EntityKind>, _>>()?;
        if any_of.is_empty() {
            return Err("empty entity requirement".to_owned());
        }
        Ok(Self { any_of })
    }
}

impl TryFrom<String> for EntityRequirement {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityRequirement> for String {
    fn from(value: EntityRequirement) -> Self {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Intents
// ---------------------------------------------------------------------------

/// Intent vocabulary.
///
/// Well-known intents are variants; anything else loaded from a vocabulary
/// file lands in [`Intent::Other`] so adding an intent never requires code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Intent {
    /// Launch an application.
    OpenApplication,
    /// Close an application.
    CloseApplication,
    /// Shutdown, restart, lock or sleep the machine.
    SystemCommand,
    /// Delete files or folders.
    DeleteFiles,
    /// Compose and send an email.
    SendEmail,
    /// Search the mailbox.
    SearchEmail,
    /// Check for new email.
    CheckEmails,
    /// Create a calendar event or reminder.
    CreateEvent,
    /// Cancel a calendar event.
    CancelEvent,
    /// Read the calendar.
    CheckCalendar,
    /// Search the web.
    WebSearch,
    /// Weather report.
    GetWeather,
    /// Play music.
    PlayMusic,
    /// Adjust or mute the volume.
    ControlVolume,
    /// Ask what the assistant can do.
    Help,
    /// Greeting.
    Greeting,
    /// Farewell.
    Farewell,
    /// Affirmative answer to a pending confirmation.
    ConfirmYes,
    /// Negative answer to a pending confirmation.
    ConfirmNo,
    /// Nothing recognized.
    Unknown,
    /// Intent declared only in vocabulary data.
    Other(String),
}

impl Intent {
    /// Wire label, e.g. `OPEN_APPLICATION`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::OpenApplication => "OPEN_APPLICATION",
            Self::CloseApplication => "CLOSE_APPLICATION",
            Self::SystemCommand => "SYSTEM_COMMAND",
            Self::DeleteFiles => "DELETE_FILES",
            Self::SendEmail => "SEND_EMAIL",
            Self::SearchEmail => "SEARCH_EMAIL",
            Self::CheckEmails => "CHECK_EMAILS",
            Self::CreateEvent => "CREATE_EVENT",
            Self::CancelEvent => "CANCEL_EVENT",
            Self::CheckCalendar => "CHECK_CALENDAR",
            Self::WebSearch => "WEB_SEARCH",
            Self::GetWeather => "GET_WEATHER",
            Self::PlayMusic => "PLAY_MUSIC",
            Self::ControlVolume => "CONTROL_VOLUME",
            Self::Help => "HELP",
            Self::Greeting => "GREETING",
            Self::Farewell => "FAREWELL",
            Self::ConfirmYes => "CONFIRM_YES",
            Self::ConfirmNo => "CONFIRM_NO",
            Self::Unknown => "UNKNOWN",
            Self::Other(label) => label,
        }
    }

    /// Parse a label. Case and surrounding whitespace are ignored; unknown
    /// labels become [`Intent::Other`] in upper case.
    pub fn parse(label: &str) -> Self {
        let upper = label.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match upper.as_str() {
            "OPEN_APPLICATION" => Self::OpenApplication,
            "CLOSE_APPLICATION" => Self::CloseApplication,
            "SYSTEM_COMMAND" => Self::SystemCommand,
            "DELETE_FILES" => Self::DeleteFiles,
            "SEND_EMAIL" => Self::SendEmail,
            "SEARCH_EMAIL" => Self::SearchEmail,
            "CHECK_EMAILS" => Self::CheckEmails,
            "CREATE_EVENT" => Self::CreateEvent,
            "CANCEL_EVENT" => Self::CancelEvent,
            "CHECK_CALENDAR" => Self::CheckCalendar,
            "WEB_SEARCH" => Self::WebSearch,
            "GET_WEATHER" => Self::GetWeather,
            "PLAY_MUSIC" => Self::PlayMusic,
            "CONTROL_VOLUME" => Self::ControlVolume,
            "HELP" => Self::Help,
            "GREETING" => Self::Greeting,
            "FAREWELL" => Self::Farewell,
            "CONFIRM_YES" => Self::ConfirmYes,
            "CONFIRM_NO" => Self::ConfirmNo,
            "UNKNOWN" => Self::Unknown,
            _ => Self::Other(upper),
        }
    }

    /// Meta-intents never act as antecedents or carry-over targets.
    pub fn is_meta(&self) -> bool {
        matches!(self, Self::ConfirmYes | Self::ConfirmNo | Self::Unknown)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Intent {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for Intent {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<Intent> for String {
    fn from(value: Intent) -> Self {
        value.as_str().to_owned()
    }
}

/// Stage that proposed an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recognizer {
    /// Hand-authored pattern.
    Pattern,
    /// Statistical classifier.
    Statistical,
    /// Reinterpreted from conversational context.
    Context,
    /// Nothing matched; the resolver fell back to `UNKNOWN`.
    Fallback,
}

/// A scored intent hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentCandidate {
    /// Proposed intent.
    pub intent: Intent,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Stage that produced the hypothesis.
    pub recognizer: Recognizer,
    /// Entities bound by the recognizer itself (pattern capture groups).
    pub entities: Vec<Entity>,
}

impl IntentCandidate {
    /// A candidate with no bound entities.
    pub fn new(intent: Intent, confidence: f64, recognizer: Recognizer) -> Self {
        Self {
            intent,
            confidence: clamp_unit(confidence),
            recognizer,
            entities: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Policy verdict gating dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Dispatch immediately.
    Execute,
    /// Ask the user before dispatching.
    Confirm,
    /// Do not dispatch.
    Reject,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Execute => "EXECUTE",
            Self::Confirm => "CONFIRM",
            Self::Reject => "REJECT",
        })
    }
}

/// A sub-component failure that was recovered locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// The statistical entity model was unavailable; rule-only extraction.
    ExtractionDegraded,
    /// The statistical classifier exceeded its time budget; pattern-only.
    ClassificationTimeout,
    /// The statistical classifier reported an error; pattern-only.
    ClassificationFailed,
}

/// Context rule that reshaped a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextRule {
    /// Short yes/no answer to a pending confirmation.
    Confirmation,
    /// Answer supplying an entity the previous turn was missing.
    SlotFilling,
    /// Elliptical follow-up re-using the previous intent.
    Ellipsis,
    /// Anaphoric reference resolved to an earlier turn's entities.
    Reference,
}

/// Final output of the resolver. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    utterance_id: Uuid,
    intent: Intent,
    entities: Vec<Entity>,
    confidence: f64,
    verdict: Verdict,
    recognizer: Recognizer,
    missing_entities: Vec<EntityRequirement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_decision: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context_rule: Option<ContextRule>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    degradations: Vec<Degradation>,
}

/// Field bag the resolver fills in before sealing a [`Decision`].
#[derive(Debug, Clone)]
pub(crate) struct DecisionDraft {
    pub utterance_id: Uuid,
    pub intent: Intent,
    pub entities: Vec<Entity>,
    pub confidence: f64,
    pub verdict: Verdict,
    pub recognizer: Recognizer,
    pub missing_entities: Vec<EntityRequirement>,
    pub pending_decision: Option<Uuid>,
    pub context_rule: Option<ContextRule>,
    pub degradations: Vec<Degradation>,
}

impl From<DecisionDraft> for Decision {
    fn from(d: DecisionDraft) -> Self {
        Self {
            utterance_id: d.utterance_id,
            intent: d.intent,
            entities: d.entities,
            confidence: clamp_unit(d.confidence),
            verdict: d.verdict,
            recognizer: d.recognizer,
            missing_entities: d.missing_entities,
            pending_decision: d.pending_decision,
            context_rule: d.context_rule,
            degradations: d.degradations,
        }
    }
}

impl Decision {
    /// Utterance this decision answers.
    pub fn utterance_id(&self) -> Uuid {
        self.utterance_id
    }

    /// Resolved intent.
    pub fn intent(&self) -> &Intent {
        &self.intent
    }

    /// Merged, non-overlapping entity set ordered by offset.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// First entity of a kind, if any.
    pub fn entity(&self, kind: EntityKind) -> Option<&Entity> {
        self.entities.iter().find(|e| e.kind == kind)
    }

    /// Overall confidence in `[0, 1]`.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Policy verdict.
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Stage that produced the winning candidate.
    pub fn recognizer(&self) -> Recognizer {
        self.recognizer
    }

    /// Requirements of the intent that no entity satisfies.
    pub fn missing_entities(&self) -> &[EntityRequirement] {
        &self.missing_entities
    }

    /// For `CONFIRM_YES` / `CONFIRM_NO`: the utterance id of the decision being answered.
    pub fn pending_decision(&self) -> Option<Uuid> {
        self.pending_decision
    }

    /// Context rule applied while resolving, if any.
    pub fn context_rule(&self) -> Option<ContextRule> {
        self.context_rule
    }

    /// Recovered sub-component failures.
    pub fn degradations(&self) -> &[Degradation] {
        &self.degradations
    }
}

/// A resolved exchange recorded in a conversation context. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationTurn {
    utterance: Utterance,
    decision: Decision,
    recorded_at: DateTime<Utc>,
}

impl ConversationTurn {
    /// Pair an utterance with its decision; the turn is stamped with the
    /// utterance timestamp so expiry follows conversational time.
    pub(crate) fn new(utterance: Utterance, decision: Decision) -> Self {
        let recorded_at = utterance.timestamp();
        Self {
            utterance,
            decision,
            recorded_at,
        }
    }

    /// The user input.
    pub fn utterance(&self) -> &Utterance {
        &self.utterance
    }

    /// The decision produced for it.
    pub fn decision(&self) -> &Decision {
        &self.decision
    }

    /// When the turn happened.
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}
