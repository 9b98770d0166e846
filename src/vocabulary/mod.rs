//! Data-driven intent vocabulary.
//!
//! Each intent declares an ordered list of regex patterns (most specific
//! first, matched against normalized text), its required entity kinds, the
//! intents it may refer back to, and example phrases. A built-in vocabulary
//! is embedded in the binary; an external TOML file can replace it.
//!
//! Everything is validated at load time: a bad vocabulary never reaches a
//! running session.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

use crate::types::{EntityKind, EntityRequirement, Intent};

const BUILTIN: &str = include_str!("intents.toml");

/// Errors raised while loading a vocabulary.
#[derive(Debug, thiserror::Error)]
pub enum VocabularyError {
    /// The vocabulary file could not be read.
    #[error("failed to read vocabulary at {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The TOML is malformed.
    #[error("failed to parse vocabulary TOML: {0}")]
    Parse(#[from] toml::de::Error),
    /// A pattern does not compile.
    #[error("intent {intent}: invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// Intent label.
        intent: String,
        /// Offending pattern.
        pattern: String,
        /// Regex compiler error.
        source: Box<regex::Error>,
    },
    /// A required entity or a named capture group is not an entity kind.
    #[error("intent {intent}: unknown entity kind {kind:?}")]
    UnknownEntityKind {
        /// Intent label.
        intent: String,
        /// Offending name.
        kind: String,
    },
    /// The same intent is declared twice.
    #[error("intent {0} is declared more than once")]
    DuplicateIntent(String),
    /// An intent has no patterns.
    #[error("intent {0} has no patterns")]
    EmptyPatterns(String),
    /// A per-intent confidence lies outside `[0, 1]`.
    #[error("intent {intent}: confidence {value} outside [0, 1]")]
    InvalidConfidence {
        /// Intent label.
        intent: String,
        /// Offending value.
        value: f64,
    },
}

#[derive(Debug, Deserialize)]
struct RawVocabulary {
    #[serde(default, rename = "intent")]
    intents: Vec<RawIntent>,
}

#[derive(Debug, Deserialize)]
struct RawIntent {
    name: String,
    patterns: Vec<String>,
    #[serde(default, alias = "requiredEntities")]
    required_entities: Vec<String>,
    #[serde(default)]
    antecedents: Vec<String>,
    #[serde(default)]
    examples: Vec<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// One compiled intent definition.
#[derive(Debug, Clone)]
pub struct IntentSpec {
    intent: Intent,
    patterns: Vec<Regex>,
    required: Vec<EntityRequirement>,
    antecedents: Vec<Intent>,
    examples: Vec<String>,
    confidence: Option<f64>,
}

impl IntentSpec {
    /// The intent this entry defines.
    pub fn intent(&self) -> &Intent {
        &self.intent
    }

    /// Compiled patterns, most specific first.
    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }

    /// Entity requirements; every one must be met.
    pub fn required(&self) -> &[EntityRequirement] {
        &self.required
    }

    /// Intents whose turns this intent may refer back to. Empty means any.
    pub fn antecedents(&self) -> &[Intent] {
        &self.antecedents
    }

    /// Example phrases.
    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    /// Per-intent pattern confidence override.
    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }
}

/// The full, ordered intent vocabulary. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    intents: Vec<IntentSpec>,
}

impl Vocabulary {
    /// The vocabulary embedded in the crate.
    ///
    /// # Errors
    ///
    /// Only fails if the embedded file is broken.
    pub fn builtin() -> Result<Self, VocabularyError> {
        Self::from_toml(BUILTIN)
    }

    /// Load from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a [`VocabularyError`] if the file is unreadable or invalid.
    pub fn load_from_file(path: &Path) -> Result<Self, VocabularyError> {
        let contents = std::fs::read_to_string(path).map_err(|source| VocabularyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let vocabulary = Self::from_toml(&contents)?;
        tracing::info!(path = %path.display(), intents = vocabulary.len(), "loaded vocabulary");
        Ok(vocabulary)
    }

    /// Parse and compile a TOML vocabulary.
    ///
    /// # Errors
    ///
    /// Returns a [`VocabularyError`] on any invalid entry.
    pub fn from_toml(toml_str: &str) -> Result<Self, VocabularyError> {
        let raw: RawVocabulary = toml::from_str(toml_str)?;
        let mut seen = HashSet::new();
        let mut intents = Vec::with_capacity(raw.intents.len());
        for entry in raw.intents {
            let spec = compile(entry)?;
            if !seen.insert(spec.intent.clone()) {
                return Err(VocabularyError::DuplicateIntent(spec.intent.to_string()));
            }
            intents.push(spec);
        }
        Ok(Self { intents })
    }

    /// Intents in declaration order.
    pub fn intents(&self) -> &[IntentSpec] {
        &self.intents
    }

    /// Number of intents.
    pub fn len(&self) -> usize {
        self.intents.len()
    }

    /// Whether the vocabulary declares no intents.
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Look up an intent definition.
    pub fn get(&self, intent: &Intent) -> Option<&IntentSpec> {
        self.intents.iter().find(|s| &s.intent == intent)
    }

    /// Requirements of an intent; empty for undeclared intents.
    pub fn requirements(&self, intent: &Intent) -> &[EntityRequirement] {
        self.get(intent).map(IntentSpec::required).unwrap_or(&[])
    }

    /// Declared antecedents of an intent; empty means unrestricted.
    pub fn antecedents(&self, intent: &Intent) -> &[Intent] {
        self.get(intent).map(IntentSpec::antecedents).unwrap_or(&[])
    }
}

fn compile(entry: RawIntent) -> Result<IntentSpec, VocabularyError> {
    let intent = Intent::parse(&entry.name);
    let label = intent.to_string();

    if entry.patterns.is_empty() {
        return Err(VocabularyError::EmptyPatterns(label));
    }
    if let Some(value) = entry.confidence {
        if !(0.0..=1.0).contains(&value) {
            return Err(VocabularyError::InvalidConfidence {
                intent: label,
                value,
            });
        }
    }

    let mut patterns = Vec::with_capacity(entry.patterns.len());
    for pattern in &entry.patterns {
        let re = Regex::new(pattern).map_err(|e| VocabularyError::InvalidPattern {
            intent: label.clone(),
            pattern: pattern.clone(),
            source: Box::new(e),
        })?;
        if let Some(group) = re
            .capture_names()
            .flatten()
            .find(|name| EntityKind::from_group_name(name).is_none())
        {
            return Err(VocabularyError::UnknownEntityKind {
                intent: label,
                kind: group.to_owned(),
            });
        }
        patterns.push(re);
    }

    let required = entry
        .required_entities
        .iter()
        .map(|r| {
            r.parse::<EntityRequirement>()
                .map_err(|_| VocabularyError::UnknownEntityKind {
                    intent: label.clone(),
                    kind: r.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(IntentSpec {
        intent,
        patterns,
        required,
        antecedents: entry.antecedents.iter().map(String::as_str).map(Intent::parse).collect(),
        examples: entry.examples,
        confidence: entry.confidence,
    })
}
