//! Configuration loading and validation.
//!
//! Loads the assistant configuration from `./aria.toml` (or `$ARIA_CONFIG_PATH`).
//! Environment variables override file values; file values override defaults.
//!
//! Precedence: env vars > config file > defaults.
//!
//! Keys are snake_case; the camelCase spellings used by older configuration
//! files (`executeThreshold`, `contextCapacity`, ...) are accepted as aliases.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::Intent;

/// Invalid configuration detected at initialization.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    /// A ratio setting lies outside `[0, 1]` (or is NaN).
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfRange {
        /// Offending key.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
    /// The confirm threshold is above the execute threshold.
    #[error("confirm_threshold ({confirm}) must not exceed execute_threshold ({execute})")]
    ConfirmAboveExecute {
        /// Configured confirm threshold.
        confirm: f64,
        /// Configured execute threshold.
        execute: f64,
    },
    /// A count or duration that must be positive is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    /// A count exceeds its upper bound.
    #[error("{name} must be at most {max}, got {value}")]
    TooLarge {
        /// Offending key.
        name: &'static str,
        /// Offending value.
        value: usize,
        /// Largest accepted value.
        max: usize,
    },
    /// An intent is listed more than once in the priority order.
    #[error("intent {0} appears more than once in intent_priority")]
    DuplicatePriority(String),
}

// ── Top-level config ────────────────────────────────────────────

/// Top-level assistant configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Scoring thresholds and fusion policy (`[resolver]`).
    pub resolver: ResolverConfig,
    /// Conversation memory (`[context]`).
    pub context: ContextConfig,
    /// Intent vocabulary source (`[vocabulary]`).
    pub vocabulary: VocabularyConfig,
    /// Applications registry: display name to launch identifier (`[applications]`).
    pub applications: BTreeMap<String, String>,
    /// Alternate names: alias to display name (`[application_aliases]`).
    #[serde(alias = "applicationAliases")]
    pub application_aliases: BTreeMap<String, String>,
    /// Log level and optional file output (`[logging]`).
    pub logging: LoggingConfig,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            context: ContextConfig::default(),
            vocabulary: VocabularyConfig::default(),
            applications: default_applications(),
            application_aliases: default_application_aliases(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AssistantConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults,
    /// then validate it.
    ///
    /// Config file path: `$ARIA_CONFIG_PATH` or `./aria.toml`.
    /// A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self> {
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        Self::load_with(&path, |key| std::env::var(key).ok())
    }

    /// Load from an explicit path with a custom env resolver.
    ///
    /// # Errors
    ///
    /// Same as [`AssistantConfig::load`].
    pub fn load_with(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::load_from_file(path)?;
        config.apply_overrides(env);
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("failed to parse config at {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config at {}: {e}",
                path.display()
            )),
        }
    }

    /// Resolve the config file path using a custom env resolver.
    ///
    /// Checks `$ARIA_CONFIG_PATH` first, then `./aria.toml`.
    pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("ARIA_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("aria.toml"))
    }

    /// Apply environment variable overrides.
    ///
    /// Takes a resolver function so tests never touch the process environment.
    /// Unparseable values are ignored with a warning.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        override_parsed(&env, "ARIA_EXECUTE_THRESHOLD", &mut self.resolver.execute_threshold);
        override_parsed(&env, "ARIA_CONFIRM_THRESHOLD", &mut self.resolver.confirm_threshold);
        override_parsed(&env, "ARIA_CONTEXT_CAPACITY", &mut self.context.capacity);
        override_parsed(&env, "ARIA_CONTEXT_TIMEOUT_SECS", &mut self.context.timeout_seconds);

        if let Some(v) = env("ARIA_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env("ARIA_VOCABULARY_PATH") {
            self.vocabulary.path = Some(PathBuf::from(v));
        }
    }

    /// Parse a TOML string into config. Does not validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has wrongly typed keys.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AssistantConfig =
            toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Check every invariant of the policy surface.
    ///
    /// Unknown intent labels are allowed: the vocabulary is open.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolver.validate()?;
        self.context.validate()
    }
}

fn override_parsed<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    slot: &mut T,
) {
    if let Some(v) = env(var) {
        match v.trim().parse() {
            Ok(parsed) => *slot = parsed,
            Err(_) => tracing::warn!(var, value = %v, "ignoring invalid env override"),
        }
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value })
    }
}

// ── Resolver config ─────────────────────────────────────────────

/// Scoring thresholds and fusion policy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Confidence at or above which a decision executes.
    #[serde(alias = "executeThreshold")]
    pub execute_threshold: f64,
    /// Confidence at or above which a decision asks for confirmation.
    #[serde(alias = "confirmThreshold")]
    pub confirm_threshold: f64,
    /// Pattern top-2 gap below which the statistical classifier is consulted.
    #[serde(alias = "statisticalMarginThreshold")]
    pub statistical_margin_threshold: f64,
    /// Multiplier applied to statistical candidates.
    #[serde(alias = "statisticalDiscount")]
    pub statistical_discount: f64,
    /// Default confidence of a pattern match.
    #[serde(alias = "patternConfidence")]
    pub pattern_confidence: f64,
    /// Time budget for each statistical model call.
    #[serde(alias = "classifierTimeoutMs")]
    pub classifier_timeout_ms: u64,
    /// Intents that never execute without confirmation.
    #[serde(alias = "blockedIntents")]
    pub blocked_intents: Vec<Intent>,
    /// Tie-break order, highest priority first.
    #[serde(alias = "intentPriority")]
    pub intent_priority: Vec<Intent>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            execute_threshold: 0.80,
            confirm_threshold: 0.45,
            statistical_margin_threshold: 0.05,
            statistical_discount: 0.80,
            pattern_confidence: 0.95,
            classifier_timeout_ms: 1500,
            blocked_intents: vec![Intent::SystemCommand, Intent::DeleteFiles],
            intent_priority: default_intent_priority(),
        }
    }
}

impl ResolverConfig {
    /// Classifier time budget as a [`Duration`].
    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_millis(self.classifier_timeout_ms)
    }

    /// Whether an intent is barred from `EXECUTE`.
    pub fn is_blocked(&self, intent: &Intent) -> bool {
        self.blocked_intents.contains(intent)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_unit("execute_threshold", self.execute_threshold)?;
        check_unit("confirm_threshold", self.confirm_threshold)?;
        check_unit(
            "statistical_margin_threshold",
            self.statistical_margin_threshold,
        )?;
        check_unit("statistical_discount", self.statistical_discount)?;
        check_unit("pattern_confidence", self.pattern_confidence)?;
        if self.confirm_threshold > self.execute_threshold {
            return Err(ConfigError::ConfirmAboveExecute {
                confirm: self.confirm_threshold,
                execute: self.execute_threshold,
            });
        }
        if self.classifier_timeout_ms == 0 {
            return Err(ConfigError::Zero("classifier_timeout_ms"));
        }
        let mut seen = std::collections::HashSet::new();
        for intent in &self.intent_priority {
            if !seen.insert(intent) {
                return Err(ConfigError::DuplicatePriority(intent.to_string()));
            }
        }
        Ok(())
    }
}

fn default_intent_priority() -> Vec<Intent> {
    vec![
        Intent::ConfirmYes,
        Intent::ConfirmNo,
        Intent::SystemCommand,
        Intent::DeleteFiles,
        Intent::SendEmail,
        Intent::CancelEvent,
        Intent::CreateEvent,
        Intent::OpenApplication,
        Intent::CloseApplication,
        Intent::SearchEmail,
        Intent::CheckEmails,
        Intent::CheckCalendar,
        Intent::PlayMusic,
        Intent::ControlVolume,
        Intent::GetWeather,
        Intent::WebSearch,
        Intent::Help,
        Intent::Greeting,
        Intent::Farewell,
    ]
}

// ── Context config ──────────────────────────────────────────────

/// Largest accepted number of turns kept per session.
pub const MAX_CONTEXT_CAPACITY: usize = 1000;

/// Conversation memory settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Maximum number of turns kept per session.
    #[serde(alias = "contextCapacity")]
    pub capacity: usize,
    /// Inactivity after which the context is cleared.
    #[serde(alias = "contextTimeoutSeconds", alias = "timeoutSeconds")]
    pub timeout_seconds: u64,
    /// Confidence assigned to an intent carried over from a previous turn.
    #[serde(alias = "contextCarryover")]
    pub carryover: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            timeout_seconds: 300,
            carryover: 0.85,
        }
    }
}

impl ContextConfig {
    /// Inactivity timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Zero("context capacity"));
        }
        if self.capacity > MAX_CONTEXT_CAPACITY {
            return Err(ConfigError::TooLarge {
                name: "context capacity",
                value: self.capacity,
                max: MAX_CONTEXT_CAPACITY,
            });
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::Zero("context timeout_seconds"));
        }
        check_unit("context carryover", self.carryover)
    }
}

// ── Vocabulary / logging ────────────────────────────────────────

/// Where to load the intent vocabulary from.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    /// External vocabulary TOML replacing the built-in one.
    pub path: Option<PathBuf>,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for rotated JSON logs; console only when absent.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            directory: None,
        }
    }
}

impl LoggingConfig {
    /// Log directory with a leading `~` expanded to the home directory.
    ///
    /// A `~` path is kept as written when no home directory is known.
    pub fn resolved_directory(&self) -> Option<PathBuf> {
        let dir = self.directory.as_ref()?;
        let Ok(rest) = dir.strip_prefix("~") else {
            return Some(dir.clone());
        };
        Some(
            directories::BaseDirs::new()
                .map_or_else(|| dir.clone(), |base| base.home_dir().join(rest)),
        )
    }
}

fn default_applications() -> BTreeMap<String, String> {
    [
        ("bloc-notes", "notepad.exe"),
        ("calculatrice", "calc.exe"),
        ("paint", "mspaint.exe"),
        ("chrome", "chrome.exe"),
        ("firefox", "firefox.exe"),
        ("edge", "msedge.exe"),
        ("outlook", "outlook.exe"),
        ("word", "winword.exe"),
        ("excel", "excel.exe"),
        ("powerpoint", "powerpnt.exe"),
        ("explorateur", "explorer.exe"),
        ("spotify", "spotify.exe"),
        ("discord", "discord.exe"),
        ("steam", "steam.exe"),
        ("vlc", "vlc.exe"),
        ("visual studio code", "code.exe"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect()
}

fn default_application_aliases() -> BTreeMap<String, String> {
    [
        ("notepad", "bloc-notes"),
        ("bloc notes", "bloc-notes"),
        ("calculator", "calculatrice"),
        ("calc", "calculatrice"),
        ("google chrome", "chrome"),
        ("navigateur", "chrome"),
        ("explorateur de fichiers", "explorateur"),
        ("file explorer", "explorateur"),
        ("vscode", "visual studio code"),
        ("vs code", "visual studio code"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect()
}

// ── Tests ───────────────────────────────────────────────────────
