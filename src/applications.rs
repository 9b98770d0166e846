//! Read-only applications registry.
//!
//! Maps display names and aliases to launch identifiers. Lookups are
//! accent- and case-insensitive; the longest name at a position wins.

use std::collections::BTreeMap;

use regex::Regex;

use crate::text::fold;

/// An application mention found in normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationMatch {
    /// Start offset in the normalized text.
    pub start: usize,
    /// End offset in the normalized text.
    pub end: usize,
    /// Registry display name.
    pub display_name: String,
    /// Launch identifier.
    pub launch_id: String,
}

/// Display name → launch identifier, plus aliases.
#[derive(Debug, Clone)]
pub struct ApplicationRegistry {
    /// Folded name (display or alias) → display name.
    names: BTreeMap<String, String>,
    /// Display name → launch identifier.
    launch_ids: BTreeMap<String, String>,
    matcher: Option<Regex>,
}

impl ApplicationRegistry {
    /// Build from the `[applications]` and `[application_aliases]` tables.
    ///
    /// Aliases pointing at unknown display names are skipped with a warning.
    pub fn new(
        applications: &BTreeMap<String, String>,
        aliases: &BTreeMap<String, String>,
    ) -> Self {
        let mut names = BTreeMap::new();
        for display in applications.keys() {
            names.insert(fold(display), display.clone());
        }
        for (alias, target) in aliases {
            if applications.contains_key(target) {
                names.insert(fold(alias), target.clone());
            } else {
                tracing::warn!(alias = %alias, target_app = %target, "alias targets unknown application, skipping");
            }
        }

        let mut keys: Vec<&String> = names.keys().filter(|k| !k.trim().is_empty()).collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let matcher = if keys.is_empty() {
            None
        } else {
            let alternation: Vec<String> = keys.iter().map(|k| regex::escape(k)).collect();
            let pattern = format!(r"(?:^|\b)(?:{})(?:\b|$)", alternation.join("|"));
            match Regex::new(&pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(error = %e, "application matcher failed to compile");
                    None
                }
            }
        };

        Self {
            names,
            launch_ids: applications.clone(),
            matcher,
        }
    }

    /// Number of distinct applications.
    pub fn len(&self) -> usize {
        self.launch_ids.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.launch_ids.is_empty()
    }

    /// Resolve a display name or alias to `(display name, launch id)`.
    pub fn lookup(&self, name: &str) -> Option<(&str, &str)> {
        let display = self.names.get(fold(name).trim())?;
        let launch = self.launch_ids.get(display)?;
        Some((display.as_str(), launch.as_str()))
    }

    /// All non-overlapping application mentions in normalized text.
    pub fn find_all(&self, normalized: &str) -> Vec<ApplicationMatch> {
        let Some(matcher) = &self.matcher else {
            return Vec::new();
        };
        matcher
            .find_iter(normalized)
            .filter_map(|m| {
                let (display, launch) = self.lookup(m.as_str())?;
                Some(ApplicationMatch {
                    start: m.start(),
                    end: m.end(),
                    display_name: display.to_owned(),
                    launch_id: launch.to_owned(),
                })
            })
            .collect()
    }
}
