//! Rule and gazetteer extractors for structured entity kinds.
//!
//! Email, path, contact and quoted/subject free text work on the raw text
//! (case carries meaning for names and paths). Applications and dates work
//! on the normalized text and map their spans back.

use std::sync::LazyLock;

use regex::Regex;

use crate::applications::ApplicationRegistry;
use crate::text::NormalizedText;
use crate::types::{Entity, EntityKind, EntityOrigin, Span};

use super::datetime;

const EMAIL_CONFIDENCE: f64 = 0.99;
const APPLICATION_CONFIDENCE: f64 = 0.95;
const PATH_CONFIDENCE: f64 = 0.9;
const CONTACT_CONFIDENCE: f64 = 0.7;
const FREE_TEXT_CONFIDENCE: f64 = 0.6;

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[\w.+-]+@[\w-]+(?:\.[\w-]+)+").ok());

static WINDOWS_PATH: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"\b[A-Za-z]:\\[^\s"'<>|?*]*"#).ok());

static UNIX_PATH: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?:^|\s)((?:~|\.{1,2})?/[^\s"'<>|]+)"#).ok());

static CONTACT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|\s)(?i:à|a|pour|avec|de la part de|to|for|with|from)\s+(\p{Lu}[\p{L}'-]+(?:\s+\p{Lu}[\p{L}'-]+)*)",
    )
    .ok()
});

static QUOTED: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""([^"]+)"|«\s*([^»]+?)\s*»|“([^”]+)”"#).ok());

static SUBJECT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:sujet|objet|subject)\s*:\s*(.+)$").ok());

/// Run every rule extractor. Results may overlap; the caller resolves that.
pub fn extract_all(
    raw: &str,
    normalized: &NormalizedText,
    registry: &ApplicationRegistry,
) -> Vec<Entity> {
    let mut out = Vec::new();
    out.extend(emails(raw));
    out.extend(applications(raw, normalized, registry));
    out.extend(datetime::extract(raw, normalized));
    out.extend(paths(raw));
    out.extend(contacts(raw));
    out.extend(free_text(raw));
    out
}

fn emails(raw: &str) -> Vec<Entity> {
    let Some(re) = EMAIL.as_ref() else {
        return Vec::new();
    };
    re.find_iter(raw)
        .map(|m| {
            Entity::new(
                EntityKind::Email,
                m.as_str().to_lowercase(),
                Span::new(m.start(), m.end()),
                EMAIL_CONFIDENCE,
                EntityOrigin::Rule,
            )
        })
        .collect()
}

fn applications(raw: &str, normalized: &NormalizedText, registry: &ApplicationRegistry) -> Vec<Entity> {
    registry
        .find_all(normalized.as_str())
        .into_iter()
        .filter_map(|m| {
            let (start, end) = normalized.to_raw(m.start, m.end);
            raw.get(start..end)?;
            Some(
                Entity::new(
                    EntityKind::Application,
                    m.display_name,
                    Span::new(start, end),
                    APPLICATION_CONFIDENCE,
                    EntityOrigin::Rule,
                )
                .with_reference(m.launch_id),
            )
        })
        .collect()
}

fn paths(raw: &str) -> Vec<Entity> {
    let mut out = Vec::new();
    if let Some(re) = WINDOWS_PATH.as_ref() {
        for m in re.find_iter(raw) {
            out.extend(path_entity(raw, m.start(), m.end()));
        }
    }
    if let Some(re) = UNIX_PATH.as_ref() {
        for caps in re.captures_iter(raw) {
            if let Some(m) = caps.get(1) {
                out.extend(path_entity(raw, m.start(), m.end()));
            }
        }
    }
    out
}

fn path_entity(raw: &str, start: usize, end: usize) -> Option<Entity> {
    let slice = raw.get(start..end)?;
    let trimmed = slice.trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')'));
    if trimmed.len() < 2 {
        return None;
    }
    Some(Entity::new(
        EntityKind::Path,
        trimmed,
        Span::new(start, start.saturating_add(trimmed.len())),
        PATH_CONFIDENCE,
        EntityOrigin::Rule,
    ))
}

fn contacts(raw: &str) -> Vec<Entity> {
    let Some(re) = CONTACT.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .map(|m| {
            Entity::new(
                EntityKind::Contact,
                m.as_str(),
                Span::new(m.start(), m.end()),
                CONTACT_CONFIDENCE,
                EntityOrigin::Rule,
            )
        })
        .collect()
}

fn free_text(raw: &str) -> Vec<Entity> {
    let mut out = Vec::new();
    if let Some(re) = QUOTED.as_ref() {
        for caps in re.captures_iter(raw) {
            if let Some(m) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) {
                out.extend(free_text_entity(m.as_str(), m.start()));
            }
        }
    }
    if let Some(m) = SUBJECT
        .as_ref()
        .and_then(|re| re.captures(raw))
        .and_then(|caps| caps.get(1))
    {
        out.extend(free_text_entity(m.as_str(), m.start()));
    }
    out
}

fn free_text_entity(slice: &str, offset: usize) -> Option<Entity> {
    let leading = slice.len().saturating_sub(slice.trim_start().len());
    let value = slice.trim();
    if value.is_empty() {
        return None;
    }
    let start = offset.saturating_add(leading);
    Some(Entity::new(
        EntityKind::FreeText,
        value,
        Span::new(start, start.saturating_add(value.len())),
        FREE_TEXT_CONFIDENCE,
        EntityOrigin::Rule,
    ))
}
