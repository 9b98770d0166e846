//! Lexical cues used by the context rules. All inputs are normalized text.

use crate::text::tokens;

const AFFIRMATIVE_LEADS: &[&str] = &[
    "oui", "ouais", "ok", "okay", "d'accord", "dac", "vas-y", "confirme", "confirmer", "valide",
    "parfait", "absolument", "exactement", "yes", "yep", "yeah", "sure", "confirm", "go",
];

const AFFIRMATIVE_PHRASES: &[&str] = &[
    "bien sur", "je confirme", "c'est ca", "c'est bon", "fais-le", "allez-y", "do it", "go ahead",
    "of course",
];

const NEGATIVE_LEADS: &[&str] = &["non", "nan", "stop", "no", "nope"];

const NEGATIVE_PHRASES: &[&str] = &[
    "pas maintenant", "laisse tomber", "surtout pas", "pas question", "ne fais rien", "not now",
    "never mind", "forget it",
];

const ANAPHORA_TOKENS: &[&str] = &[
    "ca", "cela", "ceci", "celui-ci", "celle-ci", "celui-la", "celle-la", "ceux-ci", "it", "that",
    "this", "them", "those",
];

const ANAPHORA_SUFFIXES: &[&str] = &["-le", "-la", "-les", "-lui", "-leur"];

const ELLIPSIS_LEADS: &[&str] = &["et", "and", "plutot", "sinon", "aussi"];

const ELLIPSIS_PHRASES: &[&str] = &["what about", "how about", "pareil pour", "same for", "instead", "plutot"];

/// Answer to a pending confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Go ahead.
    Yes,
    /// Do not.
    No,
}

fn phrase(text: &str) -> String {
    tokens(text).collect::<Vec<_>>().join(" ")
}

fn contains_phrase(haystack: &str, needle: &str) -> bool {
    haystack == needle
        || haystack.starts_with(&format!("{needle} "))
        || haystack.ends_with(&format!(" {needle}"))
        || haystack.contains(&format!(" {needle} "))
}

/// Classify a short reply as yes/no. Negatives are checked first so that
/// "non, laisse tomber" or "ok non" never count as consent.
pub fn confirmation_reply(normalized: &str) -> Option<Reply> {
    let joined = phrase(normalized);
    let mut words = tokens(normalized);
    let first = words.next()?;
    let all: Vec<&str> = std::iter::once(first).chain(words).collect();

    if NEGATIVE_PHRASES.iter().any(|p| contains_phrase(&joined, p))
        || all.iter().any(|w| NEGATIVE_LEADS.contains(w))
    {
        return Some(Reply::No);
    }
    if AFFIRMATIVE_PHRASES.iter().any(|p| contains_phrase(&joined, p))
        || AFFIRMATIVE_LEADS.contains(&first)
    {
        return Some(Reply::Yes);
    }
    None
}

/// Whether the utterance points back at something ("annule-le", "ferme ça").
pub fn has_anaphora(normalized: &str) -> bool {
    tokens(normalized).any(|t| {
        ANAPHORA_TOKENS.contains(&t) || ANAPHORA_SUFFIXES.iter().any(|s| t.len() > s.len() && t.ends_with(s))
    })
}

/// Whether the utterance reads as an elliptical follow-up ("et demain ?").
pub fn has_ellipsis_marker(normalized: &str) -> bool {
    let joined = phrase(normalized);
    let lead = tokens(normalized).next();
    lead.is_some_and(|w| ELLIPSIS_LEADS.contains(&w))
        || ELLIPSIS_PHRASES.iter().any(|p| contains_phrase(&joined, p))
}
