//! Canonical text form shared by every recognizer.
//!
//! Patterns, gazetteers and context rules all match against a lowercased,
//! accent-folded copy of the utterance. [`NormalizedText`] keeps a byte-offset
//! table so that spans found in the canonical form can be reported against
//! the original text.

/// Lowercased, accent-folded view of an utterance with an offset map back to
/// the raw text.
#[derive(Debug, Clone)]
pub struct NormalizedText {
    text: String,
    /// `origin[i]` is the raw byte offset of the char that produced normalized byte `i`.
    origin: Vec<usize>,
    raw_len: usize,
}

impl NormalizedText {
    /// Normalize `raw`: lowercase, fold Latin accents, unify apostrophes,
    /// dashes and non-breaking spaces.
    pub fn new(raw: &str) -> Self {
        let mut text = String::with_capacity(raw.len());
        let mut origin = Vec::with_capacity(raw.len().saturating_add(1));
        for (offset, ch) in raw.char_indices() {
            let before = text.len();
            fold_char(ch, &mut text);
            let emitted = text.len().saturating_sub(before);
            origin.extend(std::iter::repeat(offset).take(emitted));
        }
        origin.push(raw.len());
        Self {
            text,
            origin,
            raw_len: raw.len(),
        }
    }

    /// The normalized text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Map a normalized byte range onto the raw text.
    ///
    /// The returned range always lies on raw char boundaries.
    pub fn to_raw(&self, start: usize, end: usize) -> (usize, usize) {
        let raw_start = self.origin.get(start).copied().unwrap_or(self.raw_len);
        let raw_end = self.raw_end(end).max(raw_start);
        (raw_start, raw_end)
    }

    fn raw_end(&self, end: usize) -> usize {
        if end == 0 {
            return self.origin.first().copied().unwrap_or(0);
        }
        let last = self
            .origin
            .get(end.saturating_sub(1))
            .copied()
            .unwrap_or(self.raw_len);
        self.origin
            .get(end..)
            .unwrap_or(&[])
            .iter()
            .copied()
            .find(|&o| o > last)
            .unwrap_or(self.raw_len)
    }

    /// Number of word tokens in the normalized text.
    pub fn token_count(&self) -> usize {
        tokens(&self.text).count()
    }
}

/// Normalize a string without keeping the offset table.
pub fn fold(raw: &str) -> String {
    NormalizedText::new(raw).text
}

/// Split normalized text into word tokens.
///
/// Apostrophes and hyphens stay inside tokens ("aujourd'hui", "bloc-notes").
pub fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-'))
        .map(|t| t.trim_matches(|c| c == '\'' || c == '-'))
        .filter(|t| !t.is_empty())
}

fn fold_char(ch: char, out: &mut String) {
    match ch {
        '\u{2018}' | '\u{2019}' | '\u{02BC}' | '`' | '\u{00B4}' => out.push('\''),
        '\u{00A0}' | '\u{202F}' | '\t' => out.push(' '),
        '\u{2010}'..='\u{2013}' => out.push('-'),
        '\u{0300}'..='\u{036F}' => {}
        'œ' | 'Œ' => out.push_str("oe"),
        'æ' | 'Æ' => out.push_str("ae"),
        'ß' => out.push_str("ss"),
        _ => {
            for lower in ch.to_lowercase() {
                out.push(strip_accent(lower));
            }
        }
    }
}

fn strip_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}
