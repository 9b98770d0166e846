//! Date and time expressions, French and English.
//!
//! Works on normalized text. Dates and clock times are found separately; a
//! date and a time separated only by a connector ("demain à 14h",
//! "tomorrow at 2pm", "14h, lundi") merge into a single `"<date> <time>"`
//! entity. Times are canonicalized to `HHh[MM]`.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::text::NormalizedText;
use crate::types::{Entity, EntityKind, EntityOrigin, Span};

const DATETIME_CONFIDENCE: f64 = 0.9;

static DATE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    let weekday_fr = "lundi|mardi|mercredi|jeudi|vendredi|samedi|dimanche";
    let weekday_en = "monday|tuesday|wednesday|thursday|friday|saturday|sunday";
    let month_fr =
        "janvier|fevrier|mars|avril|mai|juin|juillet|aout|septembre|octobre|novembre|decembre";
    let pattern = format!(
        r"\b(?:apres-demain|apres demain|aujourd'hui|demain|ce soir|ce matin|cet apres-midi|ce midi|day after tomorrow|today|tomorrow|tonight|this (?:morning|afternoon|evening)|(?:{weekday_fr})(?: prochain)?|(?:next )?(?:{weekday_en})|(?:cette|la) semaine(?: prochaine| derniere)?|(?:ce|le) mois(?: prochain)?|(?:this|next) (?:week|month)|dans \d{{1,3}} (?:jours?|semaines?|mois|heures?|minutes?)|in \d{{1,3}} (?:days?|weeks?|months?|hours?|minutes?)|\d{{4}}-\d{{2}}-\d{{2}}|\d{{1,2}}/\d{{1,2}}(?:/\d{{2,4}})?|\d{{1,2}}(?:er)? (?:{month_fr})(?: \d{{4}})?)\b"
    );
    Regex::new(&pattern).ok()
});

static TIME: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:(?P<h12>\d{1,2})(?::(?P<m12>\d{2}))? ?(?P<ampm>am|pm)|(?P<hc>\d{1,2}):(?P<mc>\d{2})|(?P<hh>\d{1,2}) ?h(?: ?(?P<mh>\d{2}))?|(?P<noon>midi|noon)|(?P<midnight>minuit|midnight))\b",
    )
    .ok()
});

static CONNECTOR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*(?:,\s*)?(?:a|at|vers|le|on|,)?\s*$").ok());

#[derive(Debug, Clone)]
struct Found {
    start: usize,
    end: usize,
    value: String,
}

/// DATETIME entities in `raw`, with spans in raw byte offsets.
pub fn extract(raw: &str, normalized: &NormalizedText) -> Vec<Entity> {
    let text = normalized.as_str();
    let dates = find_dates(text);
    let times = find_times(text);

    let mut merged = Vec::new();
    let mut used_times = vec![false; times.len()];
    for date in dates {
        let partner = times.iter().enumerate().find(|(i, t)| {
            !used_times.get(*i).copied().unwrap_or(true) && adjacent(text, &date, t)
        });
        match partner {
            Some((i, time)) => {
                if let Some(slot) = used_times.get_mut(i) {
                    *slot = true;
                }
                merged.push(Found {
                    start: date.start.min(time.start),
                    end: date.end.max(time.end),
                    value: format!("{} {}", date.value, time.value),
                });
            }
            None => merged.push(date),
        }
    }
    merged.extend(
        times
            .into_iter()
            .zip(used_times)
            .filter(|(_, used)| !used)
            .map(|(t, _)| t),
    );
    merged.sort_by_key(|f| f.start);

    merged
        .into_iter()
        .filter_map(|f| {
            let (start, end) = normalized.to_raw(f.start, f.end);
            raw.get(start..end)?;
            Some(Entity::new(
                EntityKind::Datetime,
                f.value,
                Span::new(start, end),
                DATETIME_CONFIDENCE,
                EntityOrigin::Rule,
            ))
        })
        .collect()
}

fn find_dates(text: &str) -> Vec<Found> {
    let Some(re) = DATE.as_ref() else {
        return Vec::new();
    };
    re.find_iter(text)
        .map(|m| Found {
            start: m.start(),
            end: m.end(),
            value: canonical_date(m.as_str()),
        })
        .collect()
}

fn canonical_date(matched: &str) -> String {
    match matched {
        "apres demain" => "apres-demain".to_owned(),
        other => other.to_owned(),
    }
}

fn find_times(text: &str) -> Vec<Found> {
    let Some(re) = TIME.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(text)
        .filter_map(|caps| {
            let m = caps.get(0)?;
            let value = canonical_time(&caps)?;
            Some(Found {
                start: m.start(),
                end: m.end(),
                value,
            })
        })
        .collect()
}

fn number(caps: &Captures<'_>, name: &str) -> Option<u32> {
    caps.name(name).and_then(|m| m.as_str().parse().ok())
}

/// `HHh[MM]`, minutes omitted when zero. `None` for impossible clock values.
fn canonical_time(caps: &Captures<'_>) -> Option<String> {
    let (hour, minute) = if caps.name("noon").is_some() {
        (12, 0)
    } else if caps.name("midnight").is_some() {
        (0, 0)
    } else if let Some(h) = number(caps, "h12") {
        if !(1..=12).contains(&h) {
            return None;
        }
        let pm = caps.name("ampm").is_some_and(|m| m.as_str() == "pm");
        let hour = match (h, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h.checked_add(12)?,
            (h, false) => h,
        };
        (hour, number(caps, "m12").unwrap_or(0))
    } else if let Some(h) = number(caps, "hc") {
        (h, number(caps, "mc").unwrap_or(0))
    } else {
        (number(caps, "hh")?, number(caps, "mh").unwrap_or(0))
    };

    if hour > 23 || minute > 59 {
        return None;
    }
    Some(if minute == 0 {
        format!("{hour:02}h")
    } else {
        format!("{hour:02}h{minute:02}")
    })
}

fn adjacent(text: &str, a: &Found, b: &Found) -> bool {
    let (first, second) = if a.start <= b.start { (a, b) } else { (b, a) };
    if first.end > second.start {
        return false;
    }
    let Some(gap) = text.get(first.end..second.start) else {
        return false;
    };
    CONNECTOR.as_ref().is_some_and(|re| re.is_match(gap))
}
