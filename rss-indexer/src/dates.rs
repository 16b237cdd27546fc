//! Best-effort canonicalization of feed publish dates to `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

const CANONICAL: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// Date only.
    Date(&'static str),
    /// Date and time, no zone information.
    DateTime(&'static str),
    /// Date and time with a numeric offset.
    Offset(&'static str),
    /// Date and time followed by a zone abbreviation such as `GMT` or `EST`.
    NamedZone(&'static str),
}

/// Tried in order, first match wins. Weekday prefixes (`Mon, `) are stripped before matching,
/// so a weekday that disagrees with the date does not reject the string.
const PATTERNS: &[Pattern] = &[
    Pattern::DateTime("%Y-%m-%d %H:%M:%S"),
    Pattern::Date("%m/%d/%Y"),
    Pattern::Date("%b %d, %Y"),
    Pattern::Offset("%d %b %Y %H:%M:%S %z"),
    Pattern::NamedZone("%d %b %Y %H:%M:%S"),
    Pattern::DateTime("%d %b %Y %H:%M:%S"),
    Pattern::DateTime("%Y-%m-%dT%H:%M:%SZ"),
    Pattern::Date("%Y-%m-%d"),
];

/// Returns the canonical `YYYY-MM-DD` form of `raw`, or `raw` unchanged if no known format matches.
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    let candidate = strip_weekday(trimmed);

    for pattern in PATTERNS {
        if let Some(date) = try_pattern(candidate, *pattern) {
            return date.format(CANONICAL).to_string();
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return dt.date_naive().format(CANONICAL).to_string();
    }

    debug!(raw, "Unrecognized date format, keeping original");
    raw.to_string()
}

fn try_pattern(value: &str, pattern: Pattern) -> Option<NaiveDate> {
    match pattern {
        Pattern::Date(fmt) => NaiveDate::parse_from_str(value, fmt).ok(),
        Pattern::DateTime(fmt) => NaiveDateTime::parse_from_str(value, fmt)
            .ok()
            .map(|dt| dt.date()),
        Pattern::Offset(fmt) => DateTime::parse_from_str(value, fmt)
            .ok()
            .map(|dt| dt.date_naive()),
        Pattern::NamedZone(fmt) => {
            let (rest, zone) = value.rsplit_once(' ')?;
            if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
                return None;
            }
            NaiveDateTime::parse_from_str(rest, fmt).ok().map(|dt| dt.date())
        }
    }
}

fn strip_weekday(value: &str) -> &str {
    match value.split_once(',') {
        Some((head, tail)) if head.len() >= 3 && head.chars().all(|c| c.is_ascii_alphabetic()) => {
            tail.trim_start()
        }
        _ => value,
    }
}
