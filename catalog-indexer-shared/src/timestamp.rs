//! Timestamp normalization.
//!
//! The repository reports `lastModified` as `YYYY-MM-DD HH:MM:SS.fff` (no
//! zone), while values written back by other tools may be RFC 3339 or a bare
//! date. All of them are normalized to UTC before comparison.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse a repository timestamp into UTC. Zone-less values are taken as UTC.
pub fn normalize_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// True when `candidate` is strictly newer than `baseline`. Missing or
/// unparseable values on either side are never newer.
pub fn is_strictly_newer(candidate: Option<&str>, baseline: Option<&str>) -> bool {
    match (
        candidate.and_then(normalize_timestamp),
        baseline.and_then(normalize_timestamp),
    ) {
        (Some(candidate), Some(baseline)) => candidate > baseline,
        _ => false,
    }
}
