//! Lenient timestamp parsing for upstream `created_at` values.
//!
//! The store keeps `created_at` as a zone-less `TIMESTAMP`. Upstream sources
//! send either a naive ISO 8601 timestamp (`2024-01-15T09:30:00`) or a full
//! RFC 3339 one (`2024-01-15T09:30:00Z`, `2024-01-15T11:30:00+02:00`); the
//! latter is converted to UTC before its offset is dropped.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer};

/// Accepted naive layouts, tried in order.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a timestamp string in any of the accepted layouts.
///
/// Returns `None` if the input matches none of them.
#[must_use]
pub fn parse(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Deserialize an optional timestamp, treating `null` as `None`.
///
/// Use with `#[serde(default, deserialize_with = "timestamp::deserialize_optional")]`
/// so that an absent field also becomes `None`.
///
/// # Errors
///
/// Returns a deserialization error if the value is a string in none of the
/// accepted layouts, or is neither a string nor `null`.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    parse(&raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn expected() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_naive() {
        assert_eq!(parse("2024-01-15T09:30:00"), Some(expected()));
        assert_eq!(parse("2024-01-15 09:30:00"), Some(expected()));
    }

    #[test]
    fn test_parse_rfc3339_converts_to_utc() {
        assert_eq!(parse("2024-01-15T09:30:00Z"), Some(expected()));
        assert_eq!(parse("2024-01-15T11:30:00+02:00"), Some(expected()));
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let parsed = parse("2024-01-15T09:30:00.250").unwrap();
        assert_eq!(parsed.and_utc().timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_rejects_date_only() {
        assert_eq!(parse("2024-01-15"), None);
        assert_eq!(parse("yesterday"), None);
    }
}
