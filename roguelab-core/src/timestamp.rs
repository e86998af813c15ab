//! Timestamp normalisation for telemetry envelopes.
//!
//! The game client writes ISO-8601 instants with a trailing `Z` and anywhere
//! from zero to nine fractional digits. Everything is reduced to microsecond
//! resolution by truncation before parsing. Instants carrying a numeric UTC
//! offset are converted to UTC.
use chrono::{DateTime, NaiveDateTime};

/// Maximum number of fractional-second digits kept.
pub const MAX_FRACTION_DIGITS: usize = 6;

const FORMAT_T: &str = "%Y-%m-%dT%H:%M:%S%.f";
const FORMAT_SPACE: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parse a telemetry timestamp into a canonical instant.
///
/// # Errors
///
/// Returns the underlying [`chrono::ParseError`] when the text is not a
/// date-time; no defaulting is applied.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    let normalized = truncate_fraction(trimmed);
    NaiveDateTime::parse_from_str(&normalized, FORMAT_T)
        .or_else(|_| NaiveDateTime::parse_from_str(&normalized, FORMAT_SPACE))
        .or_else(|_| DateTime::parse_from_rfc3339(&normalized).map(|ts| ts.naive_utc()))
}

/// Cut the fractional digits to [`MAX_FRACTION_DIGITS`], keeping any offset
/// that follows them.
fn truncate_fraction(ts: &str) -> String {
    let Some((whole, rest)) = ts.split_once('.') else {
        return ts.to_string();
    };
    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let (fraction, offset) = rest.split_at(digits);
    let kept = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
    format!("{whole}.{kept}{offset}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_integer_seconds() {
        let ts = parse_timestamp("2025-01-15T14:30:00Z").unwrap();
        assert_eq!(ts.to_string(), "2025-01-15 14:30:00");
    }

    #[test]
    fn truncates_nanoseconds_without_rounding() {
        let ts = parse_timestamp("2025-01-15T14:30:00.123456999Z").unwrap();
        assert_eq!(ts.nanosecond(), 123_456_000);
    }

    #[test]
    fn keeps_short_fractions() {
        let ts = parse_timestamp("2025-01-15T14:30:00.5").unwrap();
        assert_eq!(ts.nanosecond(), 500_000_000);
    }

    #[test]
    fn accepts_space_separator() {
        assert!(parse_timestamp("2025-01-15 14:30:00").is_ok());
    }

    #[test]
    fn numeric_offset_converts_to_utc() {
        let ts = parse_timestamp("2025-01-15T16:30:00+02:00").unwrap();
        assert_eq!(ts.to_string(), "2025-01-15 14:30:00");
        assert_eq!(
            parse_timestamp("2025-01-15T14:30:00+00:00").unwrap(),
            parse_timestamp("2025-01-15T14:30:00Z").unwrap()
        );
    }

    #[test]
    fn truncation_keeps_the_offset() {
        let ts = parse_timestamp("2025-01-15T14:30:00.123456789-01:00").unwrap();
        assert_eq!(ts.hour(), 15);
        assert_eq!(ts.nanosecond(), 123_456_000);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("").is_err());
    }
}
