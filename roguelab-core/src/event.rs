//! Telemetry event envelopes as written by the game client, one JSON object
//! per line.
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Result, TelemetryError};
use crate::payload::canonical_keys;
use crate::timestamp::parse_timestamp;

/// Declared type of a telemetry event.
///
/// Only the kinds that shape a run are named; everything else is kept as
/// [`EventKind::Other`] and ignored by reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    RunStarted,
    RunEnded,
    FloorEntered,
    CombatStarted,
    CombatEnded,
    DamageDealt,
    ItemPicked,
    Other(String),
}

impl EventKind {
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "RUN_STARTED" => Self::RunStarted,
            "RUN_ENDED" => Self::RunEnded,
            "FLOOR_ENTERED" => Self::FloorEntered,
            "COMBAT_STARTED" => Self::CombatStarted,
            "COMBAT_ENDED" => Self::CombatEnded,
            "DAMAGE_DEALT" => Self::DamageDealt,
            "ITEM_PICKED" => Self::ItemPicked,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_tag(&self) -> &str {
        match self {
            Self::RunStarted => "RUN_STARTED",
            Self::RunEnded => "RUN_ENDED",
            Self::FloorEntered => "FLOOR_ENTERED",
            Self::CombatStarted => "COMBAT_STARTED",
            Self::CombatEnded => "COMBAT_ENDED",
            Self::DamageDealt => "DAMAGE_DEALT",
            Self::ItemPicked => "ITEM_PICKED",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_tag())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag(&tag))
    }
}

/// One parsed telemetry record. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub version: String,
    pub timestamp: NaiveDateTime,
    pub run_id: String,
    pub tick: i64,
    pub payload: Map<String, Value>,
}

/// Client spellings of the envelope keys.
const ENVELOPE_ALIASES: &[(&str, &str)] = &[
    ("eventType", "event_type"),
    ("eventVersion", "event_version"),
    ("runId", "run_id"),
];

/// Raw line shape before the timestamp is normalised.
#[derive(Debug, Deserialize)]
struct RawEvent {
    event_type: EventKind,
    event_version: String,
    timestamp: String,
    run_id: String,
    tick: i64,
    #[serde(default)]
    payload: Map<String, Value>,
}

/// Parse a single event line. `line` is the 1-based line number used in
/// error messages.
///
/// # Errors
///
/// Returns [`TelemetryError::MalformedRecord`] when the line is not an event
/// object and [`TelemetryError::MalformedTimestamp`] when its timestamp does
/// not parse.
pub fn parse_event_line(line: usize, text: &str) -> Result<Event> {
    let raw: RawEvent = serde_json::from_str(text)
        .map(|fields| canonical_keys(fields, ENVELOPE_ALIASES))
        .and_then(|fields| serde_json::from_value(Value::Object(fields)))
        .map_err(|source| TelemetryError::MalformedRecord { line, source })?;
    let timestamp =
        parse_timestamp(&raw.timestamp).map_err(|source| TelemetryError::MalformedTimestamp {
            line,
            value: raw.timestamp.clone(),
            source,
        })?;
    Ok(Event {
        kind: raw.event_type,
        version: raw.event_version,
        timestamp,
        run_id: raw.run_id,
        tick: raw.tick,
        payload: raw.payload,
    })
}

/// Parse newline-delimited events, skipping blank lines. Fails on the first
/// bad line.
///
/// # Errors
///
/// Propagates the first [`parse_event_line`] failure.
pub fn parse_events(text: &str) -> Result<Vec<Event>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| parse_event_line(idx + 1, line.trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = r#"{"event_type":"RUN_STARTED","event_version":"1.0.0","timestamp":"2025-01-15T14:30:00.000000001Z","run_id":"r1","tick":0,"payload":{"seed":42}}"#;

    #[test]
    fn parses_known_event() {
        let event = parse_event_line(1, LINE).unwrap();
        assert_eq!(event.kind, EventKind::RunStarted);
        assert_eq!(event.run_id, "r1");
        assert_eq!(event.payload.get("seed"), Some(&Value::from(42)));
    }

    #[test]
    fn unknown_kinds_are_kept() {
        let line = LINE.replace("RUN_STARTED", "SHOP_PURCHASED");
        let event = parse_event_line(1, &line).unwrap();
        assert_eq!(event.kind, EventKind::Other("SHOP_PURCHASED".to_string()));
        assert_eq!(event.kind.to_string(), "SHOP_PURCHASED");
    }

    #[test]
    fn accepts_client_camel_case_envelope() {
        let line = r#"{"eventType":"RUN_ENDED","eventVersion":"1.0.0","timestamp":"2025-01-15T14:30:00Z","runId":"r9","tick":3}"#;
        let event = parse_event_line(1, line).unwrap();
        assert_eq!(event.kind, EventKind::RunEnded);
        assert_eq!(event.run_id, "r9");
        assert!(event.payload.is_empty());
    }

    #[test]
    fn envelope_with_both_spellings_uses_snake_case() {
        let line = r#"{"event_type":"RUN_ENDED","eventType":"FLOOR_ENTERED","event_version":"1.0.0","timestamp":"2025-01-15T14:30:00Z","run_id":"r9","runId":"other","tick":3}"#;
        let event = parse_event_line(1, line).unwrap();
        assert_eq!(event.kind, EventKind::RunEnded);
        assert_eq!(event.run_id, "r9");
    }

    #[test]
    fn missing_envelope_field_is_malformed_record() {
        let err = parse_event_line(4, r#"{"event_type":"RUN_STARTED"}"#).unwrap_err();
        assert!(matches!(err, TelemetryError::MalformedRecord { line: 4, .. }));
    }

    #[test]
    fn bad_timestamp_is_reported_with_value() {
        let line = LINE.replace("2025-01-15T14:30:00.000000001Z", "not-a-time");
        let err = parse_event_line(2, &line).unwrap_err();
        match err {
            TelemetryError::MalformedTimestamp { line, value, .. } => {
                assert_eq!(line, 2);
                assert_eq!(value, "not-a-time");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn parse_events_skips_blank_lines_and_counts_raw_lines() {
        let text = format!("\n{LINE}\n   \n{{oops\n");
        let err = parse_events(&text).unwrap_err();
        assert!(matches!(err, TelemetryError::MalformedRecord { line: 4, .. }));

        let events = parse_events(&format!("{LINE}\n\n{LINE}\n")).unwrap();
        assert_eq!(events.len(), 2);
    }
}
