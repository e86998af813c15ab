use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning one telemetry source into a [`crate::Run`].
///
/// Every variant is local to a single source; batch loading reports it and
/// moves on to the next source.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("no events found in {source_name}")]
    EmptyRun { source_name: String },
    #[error("no RUN_STARTED event found in {source_name}")]
    MissingRunStart { source_name: String },
    #[error("line {line}: malformed timestamp '{value}'")]
    MalformedTimestamp {
        line: usize,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("line {line}: malformed event record")]
    MalformedRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;
