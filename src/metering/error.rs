use crate::auth::error::AuthError;
use crate::transport::error::TransportError;
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeteringError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("'{input}' is not an ISO calendar date or date-time")]
    InvalidDate { input: String },

    #[error("There must be at most 7 days between start and end ({start} to {end})")]
    SpanTooLong { start: NaiveDate, end: NaiveDate },

    #[error("No readings in the requested period ({start} to {end})")]
    NoData { start: NaiveDate, end: NaiveDate },

    #[error("Failed to parse metering response")]
    Parse(#[source] serde_json::Error),

    #[error("Failed to parse reading timestamp '{text}'")]
    Timestamp { text: String },

    #[error("Failed to parse reading value '{text}'")]
    Value { text: String },

    #[error("Local time {at} is ambiguous in Europe/Paris (fall-back transition)")]
    AmbiguousLocalTime { at: NaiveDateTime },

    #[error("Local time {at} does not exist in Europe/Paris (spring-forward transition)")]
    NonexistentLocalTime { at: NaiveDateTime },
}
