//! Calendar-date-like inputs accepted by the fetch operations.

use chrono::{NaiveDate, NaiveDateTime};

use crate::metering::error::MeteringError;

/// A value accepted wherever the API needs a calendar date.
///
/// The provider's endpoints take plain ISO dates; callers may hand over an
/// ISO string, a [`NaiveDate`], or a [`NaiveDateTime`] (whose date component
/// is used). Anything else is unrepresentable by construction, and an ISO
/// string that does not parse fails with [`MeteringError::InvalidDate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateInput {
    Iso(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl DateInput {
    /// Normalizes to a plain date (no time of day, no timezone).
    pub fn normalize(&self) -> Result<NaiveDate, MeteringError> {
        match self {
            Self::Date(date) => Ok(*date),
            Self::DateTime(datetime) => Ok(datetime.date()),
            Self::Iso(text) => parse_iso_date(text),
        }
    }
}

fn parse_iso_date(text: &str) -> Result<NaiveDate, MeteringError> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(datetime.date());
        }
    }
    Err(MeteringError::InvalidDate {
        input: text.to_string(),
    })
}

impl From<&str> for DateInput {
    fn from(text: &str) -> Self {
        Self::Iso(text.to_string())
    }
}

impl From<String> for DateInput {
    fn from(text: String) -> Self {
        Self::Iso(text)
    }
}

impl From<NaiveDate> for DateInput {
    fn from(date: NaiveDate) -> Self {
        Self::Date(date)
    }
}

impl From<NaiveDateTime> for DateInput {
    fn from(datetime: NaiveDateTime) -> Self {
        Self::DateTime(datetime)
    }
}
