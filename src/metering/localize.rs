//! Europe/Paris localization of the provider's naive timestamps.
//!
//! The provider reports wall-clock times without an offset. Daily series are
//! localized strictly: a wall time falling in a DST transition is an error,
//! because no disambiguation rule applies to those endpoints. Half-hourly
//! load curves cross transitions within a single response, so the ambiguous
//! fall-back hour is resolved from the provider's chronological ordering
//! instead.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::metering::error::MeteringError;

/// Timezone of every Enedis series.
pub const TIMEZONE: Tz = chrono_tz::Europe::Paris;

/// Strict mapping: errors on DST-ambiguous or nonexistent wall times.
pub(crate) fn localize_strict(naive: NaiveDateTime) -> Result<DateTime<Tz>, MeteringError> {
    match TIMEZONE.from_local_datetime(&naive) {
        LocalResult::Single(datetime) => Ok(datetime),
        LocalResult::Ambiguous(_, _) => Err(MeteringError::AmbiguousLocalTime { at: naive }),
        LocalResult::None => Err(MeteringError::NonexistentLocalTime { at: naive }),
    }
}

/// Mapping with fall-back inference: an ambiguous wall time resolves to the
/// earliest candidate instant that still moves the series forward.
///
/// During the repeated hour the provider emits each wall time twice, in
/// chronological order. The first pass picks the DST-side instant (it is
/// later than the previous point); the second pass finds that instant no
/// longer ahead of the series and takes the standard-time side instead.
/// Nonexistent (spring-forward) wall times remain errors.
pub(crate) fn localize_inferred(
    naive: NaiveDateTime,
    previous: Option<&DateTime<Tz>>,
) -> Result<DateTime<Tz>, MeteringError> {
    match TIMEZONE.from_local_datetime(&naive) {
        LocalResult::Single(datetime) => Ok(datetime),
        LocalResult::Ambiguous(earliest, latest) => match previous {
            Some(prev) if earliest <= *prev => Ok(latest),
            _ => Ok(earliest),
        },
        LocalResult::None => Err(MeteringError::NonexistentLocalTime { at: naive }),
    }
}
