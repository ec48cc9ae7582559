//! Date filter normalization into canonical range boundaries.
//!
//! Two input shapes are accepted: `YYYY-MM-DD` and `YYYY-MM-DDTHH:MM` (the
//! value an HTML `datetime-local` input submits). End-of-range values are
//! pushed to the last second they cover so that `timestamp <= end` includes
//! the whole day or minute the operator picked.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::core::errors::{LogscopeError, Result};

/// Canonical text form bound into SQL and used by the stored timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATE_FORMAT: &str = "%Y-%m-%d";
const MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Which side of a range a date filter bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Inclusive lower bound; used verbatim.
    Start,
    /// Inclusive upper bound; advanced to the last covered second.
    End,
}

/// Parse a date filter, reporting malformed text as an error.
///
/// Absent or blank input is `Ok(None)`.
pub fn parse_boundary(text: Option<&str>, boundary: Boundary) -> Result<Option<NaiveDateTime>> {
    let Some(raw) = text.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };

    if raw.contains('T') {
        let at = NaiveDateTime::parse_from_str(raw, MINUTE_FORMAT).map_err(|_| {
            LogscopeError::InvalidDate {
                input: raw.to_string(),
            }
        })?;
        return match boundary {
            Boundary::Start => Ok(Some(at)),
            Boundary::End => last_second(at, Duration::minutes(1), raw).map(Some),
        };
    }

    let day = NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
        LogscopeError::InvalidDate {
            input: raw.to_string(),
        }
    })?;
    let start = day.and_time(NaiveTime::MIN);
    match boundary {
        Boundary::Start => Ok(Some(start)),
        Boundary::End => last_second(start, Duration::days(1), raw).map(Some),
    }
}

/// Last second of the `span` starting at `start`. Spans that would leave
/// chrono's representable range count as invalid input.
fn last_second(start: NaiveDateTime, span: Duration, raw: &str) -> Result<NaiveDateTime> {
    start
        .checked_add_signed(span)
        .and_then(|next| next.checked_sub_signed(Duration::seconds(1)))
        .ok_or_else(|| LogscopeError::InvalidDate {
            input: raw.to_string(),
        })
}

/// Normalize a date filter; malformed input is logged and dropped.
#[must_use]
pub fn normalize(text: Option<&str>, boundary: Boundary) -> Option<NaiveDateTime> {
    match parse_boundary(text, boundary) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(code = err.code(), ?boundary, "dropping date filter: {err}");
            None
        }
    }
}

/// Render a timestamp in [`TIMESTAMP_FORMAT`].
#[must_use]
pub fn format_timestamp(at: &NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Serde adapter writing timestamps as `YYYY-MM-DD HH:MM:SS` text.
pub mod timestamp_text {
    use chrono::NaiveDateTime;
    use serde::Serializer;

    /// Serialize `at` in the canonical text form.
    pub fn serialize<S: Serializer>(at: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&at.format(super::TIMESTAMP_FORMAT))
    }
}
