use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("invalid date or format provided: '{value}' with format {layout}")]
    InvalidLayout { value: String, layout: DateLayout },

    #[error("'{value}' does not exist in time zone {tz}")]
    NonexistentLocalTime { value: String, tz: Tz },
}

/// The fixed textual date layouts used by NEM12 fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLayout {
    /// CCYYMMDD
    Date8,
    /// CCYYMMDDhhmm
    DateTime12,
    /// CCYYMMDDhhmmss
    DateTime14,
}

impl DateLayout {
    pub fn width(self) -> usize {
        match self {
            DateLayout::Date8 => 8,
            DateLayout::DateTime12 => 12,
            DateLayout::DateTime14 => 14,
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            DateLayout::Date8 => "%Y%m%d",
            DateLayout::DateTime12 => "%Y%m%d%H%M",
            DateLayout::DateTime14 => "%Y%m%d%H%M%S",
        }
    }
}

impl std::fmt::Display for DateLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DateLayout::Date8 => "CCYYMMDD",
            DateLayout::DateTime12 => "CCYYMMDDhhmm",
            DateLayout::DateTime14 => "CCYYMMDDhhmmss",
        };
        f.write_str(name)
    }
}

/// Parse the wall-clock part of a field without attaching a zone.
///
/// The value must be exactly `layout.width()` ASCII digits; chrono alone
/// would accept signs and variable-width years.
pub fn parse_naive(value: &str, layout: DateLayout) -> Result<NaiveDateTime, TimestampError> {
    let invalid = || TimestampError::InvalidLayout {
        value: value.to_string(),
        layout,
    };

    if value.len() != layout.width() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    match layout {
        DateLayout::Date8 => NaiveDate::parse_from_str(value, layout.pattern())
            .map(|date| date.and_time(NaiveTime::MIN))
            .map_err(|_| invalid()),
        DateLayout::DateTime12 | DateLayout::DateTime14 => {
            NaiveDateTime::parse_from_str(value, layout.pattern()).map_err(|_| invalid())
        }
    }
}

/// Parse a field in `layout` as a wall-clock reading in `tz` and resolve it
/// to an absolute instant.
pub fn parse_in_zone(
    value: &str,
    layout: DateLayout,
    tz: Tz,
) -> Result<DateTime<Tz>, TimestampError> {
    let naive = parse_naive(value, layout)?;
    resolve_local(naive, tz).ok_or_else(|| TimestampError::NonexistentLocalTime {
        value: value.to_string(),
        tz,
    })
}

/// Resolve a local wall-clock reading in `tz`.
///
/// Readings repeated by a DST fall-back take the earlier instant. Readings
/// skipped by a DST spring-forward are moved one hour later, past the gap.
pub fn resolve_local(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest(),
    }
}
