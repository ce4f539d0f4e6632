//! Timestamp parsing and conversion into the report's display zone.
//!
//! Spike returns UTC timestamps as ISO 8601 strings (`2024-03-01T10:00:00.000Z`).
//! Reports show them in a single fixed zone as `YYYY-MM-DD HH:MM:SS`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use chrono_tz::Tz;

use crate::error::SpikeError;

/// Canonical display format for every timestamp cell.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Zone used when nothing else is configured.
pub const DEFAULT_ZONE: &str = "Asia/Kolkata";

/// Naive layouts accepted when the string carries no offset. Interpreted as UTC.
const NAIVE_LAYOUTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Target zone for displayed timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayZone {
    /// IANA zone, e.g. `Asia/Kolkata`.
    Named(Tz),
    /// Fixed offset, e.g. `+05:30`.
    Fixed(FixedOffset),
}

impl Default for DisplayZone {
    fn default() -> Self {
        Self::Named(chrono_tz::Asia::Kolkata)
    }
}

impl DisplayZone {
    /// Wall-clock time of `instant` in this zone.
    #[must_use]
    pub fn localize(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self {
            Self::Named(tz) => instant.with_timezone(tz).naive_local(),
            Self::Fixed(offset) => instant.with_timezone(offset).naive_local(),
        }
    }

    /// Calendar date of `instant` in this zone.
    #[must_use]
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.localize(instant).date()
    }

    /// Format `instant` as a display string in this zone.
    #[must_use]
    pub fn format(&self, instant: DateTime<Utc>) -> String {
        self.localize(instant).format(DISPLAY_FORMAT).to_string()
    }

    /// Display form of an optional raw timestamp.
    ///
    /// Absent or empty input yields `""`. Anything else that does not parse,
    /// whitespace included, is returned unchanged so callers can tell
    /// "missing" from "unreadable".
    #[must_use]
    pub fn display(&self, raw: Option<&str>) -> String {
        match raw {
            None | Some("") => String::new(),
            Some(value) => match parse_utc(value.trim()) {
                Some(instant) => self.format(instant),
                None => value.to_string(),
            },
        }
    }
}

impl fmt::Display for DisplayZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(tz) => write!(f, "{}", tz.name()),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

impl FromStr for DisplayZone {
    type Err = SpikeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("utc") || s == "Z" {
            return Ok(Self::Fixed(Utc.fix()));
        }
        if s.starts_with('+') || s.starts_with('-') {
            return parse_offset(s).map(Self::Fixed);
        }
        s.parse::<Tz>()
            .map(Self::Named)
            .map_err(|e| SpikeError::Config(format!("unknown time zone '{s}': {e}")))
    }
}

/// Parse a Spike timestamp into UTC.
///
/// Accepts RFC 3339 (`Z` or explicit offset) and offset-less ISO layouts,
/// which are read as UTC.
#[must_use]
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
        .map(|naive| naive.and_utc())
}

/// Parse `+HH:MM`, `-HH:MM` or `+HHMM`.
fn parse_offset(s: &str) -> Result<FixedOffset, SpikeError> {
    let invalid = || SpikeError::Config(format!("invalid UTC offset '{s}'"));

    let (sign, rest) = s.split_at(1);
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }

    let seconds = (hours * 3600 + minutes * 60) * if sign == "-" { -1 } else { 1 };
    FixedOffset::east_opt(seconds).ok_or_else(invalid)
}
