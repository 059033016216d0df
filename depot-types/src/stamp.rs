//! Version timestamps.
//!
//! A [`Stamp`] is a UTC instant with microsecond precision. Its storage
//! form is fixed-width RFC 3339 text, so comparing two rendered stamps as
//! strings gives the same answer as comparing the instants themselves.

use crate::{Error, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Layouts accepted for naive (offset-less) input, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// The timestamp of one document version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp(DateTime<Utc>);

impl Stamp {
    /// The current time, truncated to microseconds.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Wraps a datetime, dropping sub-microsecond precision.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let micros = dt.timestamp_micros();
        Self(DateTime::from_timestamp_micros(micros).unwrap_or(dt))
    }

    /// A stamp at whole seconds since the Unix epoch.
    ///
    /// Out-of-range values clamp to the epoch.
    #[must_use]
    pub fn from_unix_secs(secs: i64) -> Self {
        Self(DateTime::from_timestamp(secs, 0).unwrap_or_default())
    }

    /// Midnight UTC at the start of `date`.
    #[must_use]
    pub fn start_of_day(date: NaiveDate) -> Self {
        Self(date.and_time(chrono::NaiveTime::MIN).and_utc())
    }

    /// The instant `days` days before now.
    #[must_use]
    pub fn days_ago(days: u32) -> Self {
        Self::from_datetime(Utc::now() - Duration::days(i64::from(days)))
    }

    /// Parses a stamp from user or peer input.
    ///
    /// Accepts RFC 3339 (`2024-05-01T10:00:00Z`, `...+02:00`), the
    /// space-separated form with an optional offset, naive date-times
    /// (taken as UTC) and bare dates (midnight UTC).
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::from_datetime(dt.with_timezone(&Utc)));
        }
        // RFC 3339 with a space instead of the `T` separator.
        if s.len() > 10 && s.as_bytes()[10] == b' ' {
            let mut t = s.to_string();
            t.replace_range(10..11, "T");
            if let Ok(dt) = DateTime::parse_from_rfc3339(&t) {
                return Ok(Self::from_datetime(dt.with_timezone(&Utc)));
            }
        }
        for fmt in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Self::from_datetime(naive.and_utc()));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::start_of_day(date));
        }
        Err(Error::InvalidTimestamp(input.to_string()))
    }

    /// The underlying datetime.
    #[must_use]
    pub const fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Fixed-width text form used as the storage and wire representation.
    #[must_use]
    pub fn to_storage_string(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Returns true if this stamp is strictly before the other.
    #[must_use]
    pub fn is_before(&self, other: &Self) -> bool {
        self < other
    }

    /// Returns true if this stamp is strictly after the other.
    #[must_use]
    pub fn is_after(&self, other: &Self) -> bool {
        self > other
    }
}

impl Default for Stamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_storage_string())
    }
}

impl FromStr for Stamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<DateTime<Utc>> for Stamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl Serialize for Stamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_storage_string())
    }
}

impl<'de> Deserialize<'de> for Stamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
