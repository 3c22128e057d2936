//! Flight time values.
//!
//! Every duration in the logbook (block time, night time, simulator sessions,
//! ...) is stored as a whole number of minutes. `HH:MM` strings only exist at
//! the edges: form input, legacy databases, and rendered output.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A non-negative elapsed time with minute precision.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FlightTime(u32);

fn duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{1,5}):([0-5]\d)$").expect("duration pattern is valid")
    })
}

impl FlightTime {
    /// Zero minutes.
    pub const ZERO: Self = Self(0);

    /// Create a flight time from a total number of minutes.
    #[must_use]
    pub const fn from_minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    /// Create a flight time from an hours/minutes pair.
    ///
    /// The pair does not need to be normalized: `(1, 90)` equals `(2, 30)`.
    #[must_use]
    pub const fn from_hours_minutes(hours: u32, minutes: u32) -> Self {
        Self(hours.saturating_mul(60).saturating_add(minutes))
    }

    /// Total number of minutes.
    #[must_use]
    pub const fn as_minutes(self) -> u32 {
        self.0
    }

    /// Normalized `(hours, minutes)` pair with minutes in `0..60`.
    #[must_use]
    pub const fn as_hours_minutes(self) -> (u32, u32) {
        (self.0 / 60, self.0 % 60)
    }

    /// Human summary such as `12h 5m`.
    #[must_use]
    pub fn summary(self) -> String {
        let (hours, minutes) = self.as_hours_minutes();
        format!("{hours}h {minutes}m")
    }
}

impl FromStr for FlightTime {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let invalid = || Error::InvalidDuration {
            value: value.to_string(),
        };
        let caps = duration_pattern()
            .captures(value.trim())
            .ok_or_else(invalid)?;
        let hours: u32 = caps[1].parse().map_err(|_| invalid())?;
        let minutes: u32 = caps[2].parse().map_err(|_| invalid())?;
        Ok(Self::from_hours_minutes(hours, minutes))
    }
}

impl fmt::Display for FlightTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hours, minutes) = self.as_hours_minutes();
        write!(f, "{hours:02}:{minutes:02}")
    }
}

impl Add for FlightTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for FlightTime {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl rusqlite::ToSql for FlightTime {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(rusqlite::types::ToSqlOutput::from(i64::from(self.0)))
    }
}

impl rusqlite::types::FromSql for FlightTime {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        let minutes = value.as_i64()?;
        u32::try_from(minutes)
            .map(Self)
            .map_err(|_| rusqlite::types::FromSqlError::OutOfRange(minutes))
    }
}
