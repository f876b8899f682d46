// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA `DateTime` handling.
//!
//! An OPC UA `DateTime` counts 100 ns ticks since 1601-01-01 00:00:00 UTC.
//! [`UaDateTime`] wraps the raw tick count and converts it to a calendar
//! breakdown ([`DateTimeParts`]) or a `chrono` timestamp.
//!
//! ```
//! use uaclock_opcua::time::UaDateTime;
//!
//! let dt = UaDateTime::from_ticks(133_497_956_967_890_000);
//! assert_eq!(dt.to_string(), "15-01-2024 12:34:56.789");
//! ```

use std::fmt;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Ticks per second (1 tick = 100 ns).
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Ticks per millisecond.
pub const TICKS_PER_MILLISECOND: i64 = 10_000;

/// Ticks between 1601-01-01 and the Unix epoch.
pub const UNIX_EPOCH_TICKS: i64 = 116_444_736_000_000_000;

// =============================================================================
// UaDateTime
// =============================================================================

/// OPC UA timestamp in 100 ns ticks since 1601-01-01 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct UaDateTime(i64);

impl UaDateTime {
    /// Creates a timestamp from raw ticks.
    #[inline]
    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Returns the raw tick count.
    #[inline]
    pub const fn ticks(&self) -> i64 {
        self.0
    }

    /// Returns the current time.
    pub fn now() -> Self {
        Self::from_chrono(Utc::now())
    }

    /// Converts a `chrono` timestamp, saturating outside the representable range.
    pub fn from_chrono(value: DateTime<Utc>) -> Self {
        let ticks = value
            .timestamp()
            .saturating_mul(TICKS_PER_SECOND)
            .saturating_add(i64::from(value.timestamp_subsec_nanos() / 100))
            .saturating_add(UNIX_EPOCH_TICKS);
        Self(ticks)
    }

    /// Converts to a `chrono` timestamp.
    ///
    /// Returns `None` when the tick count is outside `chrono`'s range.
    pub fn to_chrono(&self) -> Option<DateTime<Utc>> {
        let unix_ticks = self.0.checked_sub(UNIX_EPOCH_TICKS)?;
        let secs = unix_ticks.div_euclid(TICKS_PER_SECOND);
        let sub_ticks = unix_ticks.rem_euclid(TICKS_PER_SECOND);
        DateTime::from_timestamp(secs, (sub_ticks * 100) as u32)
    }

    /// Breaks the timestamp down into calendar fields.
    pub fn parts(&self) -> Option<DateTimeParts> {
        let dt = self.to_chrono()?;
        let sub_ticks = self.0.rem_euclid(TICKS_PER_SECOND);

        Some(DateTimeParts {
            nano_sec: ((sub_ticks % 10) * 100) as u16,
            micro_sec: ((sub_ticks / 10) % 1000) as u16,
            milli_sec: (sub_ticks / TICKS_PER_MILLISECOND) as u16,
            sec: dt.second() as u16,
            min: dt.minute() as u16,
            hour: dt.hour() as u16,
            day: dt.day() as u16,
            month: dt.month() as u16,
            year: dt.year(),
        })
    }
}

impl From<DateTime<Utc>> for UaDateTime {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from_chrono(value)
    }
}

impl fmt::Display for UaDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parts() {
            Some(parts) => fmt::Display::fmt(&parts, f),
            None => write!(f, "<invalid datetime {}>", self.0),
        }
    }
}

// =============================================================================
// DateTimeParts
// =============================================================================

/// Calendar breakdown of a [`UaDateTime`] in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTimeParts {
    /// Nanoseconds (0-900, in steps of 100).
    pub nano_sec: u16,
    /// Microseconds (0-999).
    pub micro_sec: u16,
    /// Milliseconds (0-999).
    pub milli_sec: u16,
    /// Seconds (0-59).
    pub sec: u16,
    /// Minutes (0-59).
    pub min: u16,
    /// Hours (0-23).
    pub hour: u16,
    /// Day of month (1-31).
    pub day: u16,
    /// Month (1-12).
    pub month: u16,
    /// Year.
    pub year: i32,
}

impl fmt::Display for DateTimeParts {
    /// Formats as `DD-MM-YYYY hh:mm:ss.mmm`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}-{:02}-{:04} {:02}:{:02}:{:02}.{:03}",
            self.day, self.month, self.year, self.hour, self.min, self.sec, self.milli_sec
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
