// SPDX-License-Identifier: MIT

//!
//! The OpenAtlas instant type, and the parser for dataset date literals
//!
//! A date literal is one of `YYYY`, `YYYY:MM` or `YYYY:MM:DD`, any of which
//! may carry a trailing `BC`.  A literal names a whole period (a year, a month
//! or a day), so the caller says which end of that period it wants with
//! [`Rounding`].
//!

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// The minimum year allowed in the OpenAtlas system
pub const MIN_YEAR: i64 = -50000;

/// The maximum year allowed in the OpenAtlas system
pub const MAX_YEAR: i64 = 10000;

/// The end date literal meaning "still the case today"
pub const PRESENT: &str = "present";

/// Marks a literal's year as being before the common era
const BC_MARKER: &str = "BC";

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Errors that can arise when parsing a date literal.  Every variant is a
/// malformed date.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// Not `YYYY`, `YYYY:MM` or `YYYY:MM:DD`
    #[error("Date `{0}` must be one of YYYY, YYYY:MM or YYYY:MM:DD")]
    SegmentCount(String),

    #[error("Date `{literal}` has a non-numeric segment `{segment}`")]
    NotANumber { literal: String, segment: String },

    #[error("Date `{literal}` has year `{year}` (must be {min} <= year <= {max})", min = MIN_YEAR, max = MAX_YEAR)]
    InvalidYear { literal: String, year: i64 },

    /// Months are never rolled over into the next year
    #[error("Date `{literal}` has month `{month}` (must be 1 <= month <= 12)")]
    InvalidMonth { literal: String, month: i64 },

    /// Days are never rolled over into the next month
    #[error("Date `{literal}` has day `{day}`, which that month does not have")]
    InvalidDay { literal: String, day: i64 },
}

/// Which end of the period named by a literal to resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rounding {
    /// The first second of the period (missing month/day default to 1)
    Start,

    /// The last second of the period (e.g. `1783` is 23:59:59 on 31st Dec)
    End,
}

/// An absolute, comparable point in time (second precision, proleptic
/// Gregorian calendar, astronomical years so that `44BC` is year -44)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(NaiveDateTime);

impl Instant {
    /// Parse a date literal.  `"present"` is not a date and is rejected here;
    /// see [`Instant::parse_end`].
    pub fn parse(literal: &str, rounding: Rounding) -> Result<Self, DateError> {
        parse_date(literal, rounding)
    }

    /// Parse an end date literal, resolving `"present"` to `now`
    pub fn parse_end(literal: &str, now: Instant) -> Result<Self, DateError> {
        if is_present(literal) {
            Ok(now)
        } else {
            parse_date(literal, Rounding::End)
        }
    }

    /// The current local time
    pub fn now() -> Self {
        Instant(chrono::Local::now().naive_local())
    }

    /// Wrap a `chrono` date & time
    pub fn from_naive(date_time: NaiveDateTime) -> Self {
        Instant(date_time)
    }

    /// The start of the given day, if the day exists
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(|date| Instant(start_of_day(date)))
    }

    /// Get the underlying `chrono` value
    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }

    /// The calendar day the instant falls on
    pub fn calendar_day(&self) -> NaiveDate {
        self.0.date()
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Signed number of milliseconds from `earlier` to `self`
    pub fn millis_since(&self, earlier: Instant) -> i64 {
        self.0.signed_duration_since(earlier.0).num_milliseconds()
    }

    /// Move the instant by a (possibly negative) number of milliseconds
    pub fn checked_add_millis(&self, millis: i64) -> Option<Self> {
        let delta = TimeDelta::try_milliseconds(millis)?;
        self.0.checked_add_signed(delta).map(Instant)
    }

    /// `yyyy:mm:dd` format, with a `BC` suffix for negative years.  The
    /// result parses back to the start of the same day.
    pub fn to_literal(&self) -> String {
        let year = self.year();
        let (month, day) = (self.month(), self.day());
        if year < 0 {
            format!("{:04}:{month:02}:{day:02}{BC_MARKER}", -year)
        } else {
            format!("{year:04}:{month:02}:{day:02}")
        }
    }

    /// e.g. 4 Jul 1776 or 15 Mar 44 BC
    pub fn as_long_date_format(&self) -> String {
        let month = match self.month() {
            1 => "Jan",
            2 => "Feb",
            3 => "Mar",
            4 => "Apr",
            5 => "May",
            6 => "Jun",
            7 => "Jul",
            8 => "Aug",
            9 => "Sep",
            10 => "Oct",
            11 => "Nov",
            _ => "Dec",
        };
        let year = self.year();
        let day = self.day();
        if year < 0 {
            format!("{day} {month} {} {BC_MARKER}", -year)
        } else {
            format!("{day} {month} {year}")
        }
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

impl Serialize for Instant {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Instant {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let literal = String::deserialize(deserializer)?;
        Instant::parse(&literal, Rounding::Start).map_err(serde::de::Error::custom)
    }
}

/// Whether the literal is the open-ended "present" sentinel
pub fn is_present(literal: &str) -> bool {
    literal.trim().eq_ignore_ascii_case(PRESENT)
}

/// Parse a `YYYY`, `YYYY:MM` or `YYYY:MM:DD` literal (optionally suffixed with
/// `BC`) into an [`Instant`] at the start or end of the period it names
pub fn parse_date(literal: &str, rounding: Rounding) -> Result<Instant, DateError> {
    let trimmed = literal.trim();
    let (body, is_bc) = match trimmed.strip_suffix(BC_MARKER) {
        Some(body) => (body.trim_end(), true),
        None => (trimmed, false),
    };

    // Split into segments, rejecting things like "1776::4" and ""
    let segments: Vec<&str> = body.split(':').map(str::trim).collect();
    if segments.len() > 3 || segments.iter().any(|segment| segment.is_empty()) {
        return Err(DateError::SegmentCount(literal.to_string()));
    }

    let mut numbers = Vec::with_capacity(segments.len());
    for segment in segments {
        let number = segment
            .parse::<i64>()
            .map_err(|_| DateError::NotANumber {
                literal: literal.to_string(),
                segment: segment.to_string(),
            })?;
        numbers.push(number);
    }

    let date_time = match *numbers.as_slice() {
        [year] => {
            let year = checked_year(literal, year, is_bc)?;
            let (month, day) = match rounding {
                Rounding::Start => (1, 1),
                Rounding::End => (12, 31),
            };
            let date = checked_date(literal, year, month, day)?;
            bound_of_day(date, rounding)
        }
        [year, month] => {
            let year = checked_year(literal, year, is_bc)?;
            let month = checked_month(literal, month)?;
            let first = checked_date(literal, year, month, 1)?;
            match rounding {
                Rounding::Start => start_of_day(first),
                Rounding::End => {
                    // Last second of the month, i.e. just before the next one
                    let (next_year, next_month) = if month == 12 {
                        (year + 1, 1)
                    } else {
                        (year, month + 1)
                    };
                    let next_first = checked_date(literal, next_year, next_month, 1)?;
                    start_of_day(next_first) - TimeDelta::seconds(1)
                }
            }
        }
        [year, month, day] => {
            let year = checked_year(literal, year, is_bc)?;
            let month = checked_month(literal, month)?;
            let date = u32::try_from(day)
                .ok()
                .and_then(|day| NaiveDate::from_ymd_opt(year, month, day))
                .ok_or_else(|| DateError::InvalidDay {
                    literal: literal.to_string(),
                    day,
                })?;
            bound_of_day(date, rounding)
        }
        _ => return Err(DateError::SegmentCount(literal.to_string())),
    };

    Ok(Instant(date_time))
}

fn checked_year(literal: &str, year: i64, is_bc: bool) -> Result<i32, DateError> {
    let year = if is_bc { -year } else { year };
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(year as i32)
    } else {
        Err(DateError::InvalidYear {
            literal: literal.to_string(),
            year,
        })
    }
}

fn checked_month(literal: &str, month: i64) -> Result<u32, DateError> {
    if (1..=12).contains(&month) {
        Ok(month as u32)
    } else {
        Err(DateError::InvalidMonth {
            literal: literal.to_string(),
            month,
        })
    }
}

fn checked_date(literal: &str, year: i32, month: u32, day: u32) -> Result<NaiveDate, DateError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| DateError::InvalidYear {
        literal: literal.to_string(),
        year: year.into(),
    })
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn bound_of_day(date: NaiveDate, rounding: Rounding) -> NaiveDateTime {
    match rounding {
        Rounding::Start => start_of_day(date),
        Rounding::End => start_of_day(date) + TimeDelta::seconds(SECONDS_PER_DAY - 1),
    }
}
