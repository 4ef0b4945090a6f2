//! Calendar reconciliation between the two grid conventions.
//!
//! The source grid encodes day columns Sunday-first in its DOM field names;
//! aggregation and the destination's logical ordering run Monday-first. The
//! two never convert slot-to-slot directly: every crossing goes through a
//! calendar date, which both conventions agree on.

use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::TranscribeError;

static ENTRY_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid regex"));
static HEADER_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})/(\d{1,2})(?:/(\d{4}))?").expect("valid regex"));
static LOCATION_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"date=(\d{4})-(\d{2})-(\d{2})").expect("valid regex"));

/// Which calendar weekday a grid's slot 0 denotes.
///
/// `SundayFirst` is the source grid's positional DOM-field encoding
/// (Sunday=0..Saturday=6); `MondayFirst` is the logical ordering used for
/// aggregation keys and the destination week (Monday=0..Sunday=6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayConvention {
    SundayFirst,
    MondayFirst,
}

const FROM_MONDAY: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

impl DayConvention {
    /// Slot index (0..=6) this convention assigns to a calendar weekday.
    pub fn slot_of(&self, weekday: Weekday) -> usize {
        match self {
            DayConvention::MondayFirst => weekday.num_days_from_monday() as usize,
            DayConvention::SundayFirst => weekday.num_days_from_sunday() as usize,
        }
    }

    /// Slot index for a calendar date.
    pub fn slot_for_date(&self, date: NaiveDate) -> usize {
        self.slot_of(date.weekday())
    }

    /// Calendar weekday a slot denotes, or `None` for an out-of-range slot.
    pub fn weekday_at(&self, slot: usize) -> Option<Weekday> {
        if slot > 6 {
            return None;
        }
        Some(match self {
            DayConvention::MondayFirst => FROM_MONDAY[slot],
            DayConvention::SundayFirst => FROM_MONDAY[(slot + 6) % 7],
        })
    }

    /// The concrete date a slot denotes within a week. This is the only
    /// sanctioned way to move a slot across conventions.
    pub fn date_in_week(&self, week: &WeekRange, slot: usize) -> Option<NaiveDate> {
        let weekday = self.weekday_at(slot)?;
        (0..7)
            .map(|offset| week.start + Duration::days(offset))
            .find(|date| date.weekday() == weekday)
    }
}

/// One calendar week. `containing` guarantees a Monday-aligned start and
/// `end == start + 6 days`; header-derived ranges carry the visible dates
/// verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekRange {
    /// The Monday..Sunday week containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let back = date.weekday().num_days_from_monday() as i64;
        let start = date - Duration::days(back);
        Self {
            start,
            end: start + Duration::days(6),
        }
    }

    /// The current calendar week, Monday-aligned. Last-resort default when a
    /// page offers no date at all.
    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }

    /// Earliest/latest of two visible dates, in ascending order.
    pub fn from_span(a: NaiveDate, b: NaiveDate) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Parse a full `MM/DD/YYYY` cell, the only date shape a detail row carries.
pub fn parse_entry_date(text: &str) -> Result<NaiveDate, TranscribeError> {
    let text = text.trim();
    let caps = ENTRY_DATE
        .captures(text)
        .ok_or_else(|| TranscribeError::DateParseFailure(format!("not a MM/DD/YYYY date: {text:?}")))?;
    date_from_parts(&caps[1], &caps[2], &caps[3])
        .ok_or_else(|| TranscribeError::DateParseFailure(format!("no such calendar date: {text:?}")))
}

/// Parse a `MM/DD` (optionally `/YYYY`) fragment from a header cell. Headers
/// usually omit the year; the caller supplies the year of the extraction run.
pub fn parse_header_date(text: &str, default_year: i32) -> Option<NaiveDate> {
    let caps = HEADER_DATE.captures(text)?;
    let year = caps
        .get(3)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .unwrap_or(default_year);
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Explicit `date=YYYY-MM-DD` parameter in a page's addressable location.
pub fn parse_location_date(location: &str) -> Option<NaiveDate> {
    let caps = LOCATION_DATE.captures(location)?;
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
}

fn date_from_parts(month: &str, day: &str, year: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}
