//! Semester week arithmetic and holiday lookup.
//!
//! A semester is a grid of academic weeks anchored on the Monday of week 1.
//! `(week, day_of_week)` pairs map onto calendar dates by plain day offsets;
//! there is no timezone involved, every value here is a `NaiveDate`.
//!
//! Holiday status comes from versioned [`HolidayTable`]s supplied at startup
//! (one table per covered year). Tables carry both rest days and the weekend
//! days that are officially adjusted into workdays, so [`HolidayCalendar::is_holiday`]
//! and [`HolidayCalendar::is_workday`] are NOT complements: an ordinary
//! Saturday is neither.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};

/// A position on the semester week grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeekDay {
    /// 1-based academic week.
    pub week: u32,
    /// 1 = Monday ... 7 = Sunday.
    pub day: u8,
}

/// Calendar date of `day_of_week` in academic `week`.
///
/// Computes `semester_start + (week - 1) * 7 + (day_of_week - 1)` days. Neither
/// argument is range-checked against a semester: week 0 or a negative week
/// lands before the semester start.
///
/// # Errors
/// Returns `ScheduleError::InvalidRange` if the offset overflows or the result
/// leaves chrono's representable date range.
pub fn date_for_week_and_day(
    semester_start: NaiveDate,
    week: i64,
    day_of_week: i64,
) -> Result<NaiveDate> {
    week.checked_sub(1)
        .and_then(|w| w.checked_mul(7))
        .and_then(|days| days.checked_add(day_of_week.checked_sub(1)?))
        .and_then(Duration::try_days)
        .and_then(|offset| semester_start.checked_add_signed(offset))
        .ok_or_else(|| {
            ScheduleError::InvalidRange(format!(
                "week {} day {} is out of range for a semester starting {}",
                week, day_of_week, semester_start
            ))
        })
}

/// Inverse of [`date_for_week_and_day`].
///
/// `week = floor(diff / 7) + 1` and `day = diff mod 7 + 1`, where `diff` is the
/// number of whole days between `semester_start` and `date`.
///
/// # Errors
/// Returns `ScheduleError::InvalidRange` when `date` is before `semester_start`.
pub fn week_and_day_for_date(semester_start: NaiveDate, date: NaiveDate) -> Result<WeekDay> {
    let diff = (date - semester_start).num_days();
    if diff < 0 {
        return Err(ScheduleError::InvalidRange(format!(
            "{} is before semester start {}",
            date, semester_start
        )));
    }

    let week = u32::try_from(diff / 7 + 1)
        .map_err(|_| ScheduleError::InvalidRange(format!("{} is too far past {}", date, semester_start)))?;
    // diff >= 0, so the remainder is 0..=6.
    let day = (diff % 7) as u8 + 1;

    Ok(WeekDay { week, day })
}

/// One dated row of a holiday table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayEntry {
    pub date: NaiveDate,
    pub name: String,
    /// `true` for a day off; `false` for a weekend day adjusted into a workday.
    pub is_rest_day: bool,
}

/// The holiday table for a single calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayTable {
    pub year: i32,
    /// Free-form revision tag so yearly updates can be told apart.
    pub version: String,
    pub entries: Vec<HolidayEntry>,
}

impl HolidayTable {
    /// Parse a table from its JSON form.
    ///
    /// # Errors
    /// Returns `ScheduleError::Serialization` for malformed JSON, and
    /// `ScheduleError::Validation` when an entry falls outside `year` or a
    /// date appears twice.
    pub fn from_json(json: &str) -> Result<Self> {
        let table: HolidayTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for entry in &self.entries {
            if entry.date.year() != self.year {
                return Err(ScheduleError::validation(format!(
                    "holiday table {} ({}) contains {} from another year",
                    self.year, self.version, entry.date
                )));
            }
            if !seen.insert(entry.date) {
                return Err(ScheduleError::validation(format!(
                    "holiday table {} ({}) lists {} twice",
                    self.year, self.version, entry.date
                )));
            }
        }
        Ok(())
    }
}

/// Immutable lookup over a set of yearly holiday tables.
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    tables: BTreeMap<i32, HolidayTable>,
    entries: BTreeMap<NaiveDate, HolidayEntry>,
}

impl HolidayCalendar {
    /// A calendar with no holidays: every Monday–Friday is a workday.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a calendar from yearly tables.
    ///
    /// # Errors
    /// Returns `ScheduleError::Validation` if two tables cover the same year or
    /// a table is internally inconsistent.
    pub fn from_tables(tables: impl IntoIterator<Item = HolidayTable>) -> Result<Self> {
        let mut calendar = Self::default();
        for table in tables {
            table.validate()?;
            if let Some(existing) = calendar.tables.get(&table.year) {
                return Err(ScheduleError::validation(format!(
                    "holiday tables {} and {} both cover {}",
                    existing.version, table.version, table.year
                )));
            }
            for entry in &table.entries {
                calendar.entries.insert(entry.date, entry.clone());
            }
            calendar.tables.insert(table.year, table);
        }
        Ok(calendar)
    }

    /// `true` if `date` is a rest day in the loaded tables.
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.entries.get(&date).is_some_and(|e| e.is_rest_day)
    }

    /// `true` if `date` is an adjusted workday, or a Monday–Friday that is not
    /// a rest-day holiday.
    pub fn is_workday(&self, date: NaiveDate) -> bool {
        match self.entries.get(&date) {
            Some(entry) => !entry.is_rest_day,
            None => !matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        }
    }

    /// The table row for `date`, if any.
    pub fn entry(&self, date: NaiveDate) -> Option<&HolidayEntry> {
        self.entries.get(&date)
    }

    /// Whether a table for `year` has been loaded.
    pub fn covers_year(&self, year: i32) -> bool {
        self.tables.contains_key(&year)
    }

    /// Loaded tables in year order.
    pub fn tables(&self) -> impl Iterator<Item = &HolidayTable> {
        self.tables.values()
    }
}
