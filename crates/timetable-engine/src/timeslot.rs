//! Recurring teaching blocks and their expansion into dated occurrences.
//!
//! A [`TimeSlot`] says "day D, periods P1..=P2, on these academic weeks". It is
//! the only persisted form; [`Occurrence`]s are recomputed from it and the
//! semester start every time they are needed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{self, HolidayCalendar, HolidayEntry};
use crate::error::{Result, ScheduleError};

/// Number of teaching periods in a day.
pub const PERIODS_PER_DAY: u8 = 12;

/// A recurring weekly teaching block.
///
/// Wire shape: `{day_of_week, period_start, period_end, week_numbers}`.
/// `week_numbers` keeps its original order so the value round-trips as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    /// 1 = Monday ... 7 = Sunday.
    pub day_of_week: u8,
    /// First period, 1-based and inclusive.
    pub period_start: u8,
    /// Last period, inclusive.
    pub period_end: u8,
    /// Academic weeks this block recurs on. Need not be contiguous.
    pub week_numbers: Vec<u32>,
}

impl TimeSlot {
    pub fn new(day_of_week: u8, period_start: u8, period_end: u8, week_numbers: Vec<u32>) -> Self {
        Self {
            day_of_week,
            period_start,
            period_end,
            week_numbers,
        }
    }

    /// Check ranges against a semester of `week_count` weeks.
    ///
    /// # Errors
    /// Returns `ScheduleError::Validation` for a day outside 1–7, periods
    /// outside 1–12 or reversed, and week numbers that are zero, past the end
    /// of the semester, or repeated.
    pub fn validate(&self, week_count: u32) -> Result<()> {
        if !(1..=7).contains(&self.day_of_week) {
            return Err(ScheduleError::validation(format!(
                "day_of_week must be 1-7, got {}",
                self.day_of_week
            )));
        }
        for period in [self.period_start, self.period_end] {
            if !(1..=PERIODS_PER_DAY).contains(&period) {
                return Err(ScheduleError::validation(format!(
                    "periods must be 1-{}, got {}",
                    PERIODS_PER_DAY, period
                )));
            }
        }
        if self.period_start > self.period_end {
            return Err(ScheduleError::validation(format!(
                "period_start {} is after period_end {}",
                self.period_start, self.period_end
            )));
        }

        let mut seen = std::collections::BTreeSet::new();
        for &week in &self.week_numbers {
            if week == 0 || week > week_count {
                return Err(ScheduleError::validation(format!(
                    "week {} is outside the semester's 1-{} weeks",
                    week, week_count
                )));
            }
            if !seen.insert(week) {
                return Err(ScheduleError::validation(format!(
                    "week {} is listed twice",
                    week
                )));
            }
        }
        Ok(())
    }

    /// Number of periods covered on each occurrence.
    pub fn span(&self) -> u8 {
        self.period_end.saturating_sub(self.period_start) + 1
    }
}

/// One concrete, dated instance of a [`TimeSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub day_of_week: u8,
    pub period_start: u8,
    pub period_end: u8,
}

impl Occurrence {
    /// Same date and intersecting period ranges.
    ///
    /// Period ranges are inclusive, so `[1,2]` and `[2,3]` overlap on period 2.
    pub fn overlaps(&self, other: &Occurrence) -> bool {
        self.shared_periods(other).is_some()
    }

    /// The inclusive period range both occurrences occupy, if any.
    pub fn shared_periods(&self, other: &Occurrence) -> Option<(u8, u8)> {
        if self.date != other.date {
            return None;
        }
        let start = self.period_start.max(other.period_start);
        let end = self.period_end.min(other.period_end);
        (start <= end).then_some((start, end))
    }
}

/// Expand one slot into its dated occurrences, one per listed week.
///
/// An empty `week_numbers` yields nothing. The slot is not validated; callers
/// holding unchecked input should run [`TimeSlot::validate`] first.
///
/// # Errors
/// Returns `ScheduleError::InvalidRange` if a week number places an
/// occurrence outside the representable date range.
pub fn expand(slot: &TimeSlot, semester_start: NaiveDate) -> Result<Vec<Occurrence>> {
    slot.week_numbers
        .iter()
        .map(|&week| {
            let date = calendar::date_for_week_and_day(
                semester_start,
                i64::from(week),
                i64::from(slot.day_of_week),
            )?;
            Ok(Occurrence {
                date,
                day_of_week: slot.day_of_week,
                period_start: slot.period_start,
                period_end: slot.period_end,
            })
        })
        .collect()
}

/// Concatenate [`expand`] over every slot.
///
/// Occurrences that coincide across slots of the same assignment are kept;
/// whether they matter is the detector's call.
///
/// # Errors
/// Same as [`expand`].
pub fn expand_all(slots: &[TimeSlot], semester_start: NaiveDate) -> Result<Vec<Occurrence>> {
    let mut occurrences = Vec::new();
    for slot in slots {
        occurrences.extend(expand(slot, semester_start)?);
    }
    Ok(occurrences)
}

/// Occurrences that land on a rest-day holiday, paired with the table row.
pub fn holiday_occurrences<'c>(
    occurrences: &[Occurrence],
    holidays: &'c HolidayCalendar,
) -> Vec<(Occurrence, &'c HolidayEntry)> {
    occurrences
        .iter()
        .filter_map(|occ| {
            holidays
                .entry(occ.date)
                .filter(|entry| entry.is_rest_day)
                .map(|entry| (*occ, entry))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_counts_inclusive_periods() {
        assert_eq!(TimeSlot::new(1, 3, 4, vec![1]).span(), 2);
        assert_eq!(TimeSlot::new(1, 5, 5, vec![1]).span(), 1);
    }

    #[test]
    fn validate_rejects_reversed_periods() {
        let slot = TimeSlot::new(2, 4, 3, vec![1]);
        assert!(matches!(slot.validate(16), Err(ScheduleError::Validation(_))));
    }

    #[test]
    fn validate_rejects_week_past_semester_end() {
        let slot = TimeSlot::new(2, 1, 2, vec![1, 17]);
        assert!(slot.validate(16).is_err());
        assert!(slot.validate(17).is_ok());
    }

    #[test]
    fn validate_rejects_repeated_week() {
        let slot = TimeSlot::new(2, 1, 2, vec![3, 3]);
        assert!(slot.validate(16).is_err());
    }

    #[test]
    fn expanding_an_unvalidated_far_week_is_an_error() {
        let start = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();
        let slot = TimeSlot::new(1, 1, 2, vec![1, 4_000_000_000]);
        assert!(matches!(
            expand(&slot, start),
            Err(ScheduleError::InvalidRange(_))
        ));
        assert!(expand_all(&[slot], start).is_err());
    }

    #[test]
    fn validate_accepts_empty_weeks() {
        assert!(TimeSlot::new(7, 12, 12, vec![]).validate(16).is_ok());
    }
}
