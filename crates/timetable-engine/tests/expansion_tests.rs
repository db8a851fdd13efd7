//! Tests for time-slot expansion and occurrence overlap.

use chrono::{Datelike, NaiveDate, Weekday};
use timetable_engine::{expand, expand_all, Occurrence, TimeSlot};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn occ(date: NaiveDate, start: u8, end: u8) -> Occurrence {
    Occurrence {
        date,
        day_of_week: date.weekday().number_from_monday() as u8,
        period_start: start,
        period_end: end,
    }
}

#[test]
fn odd_weeks_wednesday_fourteen_days_apart() {
    let slot = TimeSlot::new(3, 2, 3, vec![1, 3, 5]);
    let result = expand(&slot, ymd(2025, 2, 3)).unwrap();

    let dates: Vec<NaiveDate> = result.iter().map(|o| o.date).collect();
    assert_eq!(
        dates,
        vec![ymd(2025, 2, 5), ymd(2025, 2, 19), ymd(2025, 3, 5)]
    );
    for o in &result {
        assert_eq!(o.date.weekday(), Weekday::Wed);
        assert_eq!((o.day_of_week, o.period_start, o.period_end), (3, 2, 3));
    }
}

#[test]
fn empty_weeks_expand_to_nothing() {
    let slot = TimeSlot::new(1, 1, 12, vec![]);
    assert!(expand(&slot, ymd(2025, 2, 3)).unwrap().is_empty());
}

#[test]
fn expansion_is_repeatable() {
    let slot = TimeSlot::new(5, 7, 8, vec![2, 9, 4]);
    let start = ymd(2025, 9, 1);
    assert_eq!(expand(&slot, start).unwrap(), expand(&slot, start).unwrap());
}

#[test]
fn expand_all_keeps_duplicates_across_slots() {
    // Two slots of one assignment that land on the same Monday.
    let slots = vec![
        TimeSlot::new(1, 1, 2, vec![1]),
        TimeSlot::new(1, 2, 3, vec![1]),
    ];
    let result = expand_all(&slots, ymd(2025, 2, 3)).unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result[0].date, result[1].date);
}

#[test]
fn expand_all_concatenates_in_slot_order() {
    let slots = vec![
        TimeSlot::new(2, 1, 2, vec![1, 2]),
        TimeSlot::new(4, 5, 6, vec![1]),
    ];
    let result = expand_all(&slots, ymd(2025, 2, 3)).unwrap();
    assert_eq!(result.len(), 3);
    assert_eq!(result[2].date, ymd(2025, 2, 6));
}

// ---------------------------------------------------------------------------
// Overlap
// ---------------------------------------------------------------------------

#[test]
fn shared_boundary_period_overlaps() {
    let day = ymd(2025, 3, 3);
    let a = occ(day, 1, 2);
    let b = occ(day, 2, 3);
    assert!(a.overlaps(&b));
    assert!(b.overlaps(&a));
    assert_eq!(a.shared_periods(&b), Some((2, 2)));
}

#[test]
fn disjoint_periods_do_not_overlap() {
    let day = ymd(2025, 3, 3);
    assert!(!occ(day, 1, 2).overlaps(&occ(day, 3, 4)));
}

#[test]
fn contained_range_shares_the_inner_periods() {
    let day = ymd(2025, 3, 3);
    assert_eq!(occ(day, 1, 6).shared_periods(&occ(day, 3, 4)), Some((3, 4)));
}

#[test]
fn different_dates_never_overlap() {
    assert!(!occ(ymd(2025, 3, 3), 1, 4).overlaps(&occ(ymd(2025, 3, 10), 1, 4)));
}

#[test]
fn time_slot_wire_shape_round_trips() {
    let json = r#"{"day_of_week":3,"period_start":2,"period_end":3,"week_numbers":[5,1,3]}"#;
    let slot: TimeSlot = serde_json::from_str(json).unwrap();
    assert_eq!(slot.week_numbers, vec![5, 1, 3]);
    assert_eq!(serde_json::to_string(&slot).unwrap(), json);
}
