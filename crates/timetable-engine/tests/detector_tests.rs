//! Tests for pairwise conflict detection.

use chrono::NaiveDate;
use timetable_engine::detector::{detect_within, matching_axes, rollup};
use timetable_engine::{
    detect, ClassAssignment, ConflictKey, ConflictTime, ConflictType, Roster, ScheduleError,
    TimeSlot,
};
use uuid::Uuid;

const SEMESTER: Uuid = Uuid::from_u128(0x5e);

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 2, 17).unwrap()
}

fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

/// Helper: an assignment on a given teacher/room with one admin class.
fn assignment(
    uuid: u128,
    teacher: u128,
    room: u128,
    admin_class: u128,
    slots: Vec<TimeSlot>,
) -> ClassAssignment {
    ClassAssignment {
        assignment_uuid: id(uuid),
        semester_uuid: SEMESTER,
        course_uuid: id(900 + uuid),
        teacher_uuid: id(teacher),
        classroom_uuid: id(room),
        teaching_class_uuid: id(800 + uuid),
        roster: Roster::Mandatory {
            administrative_class_uuids: vec![id(admin_class)],
        },
        class_time: slots,
        scheduling_priority: 0,
        consecutive_sessions: None,
    }
}

fn weeks(range: std::ops::RangeInclusive<u32>) -> Vec<u32> {
    range.collect()
}

fn count(keys: &[ConflictKey], ty: ConflictType) -> usize {
    keys.iter().filter(|k| k.conflict_type == ty).count()
}

#[test]
fn same_teacher_overlapping_two_weeks() {
    let a = assignment(1, 100, 200, 300, vec![TimeSlot::new(1, 1, 2, weeks(1..=16))]);
    let b = assignment(2, 100, 201, 301, vec![TimeSlot::new(1, 2, 3, vec![1, 2])]);

    let keys = detect(&b, &[a], start()).unwrap();

    assert_eq!(count(&keys, ConflictType::Teacher), 2);
    assert_eq!(count(&keys, ConflictType::Classroom), 0);
    assert_eq!(keys.len(), 2);
    assert_eq!(
        keys[0].conflict_time,
        ConflictTime {
            week: 1,
            day: 1,
            period: 2
        }
    );
    assert_eq!(keys[1].conflict_time.week, 2);
}

#[test]
fn candidate_is_never_compared_with_itself() {
    let a = assignment(1, 100, 200, 300, vec![TimeSlot::new(2, 1, 4, weeks(1..=8))]);
    let older_version = a.clone();
    let keys = detect(&a, &[older_version, a.clone()], start()).unwrap();
    assert!(keys.is_empty());
}

#[test]
fn detection_is_symmetric() {
    let a = assignment(7, 100, 200, 300, vec![TimeSlot::new(4, 3, 5, vec![1, 2, 3])]);
    let b = assignment(3, 100, 200, 300, vec![TimeSlot::new(4, 5, 6, vec![2, 3, 4])]);

    let ab = detect(&a, &[b.clone()], start()).unwrap();
    let ba = detect(&b, &[a], start()).unwrap();

    assert_eq!(ab, ba);
    // Weeks 2 and 3, on all three axes.
    assert_eq!(ab.len(), 6);
    assert!(ab.iter().all(|k| k.first_assignment_uuid == id(3)));
}

#[test]
fn adjacent_periods_do_not_collide() {
    let a = assignment(1, 100, 200, 300, vec![TimeSlot::new(1, 1, 2, vec![1])]);
    let b = assignment(2, 100, 200, 300, vec![TimeSlot::new(1, 3, 4, vec![1])]);
    assert!(detect(&a, &[b], start()).unwrap().is_empty());
}

#[test]
fn empty_weeks_never_conflict() {
    let a = assignment(1, 100, 200, 300, vec![TimeSlot::new(1, 1, 12, vec![])]);
    let b = assignment(2, 100, 200, 300, vec![TimeSlot::new(1, 1, 12, weeks(1..=20))]);
    assert!(detect(&a, &[b.clone()], start()).unwrap().is_empty());
    assert!(detect(&b, &[a], start()).unwrap().is_empty());
}

#[test]
fn unvalidated_far_week_is_an_error() {
    let a = assignment(1, 100, 200, 300, vec![TimeSlot::new(1, 1, 2, vec![1])]);
    let far = assignment(2, 100, 201, 301, vec![TimeSlot::new(1, 1, 2, vec![u32::MAX])]);

    assert!(matches!(
        detect(&far, std::slice::from_ref(&a), start()),
        Err(ScheduleError::InvalidRange(_))
    ));
    assert!(detect(&a, &[far], start()).is_err());
}

#[test]
fn different_weeks_same_weekday_do_not_collide() {
    let odd = assignment(1, 100, 200, 300, vec![TimeSlot::new(5, 1, 2, vec![1, 3, 5])]);
    let even = assignment(2, 100, 200, 300, vec![TimeSlot::new(5, 1, 2, vec![2, 4, 6])]);
    assert!(detect(&odd, &[even], start()).unwrap().is_empty());
}

#[test]
fn unrelated_resources_do_not_collide() {
    let a = assignment(1, 100, 200, 300, vec![TimeSlot::new(1, 1, 2, vec![1])]);
    let b = assignment(2, 101, 201, 301, vec![TimeSlot::new(1, 1, 2, vec![1])]);
    assert!(matching_axes(&a, &b).is_empty());
    assert!(detect(&a, &[b], start()).unwrap().is_empty());
}

#[test]
fn shared_room_is_classroom_conflict() {
    let a = assignment(1, 100, 200, 300, vec![TimeSlot::new(1, 1, 2, vec![1])]);
    let b = assignment(2, 101, 200, 301, vec![TimeSlot::new(1, 1, 2, vec![1])]);
    let keys = detect(&a, &[b], start()).unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].conflict_type, ConflictType::Classroom);
}

#[test]
fn shared_administrative_class_is_roster_conflict() {
    let a = assignment(1, 100, 200, 300, vec![TimeSlot::new(1, 1, 2, vec![1])]);
    let b = assignment(2, 101, 201, 300, vec![TimeSlot::new(1, 1, 2, vec![1])]);
    let keys = detect(&a, &[b], start()).unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].conflict_type, ConflictType::Roster);
}

#[test]
fn elective_is_conservatively_a_roster_conflict() {
    let a = assignment(1, 100, 200, 300, vec![TimeSlot::new(1, 1, 2, vec![1])]);
    let mut b = assignment(2, 101, 201, 301, vec![TimeSlot::new(1, 1, 2, vec![1])]);
    b.roster = Roster::Elective { student_count: 80 };

    let keys = detect(&a, &[b], start()).unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].conflict_type, ConflictType::Roster);
}

#[test]
fn other_semesters_are_skipped() {
    let a = assignment(1, 100, 200, 300, vec![TimeSlot::new(1, 1, 2, vec![1])]);
    let mut b = assignment(2, 100, 200, 300, vec![TimeSlot::new(1, 1, 2, vec![1])]);
    b.semester_uuid = id(0x5f);
    assert!(detect(&a, &[b], start()).unwrap().is_empty());
}

#[test]
fn two_candidate_slots_hitting_one_occurrence_are_deduplicated() {
    // Both candidate slots cover period 2 on week-1 Monday; the intersected
    // start is the same, so only one key per axis survives.
    let a = assignment(
        1,
        100,
        200,
        300,
        vec![TimeSlot::new(1, 1, 2, vec![1]), TimeSlot::new(1, 2, 2, vec![1])],
    );
    let b = assignment(2, 100, 201, 301, vec![TimeSlot::new(1, 2, 3, vec![1])]);
    let keys = detect(&a, &[b], start()).unwrap();
    assert_eq!(keys.len(), 1);
}

#[test]
fn detect_within_checks_every_pair_once() {
    let a = assignment(1, 100, 200, 300, vec![TimeSlot::new(1, 1, 2, vec![1])]);
    let b = assignment(2, 100, 201, 301, vec![TimeSlot::new(1, 1, 2, vec![1])]);
    let c = assignment(3, 102, 200, 302, vec![TimeSlot::new(1, 2, 2, vec![1])]);

    let keys = detect_within(&[a, b, c], start()).unwrap();
    // a-b teacher, a-c classroom; b-c share nothing.
    assert_eq!(keys.len(), 2);
    assert_eq!(count(&keys, ConflictType::Teacher), 1);
    assert_eq!(count(&keys, ConflictType::Classroom), 1);
}

#[test]
fn rollup_groups_weeks_per_pair_and_axis() {
    let a = assignment(1, 100, 200, 300, vec![TimeSlot::new(1, 1, 2, weeks(1..=16))]);
    let b = assignment(2, 100, 201, 301, vec![TimeSlot::new(1, 2, 3, vec![4, 1, 2])]);
    let keys = detect(&b, &[a], start()).unwrap();

    let summary = rollup(&keys);
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].weeks, vec![1, 2, 4]);
    assert_eq!(summary[0].occurrences, 3);
    assert_eq!(summary[0].conflict_type, ConflictType::Teacher);
}
