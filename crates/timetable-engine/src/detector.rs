//! Detect colliding occurrences between class assignments.
//!
//! Two assignments collide when an occurrence of one falls on the same date as
//! an occurrence of the other and their period ranges intersect, AND they share
//! a resource: the teacher, the classroom, or (possibly) students. Each
//! colliding occurrence yields one [`ConflictKey`] per shared resource axis.
//!
//! Keys are normalized so the smaller assignment UUID is always first, which
//! makes `detect(A, [B])` and `detect(B, [A])` produce identical output and lets
//! callers deduplicate against stored records.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar;
use crate::error::Result;
use crate::model::ClassAssignment;
use crate::timeslot::{self, Occurrence};

/// Resource axis on which two occurrences collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    Teacher,
    Classroom,
    /// Overlapping student population.
    Roster,
}

/// Where on the week grid a collision happens.
///
/// Wire shape: `{week, day, period}`. `period` is the first period both sides
/// occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConflictTime {
    pub week: u32,
    pub day: u8,
    pub period: u8,
}

/// Identity of one detected collision.
///
/// At most one unresolved record may exist per key. Field order doubles as the
/// sort order: semester, then time, then pair, then axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConflictKey {
    pub semester_uuid: Uuid,
    pub conflict_time: ConflictTime,
    pub first_assignment_uuid: Uuid,
    pub second_assignment_uuid: Uuid,
    pub conflict_type: ConflictType,
}

impl ConflictKey {
    /// Build a key with the pair ordered smaller-UUID-first.
    pub fn new(
        semester_uuid: Uuid,
        a: Uuid,
        b: Uuid,
        conflict_time: ConflictTime,
        conflict_type: ConflictType,
    ) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self {
            semester_uuid,
            conflict_time,
            first_assignment_uuid: first,
            second_assignment_uuid: second,
            conflict_type,
        }
    }

    pub fn involves(&self, assignment_uuid: Uuid) -> bool {
        self.first_assignment_uuid == assignment_uuid
            || self.second_assignment_uuid == assignment_uuid
    }
}

/// Axes on which `a` and `b` share a resource, in [`ConflictType`] order.
pub fn matching_axes(a: &ClassAssignment, b: &ClassAssignment) -> Vec<ConflictType> {
    let mut axes = Vec::with_capacity(3);
    if a.teacher_uuid == b.teacher_uuid {
        axes.push(ConflictType::Teacher);
    }
    if a.classroom_uuid == b.classroom_uuid {
        axes.push(ConflictType::Classroom);
    }
    if a.roster.intersects(&b.roster) {
        axes.push(ConflictType::Roster);
    }
    axes
}

/// Find every collision between `candidate` and `others`.
///
/// `others` may contain the candidate itself (any version with the same UUID)
/// and assignments from other semesters; both are skipped. Returns sorted,
/// deduplicated keys. A candidate with no occurrences yields no keys.
///
/// # Errors
/// Returns `ScheduleError::InvalidRange` if a slot carries a week number that
/// places an occurrence outside chrono's date range; validated slots never do.
pub fn detect(
    candidate: &ClassAssignment,
    others: &[ClassAssignment],
    semester_start: NaiveDate,
) -> Result<Vec<ConflictKey>> {
    let ours = occurrences_by_date(candidate, semester_start)?;
    if ours.is_empty() {
        return Ok(Vec::new());
    }

    let mut keys = BTreeSet::new();
    for other in others {
        if other.assignment_uuid == candidate.assignment_uuid
            || other.semester_uuid != candidate.semester_uuid
        {
            continue;
        }
        let axes = matching_axes(candidate, other);
        if axes.is_empty() {
            continue;
        }

        for theirs in timeslot::expand_all(&other.class_time, semester_start)? {
            let Some(same_day) = ours.get(&theirs.date) else {
                continue;
            };
            for occ in same_day {
                let Some((period, _)) = occ.shared_periods(&theirs) else {
                    continue;
                };
                let grid = calendar::week_and_day_for_date(semester_start, theirs.date)?;
                let conflict_time = ConflictTime {
                    week: grid.week,
                    day: grid.day,
                    period,
                };
                for &axis in &axes {
                    keys.insert(ConflictKey::new(
                        candidate.semester_uuid,
                        candidate.assignment_uuid,
                        other.assignment_uuid,
                        conflict_time,
                        axis,
                    ));
                }
            }
        }
    }

    tracing::debug!(
        assignment = %candidate.assignment_uuid,
        compared = others.len(),
        conflicts = keys.len(),
        "conflict detection finished"
    );

    Ok(keys.into_iter().collect())
}

/// Every collision among a set of assignments, each pair checked once.
///
/// # Errors
/// Same as [`detect`].
pub fn detect_within(
    assignments: &[ClassAssignment],
    semester_start: NaiveDate,
) -> Result<Vec<ConflictKey>> {
    let mut keys = BTreeSet::new();
    for (i, candidate) in assignments.iter().enumerate() {
        keys.extend(detect(candidate, &assignments[i + 1..], semester_start)?);
    }
    Ok(keys.into_iter().collect())
}

/// Conflicts between one pair on one axis, summarized across weeks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRollup {
    pub first_assignment_uuid: Uuid,
    pub second_assignment_uuid: Uuid,
    pub conflict_type: ConflictType,
    /// Distinct weeks with at least one collision, ascending.
    pub weeks: Vec<u32>,
    /// Number of underlying per-occurrence keys.
    pub occurrences: usize,
}

/// Group per-occurrence keys into one summary per `(pair, axis)`.
pub fn rollup<'a>(keys: impl IntoIterator<Item = &'a ConflictKey>) -> Vec<ConflictRollup> {
    let mut groups: BTreeMap<(Uuid, Uuid, ConflictType), (BTreeSet<u32>, usize)> = BTreeMap::new();
    for key in keys {
        let group = groups
            .entry((
                key.first_assignment_uuid,
                key.second_assignment_uuid,
                key.conflict_type,
            ))
            .or_default();
        group.0.insert(key.conflict_time.week);
        group.1 += 1;
    }

    groups
        .into_iter()
        .map(|((first, second, conflict_type), (weeks, occurrences))| ConflictRollup {
            first_assignment_uuid: first,
            second_assignment_uuid: second,
            conflict_type,
            weeks: weeks.into_iter().collect(),
            occurrences,
        })
        .collect()
}

fn occurrences_by_date(
    assignment: &ClassAssignment,
    semester_start: NaiveDate,
) -> Result<BTreeMap<NaiveDate, Vec<Occurrence>>> {
    let mut by_date: BTreeMap<NaiveDate, Vec<Occurrence>> = BTreeMap::new();
    for occ in timeslot::expand_all(&assignment.class_time, semester_start)? {
        by_date.entry(occ.date).or_default().push(occ);
    }
    Ok(by_date)
}
