//! Schedulable records and their wire forms.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ScheduleError};
use crate::timeslot::{TimeSlot, PERIODS_PER_DAY};

/// Longest semester the engine accepts, in weeks.
pub const MAX_SEMESTER_WEEKS: u32 = 30;

/// An academic term: a run of weeks starting on a Monday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semester {
    pub semester_uuid: Uuid,
    pub name: String,
    /// Monday of week 1.
    pub start_date: NaiveDate,
    pub week_count: u32,
}

impl Semester {
    /// # Errors
    /// Returns `ScheduleError::Validation` if `start_date` is not a Monday or
    /// `week_count` is outside `1..=MAX_SEMESTER_WEEKS`.
    pub fn new(
        semester_uuid: Uuid,
        name: impl Into<String>,
        start_date: NaiveDate,
        week_count: u32,
    ) -> Result<Self> {
        let semester = Self {
            semester_uuid,
            name: name.into(),
            start_date,
            week_count,
        };
        semester.validate()?;
        Ok(semester)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_date.weekday() != Weekday::Mon {
            return Err(ScheduleError::validation(format!(
                "semester start {} is a {:?}, not a Monday",
                self.start_date,
                self.start_date.weekday()
            )));
        }
        if !(1..=MAX_SEMESTER_WEEKS).contains(&self.week_count) {
            return Err(ScheduleError::validation(format!(
                "week_count must be 1-{}, got {}",
                MAX_SEMESTER_WEEKS, self.week_count
            )));
        }
        Ok(())
    }
}

/// Who sits in the class.
///
/// Serialized as two optional sibling fields, `student_count` and
/// `administrative_class_uuids`; exactly one must be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RosterFields", into = "RosterFields")]
pub enum Roster {
    /// Open enrolment; only a headcount is known.
    Elective { student_count: u32 },
    /// Whole administrative classes attend together.
    Mandatory { administrative_class_uuids: Vec<Uuid> },
}

impl Roster {
    /// Whether the two student populations may share a student.
    ///
    /// Electives carry no per-student data, so anything involving an elective
    /// is treated as intersecting. Two mandatory rosters intersect when they
    /// share an administrative class.
    pub fn intersects(&self, other: &Roster) -> bool {
        match (self, other) {
            (
                Roster::Mandatory {
                    administrative_class_uuids: a,
                },
                Roster::Mandatory {
                    administrative_class_uuids: b,
                },
            ) => a.iter().any(|id| b.contains(id)),
            _ => true,
        }
    }

    pub fn administrative_classes(&self) -> &[Uuid] {
        match self {
            Roster::Mandatory {
                administrative_class_uuids,
            } => administrative_class_uuids,
            Roster::Elective { .. } => &[],
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Roster::Elective { student_count: 0 } => Err(ScheduleError::validation(
                "elective roster needs a positive student_count",
            )),
            Roster::Mandatory {
                administrative_class_uuids,
            } if administrative_class_uuids.is_empty() => Err(ScheduleError::validation(
                "mandatory roster needs at least one administrative class",
            )),
            _ => Ok(()),
        }
    }
}

/// Flat wire form of [`Roster`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrative_class_uuids: Option<Vec<Uuid>>,
}

impl TryFrom<RosterFields> for Roster {
    type Error = ScheduleError;

    fn try_from(fields: RosterFields) -> Result<Self> {
        let roster = match (fields.student_count, fields.administrative_class_uuids) {
            (Some(student_count), None) => Roster::Elective { student_count },
            (None, Some(administrative_class_uuids)) => Roster::Mandatory {
                administrative_class_uuids,
            },
            (Some(_), Some(_)) => {
                return Err(ScheduleError::validation(
                    "roster has both student_count and administrative_class_uuids",
                ))
            }
            (None, None) => {
                return Err(ScheduleError::validation(
                    "roster needs student_count or administrative_class_uuids",
                ))
            }
        };
        roster.validate()?;
        Ok(roster)
    }
}

impl From<Roster> for RosterFields {
    fn from(roster: Roster) -> Self {
        match roster {
            Roster::Elective { student_count } => RosterFields {
                student_count: Some(student_count),
                administrative_class_uuids: None,
            },
            Roster::Mandatory {
                administrative_class_uuids,
            } => RosterFields {
                student_count: None,
                administrative_class_uuids: Some(administrative_class_uuids),
            },
        }
    }
}

/// A persisted class assignment: one course section placed on teacher,
/// classroom and a set of recurring time slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassAssignment {
    pub assignment_uuid: Uuid,
    pub semester_uuid: Uuid,
    pub course_uuid: Uuid,
    pub teacher_uuid: Uuid,
    pub classroom_uuid: Uuid,
    pub teaching_class_uuid: Uuid,
    #[serde(flatten)]
    pub roster: Roster,
    pub class_time: Vec<TimeSlot>,
    /// Tie-break hint for manual resolution. Detection ignores it.
    #[serde(default)]
    pub scheduling_priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consecutive_sessions: Option<u8>,
}

impl ClassAssignment {
    /// Validate against the semester the assignment belongs to.
    ///
    /// # Errors
    /// Returns `ScheduleError::Validation` for a semester mismatch, a bad
    /// roster, a bad time slot or an out-of-range `consecutive_sessions`.
    pub fn validate(&self, semester: &Semester) -> Result<()> {
        if self.semester_uuid != semester.semester_uuid {
            return Err(ScheduleError::validation(format!(
                "assignment belongs to semester {}, validated against {}",
                self.semester_uuid, semester.semester_uuid
            )));
        }
        self.roster.validate()?;
        for (index, slot) in self.class_time.iter().enumerate() {
            slot.validate(semester.week_count).map_err(|e| match e {
                ScheduleError::Validation(msg) => {
                    ScheduleError::Validation(format!("class_time[{}]: {}", index, msg))
                }
                other => other,
            })?;
        }
        if let Some(sessions) = self.consecutive_sessions {
            if !(1..=PERIODS_PER_DAY).contains(&sessions) {
                return Err(ScheduleError::validation(format!(
                    "consecutive_sessions must be 1-{}, got {}",
                    PERIODS_PER_DAY, sessions
                )));
            }
        }
        Ok(())
    }
}

/// Fields supplied when creating an assignment. The identity is assigned by
/// the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentInput {
    pub semester_uuid: Uuid,
    pub course_uuid: Uuid,
    pub teacher_uuid: Uuid,
    pub classroom_uuid: Uuid,
    pub teaching_class_uuid: Uuid,
    #[serde(flatten)]
    pub roster: Roster,
    #[serde(default)]
    pub class_time: Vec<TimeSlot>,
    #[serde(default)]
    pub scheduling_priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consecutive_sessions: Option<u8>,
}

impl AssignmentInput {
    pub fn into_assignment(self, assignment_uuid: Uuid) -> ClassAssignment {
        ClassAssignment {
            assignment_uuid,
            semester_uuid: self.semester_uuid,
            course_uuid: self.course_uuid,
            teacher_uuid: self.teacher_uuid,
            classroom_uuid: self.classroom_uuid,
            teaching_class_uuid: self.teaching_class_uuid,
            roster: self.roster,
            class_time: self.class_time,
            scheduling_priority: self.scheduling_priority,
            consecutive_sessions: self.consecutive_sessions,
        }
    }
}

/// Partial edit of an existing assignment. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classroom: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_time: Option<Vec<TimeSlot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consecutive_sessions: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling_priority: Option<i32>,
}

impl Adjustments {
    pub fn is_empty(&self) -> bool {
        *self == Adjustments::default()
    }

    /// A copy of `assignment` with these adjustments applied.
    pub fn apply(&self, assignment: &ClassAssignment) -> ClassAssignment {
        let mut adjusted = assignment.clone();
        if let Some(classroom) = self.classroom {
            adjusted.classroom_uuid = classroom;
        }
        if let Some(teacher) = self.teacher {
            adjusted.teacher_uuid = teacher;
        }
        if let Some(class_time) = &self.class_time {
            adjusted.class_time = class_time.clone();
        }
        if let Some(sessions) = self.consecutive_sessions {
            adjusted.consecutive_sessions = Some(sessions);
        }
        if let Some(priority) = self.scheduling_priority {
            adjusted.scheduling_priority = priority;
        }
        adjusted
    }

    /// Only the teacher and classroom parts, which are what a teaching-class
    /// wide adjustment carries over to sibling assignments.
    pub(crate) fn staffing_only(&self) -> Adjustments {
        Adjustments {
            classroom: self.classroom,
            teacher: self.teacher,
            ..Adjustments::default()
        }
    }
}

/// Update request as sent by the admin UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentRequest {
    pub assignment_id: Uuid,
    #[serde(default)]
    pub adjustments: Adjustments,
    /// Carry teacher/classroom changes to every assignment of the same
    /// teaching class in the semester.
    #[serde(default)]
    pub adjust_teaching_class: bool,
    /// Suppress the acknowledgement prompt. Conflict records are still written.
    #[serde(default)]
    pub ignore_conflicts: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
