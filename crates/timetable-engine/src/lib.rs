//! # timetable-engine
//!
//! Conflict detection and resolution bookkeeping for course timetables.
//!
//! Class assignments place a course section on a teacher, a classroom and a
//! set of recurring time slots (weekday + period range + academic weeks). The
//! engine expands those slots into dated occurrences, finds every occurrence
//! that collides with another assignment on a shared teacher, classroom or
//! student population, and tracks each collision from detection to
//! resolution.
//!
//! ## Modules
//!
//! - [`calendar`]: semester week ↔ date arithmetic, holiday tables
//! - [`timeslot`]: recurring slots → concrete occurrences
//! - [`detector`]: pairwise, per-axis collision detection
//! - [`resolution`]: conflict records, their lifecycle, paginated queries
//! - [`model`]: semesters, assignments, rosters, adjustment requests
//! - [`store`]: transactional storage contract + in-memory store
//! - [`service`]: create / update / delete with detection, conflict operations
//! - [`draft`]: in-progress edits as a serializable value
//! - [`error`]: Error types

pub mod calendar;
pub mod detector;
pub mod draft;
pub mod error;
pub mod model;
pub mod resolution;
pub mod service;
pub mod store;
pub mod timeslot;

pub use calendar::{date_for_week_and_day, week_and_day_for_date, HolidayCalendar, HolidayTable};
pub use detector::{detect, ConflictKey, ConflictTime, ConflictType};
pub use draft::SchedulingDraft;
pub use error::{ResourceKind, ScheduleError};
pub use model::{AdjustmentRequest, Adjustments, AssignmentInput, ClassAssignment, Roster, Semester};
pub use resolution::{ConflictQuery, Page, ResolutionMethod, ResolutionStatus, SchedulingConflict};
pub use service::{EngineOptions, SchedulingService};
pub use store::{InMemoryStore, ScheduleStore};
pub use timeslot::{expand, expand_all, Occurrence, TimeSlot};
