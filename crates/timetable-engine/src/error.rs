//! Error types for timetable-engine operations.

use thiserror::Error;
use uuid::Uuid;

use crate::resolution::ResolutionStatus;

/// Kind of record a [`ScheduleError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Semester,
    Course,
    Teacher,
    Classroom,
    TeachingClass,
    AdministrativeClass,
    Assignment,
    Conflict,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::Semester => "semester",
            ResourceKind::Course => "course",
            ResourceKind::Teacher => "teacher",
            ResourceKind::Classroom => "classroom",
            ResourceKind::TeachingClass => "teaching class",
            ResourceKind::AdministrativeClass => "administrative class",
            ResourceKind::Assignment => "assignment",
            ResourceKind::Conflict => "conflict",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    /// Malformed input rejected before detection runs. Never persisted.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{kind} not found: {uuid}")]
    NotFound { kind: ResourceKind, uuid: Uuid },

    /// A date that cannot be placed on the semester's week grid.
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid transition: conflict is {from:?}, cannot become {to:?}")]
    InvalidTransition {
        from: ResolutionStatus,
        to: ResolutionStatus,
    },

    /// Storage failure. The surrounding write transaction is rolled back.
    #[error("Repository failure: {0}")]
    Repository(String),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScheduleError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ScheduleError::Validation(message.into())
    }

    pub(crate) fn not_found(kind: ResourceKind, uuid: Uuid) -> Self {
        ScheduleError::NotFound { kind, uuid }
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
