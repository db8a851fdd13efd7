//! Conflict records and their one-way resolution lifecycle.
//!
//! ```text
//! UNRESOLVED ──resolve(ADJUST_*)──▶ RESOLVED
//!     │
//!     └────────ignore()───────────▶ IGNORED
//! ```
//!
//! Both outcomes are terminal. Records are only ever created by detection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::detector::{ConflictKey, ConflictTime, ConflictType};
use crate::error::{Result, ScheduleError};

/// Default upper bound on [`ConflictQuery::size`].
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionStatus {
    Unresolved,
    Resolved,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionMethod {
    None,
    AdjustFirst,
    AdjustSecond,
    AdjustBoth,
    Ignore,
}

impl ResolutionMethod {
    fn is_adjustment(self) -> bool {
        matches!(
            self,
            ResolutionMethod::AdjustFirst | ResolutionMethod::AdjustSecond | ResolutionMethod::AdjustBoth
        )
    }
}

/// A stored, per-occurrence collision between two assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingConflict {
    pub conflict_uuid: Uuid,
    pub semester_uuid: Uuid,
    pub first_assignment_uuid: Uuid,
    pub second_assignment_uuid: Uuid,
    pub conflict_type: ConflictType,
    pub conflict_time: ConflictTime,
    pub resolution_status: ResolutionStatus,
    pub resolution_method: ResolutionMethod,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
    pub detected_at: DateTime<Utc>,
}

impl SchedulingConflict {
    /// A fresh, unresolved record for a detected key.
    pub fn from_key(key: ConflictKey, conflict_uuid: Uuid, detected_at: DateTime<Utc>) -> Self {
        Self {
            conflict_uuid,
            semester_uuid: key.semester_uuid,
            first_assignment_uuid: key.first_assignment_uuid,
            second_assignment_uuid: key.second_assignment_uuid,
            conflict_type: key.conflict_type,
            conflict_time: key.conflict_time,
            resolution_status: ResolutionStatus::Unresolved,
            resolution_method: ResolutionMethod::None,
            resolved_by: None,
            resolved_at: None,
            resolution_notes: None,
            detected_at,
        }
    }

    pub fn key(&self) -> ConflictKey {
        ConflictKey {
            semester_uuid: self.semester_uuid,
            conflict_time: self.conflict_time,
            first_assignment_uuid: self.first_assignment_uuid,
            second_assignment_uuid: self.second_assignment_uuid,
            conflict_type: self.conflict_type,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        self.resolution_status == ResolutionStatus::Unresolved
    }

    pub fn involves(&self, assignment_uuid: Uuid) -> bool {
        self.first_assignment_uuid == assignment_uuid
            || self.second_assignment_uuid == assignment_uuid
    }

    /// Mark the conflict as fixed by adjusting one or both assignments.
    ///
    /// The caller is expected to have re-verified that the overlap is gone.
    ///
    /// # Errors
    /// `ScheduleError::InvalidTransition` unless the conflict is unresolved;
    /// `ScheduleError::Validation` if `method` is not an `ADJUST_*` method.
    pub fn resolve(
        &mut self,
        method: ResolutionMethod,
        resolved_by: impl Into<String>,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_unresolved(ResolutionStatus::Resolved)?;
        if !method.is_adjustment() {
            return Err(ScheduleError::validation(format!(
                "{:?} is not an adjustment method",
                method
            )));
        }
        self.close(ResolutionStatus::Resolved, method, resolved_by.into(), notes, at);
        Ok(())
    }

    /// Accept the conflict as-is.
    ///
    /// # Errors
    /// `ScheduleError::InvalidTransition` unless the conflict is unresolved.
    pub fn ignore(
        &mut self,
        resolved_by: impl Into<String>,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_unresolved(ResolutionStatus::Ignored)?;
        self.close(
            ResolutionStatus::Ignored,
            ResolutionMethod::Ignore,
            resolved_by.into(),
            notes,
            at,
        );
        Ok(())
    }

    fn ensure_unresolved(&self, to: ResolutionStatus) -> Result<()> {
        if self.is_unresolved() {
            Ok(())
        } else {
            Err(ScheduleError::InvalidTransition {
                from: self.resolution_status,
                to,
            })
        }
    }

    fn close(
        &mut self,
        status: ResolutionStatus,
        method: ResolutionMethod,
        resolved_by: String,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) {
        self.resolution_status = status;
        self.resolution_method = method;
        self.resolved_by = Some(resolved_by);
        self.resolved_at = Some(at);
        self.resolution_notes = notes;
    }
}

/// Paginated conflict listing request. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictQuery {
    pub page: u32,
    pub size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester_uuid: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_type: Option<ConflictType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_status: Option<ResolutionStatus>,
}

impl ConflictQuery {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            semester_uuid: None,
            conflict_type: None,
            resolution_status: None,
        }
    }

    pub fn semester(mut self, semester_uuid: Uuid) -> Self {
        self.semester_uuid = Some(semester_uuid);
        self
    }

    pub fn conflict_type(mut self, conflict_type: ConflictType) -> Self {
        self.conflict_type = Some(conflict_type);
        self
    }

    pub fn status(mut self, status: ResolutionStatus) -> Self {
        self.resolution_status = Some(status);
        self
    }

    pub fn matches(&self, conflict: &SchedulingConflict) -> bool {
        self.semester_uuid.is_none_or(|s| s == conflict.semester_uuid)
            && self.conflict_type.is_none_or(|t| t == conflict.conflict_type)
            && self
                .resolution_status
                .is_none_or(|s| s == conflict.resolution_status)
    }

    fn validate(&self, max_page_size: u32) -> Result<()> {
        if self.page == 0 {
            return Err(ScheduleError::validation("page numbers start at 1"));
        }
        if self.size == 0 || self.size > max_page_size {
            return Err(ScheduleError::validation(format!(
                "page size must be 1-{}, got {}",
                max_page_size, self.size
            )));
        }
        Ok(())
    }
}

/// Unpaginated listing request, always scoped to one semester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleConflictQuery {
    pub semester_uuid: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_status: Option<ResolutionStatus>,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    /// Matching records across all pages.
    pub total: usize,
}

/// Stable listing order: by key, then detection time.
pub fn sort_conflicts(conflicts: &mut [SchedulingConflict]) {
    conflicts.sort_by_key(|c| (c.key(), c.detected_at, c.conflict_uuid));
}

/// Filter, order and slice `conflicts` according to `query`.
///
/// A page past the end is empty, not an error.
///
/// # Errors
/// Returns `ScheduleError::Validation` for page 0 or a size outside
/// `1..=max_page_size`.
pub fn paginate(
    conflicts: impl IntoIterator<Item = SchedulingConflict>,
    query: &ConflictQuery,
    max_page_size: u32,
) -> Result<Page<SchedulingConflict>> {
    query.validate(max_page_size)?;

    let mut matching: Vec<SchedulingConflict> =
        conflicts.into_iter().filter(|c| query.matches(c)).collect();
    sort_conflicts(&mut matching);

    let total = matching.len();
    let offset = (query.page as usize - 1).saturating_mul(query.size as usize);
    let items = matching
        .into_iter()
        .skip(offset)
        .take(query.size as usize)
        .collect();

    Ok(Page {
        items,
        page: query.page,
        size: query.size,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn conflict(n: u128) -> SchedulingConflict {
        let key = ConflictKey::new(
            Uuid::from_u128(1),
            Uuid::from_u128(10),
            Uuid::from_u128(11),
            ConflictTime {
                week: n as u32,
                day: 1,
                period: 1,
            },
            ConflictType::Teacher,
        );
        SchedulingConflict::from_key(
            key,
            Uuid::from_u128(100 + n),
            Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
        )
    }

    #[test]
    fn resolve_requires_adjustment_method() {
        let mut c = conflict(1);
        let at = Utc::now();
        assert!(matches!(
            c.resolve(ResolutionMethod::Ignore, "admin", None, at),
            Err(ScheduleError::Validation(_))
        ));
        assert!(c.is_unresolved());
    }

    #[test]
    fn ignored_conflict_cannot_be_resolved() {
        let mut c = conflict(1);
        let at = Utc::now();
        c.ignore("admin", None, at).unwrap();
        let err = c
            .resolve(ResolutionMethod::AdjustFirst, "admin", None, at)
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidTransition {
                from: ResolutionStatus::Ignored,
                to: ResolutionStatus::Resolved
            }
        ));
    }

    #[test]
    fn page_past_end_is_empty() {
        let all: Vec<_> = (1..=3).map(conflict).collect();
        let page = paginate(all, &ConflictQuery::new(3, 2), DEFAULT_MAX_PAGE_SIZE).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn oversized_page_is_rejected() {
        let query = ConflictQuery::new(1, DEFAULT_MAX_PAGE_SIZE + 1);
        assert!(paginate(Vec::new(), &query, DEFAULT_MAX_PAGE_SIZE).is_err());
    }
}
