//! Assignment writes with conflict detection, and conflict bookkeeping.
//!
//! Conflicts are advisory: `create` and `update` always persist the assignment
//! and hand back whatever collisions it has. Each write also re-examines the
//! written assignment's unresolved conflicts and closes the ones whose overlap
//! is gone, so stale records do not linger after an edit or delete.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::detector::{self, ConflictKey};
use crate::error::{ResourceKind, Result, ScheduleError};
use crate::model::{AdjustmentRequest, AssignmentInput, ClassAssignment, Semester};
use crate::resolution::{
    self, ConflictQuery, Page, ResolutionMethod, ResolutionStatus, SchedulingConflict,
    SimpleConflictQuery, DEFAULT_MAX_PAGE_SIZE,
};
use crate::store::{ScheduleStore, StoreTx, StoreView};

/// Placeholder identity used for assignments that have not been created yet.
///
/// The nil UUID sorts before every generated one, so a previewed candidate is
/// always the first side of its conflict keys.
pub const DRAFT_ASSIGNMENT_UUID: Uuid = Uuid::nil();

/// Tunables for [`SchedulingService`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Largest page [`SchedulingService::list_conflicts`] will return.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_max_page_size() -> u32 {
    DEFAULT_MAX_PAGE_SIZE
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOutcome {
    pub assignment_uuid: Uuid,
    /// Unresolved conflicts involving the new assignment. Empty if none.
    pub conflicts: Vec<SchedulingConflict>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub assignment_uuid: Uuid,
    /// Every assignment written, the requested one first. Contains the
    /// teaching-class siblings when `adjust_teaching_class` was set.
    pub updated: Vec<Uuid>,
    /// Unresolved conflicts involving the written assignments.
    pub conflicts: Vec<SchedulingConflict>,
    /// `true` when there are conflicts and the caller did not ask to skip the
    /// prompt.
    pub requires_acknowledgement: bool,
    /// Conflicts closed because their overlap no longer exists.
    pub auto_resolved: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub assignment_uuid: Uuid,
    /// Unresolved conflicts closed because one side is gone.
    pub invalidated: Vec<Uuid>,
}

/// The scheduling operations, over any [`ScheduleStore`].
#[derive(Debug)]
pub struct SchedulingService<S> {
    store: S,
    options: EngineOptions,
}

impl<S: ScheduleStore> SchedulingService<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, EngineOptions::default())
    }

    pub fn with_options(store: S, options: EngineOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Assignments of a semester, optionally leaving one out.
    ///
    /// # Errors
    /// `ScheduleError::NotFound` if the semester does not exist.
    pub fn list_by_semester(
        &self,
        semester_uuid: Uuid,
        excluding: Option<Uuid>,
    ) -> Result<Vec<ClassAssignment>> {
        self.store.read(|view| {
            require_semester(view, semester_uuid)?;
            view.assignments_in_semester(semester_uuid, excluding)
        })
    }

    /// Run detection for an assignment that has not been created, without
    /// writing anything. The candidate appears as [`DRAFT_ASSIGNMENT_UUID`].
    ///
    /// # Errors
    /// Validation and not-found errors as for [`SchedulingService::create`].
    pub fn preview(&self, input: &AssignmentInput) -> Result<Vec<ConflictKey>> {
        let candidate = input.clone().into_assignment(DRAFT_ASSIGNMENT_UUID);
        self.store.read(|view| {
            let semester = check_references(view, &candidate)?;
            let others = view.assignments_in_semester(semester.semester_uuid, None)?;
            detector::detect(&candidate, &others, semester.start_date)
        })
    }

    /// Create an assignment and record its conflicts.
    ///
    /// # Errors
    /// - `ScheduleError::NotFound` for an unknown semester or referenced record.
    /// - `ScheduleError::Validation` for malformed slots or roster.
    /// - `ScheduleError::Repository` if the store fails; nothing is written.
    pub fn create(&self, input: AssignmentInput, actor: &str) -> Result<CreateOutcome> {
        let assignment = input.into_assignment(Uuid::now_v7());
        let assignment_uuid = assignment.assignment_uuid;
        let now = Utc::now();

        let conflicts = self.store.write(|tx| {
            let semester = check_references(&*tx, &assignment)?;
            let others = tx.assignments_in_semester(semester.semester_uuid, Some(assignment_uuid))?;
            let keys = detector::detect(&assignment, &others, semester.start_date)?;
            tx.put_assignment(assignment)?;
            record_conflicts(tx, semester.semester_uuid, &keys, now)
        })?;

        tracing::info!(
            assignment = %assignment_uuid,
            actor,
            conflicts = conflicts.len(),
            "assignment created"
        );

        Ok(CreateOutcome {
            assignment_uuid,
            conflicts,
        })
    }

    /// Apply an adjustment, re-detect, and close conflicts that went away.
    ///
    /// With `adjust_teaching_class`, teacher and classroom changes are also
    /// applied to every other assignment of the same teaching class in the
    /// semester; each one is re-checked in the same transaction.
    ///
    /// # Errors
    /// As for [`SchedulingService::create`], plus `NotFound` for an unknown
    /// assignment.
    pub fn update(&self, request: AdjustmentRequest, actor: &str) -> Result<UpdateOutcome> {
        let assignment_uuid = request.assignment_id;
        let now = Utc::now();
        let note = match &request.reason {
            Some(reason) => format!("overlap no longer present after update: {}", reason),
            None => "overlap no longer present after update".to_string(),
        };

        let (updated, conflicts, auto_resolved) = self.store.write(|tx| {
            let current = tx
                .assignment(assignment_uuid)?
                .ok_or_else(|| ScheduleError::not_found(ResourceKind::Assignment, assignment_uuid))?;

            let mut targets = vec![request.adjustments.apply(&current)];
            let staffing = request.adjustments.staffing_only();
            if request.adjust_teaching_class && !staffing.is_empty() {
                let siblings = tx
                    .assignments_in_semester(current.semester_uuid, Some(assignment_uuid))?
                    .into_iter()
                    .filter(|a| a.teaching_class_uuid == current.teaching_class_uuid);
                targets.extend(siblings.map(|sibling| staffing.apply(&sibling)));
            }

            // Reject the whole batch before anything is written.
            let mut semester = None;
            for target in &targets {
                semester = Some(check_references(&*tx, target)?);
            }
            let semester = semester
                .ok_or_else(|| ScheduleError::not_found(ResourceKind::Semester, current.semester_uuid))?;

            let mut updated = Vec::with_capacity(targets.len());
            let mut conflict_ids = Vec::new();
            let mut auto_resolved = Vec::new();
            for target in targets {
                let target_uuid = target.assignment_uuid;
                let others = tx.assignments_in_semester(semester.semester_uuid, Some(target_uuid))?;
                let keys = detector::detect(&target, &others, semester.start_date)?;
                tx.put_assignment(target)?;

                let found = record_conflicts(tx, semester.semester_uuid, &keys, now)?;
                conflict_ids.extend(found.into_iter().map(|c| c.conflict_uuid));
                auto_resolved.extend(close_stale(
                    tx,
                    semester.semester_uuid,
                    target_uuid,
                    &keys,
                    actor,
                    &note,
                    now,
                )?);
                updated.push(target_uuid);
            }

            // A sibling pass may have closed a record an earlier pass found.
            let mut seen = BTreeSet::new();
            let mut conflicts = Vec::new();
            for id in conflict_ids {
                if !seen.insert(id) {
                    continue;
                }
                if let Some(conflict) = tx.conflict(id)? {
                    if conflict.is_unresolved() {
                        conflicts.push(conflict);
                    }
                }
            }
            Ok((updated, conflicts, auto_resolved))
        })?;

        let requires_acknowledgement = !request.ignore_conflicts && !conflicts.is_empty();
        tracing::info!(
            assignment = %assignment_uuid,
            actor,
            written = updated.len(),
            conflicts = conflicts.len(),
            auto_resolved = auto_resolved.len(),
            ignore_conflicts = request.ignore_conflicts,
            "assignment updated"
        );

        Ok(UpdateOutcome {
            assignment_uuid,
            updated,
            conflicts,
            requires_acknowledgement,
            auto_resolved,
        })
    }

    /// Delete an assignment and close every unresolved conflict it was part of.
    ///
    /// There is no separate void state: each invalidated record moves to
    /// `RESOLVED` with `ADJUST_FIRST` or `ADJUST_SECOND` naming the deleted
    /// side, `resolved_by` set to `actor` and the note "assignment deleted".
    /// The record ids are returned in [`DeleteOutcome::invalidated`].
    ///
    /// # Errors
    /// `ScheduleError::NotFound` if the assignment does not exist.
    pub fn delete(&self, assignment_uuid: Uuid, actor: &str) -> Result<DeleteOutcome> {
        let now = Utc::now();
        let invalidated = self.store.write(|tx| {
            let removed = tx
                .remove_assignment(assignment_uuid)?
                .ok_or_else(|| ScheduleError::not_found(ResourceKind::Assignment, assignment_uuid))?;
            close_stale(
                tx,
                removed.semester_uuid,
                assignment_uuid,
                &[],
                actor,
                "assignment deleted",
                now,
            )
        })?;

        tracing::info!(
            assignment = %assignment_uuid,
            actor,
            invalidated = invalidated.len(),
            "assignment deleted"
        );

        Ok(DeleteOutcome {
            assignment_uuid,
            invalidated,
        })
    }

    /// Record that a conflict was fixed by adjusting assignments.
    ///
    /// # Errors
    /// `NotFound`, `InvalidTransition` or `Validation`, see
    /// [`SchedulingConflict::resolve`].
    pub fn resolve_conflict(
        &self,
        conflict_uuid: Uuid,
        method: ResolutionMethod,
        resolved_by: &str,
        notes: Option<String>,
    ) -> Result<SchedulingConflict> {
        let now = Utc::now();
        let conflict = self.store.write(|tx| {
            let mut conflict = require_conflict(&*tx, conflict_uuid)?;
            conflict.resolve(method, resolved_by, notes, now)?;
            tx.put_conflict(conflict.clone())?;
            Ok(conflict)
        })?;
        tracing::info!(conflict = %conflict_uuid, ?method, resolved_by, "conflict resolved");
        Ok(conflict)
    }

    /// Accept a conflict as-is.
    ///
    /// # Errors
    /// `NotFound` or `InvalidTransition`.
    pub fn ignore_conflict(
        &self,
        conflict_uuid: Uuid,
        resolved_by: &str,
        notes: Option<String>,
    ) -> Result<SchedulingConflict> {
        let now = Utc::now();
        let conflict = self.store.write(|tx| {
            let mut conflict = require_conflict(&*tx, conflict_uuid)?;
            conflict.ignore(resolved_by, notes, now)?;
            tx.put_conflict(conflict.clone())?;
            Ok(conflict)
        })?;
        tracing::info!(conflict = %conflict_uuid, resolved_by, "conflict ignored");
        Ok(conflict)
    }

    /// # Errors
    /// `ScheduleError::NotFound` if no such conflict exists.
    pub fn get_conflict(&self, conflict_uuid: Uuid) -> Result<SchedulingConflict> {
        self.store.read(|view| require_conflict(view, conflict_uuid))
    }

    /// Filtered, paginated conflict listing.
    ///
    /// # Errors
    /// `ScheduleError::Validation` for a bad page or size.
    pub fn list_conflicts(&self, query: &ConflictQuery) -> Result<Page<SchedulingConflict>> {
        let conflicts = self.store.read(|view| view.conflicts(query.semester_uuid))?;
        resolution::paginate(conflicts, query, self.options.max_page_size)
    }

    /// Every conflict of a semester, optionally with one status.
    ///
    /// # Errors
    /// `ScheduleError::NotFound` if the semester does not exist.
    pub fn list_conflicts_simple(
        &self,
        query: &SimpleConflictQuery,
    ) -> Result<Vec<SchedulingConflict>> {
        let mut conflicts = self.store.read(|view| {
            require_semester(view, query.semester_uuid)?;
            view.conflicts(Some(query.semester_uuid))
        })?;
        conflicts.retain(|c| query.resolution_status.is_none_or(|s| s == c.resolution_status));
        resolution::sort_conflicts(&mut conflicts);
        Ok(conflicts)
    }
}

fn require_semester<V: StoreView + ?Sized>(view: &V, semester_uuid: Uuid) -> Result<Semester> {
    view.semester(semester_uuid)?
        .ok_or_else(|| ScheduleError::not_found(ResourceKind::Semester, semester_uuid))
}

fn require_conflict<V: StoreView + ?Sized>(
    view: &V,
    conflict_uuid: Uuid,
) -> Result<SchedulingConflict> {
    view.conflict(conflict_uuid)?
        .ok_or_else(|| ScheduleError::not_found(ResourceKind::Conflict, conflict_uuid))
}

/// Resolve the semester, validate the assignment against it, and make sure
/// every referenced record exists.
fn check_references<V: StoreView + ?Sized>(
    view: &V,
    assignment: &ClassAssignment,
) -> Result<Semester> {
    let semester = require_semester(view, assignment.semester_uuid)?;
    assignment.validate(&semester)?;

    let references = [
        (ResourceKind::Course, assignment.course_uuid),
        (ResourceKind::Teacher, assignment.teacher_uuid),
        (ResourceKind::Classroom, assignment.classroom_uuid),
        (ResourceKind::TeachingClass, assignment.teaching_class_uuid),
    ]
    .into_iter()
    .chain(
        assignment
            .roster
            .administrative_classes()
            .iter()
            .map(|&uuid| (ResourceKind::AdministrativeClass, uuid)),
    );
    for (kind, uuid) in references {
        if !view.resource_exists(kind, uuid)? {
            return Err(ScheduleError::not_found(kind, uuid));
        }
    }
    Ok(semester)
}

/// Turn detected keys into records without duplicating existing ones.
///
/// A key with an unresolved record reuses it. A key that was ignored stays
/// ignored. A key whose records are all resolved gets a new record, since the
/// overlap has come back.
fn record_conflicts(
    tx: &mut dyn StoreTx,
    semester_uuid: Uuid,
    keys: &[ConflictKey],
    now: DateTime<Utc>,
) -> Result<Vec<SchedulingConflict>> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let mut existing: HashMap<ConflictKey, Vec<SchedulingConflict>> = HashMap::new();
    for conflict in tx.conflicts(Some(semester_uuid))? {
        existing.entry(conflict.key()).or_default().push(conflict);
    }

    let mut recorded = Vec::with_capacity(keys.len());
    let mut created = 0usize;
    for key in keys {
        let prior = existing.get(key).map(Vec::as_slice).unwrap_or_default();
        if let Some(open) = prior.iter().find(|c| c.is_unresolved()) {
            recorded.push(open.clone());
            continue;
        }
        if prior
            .iter()
            .any(|c| c.resolution_status == ResolutionStatus::Ignored)
        {
            continue;
        }
        let conflict = SchedulingConflict::from_key(*key, Uuid::now_v7(), now);
        tx.put_conflict(conflict.clone())?;
        recorded.push(conflict);
        created += 1;
    }

    tracing::debug!(
        detected = keys.len(),
        created,
        reused = recorded.len() - created,
        "conflict records upserted"
    );
    Ok(recorded)
}

/// Close unresolved conflicts of `assignment_uuid` whose key is not in
/// `still_detected`.
///
/// The method names the side that changed. A record whose pair, type, week
/// and day are still detected at another period is noted as superseded;
/// otherwise `note` is recorded.
fn close_stale(
    tx: &mut dyn StoreTx,
    semester_uuid: Uuid,
    assignment_uuid: Uuid,
    still_detected: &[ConflictKey],
    actor: &str,
    note: &str,
    now: DateTime<Utc>,
) -> Result<Vec<Uuid>> {
    let still: BTreeSet<&ConflictKey> = still_detected.iter().collect();
    let superseding = |stale: &ConflictKey| {
        still_detected.iter().find(|key| {
            key.first_assignment_uuid == stale.first_assignment_uuid
                && key.second_assignment_uuid == stale.second_assignment_uuid
                && key.conflict_type == stale.conflict_type
                && key.conflict_time.week == stale.conflict_time.week
                && key.conflict_time.day == stale.conflict_time.day
        })
    };
    let mut closed = Vec::new();

    for mut conflict in tx.conflicts(Some(semester_uuid))? {
        if !conflict.is_unresolved()
            || !conflict.involves(assignment_uuid)
            || still.contains(&conflict.key())
        {
            continue;
        }
        let method = if conflict.first_assignment_uuid == assignment_uuid {
            ResolutionMethod::AdjustFirst
        } else {
            ResolutionMethod::AdjustSecond
        };
        let record_note = match superseding(&conflict.key()) {
            Some(key) => format!(
                "superseded by overlap re-detected at period {}",
                key.conflict_time.period
            ),
            None => note.to_string(),
        };
        conflict.resolve(method, actor, Some(record_note), now)?;
        closed.push(conflict.conflict_uuid);
        tx.put_conflict(conflict)?;
    }

    if !closed.is_empty() {
        tracing::info!(
            assignment = %assignment_uuid,
            closed = closed.len(),
            note,
            "closed stale conflicts"
        );
    }
    Ok(closed)
}
