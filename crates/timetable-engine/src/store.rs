//! Storage contract the scheduling service runs against.
//!
//! Every mutating service call runs inside a single [`ScheduleStore::write`]
//! closure: the sibling scan, detection, the assignment write and the conflict
//! upsert all see and produce one consistent state. If the closure returns an
//! error nothing it did is kept.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use uuid::Uuid;

use crate::error::{ResourceKind, Result, ScheduleError};
use crate::model::{ClassAssignment, Semester};
use crate::resolution::SchedulingConflict;

/// Read access to stored records.
pub trait StoreView {
    fn semester(&self, semester_uuid: Uuid) -> Result<Option<Semester>>;

    /// Whether a referenced record (course, teacher, ...) exists.
    fn resource_exists(&self, kind: ResourceKind, uuid: Uuid) -> Result<bool>;

    fn assignment(&self, assignment_uuid: Uuid) -> Result<Option<ClassAssignment>>;

    /// All assignments of a semester, optionally leaving one out.
    fn assignments_in_semester(
        &self,
        semester_uuid: Uuid,
        excluding: Option<Uuid>,
    ) -> Result<Vec<ClassAssignment>>;

    fn conflict(&self, conflict_uuid: Uuid) -> Result<Option<SchedulingConflict>>;

    /// Conflict records, optionally restricted to one semester.
    fn conflicts(&self, semester_uuid: Option<Uuid>) -> Result<Vec<SchedulingConflict>>;
}

/// Write access inside a transaction.
pub trait StoreTx: StoreView {
    /// Insert or replace by `assignment_uuid`.
    fn put_assignment(&mut self, assignment: ClassAssignment) -> Result<()>;

    fn remove_assignment(&mut self, assignment_uuid: Uuid) -> Result<Option<ClassAssignment>>;

    /// Insert or replace by `conflict_uuid`.
    fn put_conflict(&mut self, conflict: SchedulingConflict) -> Result<()>;
}

/// A transactional schedule store.
pub trait ScheduleStore: Send + Sync {
    fn read<T>(&self, f: impl FnOnce(&dyn StoreView) -> Result<T>) -> Result<T>;

    /// Run `f` as one serializable transaction. An `Err` from `f` discards
    /// every write it made.
    fn write<T>(&self, f: impl FnOnce(&mut dyn StoreTx) -> Result<T>) -> Result<T>;
}

#[derive(Debug, Clone, Default)]
struct State {
    semesters: HashMap<Uuid, Semester>,
    resources: HashSet<(ResourceKind, Uuid)>,
    assignments: BTreeMap<Uuid, ClassAssignment>,
    conflicts: BTreeMap<Uuid, SchedulingConflict>,
}

impl StoreView for State {
    fn semester(&self, semester_uuid: Uuid) -> Result<Option<Semester>> {
        Ok(self.semesters.get(&semester_uuid).cloned())
    }

    fn resource_exists(&self, kind: ResourceKind, uuid: Uuid) -> Result<bool> {
        Ok(match kind {
            ResourceKind::Semester => self.semesters.contains_key(&uuid),
            ResourceKind::Assignment => self.assignments.contains_key(&uuid),
            ResourceKind::Conflict => self.conflicts.contains_key(&uuid),
            other => self.resources.contains(&(other, uuid)),
        })
    }

    fn assignment(&self, assignment_uuid: Uuid) -> Result<Option<ClassAssignment>> {
        Ok(self.assignments.get(&assignment_uuid).cloned())
    }

    fn assignments_in_semester(
        &self,
        semester_uuid: Uuid,
        excluding: Option<Uuid>,
    ) -> Result<Vec<ClassAssignment>> {
        Ok(self
            .assignments
            .values()
            .filter(|a| a.semester_uuid == semester_uuid)
            .filter(|a| excluding != Some(a.assignment_uuid))
            .cloned()
            .collect())
    }

    fn conflict(&self, conflict_uuid: Uuid) -> Result<Option<SchedulingConflict>> {
        Ok(self.conflicts.get(&conflict_uuid).cloned())
    }

    fn conflicts(&self, semester_uuid: Option<Uuid>) -> Result<Vec<SchedulingConflict>> {
        Ok(self
            .conflicts
            .values()
            .filter(|c| semester_uuid.is_none_or(|s| s == c.semester_uuid))
            .cloned()
            .collect())
    }
}

impl StoreTx for State {
    fn put_assignment(&mut self, assignment: ClassAssignment) -> Result<()> {
        self.assignments.insert(assignment.assignment_uuid, assignment);
        Ok(())
    }

    fn remove_assignment(&mut self, assignment_uuid: Uuid) -> Result<Option<ClassAssignment>> {
        Ok(self.assignments.remove(&assignment_uuid))
    }

    fn put_conflict(&mut self, conflict: SchedulingConflict) -> Result<()> {
        self.conflicts.insert(conflict.conflict_uuid, conflict);
        Ok(())
    }
}

/// Process-local store.
///
/// Writers are serialized by the lock and work on a copy of the state that
/// replaces the live one only when the transaction succeeds.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a semester.
    ///
    /// # Errors
    /// Returns `ScheduleError::Validation` if the semester is malformed.
    pub fn insert_semester(&self, semester: Semester) -> Result<()> {
        semester.validate()?;
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.semesters.insert(semester.semester_uuid, semester);
        Ok(())
    }

    /// Seed a referenced record (course, teacher, classroom, ...).
    ///
    /// # Errors
    /// Returns `ScheduleError::Validation` for kinds the store tracks itself
    /// (semesters, assignments, conflicts).
    pub fn register(&self, kind: ResourceKind, uuid: Uuid) -> Result<()> {
        if matches!(
            kind,
            ResourceKind::Semester | ResourceKind::Assignment | ResourceKind::Conflict
        ) {
            return Err(ScheduleError::validation(format!(
                "{} records cannot be registered directly",
                kind
            )));
        }
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.resources.insert((kind, uuid));
        Ok(())
    }
}

impl ScheduleStore for InMemoryStore {
    fn read<T>(&self, f: impl FnOnce(&dyn StoreView) -> Result<T>) -> Result<T> {
        let state = self.state.read().map_err(|_| poisoned())?;
        f(&*state)
    }

    fn write<T>(&self, f: impl FnOnce(&mut dyn StoreTx) -> Result<T>) -> Result<T> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let mut working = state.clone();
        let out = f(&mut working)?;
        *state = working;
        Ok(out)
    }
}

fn poisoned() -> ScheduleError {
    ScheduleError::Repository("store lock poisoned".to_string())
}
