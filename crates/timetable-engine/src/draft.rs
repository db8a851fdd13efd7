//! An in-progress assignment edit as a plain value.
//!
//! The draft is threaded through calls by value: every edit returns a new
//! draft and invalidates the previous check. Drafts proposed by an assistant
//! or typed in by hand go through the same `check` and `submit` path.

use serde::{Deserialize, Serialize};

use crate::detector::ConflictKey;
use crate::error::{Result, ScheduleError};
use crate::model::AssignmentInput;
use crate::service::{CreateOutcome, SchedulingService};
use crate::store::ScheduleStore;
use crate::timeslot::TimeSlot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingDraft {
    pub input: AssignmentInput,
    /// Conflicts found by the last [`SchedulingDraft::check`].
    #[serde(default)]
    pub conflicts: Vec<ConflictKey>,
    /// Whether `conflicts` reflects the current `input`.
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub acknowledged: bool,
}

impl SchedulingDraft {
    pub fn new(input: AssignmentInput) -> Self {
        Self {
            input,
            conflicts: Vec::new(),
            checked: false,
            acknowledged: false,
        }
    }

    /// Apply an arbitrary edit to the input.
    pub fn edit(mut self, f: impl FnOnce(&mut AssignmentInput)) -> Self {
        f(&mut self.input);
        self.stale()
    }

    pub fn add_time_slot(mut self, slot: TimeSlot) -> Self {
        self.input.class_time.push(slot);
        self.stale()
    }

    /// # Errors
    /// `ScheduleError::Validation` if `index` is out of bounds.
    pub fn remove_time_slot(mut self, index: usize) -> Result<Self> {
        if index >= self.input.class_time.len() {
            return Err(ScheduleError::validation(format!(
                "draft has {} time slots, cannot remove #{}",
                self.input.class_time.len(),
                index
            )));
        }
        self.input.class_time.remove(index);
        Ok(self.stale())
    }

    /// Run detection against the current store contents.
    ///
    /// # Errors
    /// Validation and not-found errors from [`SchedulingService::preview`].
    pub fn check<S: ScheduleStore>(mut self, service: &SchedulingService<S>) -> Result<Self> {
        self.conflicts = service.preview(&self.input)?;
        self.checked = true;
        self.acknowledged = false;
        Ok(self)
    }

    /// Accept the conflicts found by the last check.
    pub fn acknowledge(mut self) -> Self {
        self.acknowledged = true;
        self
    }

    pub fn needs_acknowledgement(&self) -> bool {
        !self.conflicts.is_empty() && !self.acknowledged
    }

    /// Create the assignment.
    ///
    /// Detection runs again inside the write, so the returned conflicts
    /// reflect the store at commit time rather than at check time.
    ///
    /// # Errors
    /// `ScheduleError::Validation` if the draft was never checked or its
    /// conflicts were not acknowledged; otherwise as for
    /// [`SchedulingService::create`].
    pub fn submit<S: ScheduleStore>(
        self,
        service: &SchedulingService<S>,
        actor: &str,
    ) -> Result<CreateOutcome> {
        if !self.checked {
            return Err(ScheduleError::validation("draft must be checked before submit"));
        }
        if self.needs_acknowledgement() {
            return Err(ScheduleError::validation(format!(
                "draft has {} unacknowledged conflicts",
                self.conflicts.len()
            )));
        }
        service.create(self.input, actor)
    }

    fn stale(mut self) -> Self {
        self.conflicts.clear();
        self.checked = false;
        self.acknowledged = false;
        self
    }
}
