//! Per-unit, per-task completion records and the status state machine.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::fields::{ProgressStatus, TargetType};
use crate::session::Session;
use crate::store::RemoteStore;
use crate::sync::Mutation;

/// Sort fields for the full progress ordering.
pub const PROGRESS_ORDER: &[&str] = &["target_type", "target_id"];

/// Completion state of one task for one unit.
///
/// `date` is the completion audit trail: stamped when the task enters
/// `done`, preserved through every later transition, never cleared.
/// `note` is free text carried along with the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub target_type: TargetType,
    pub target_id: String,
    pub task_id: String,
    pub status: ProgressStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Progress {
    /// Deterministic store key for this record.
    pub fn record_key(&self) -> String {
        progress_key(&self.task_id, self.target_type, &self.target_id)
    }
}

pub fn progress_key(task_id: &str, target_type: TargetType, target_id: &str) -> String {
    format!("{}-{}-{}", task_id, target_type.as_str(), target_id)
}

/// Uniform absent-record rule: no record means `not_started`.
pub fn effective_status(record: Option<&Progress>) -> ProgressStatus {
    record.map(|p| p.status).unwrap_or_default()
}

/// Build the record produced by moving `prior` to `status`.
///
/// Any status may move to any other in one step, so an erroneous
/// completion can always be reverted directly. The completion date is
/// stamped exactly when the destination is `done` and carried forward
/// unchanged otherwise.
pub fn transition(
    prior: Option<&Progress>,
    target_type: TargetType,
    target_id: &str,
    task_id: &str,
    status: ProgressStatus,
    today: NaiveDate,
) -> Progress {
    let (date, note) = match prior {
        Some(p) => (p.date, p.note.clone()),
        None => (None, None),
    };
    Progress {
        target_type,
        target_id: target_id.to_string(),
        task_id: task_id.to_string(),
        status,
        date: if status == ProgressStatus::Done {
            Some(today)
        } else {
            date
        },
        note,
    }
}

impl<S: RemoteStore> Session<S> {
    /// Move one of this unit's assigned tasks to a new status
    /// (subordinate roles only, each for its own unit).
    pub fn set_status(&mut self, task_id: &str, status: ProgressStatus) -> Result<(), Error> {
        let Some(target_type) = self.role.target_type() else {
            return Err(Error::Forbidden);
        };
        let Some(target_id) = self.unit_id.clone() else {
            return Err(Error::Forbidden);
        };
        if !self.tasks_for_board().iter().any(|t| t.id == task_id) {
            return Err(Error::NotAssigned {
                task_id: task_id.to_string(),
            });
        }
        let prior = self.find_progress(target_type, &target_id, task_id);
        let next = transition(
            prior,
            target_type,
            &target_id,
            task_id,
            status,
            Local::now().date_naive(),
        );
        self.apply(Mutation::Progress(next))
    }
}
