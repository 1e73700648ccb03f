//! Error taxonomy for the assignment and progress core.
//!
//! Nothing here is fatal to the process: read failures leave previously
//! loaded state untouched, write failures are rolled back before being
//! surfaced, and invariant violations are rejected before any write.

use std::fmt;

use thiserror::Error;

use crate::fields::TargetType;
use crate::store::StoreError;

/// The remote action a failed write was performing. Surfaced in failure
/// notices so the user knows which action to re-attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    TaskAdd,
    TaskUpdate,
    TaskDelete,
    AssignmentUpdate,
    ProgressUpdate,
}

impl fmt::Display for WriteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteAction::TaskAdd => "task add",
            WriteAction::TaskUpdate => "task update",
            WriteAction::TaskDelete => "task delete",
            WriteAction::AssignmentUpdate => "assignment update",
            WriteAction::ProgressUpdate => "progress update",
        })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// A load or scan failed. Previously loaded state is left as it was.
    #[error("remote read failed: {source}")]
    RemoteRead {
        #[source]
        source: StoreError,
    },

    /// A persist failed after the optimistic update. In-memory state has
    /// already been rolled back to the pre-mutation snapshot; the action
    /// must be re-attempted by the user.
    #[error("{action} was not saved and has been reverted: {source}")]
    RemoteWrite {
        action: WriteAction,
        #[source]
        source: StoreError,
    },

    /// A task was used with a unit of the wrong class.
    #[error("task {task_id} targets {found} units and cannot be assigned to a {expected} unit")]
    ClassMismatch {
        task_id: String,
        expected: TargetType,
        found: TargetType,
    },

    /// The active role is not entitled to this operation.
    #[error("the current role may not perform this action")]
    Forbidden,

    /// A progress transition was requested for a task the unit does not
    /// currently hold.
    #[error("task {task_id} is not assigned to this unit")]
    NotAssigned { task_id: String },

    #[error("unknown unit id {unit_id}")]
    UnknownUnit { unit_id: String },

    #[error("unknown task id {task_id}")]
    UnknownTask { task_id: String },
}
