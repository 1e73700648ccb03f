//! Per-unit task assignment records and the assignment mutator.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::fields::{Role, TargetType};
use crate::session::Session;
use crate::store::RemoteStore;
use crate::sync::Mutation;
use crate::units;

/// The set of tasks one unit is responsible for.
///
/// At most one record exists per `(target_type, target_id)`; a missing
/// record reads as the empty set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignment {
    pub target_type: TargetType,
    pub target_id: String,
    pub assigned_task_ids: BTreeSet<String>,
}

impl Assignment {
    pub fn empty(target_type: TargetType, target_id: &str) -> Self {
        Assignment {
            target_type,
            target_id: target_id.to_string(),
            assigned_task_ids: BTreeSet::new(),
        }
    }

    /// Deterministic store key for this record.
    pub fn record_key(&self) -> String {
        assignment_key(self.target_type, &self.target_id)
    }
}

pub fn assignment_key(target_type: TargetType, target_id: &str) -> String {
    format!("{}-{}", target_type.as_str(), target_id)
}

impl<S: RemoteStore> Session<S> {
    /// Toggle membership of a task in a unit's assignment set
    /// (headquarters only).
    ///
    /// Creates the record on first assign. Adding a present id or
    /// removing an absent one leaves the set unchanged but still writes;
    /// unassigning when no record exists writes nothing at all.
    /// De-assignment never touches progress records, so completion
    /// history survives a later revocation.
    pub fn set_assignment(
        &mut self,
        target_type: TargetType,
        target_id: &str,
        task_id: &str,
        assigned: bool,
    ) -> Result<(), Error> {
        if self.role != Role::Headquarters {
            return Err(Error::Forbidden);
        }
        if !units::unit_exists(target_type, target_id) {
            return Err(Error::UnknownUnit {
                unit_id: target_id.to_string(),
            });
        }
        self.check_task_class(target_type, task_id)?;

        let current = self.assignment_for(target_type, target_id);
        if current.is_none() && !assigned {
            tracing::debug!("no assignment record for {target_type}-{target_id}, nothing to do");
            return Ok(());
        }
        let mut next = current
            .cloned()
            .unwrap_or_else(|| Assignment::empty(target_type, target_id));
        if assigned {
            next.assigned_task_ids.insert(task_id.to_string());
        } else {
            next.assigned_task_ids.remove(task_id);
        }
        self.apply(Mutation::Assignment(next))
    }

    /// Reject a task id that does not belong to the target class.
    fn check_task_class(&self, target_type: TargetType, task_id: &str) -> Result<(), Error> {
        if self.catalog(target_type).iter().any(|t| t.id == task_id) {
            return Ok(());
        }
        let other = match target_type {
            TargetType::Branch => TargetType::RegionalCouncil,
            TargetType::RegionalCouncil => TargetType::Branch,
        };
        if self.catalog(other).iter().any(|t| t.id == task_id) {
            return Err(Error::ClassMismatch {
                task_id: task_id.to_string(),
                expected: target_type,
                found: other,
            });
        }
        Err(Error::UnknownTask {
            task_id: task_id.to_string(),
        })
    }
}
