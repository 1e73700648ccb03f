//! The per-login session: scoped loading and in-memory state.
//!
//! A `Session` owns the remote store handle and the in-memory snapshot
//! for exactly one `(role, unit)` identity. The snapshot is replaced
//! wholesale on every (re)scope so nothing leaks between units; it is
//! never merged.

use crate::assignment::{assignment_key, Assignment};
use crate::error::Error;
use crate::fields::{ProgressStatus, Role, TargetType};
use crate::progress::{effective_status, Progress, PROGRESS_ORDER};
use crate::store::{decode_rows, RemoteStore, ScanBound, StoreError, ASSIGNMENTS, PROGRESS, TASKS};
use crate::task::{sort_by_display_order, Task};
use crate::units;

#[derive(Debug)]
pub struct Session<S> {
    pub(crate) role: Role,
    pub(crate) unit_id: Option<String>,
    pub(crate) store: S,
    pub(crate) branch_tasks: Vec<Task>,
    pub(crate) council_tasks: Vec<Task>,
    pub(crate) assignments: Vec<Assignment>,
    pub(crate) progress: Vec<Progress>,
}

/// One fetched scope, staged before it replaces session state.
#[derive(Default)]
struct Snapshot {
    branch_tasks: Vec<Task>,
    council_tasks: Vec<Task>,
    assignments: Vec<Assignment>,
    progress: Vec<Progress>,
}

fn read_err(source: StoreError) -> Error {
    Error::RemoteRead { source }
}

impl<S: RemoteStore> Session<S> {
    /// Open a session for `role` and load its scope.
    pub fn new(store: S, role: Role, unit_id: Option<String>) -> Result<Session<S>, Error> {
        Self::validate_identity(role, unit_id.as_deref())?;
        let snapshot = Self::fetch_scope(&store, role, unit_id.as_deref())?;
        let mut session = Session {
            role,
            unit_id,
            store,
            branch_tasks: Vec::new(),
            council_tasks: Vec::new(),
            assignments: Vec::new(),
            progress: Vec::new(),
        };
        session.commit(snapshot);
        Ok(session)
    }

    /// Re-scope to a new role/identity. The fetch is staged: a failure
    /// leaves the current state untouched, a success replaces it
    /// wholesale.
    pub fn switch(&mut self, role: Role, unit_id: Option<String>) -> Result<(), Error> {
        Self::validate_identity(role, unit_id.as_deref())?;
        let snapshot = Self::fetch_scope(&self.store, role, unit_id.as_deref())?;
        self.role = role;
        self.unit_id = unit_id;
        self.commit(snapshot);
        Ok(())
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn unit_id(&self) -> Option<&str> {
        self.unit_id.as_deref()
    }

    /// Give the store back, consuming the session.
    pub fn into_store(self) -> S {
        self.store
    }

    fn validate_identity(role: Role, unit_id: Option<&str>) -> Result<(), Error> {
        if let (Some(target_type), Some(unit)) = (role.target_type(), unit_id) {
            if !units::unit_exists(target_type, unit) {
                return Err(Error::UnknownUnit {
                    unit_id: unit.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Fetch exactly what the identity is entitled to see.
    fn fetch_scope(store: &S, role: Role, unit_id: Option<&str>) -> Result<Snapshot, Error> {
        match (role.target_type(), unit_id) {
            // Headquarters: both catalogs and every assignment. Progress
            // is left to the paginated table, the set can be large.
            (None, _) => {
                let (branch_tasks, council_tasks) = Self::fetch_catalogs(store)?;
                let assignments =
                    decode_rows(store.get_all(ASSIGNMENTS).map_err(read_err)?).map_err(read_err)?;
                Ok(Snapshot {
                    branch_tasks,
                    council_tasks,
                    assignments,
                    progress: Vec::new(),
                })
            }
            // Subordinate login without a unit picked yet.
            (Some(_), None) => Ok(Snapshot::default()),
            // Subordinate unit: its one assignment record, its class
            // catalog narrowed to the assigned ids, its own progress.
            (Some(target_type), Some(unit)) => {
                let key = assignment_key(target_type, unit);
                let assignment = match store.get_one(ASSIGNMENTS, &key).map_err(read_err)? {
                    Some(value) => {
                        serde_json::from_value(value).map_err(|e| read_err(e.into()))?
                    }
                    None => Assignment::empty(target_type, unit),
                };
                let (branch_tasks, council_tasks) = Self::fetch_catalogs(store)?;
                let mut tasks = match target_type {
                    TargetType::Branch => branch_tasks,
                    TargetType::RegionalCouncil => council_tasks,
                };
                tasks.retain(|t| assignment.assigned_task_ids.contains(&t.id));
                let page = store
                    .scan(
                        PROGRESS,
                        &[
                            ("target_type", target_type.as_str()),
                            ("target_id", unit),
                        ],
                        PROGRESS_ORDER,
                        ScanBound::All,
                    )
                    .map_err(read_err)?;
                let progress = decode_rows(page.rows).map_err(read_err)?;
                let (branch_tasks, council_tasks) = match target_type {
                    TargetType::Branch => (tasks, Vec::new()),
                    TargetType::RegionalCouncil => (Vec::new(), tasks),
                };
                Ok(Snapshot {
                    branch_tasks,
                    council_tasks,
                    assignments: vec![assignment],
                    progress,
                })
            }
        }
    }

    fn fetch_catalogs(store: &S) -> Result<(Vec<Task>, Vec<Task>), Error> {
        let tasks: Vec<Task> =
            decode_rows(store.get_all(TASKS).map_err(read_err)?).map_err(read_err)?;
        let (mut branch, mut council): (Vec<Task>, Vec<Task>) = tasks
            .into_iter()
            .partition(|t| t.target_type == TargetType::Branch);
        sort_by_display_order(&mut branch);
        sort_by_display_order(&mut council);
        Ok((branch, council))
    }

    fn commit(&mut self, snapshot: Snapshot) {
        self.branch_tasks = snapshot.branch_tasks;
        self.council_tasks = snapshot.council_tasks;
        self.assignments = snapshot.assignments;
        self.progress = snapshot.progress;
        tracing::debug!(
            "scope loaded: {} branch tasks, {} council tasks, {} assignments, {} progress records",
            self.branch_tasks.len(),
            self.council_tasks.len(),
            self.assignments.len(),
            self.progress.len()
        );
    }

    pub fn catalog(&self, target_type: TargetType) -> &[Task] {
        match target_type {
            TargetType::Branch => &self.branch_tasks,
            TargetType::RegionalCouncil => &self.council_tasks,
        }
    }

    pub(crate) fn catalog_mut(&mut self, target_type: TargetType) -> &mut Vec<Task> {
        match target_type {
            TargetType::Branch => &mut self.branch_tasks,
            TargetType::RegionalCouncil => &mut self.council_tasks,
        }
    }

    /// The unit's board: its assigned tasks, in display order. Empty for
    /// headquarters and for units with no assignment record.
    pub fn tasks_for_board(&self) -> &[Task] {
        match self.role.target_type() {
            Some(target_type) if self.unit_id.is_some() => self.catalog(target_type),
            _ => &[],
        }
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn assignment_for(&self, target_type: TargetType, target_id: &str) -> Option<&Assignment> {
        self.assignments
            .iter()
            .find(|a| a.target_type == target_type && a.target_id == target_id)
    }

    pub fn find_progress(
        &self,
        target_type: TargetType,
        target_id: &str,
        task_id: &str,
    ) -> Option<&Progress> {
        self.progress.iter().find(|p| {
            p.task_id == task_id && p.target_type == target_type && p.target_id == target_id
        })
    }

    /// Status of one of this unit's tasks, absent record included.
    pub fn status_of(&self, task_id: &str) -> ProgressStatus {
        match (self.role.target_type(), self.unit_id.as_deref()) {
            (Some(target_type), Some(unit)) => {
                effective_status(self.find_progress(target_type, unit, task_id))
            }
            _ => ProgressStatus::NotStarted,
        }
    }

    /// `(done, assigned)` counts for the unit's board.
    pub fn completion(&self) -> (usize, usize) {
        let total = self.tasks_for_board().len();
        let done = self
            .tasks_for_board()
            .iter()
            .filter(|t| self.status_of(&t.id) == ProgressStatus::Done)
            .count();
        (done, total)
    }
}
