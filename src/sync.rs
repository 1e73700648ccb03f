//! The optimistic sync engine: the single write path to the remote
//! store.
//!
//! Every mutation is a full replacement value for one keyed record. The
//! engine applies it in memory first, persists it under the record's
//! deterministic composite key (so a retried write is a harmless
//! upsert), and restores the pre-mutation snapshot if the store does not
//! acknowledge the write. In-memory state is therefore never left
//! reflecting a write the store did not accept. Failed writes are not
//! retried; the user re-attempts the action.

use crate::assignment::Assignment;
use crate::error::{Error, WriteAction};
use crate::fields::{Role, TargetType};
use crate::progress::Progress;
use crate::session::Session;
use crate::store::{RemoteStore, StoreError, ASSIGNMENTS, PROGRESS, TASKS};
use crate::task::{next_task_id, sort_by_display_order, Task, TaskRow};

/// What a task-master change is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Add,
    Update,
    Delete,
}

/// A full replacement value for one keyed record.
#[derive(Debug, Clone)]
pub enum Mutation {
    Task { task: Task, action: TaskAction },
    Assignment(Assignment),
    Progress(Progress),
}

impl<S: RemoteStore> Session<S> {
    /// Create, edit or delete a catalog task (headquarters only).
    ///
    /// Assignment and progress records referencing a deleted task are
    /// left in place; they stop being surfaced, but completion history
    /// is never destroyed.
    pub fn task_change(&mut self, task: Task, action: TaskAction) -> Result<(), Error> {
        if self.role != Role::Headquarters {
            return Err(Error::Forbidden);
        }
        self.apply(Mutation::Task { task, action })
    }

    /// Bulk-import parsed rows into one class catalog: an existing id is
    /// an update, anything else an add. Rows without an id get the next
    /// free catalog id. The first failed write aborts the remainder.
    pub fn import_rows(
        &mut self,
        rows: Vec<TaskRow>,
        target_type: TargetType,
    ) -> Result<(usize, usize), Error> {
        let mut added = 0;
        let mut updated = 0;
        for row in rows {
            let fallback = next_task_id(self.catalog(target_type), target_type);
            let task = row.into_task(target_type, fallback);
            let exists = self.catalog(target_type).iter().any(|t| t.id == task.id);
            let action = if exists {
                TaskAction::Update
            } else {
                TaskAction::Add
            };
            self.task_change(task, action)?;
            if exists {
                updated += 1;
            } else {
                added += 1;
            }
        }
        Ok((added, updated))
    }

    pub(crate) fn apply(&mut self, mutation: Mutation) -> Result<(), Error> {
        match mutation {
            Mutation::Task { task, action } => self.apply_task(task, action),
            Mutation::Assignment(assignment) => self.apply_assignment(assignment),
            Mutation::Progress(progress) => self.apply_progress(progress),
        }
    }

    fn apply_task(&mut self, task: Task, action: TaskAction) -> Result<(), Error> {
        let key = task.id.clone();
        let target_type = task.target_type;
        let snapshot = self
            .catalog(target_type)
            .iter()
            .find(|t| t.id == key)
            .cloned();

        let catalog = self.catalog_mut(target_type);
        catalog.retain(|t| t.id != key);
        if action != TaskAction::Delete {
            catalog.push(task.clone());
            sort_by_display_order(catalog);
        }

        let write = match action {
            TaskAction::Delete => self.store.delete(TASKS, &key),
            _ => serde_json::to_value(&task)
                .map_err(StoreError::from)
                .and_then(|value| self.store.upsert(TASKS, &key, value, false)),
        };
        let action = match action {
            TaskAction::Add => WriteAction::TaskAdd,
            TaskAction::Update => WriteAction::TaskUpdate,
            TaskAction::Delete => WriteAction::TaskDelete,
        };

        if let Err(source) = write {
            let catalog = self.catalog_mut(target_type);
            catalog.retain(|t| t.id != key);
            if let Some(prev) = snapshot {
                catalog.push(prev);
                sort_by_display_order(catalog);
            }
            tracing::warn!("{action} for {key} failed, reverted: {source}");
            return Err(Error::RemoteWrite { action, source });
        }
        Ok(())
    }

    fn apply_assignment(&mut self, assignment: Assignment) -> Result<(), Error> {
        let key = assignment.record_key();
        let target_type = assignment.target_type;
        let target_id = assignment.target_id.clone();
        let snapshot = self.assignment_for(target_type, &target_id).cloned();

        self.assignments
            .retain(|a| !(a.target_type == target_type && a.target_id == target_id));
        self.assignments.push(assignment.clone());

        let write = serde_json::to_value(&assignment)
            .map_err(StoreError::from)
            .and_then(|value| self.store.upsert(ASSIGNMENTS, &key, value, false));

        if let Err(source) = write {
            self.assignments
                .retain(|a| !(a.target_type == target_type && a.target_id == target_id));
            if let Some(prev) = snapshot {
                self.assignments.push(prev);
            }
            tracing::warn!("assignment write for {key} failed, reverted: {source}");
            return Err(Error::RemoteWrite {
                action: WriteAction::AssignmentUpdate,
                source,
            });
        }
        Ok(())
    }

    fn apply_progress(&mut self, progress: Progress) -> Result<(), Error> {
        let key = progress.record_key();
        let target_type = progress.target_type;
        let target_id = progress.target_id.clone();
        let task_id = progress.task_id.clone();
        let snapshot = self.find_progress(target_type, &target_id, &task_id).cloned();

        self.progress.retain(|p| {
            !(p.task_id == task_id && p.target_type == target_type && p.target_id == target_id)
        });
        self.progress.push(progress.clone());

        // Merge on the remote side mirrors the carried-forward fields.
        let write = serde_json::to_value(&progress)
            .map_err(StoreError::from)
            .and_then(|value| self.store.upsert(PROGRESS, &key, value, true));

        if let Err(source) = write {
            self.progress.retain(|p| {
                !(p.task_id == task_id
                    && p.target_type == target_type
                    && p.target_id == target_id)
            });
            if let Some(prev) = snapshot {
                self.progress.push(prev);
            }
            tracing::warn!("progress write for {key} failed, reverted: {source}");
            return Err(Error::RemoteWrite {
                action: WriteAction::ProgressUpdate,
                source,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::ProgressStatus;
    use crate::store::{decode_rows, FileStore, ScanBound, ScanPage};
    use serde_json::Value;
    use std::collections::BTreeSet;
    use std::io;

    fn task(id: &str, target_type: TargetType, sort_order: i64) -> Task {
        Task {
            id: id.to_string(),
            title: format!("title {id}"),
            description: String::new(),
            sort_order,
            target_type,
        }
    }

    fn seeded() -> FileStore {
        let mut hq = Session::new(FileStore::memory(), Role::Headquarters, None).unwrap();
        hq.task_change(task("task01", TargetType::Branch, 1), TaskAction::Add)
            .unwrap();
        hq.task_change(task("task02", TargetType::Branch, 2), TaskAction::Add)
            .unwrap();
        hq.task_change(
            task("rc_task01", TargetType::RegionalCouncil, 1),
            TaskAction::Add,
        )
        .unwrap();
        hq.set_assignment(TargetType::Branch, "11", "task01", true)
            .unwrap();
        hq.into_store()
    }

    /// Store whose reads work and whose writes always fail.
    struct FailingWrites(FileStore);

    fn offline() -> StoreError {
        StoreError::Io(io::Error::new(io::ErrorKind::Other, "remote unavailable"))
    }

    impl RemoteStore for FailingWrites {
        fn get_all(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
            self.0.get_all(collection)
        }
        fn get_one(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
            self.0.get_one(collection, key)
        }
        fn upsert(&mut self, _: &str, _: &str, _: Value, _: bool) -> Result<(), StoreError> {
            Err(offline())
        }
        fn delete(&mut self, _: &str, _: &str) -> Result<(), StoreError> {
            Err(offline())
        }
        fn scan(
            &self,
            collection: &str,
            filters: &[(&str, &str)],
            order_by: &[&str],
            bound: ScanBound,
        ) -> Result<ScanPage, StoreError> {
            self.0.scan(collection, filters, order_by, bound)
        }
    }

    fn ids(assignment: &Assignment) -> Vec<&str> {
        assignment
            .assigned_task_ids
            .iter()
            .map(|s| s.as_str())
            .collect()
    }

    #[test]
    fn test_toggle_round_trip_restores_prior_set() {
        let mut hq = Session::new(seeded(), Role::Headquarters, None).unwrap();
        let before: BTreeSet<String> = hq
            .assignment_for(TargetType::Branch, "11")
            .unwrap()
            .assigned_task_ids
            .clone();
        hq.set_assignment(TargetType::Branch, "11", "task02", true)
            .unwrap();
        assert_eq!(
            ids(hq.assignment_for(TargetType::Branch, "11").unwrap()),
            ["task01", "task02"]
        );
        hq.set_assignment(TargetType::Branch, "11", "task02", false)
            .unwrap();
        assert_eq!(
            hq.assignment_for(TargetType::Branch, "11").unwrap().assigned_task_ids,
            before
        );
        // Still exactly one record for the key.
        let rows = hq.store.get_all(ASSIGNMENTS).unwrap();
        assert_eq!(rows.iter().filter(|(k, _)| k == "branch-11").count(), 1);
    }

    #[test]
    fn test_unassign_without_record_writes_nothing() {
        let mut hq = Session::new(seeded(), Role::Headquarters, None).unwrap();
        hq.set_assignment(TargetType::Branch, "01", "task01", false)
            .unwrap();
        assert!(hq.assignment_for(TargetType::Branch, "01").is_none());
        assert!(hq.store.get_one(ASSIGNMENTS, "branch-01").unwrap().is_none());
    }

    #[test]
    fn test_first_assign_creates_record() {
        let mut hq = Session::new(seeded(), Role::Headquarters, None).unwrap();
        hq.set_assignment(TargetType::RegionalCouncil, "kanto", "rc_task01", true)
            .unwrap();
        assert_eq!(
            ids(hq.assignment_for(TargetType::RegionalCouncil, "kanto").unwrap()),
            ["rc_task01"]
        );
    }

    #[test]
    fn test_cross_class_assignment_rejected() {
        let mut hq = Session::new(seeded(), Role::Headquarters, None).unwrap();
        let err = hq
            .set_assignment(TargetType::Branch, "11", "rc_task01", true)
            .unwrap_err();
        assert!(matches!(err, Error::ClassMismatch { .. }));
        let err = hq
            .set_assignment(TargetType::Branch, "11", "no_such", true)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownTask { .. }));
    }

    #[test]
    fn test_role_gating() {
        let mut branch = Session::new(seeded(), Role::Branch, Some("11".to_string())).unwrap();
        assert!(matches!(
            branch.task_change(task("task09", TargetType::Branch, 9), TaskAction::Add),
            Err(Error::Forbidden)
        ));
        assert!(matches!(
            branch.set_assignment(TargetType::Branch, "11", "task01", true),
            Err(Error::Forbidden)
        ));

        let mut hq = Session::new(branch.into_store(), Role::Headquarters, None).unwrap();
        assert!(matches!(
            hq.set_status("task01", ProgressStatus::Done),
            Err(Error::Forbidden)
        ));
    }

    #[test]
    fn test_failed_write_restores_absence() {
        let store = FailingWrites(seeded());
        let mut branch = Session::new(store, Role::Branch, Some("11".to_string())).unwrap();
        let err = branch.set_status("task01", ProgressStatus::Done).unwrap_err();
        assert!(matches!(
            err,
            Error::RemoteWrite {
                action: WriteAction::ProgressUpdate,
                ..
            }
        ));
        // The brand-new key is gone again, in memory and remotely.
        assert!(branch.find_progress(TargetType::Branch, "11", "task01").is_none());
        assert_eq!(branch.status_of("task01"), ProgressStatus::NotStarted);
        assert!(branch
            .store
            .get_one(PROGRESS, "task01-branch-11")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_failed_write_restores_prior_record() {
        let mut branch =
            Session::new(seeded(), Role::Branch, Some("11".to_string())).unwrap();
        branch.set_status("task01", ProgressStatus::Done).unwrap();
        let before = branch
            .find_progress(TargetType::Branch, "11", "task01")
            .cloned()
            .unwrap();

        let mut branch = Session::new(
            FailingWrites(branch.into_store()),
            Role::Branch,
            Some("11".to_string()),
        )
        .unwrap();
        let err = branch
            .set_status("task01", ProgressStatus::InProgress)
            .unwrap_err();
        assert!(matches!(err, Error::RemoteWrite { .. }));
        assert_eq!(
            branch.find_progress(TargetType::Branch, "11", "task01"),
            Some(&before)
        );
    }

    #[test]
    fn test_failed_task_write_restores_catalog() {
        let mut hq = Session::new(FailingWrites(seeded()), Role::Headquarters, None).unwrap();
        let err = hq
            .task_change(task("task03", TargetType::Branch, 3), TaskAction::Add)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::RemoteWrite {
                action: WriteAction::TaskAdd,
                ..
            }
        ));
        assert_eq!(hq.catalog(TargetType::Branch).len(), 2);

        let mut edited = task("task01", TargetType::Branch, 1);
        edited.title = "renamed".to_string();
        let err = hq.task_change(edited, TaskAction::Update).unwrap_err();
        assert!(matches!(
            err,
            Error::RemoteWrite {
                action: WriteAction::TaskUpdate,
                ..
            }
        ));
        assert_eq!(hq.catalog(TargetType::Branch)[0].title, "title task01");
    }

    #[test]
    fn test_failed_assignment_write_restores_set() {
        let mut hq = Session::new(FailingWrites(seeded()), Role::Headquarters, None).unwrap();
        let err = hq
            .set_assignment(TargetType::Branch, "11", "task02", true)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::RemoteWrite {
                action: WriteAction::AssignmentUpdate,
                ..
            }
        ));
        assert_eq!(
            ids(hq.assignment_for(TargetType::Branch, "11").unwrap()),
            ["task01"]
        );
    }

    #[test]
    fn test_deassign_keeps_completion_history() {
        let mut branch = Session::new(seeded(), Role::Branch, Some("11".to_string())).unwrap();
        branch.set_status("task01", ProgressStatus::Done).unwrap();
        let record = branch
            .find_progress(TargetType::Branch, "11", "task01")
            .cloned()
            .unwrap();

        let mut hq = Session::new(branch.into_store(), Role::Headquarters, None).unwrap();
        hq.set_assignment(TargetType::Branch, "11", "task01", false)
            .unwrap();
        assert!(ids(hq.assignment_for(TargetType::Branch, "11").unwrap()).is_empty());

        let stored: Vec<Progress> = decode_rows(hq.store.get_all(PROGRESS).unwrap()).unwrap();
        assert_eq!(stored, vec![record]);
    }

    #[test]
    fn test_delete_task_keeps_records() {
        let mut branch = Session::new(seeded(), Role::Branch, Some("11".to_string())).unwrap();
        branch.set_status("task01", ProgressStatus::Done).unwrap();

        let mut hq = Session::new(branch.into_store(), Role::Headquarters, None).unwrap();
        hq.task_change(task("task01", TargetType::Branch, 1), TaskAction::Delete)
            .unwrap();
        assert!(hq.store.get_one(TASKS, "task01").unwrap().is_none());
        assert!(hq.store.get_one(PROGRESS, "task01-branch-11").unwrap().is_some());
        // The unit's board no longer offers the task.
        let branch = Session::new(hq.into_store(), Role::Branch, Some("11".to_string())).unwrap();
        assert!(branch.tasks_for_board().is_empty());
    }

    #[test]
    fn test_import_rows_add_and_update() {
        let mut hq = Session::new(seeded(), Role::Headquarters, None).unwrap();
        let rows = vec![
            TaskRow {
                id: Some("task01".to_string()),
                title: Some("renamed".to_string()),
                description: None,
                sort_order: Some("5".to_string()),
            },
            TaskRow {
                id: None,
                title: Some("fresh".to_string()),
                description: None,
                sort_order: None,
            },
        ];
        let (added, updated) = hq.import_rows(rows, TargetType::Branch).unwrap();
        assert_eq!((added, updated), (1, 1));
        let catalog = hq.catalog(TargetType::Branch);
        assert_eq!(catalog.len(), 3);
        // The fresh row got the next free id.
        assert!(catalog.iter().any(|t| t.id == "task03" && t.title == "fresh"));
        assert!(catalog.iter().any(|t| t.id == "task01" && t.title == "renamed"));
    }
}
