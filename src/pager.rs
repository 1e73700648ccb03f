//! Keyset pagination over the full progress set.
//!
//! Used by the headquarters progress table only. The pager is read-only
//! and independent of the session snapshot: it neither merges with nor
//! invalidates the loaded task/assignment state.

use crate::error::Error;
use crate::progress::{Progress, PROGRESS_ORDER};
use crate::store::{decode_rows, RemoteStore, ScanBound, ScanCursor, ScanPage, PROGRESS};

pub const PAGE_SIZE: usize = 20;

/// Forward/backward pager over progress records ordered by
/// `(target_type, target_id)` ascending.
///
/// Each fetch replaces the held page. A page shorter than `PAGE_SIZE`
/// marks the end of the set; `prev` is available only while a first
/// cursor is held.
#[derive(Debug, Default)]
pub struct ProgressPager {
    page: Vec<Progress>,
    first: Option<ScanCursor>,
    last: Option<ScanCursor>,
    last_page: bool,
}

impl ProgressPager {
    pub fn new() -> Self {
        ProgressPager::default()
    }

    pub fn page(&self) -> &[Progress] {
        &self.page
    }

    pub fn has_prev(&self) -> bool {
        self.first.is_some()
    }

    pub fn has_next(&self) -> bool {
        !self.last_page
    }

    /// Load the first page. Also the reset used on a role change.
    /// Returns whether the held page was replaced.
    pub fn initial<S: RemoteStore>(&mut self, store: &S) -> Result<bool, Error> {
        let page = self.fetch(store, ScanBound::First { limit: PAGE_SIZE })?;
        self.commit(page)?;
        Ok(true)
    }

    /// Load the page strictly after the current one. No-op once the end
    /// of the set has been seen.
    pub fn next<S: RemoteStore>(&mut self, store: &S) -> Result<bool, Error> {
        if self.last_page {
            return Ok(false);
        }
        let Some(cursor) = self.last.clone() else {
            return self.initial(store);
        };
        let page = self.fetch(store, ScanBound::After {
            cursor,
            limit: PAGE_SIZE,
        })?;
        if page.rows.is_empty() {
            // The set ended exactly on the page boundary; keep the held
            // page rather than replacing it with an empty one.
            self.last_page = true;
            return Ok(false);
        }
        self.commit(page)?;
        Ok(true)
    }

    /// Load the last `PAGE_SIZE` records strictly before the current
    /// page. No-op when no cursor is held or nothing precedes it.
    pub fn prev<S: RemoteStore>(&mut self, store: &S) -> Result<bool, Error> {
        let Some(cursor) = self.first.clone() else {
            tracing::debug!("prev requested with no prior page cursor");
            return Ok(false);
        };
        let page = self.fetch(store, ScanBound::Before {
            cursor,
            limit: PAGE_SIZE,
        })?;
        if page.rows.is_empty() {
            return Ok(false);
        }
        self.commit(page)?;
        Ok(true)
    }

    fn fetch<S: RemoteStore>(&self, store: &S, bound: ScanBound) -> Result<ScanPage, Error> {
        store
            .scan(PROGRESS, &[], PROGRESS_ORDER, bound)
            .map_err(|source| Error::RemoteRead { source })
    }

    fn commit(&mut self, page: ScanPage) -> Result<(), Error> {
        let rows: Vec<Progress> =
            decode_rows(page.rows).map_err(|source| Error::RemoteRead { source })?;
        self.last_page = rows.len() < PAGE_SIZE;
        self.first = page.first;
        self.last = page.last;
        self.page = rows;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{ProgressStatus, TargetType};
    use crate::store::{FileStore, RemoteStore};

    /// `n` progress records across distinct branch ids, so the ordering
    /// is by zero-padded unit id.
    fn seeded(n: usize) -> FileStore {
        let mut store = FileStore::memory();
        for i in 0..n {
            let record = Progress {
                target_type: TargetType::Branch,
                target_id: format!("{i:03}"),
                task_id: "task01".to_string(),
                status: ProgressStatus::InProgress,
                date: None,
                note: None,
            };
            store
                .upsert(
                    PROGRESS,
                    &record.record_key(),
                    serde_json::to_value(&record).unwrap(),
                    false,
                )
                .unwrap();
        }
        store
    }

    fn unit_ids(pager: &ProgressPager) -> Vec<String> {
        pager.page().iter().map(|p| p.target_id.clone()).collect()
    }

    #[test]
    fn test_walk_covers_everything_once() {
        for n in [0, 1, 20, 45] {
            let store = seeded(n);
            let mut pager = ProgressPager::new();
            pager.initial(&store).unwrap();
            let mut seen = unit_ids(&pager);
            while pager.next(&store).unwrap() {
                seen.extend(unit_ids(&pager));
            }
            let want: Vec<String> = (0..n).map(|i| format!("{i:03}")).collect();
            assert_eq!(seen, want, "walk of {n} records");
            assert!(!pager.has_next());
        }
    }

    #[test]
    fn test_pages_are_fixed_size() {
        let store = seeded(45);
        let mut pager = ProgressPager::new();
        pager.initial(&store).unwrap();
        assert_eq!(pager.page().len(), 20);
        assert!(pager.has_next());
        pager.next(&store).unwrap();
        assert_eq!(pager.page().len(), 20);
        pager.next(&store).unwrap();
        assert_eq!(pager.page().len(), 5);
        assert!(!pager.has_next());
    }

    #[test]
    fn test_prev_without_cursor_is_noop() {
        let store = seeded(45);
        let mut pager = ProgressPager::new();
        assert!(!pager.has_prev());
        assert!(!pager.prev(&store).unwrap());
        assert!(pager.page().is_empty());
    }

    #[test]
    fn test_prev_on_first_page_keeps_page() {
        let store = seeded(45);
        let mut pager = ProgressPager::new();
        pager.initial(&store).unwrap();
        let first = unit_ids(&pager);
        assert!(!pager.prev(&store).unwrap());
        assert_eq!(unit_ids(&pager), first);
    }

    #[test]
    fn test_prev_returns_to_previous_page() {
        let store = seeded(45);
        let mut pager = ProgressPager::new();
        pager.initial(&store).unwrap();
        let first = unit_ids(&pager);
        assert!(pager.next(&store).unwrap());
        assert!(pager.prev(&store).unwrap());
        assert_eq!(unit_ids(&pager), first);
    }

    #[test]
    fn test_initial_resets_after_walk() {
        let store = seeded(45);
        let mut pager = ProgressPager::new();
        pager.initial(&store).unwrap();
        let first = unit_ids(&pager);
        while pager.next(&store).unwrap() {}
        pager.initial(&store).unwrap();
        assert_eq!(unit_ids(&pager), first);
        assert!(pager.has_next());
    }

    #[test]
    fn test_exact_page_boundary_ends_cleanly() {
        let store = seeded(20);
        let mut pager = ProgressPager::new();
        pager.initial(&store).unwrap();
        assert_eq!(pager.page().len(), 20);
        // A full first page doesn't yet know it is the last one; the
        // empty follow-up fetch settles it without dropping the page.
        assert!(pager.has_next());
        assert!(!pager.next(&store).unwrap());
        assert_eq!(pager.page().len(), 20);
        assert!(!pager.has_next());
    }
}
