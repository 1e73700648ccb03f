//! Task catalog records and bulk-import row coercion.
//!
//! A `Task` belongs to exactly one unit class (`target_type`), fixed at
//! creation. Catalog ids are short strings with a class prefix and a
//! numeric suffix (`task01`, `rc_task03`).

use serde::{Deserialize, Serialize};

use crate::fields::TargetType;

/// One catalog task, assignable per-unit within its target class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sort_order: i64,
    pub target_type: TargetType,
}

/// Keep a catalog in display order. `sort_order` is not required to be
/// unique; ties keep their relative order.
pub fn sort_by_display_order(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| t.sort_order);
}

/// Allocate the next id for a class catalog: the class prefix plus a
/// zero-padded numeric suffix one past the largest currently in use.
pub fn next_task_id(catalog: &[Task], target_type: TargetType) -> String {
    let prefix = match target_type {
        TargetType::Branch => "task",
        TargetType::RegionalCouncil => "rc_task",
    };
    let max = catalog
        .iter()
        .filter_map(|t| {
            let digits: String = t.id.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse::<u64>().ok()
        })
        .max()
        .unwrap_or(0);
    format!("{}{:02}", prefix, max + 1)
}

/// One bulk-import row before validation.
///
/// Imported rows arrive with loose shapes (missing columns, blank ids,
/// non-numeric sort orders); `into_task` coerces them into the strict
/// catalog shape before they reach the write path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskRow {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub sort_order: Option<String>,
}

impl TaskRow {
    pub fn into_task(self, target_type: TargetType, fallback_id: String) -> Task {
        Task {
            id: self
                .id
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(fallback_id),
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            sort_order: self
                .sort_order
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(0),
            target_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, sort_order: i64) -> Task {
        Task {
            id: id.to_string(),
            title: String::new(),
            description: String::new(),
            sort_order,
            target_type: TargetType::Branch,
        }
    }

    #[test]
    fn test_next_task_id() {
        assert_eq!(next_task_id(&[], TargetType::Branch), "task01");
        assert_eq!(next_task_id(&[], TargetType::RegionalCouncil), "rc_task01");
        let catalog = vec![task("task01", 1), task("task07", 2)];
        assert_eq!(next_task_id(&catalog, TargetType::Branch), "task08");
        // Suffixes wider than the pad are carried through.
        let catalog = vec![task("task99", 1)];
        assert_eq!(next_task_id(&catalog, TargetType::Branch), "task100");
    }

    #[test]
    fn test_row_coercion_defaults() {
        let row = TaskRow {
            id: Some("  ".to_string()),
            title: None,
            description: None,
            sort_order: Some("x".to_string()),
        };
        let t = row.into_task(TargetType::Branch, "task05".to_string());
        assert_eq!(t.id, "task05");
        assert_eq!(t.title, "");
        assert_eq!(t.sort_order, 0);
        assert_eq!(t.target_type, TargetType::Branch);
    }

    #[test]
    fn test_display_order_is_stable() {
        let mut catalog = vec![task("b", 2), task("a", 1), task("c", 2)];
        sort_by_display_order(&mut catalog);
        let ids: Vec<&str> = catalog.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
