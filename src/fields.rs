//! Enumerations shared across the assignment and progress core.
//!
//! This module defines the closed vocabularies of the system: the two unit
//! classes a task can target, the three-state completion status, and the
//! login roles. Serde names match the persisted wire format exactly.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// The class of subordinate unit a task or record targets.
///
/// The two classes are disjoint: a task created for one class is never
/// assignable to a unit of the other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Branch,
    RegionalCouncil,
}

impl TargetType {
    /// Wire name, also used inside composite record keys.
    pub fn as_str(self) -> &'static str {
        match self {
            TargetType::Branch => "branch",
            TargetType::RegionalCouncil => "regional_council",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion status of one task for one unit.
///
/// `NotStarted` is the implicit default: a missing progress record reads
/// as `NotStarted` and is never materialized as such.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Done,
}

impl ProgressStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "not_started",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Done => "done",
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login role. Headquarters administers the catalogs and reads all
/// progress; each subordinate role owns exactly one unit class.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Role {
    Headquarters,
    Branch,
    RegionalCouncil,
}

impl Role {
    /// The unit class this role owns, `None` for headquarters.
    pub fn target_type(self) -> Option<TargetType> {
        match self {
            Role::Headquarters => None,
            Role::Branch => Some(TargetType::Branch),
            Role::RegionalCouncil => Some(TargetType::RegionalCouncil),
        }
    }
}

/// Human-readable status label for table output.
pub fn format_status(s: ProgressStatus) -> &'static str {
    match s {
        ProgressStatus::NotStarted => "Not Started",
        ProgressStatus::InProgress => "In Progress",
        ProgressStatus::Done => "Done",
    }
}
