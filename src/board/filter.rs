//! Derived board views: which tasks pass the active filter, which versions
//! the version picker offers, and how visible tasks group into columns.
//!
//! Every predicate is independent and the filter is their conjunction, so
//! the order predicates are applied in never changes the result.

use std::fmt;
use std::str::FromStr;

use flowboard_common::{Priority, Task, TaskStatus, Version};
use serde::{Deserialize, Serialize};

use super::prefs::ColumnSet;

/// Sentinel used by front-ends for "no restriction".
pub const ALL: &str = "all";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

impl FromStr for PriorityFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

impl TryFrom<String> for PriorityFilter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PriorityFilter> for String {
    fn from(filter: PriorityFilter) -> Self {
        filter.to_string()
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL),
            Self::Only(p) => f.write_str(p.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VersionFilter {
    #[default]
    All,
    Only(String),
}

impl From<String> for VersionFilter {
    fn from(value: String) -> Self {
        if value == ALL || value.is_empty() {
            Self::All
        } else {
            Self::Only(value)
        }
    }
}

impl From<VersionFilter> for String {
    fn from(filter: VersionFilter) -> Self {
        match filter {
            VersionFilter::All => ALL.to_string(),
            VersionFilter::Only(id) => id,
        }
    }
}

impl From<&str> for VersionFilter {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

/// Active board filter. `project_id == None` means all projects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub project_id: Option<String>,
    pub search: String,
    pub priority: PriorityFilter,
    pub version: VersionFilter,
}

impl TaskFilter {
    pub fn matches_project(&self, task: &Task) -> bool {
        self.project_id
            .as_deref()
            .is_none_or(|project| task.project_id == project)
    }

    /// Case-insensitive substring match on title or code.
    pub fn matches_search(&self, task: &Task) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        task.title.to_lowercase().contains(&needle) || task.code.to_lowercase().contains(&needle)
    }

    pub fn matches_priority(&self, task: &Task) -> bool {
        match self.priority {
            PriorityFilter::All => true,
            PriorityFilter::Only(p) => task.priority == p,
        }
    }

    pub fn matches_version(&self, task: &Task) -> bool {
        match &self.version {
            VersionFilter::All => true,
            VersionFilter::Only(id) => task.version_id.as_deref() == Some(id.as_str()),
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.matches_project(task)
            && self.matches_search(task)
            && self.matches_priority(task)
            && self.matches_version(task)
    }

    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|t| self.matches(t)).collect()
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Versions offered by the version picker for a project scope.
pub fn version_options<'a>(versions: &'a [Version], project_id: Option<&str>) -> Vec<&'a Version> {
    versions
        .iter()
        .filter(|v| project_id.is_none_or(|p| v.project_id == p))
        .collect()
}

/// One rendered board column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub status: TaskStatus,
    pub title: &'static str,
    pub tasks: Vec<Task>,
}

/// Group tasks into the visible columns, in canonical column order. Tasks
/// keep their incoming order within a column.
pub fn group_columns(columns: &ColumnSet, tasks: &[&Task]) -> Vec<BoardColumn> {
    columns
        .iter()
        .map(|status| BoardColumn {
            status,
            title: status.title(),
            tasks: tasks
                .iter()
                .filter(|t| t.status == status)
                .map(|t| (*t).clone())
                .collect(),
        })
        .collect()
}
