//! Organization summary shown on the dashboard.

use flowboard_common::{Task, TaskStatus, Version, VersionStatus};
use serde::Serialize;

/// How many of the newest tasks the summary carries.
pub const RECENT_TASK_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardStats {
    pub total_tasks: usize,
    /// Tasks in `done` or `deployed`.
    pub completed_tasks: usize,
    /// Versions in development.
    pub active_versions: usize,
    /// Newest first; tasks without a creation time come last.
    pub recent_tasks: Vec<Task>,
}

pub fn board_stats(tasks: &[Task], versions: &[Version]) -> BoardStats {
    let completed_tasks = tasks
        .iter()
        .filter(|t| matches!(t.status, TaskStatus::Done | TaskStatus::Deployed))
        .count();
    let active_versions = versions
        .iter()
        .filter(|v| v.status == VersionStatus::InDevelopment)
        .count();

    let mut recent: Vec<&Task> = tasks.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    BoardStats {
        total_tasks: tasks.len(),
        completed_tasks,
        active_versions,
        recent_tasks: recent
            .into_iter()
            .take(RECENT_TASK_LIMIT)
            .cloned()
            .collect(),
    }
}
