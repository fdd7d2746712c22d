use flowboard_common::{TaskStatus, VersionStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::filter::TaskFilter;
use super::prefs::ViewMode;

/// Capacity of each controller's event channel. Slow subscribers lag and
/// skip events rather than blocking the controller.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// Short user-facing message about the outcome of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: "Success".to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: "Error".to_string(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

/// State changes published by the board and roadmap controllers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BoardEvent {
    /// Authoritative data replaced the cached collections.
    Loaded {
        tasks: usize,
        projects: usize,
        versions: usize,
    },
    /// Optimistic status change applied locally.
    TasksMoved {
        task_ids: Vec<String>,
        status: TaskStatus,
    },
    TaskDeleted {
        task_id: String,
    },
    SelectionChanged {
        selected: Vec<String>,
    },
    ColumnsChanged {
        columns: Vec<TaskStatus>,
    },
    FilterChanged {
        filter: TaskFilter,
    },
    /// A confirmation failed and the cache was re-fetched.
    Reconciled {
        reason: String,
    },
    VersionStatusChanged {
        version_id: String,
        status: VersionStatus,
    },
    VersionDeleted {
        version_id: String,
    },
    ViewModeChanged {
        mode: ViewMode,
    },
    Notice(Notice),
}

/// Publish an event, ignoring the error returned when nobody is subscribed.
pub fn publish(tx: &broadcast::Sender<BoardEvent>, event: BoardEvent) {
    let _ = tx.send(event);
}
