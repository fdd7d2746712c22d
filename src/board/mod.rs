//! Board and roadmap state.
//!
//! | Module | Responsibility |
//! |---|---|
//! | `controller` | Kanban state: drag/drop, multi-select, optimistic moves, reconciliation |
//! | `roadmap` | Version lists and optimistic version status changes |
//! | `dashboard` | Organization summary: totals and recent tasks |
//! | `filter` | Task filter predicates, version options, column grouping |
//! | `prefs` | Persisted view preferences (columns, view mode, current project) |
//! | `events` | Events and notices published to front-ends |

pub mod controller;
pub mod dashboard;
pub mod events;
pub mod filter;
pub mod prefs;
pub mod roadmap;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{BoardController, BoardState, MoveOutcome, TaskDraft};
pub use dashboard::BoardStats;
pub use events::{BoardEvent, Notice, NoticeKind};
pub use filter::{PriorityFilter, TaskFilter, VersionFilter};
pub use prefs::{ColumnSet, FilePreferences, MemoryPreferences, PreferenceStore, ViewMode, ViewPreferences};
pub use roadmap::{RoadmapController, VersionDraft};
