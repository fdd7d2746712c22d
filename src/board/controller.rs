//! Board state controller.
//!
//! Owns the cached tasks, projects and versions for one organization, the
//! multi-select set, the in-progress drag and the visible columns. Status
//! changes are applied to the cache first and confirmed against the store
//! afterwards; if any confirmation fails the whole cache is re-fetched
//! instead of undoing individual writes.
//!
//! The controller is a cheap `Clone` handle. State sits behind a
//! `std::sync::Mutex` that is never held across an `.await`, so every
//! optimistic rewrite is applied in one critical section.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use flowboard_common::*;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::dashboard::{self, BoardStats};
use super::events::{BoardEvent, EVENT_CHANNEL_CAPACITY, Notice, publish};
use super::filter::{self, BoardColumn, PriorityFilter, TaskFilter, VersionFilter};
use super::prefs::{ColumnSet, ViewPreferences};
use crate::errors::BoardError;

/// First task number handed out in a project with no numbered tasks.
pub const FIRST_TASK_NUMBER: u32 = 101;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardState {
    pub organization_id: Option<String>,
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    pub versions: Vec<Version>,
    pub selected_task_ids: BTreeSet<String>,
    pub active_drag_id: Option<String>,
    pub visible_columns: ColumnSet,
    pub filter: TaskFilter,
    pub loading: bool,
    pub load_error: Option<String>,
    pub pending_delete: Option<String>,
    /// Sequence number of the fetch whose results are currently applied.
    #[serde(skip)]
    applied_fetch: u64,
}

/// Result of a drag or bulk status change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// Dropped outside any column.
    NoTarget,
    /// Nothing needed to change; no request was issued.
    Unchanged,
    /// Every confirmation succeeded.
    Moved {
        task_ids: Vec<String>,
        status: TaskStatus,
    },
    /// At least one confirmation failed; the cache was re-fetched from the
    /// store (unless the controller had been closed).
    Reconciled {
        task_ids: Vec<String>,
        status: TaskStatus,
        error: String,
    },
}

impl MoveOutcome {
    pub fn is_reconciled(&self) -> bool {
        matches!(self, Self::Reconciled { .. })
    }
}

/// Task dialog contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_draft_status")]
    pub status: TaskStatus,
    #[serde(default = "default_draft_priority")]
    pub priority: Priority,
    #[serde(default)]
    pub kind: Option<TaskKind>,
    /// One task is created per project; editing uses the first.
    pub project_ids: Vec<String>,
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    /// Newline-separated image URLs.
    #[serde(default)]
    pub image_urls: String,
}

fn default_draft_status() -> TaskStatus {
    TaskStatus::Ideas
}

fn default_draft_priority() -> Priority {
    Priority::Medium
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, project_ids: Vec<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: default_draft_status(),
            priority: default_draft_priority(),
            kind: None,
            project_ids,
            version_id: None,
            assignee_id: None,
            image_urls: String::new(),
        }
    }

    /// Prefill from an existing task for editing.
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            kind: task.kind,
            project_ids: vec![task.project_id.clone()],
            version_id: task.version_id.clone(),
            assignee_id: task.assignee_id.clone(),
            image_urls: task.images.join("\n"),
        }
    }

    pub fn validate(&self) -> Result<(), BoardError> {
        if self.title.trim().is_empty() {
            return Err(BoardError::Validation("Title is required".to_string()));
        }
        if self.project_ids.is_empty() {
            return Err(BoardError::Validation(
                "Select at least one project".to_string(),
            ));
        }
        Ok(())
    }

    pub fn images(&self) -> Vec<String> {
        self.image_urls
            .lines()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// A version belongs to one project, so it is dropped when the draft
    /// spans several.
    fn effective_version(&self) -> Option<String> {
        if self.project_ids.len() > 1 {
            return None;
        }
        self.version_id
            .clone()
            .filter(|v| !v.trim().is_empty() && v != "none")
    }

    fn description(&self) -> Option<String> {
        self.description.clone().filter(|d| !d.trim().is_empty())
    }
}

/// Next `<PREFIX>-<n>` code for a project: one past the highest numeric
/// suffix among its cached tasks.
pub fn next_task_code(prefix: &str, project_id: &str, tasks: &[Task]) -> String {
    let marker = format!("{}-", prefix);
    let highest = tasks
        .iter()
        .filter(|t| t.project_id == project_id)
        .filter_map(|t| t.code.strip_prefix(&marker)?.parse::<u32>().ok())
        .max();
    let n = highest.map_or(FIRST_TASK_NUMBER, |n| n + 1);
    format!("{}-{}", prefix, n)
}

struct Inner {
    repo: Arc<dyn Repository>,
    prefs: ViewPreferences,
    state: Mutex<BoardState>,
    events: broadcast::Sender<BoardEvent>,
    fetch_seq: AtomicU64,
    closed: AtomicBool,
}

#[derive(Clone)]
pub struct BoardController {
    inner: Arc<Inner>,
}

impl BoardController {
    /// Create a controller for `organization_id` (or all organizations when
    /// `None`). Visible columns are read from preferences immediately; data
    /// is fetched by [`load_all`](Self::load_all).
    pub fn new(
        repo: Arc<dyn Repository>,
        prefs: ViewPreferences,
        organization_id: Option<String>,
    ) -> Self {
        let visible_columns = prefs.columns(organization_id.as_deref());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let state = BoardState {
            organization_id,
            visible_columns,
            loading: true,
            ..BoardState::default()
        };
        Self {
            inner: Arc::new(Inner {
                repo,
                prefs,
                state: Mutex::new(state),
                events,
                fetch_seq: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, BoardState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: BoardEvent) {
        publish(&self.inner.events, event);
    }

    fn notify(&self, notice: Notice) {
        self.emit(BoardEvent::Notice(notice));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.inner.events.subscribe()
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.inner.repo
    }

    pub fn organization_id(&self) -> Option<String> {
        self.state().organization_id.clone()
    }

    /// Detach the controller. Requests already in flight still complete, but
    /// their results are no longer applied.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        tracing::debug!("Board controller closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    // ── Loading ───────────────────────────────────────────────────────

    /// Fetch tasks, projects and versions concurrently and replace the cache.
    /// All three must succeed or nothing is applied.
    pub async fn load_all(&self) -> Result<(), BoardError> {
        let seq = self.inner.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let org = {
            let mut st = self.state();
            st.loading = true;
            st.organization_id.clone()
        };
        let org = org.as_deref();

        let repo = &self.inner.repo;
        let (tasks, projects, versions) = futures::join!(
            repo.list_tasks(org),
            repo.list_projects(org),
            repo.list_versions(org)
        );

        if self.is_closed() {
            return Ok(());
        }

        let fetched = match (tasks, projects, versions) {
            (Ok(t), Ok(p), Ok(v)) => Ok((t, p, v)),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => Err(e),
        };

        let latest = seq == self.inner.fetch_seq.load(Ordering::SeqCst);
        match fetched {
            Ok((tasks, projects, versions)) => {
                let counts = (tasks.len(), projects.len(), versions.len());
                let pruned = {
                    let mut st = self.state();
                    if seq < st.applied_fetch {
                        tracing::debug!(seq, applied = st.applied_fetch, "Discarding stale fetch");
                        return Ok(());
                    }
                    st.applied_fetch = seq;
                    st.tasks = tasks;
                    st.projects = projects;
                    st.versions = versions;
                    st.load_error = None;
                    if latest {
                        st.loading = false;
                    }
                    self.restore_scope(&mut st);
                    Self::prune_selection(&mut st)
                        .then(|| st.selected_task_ids.iter().cloned().collect::<Vec<_>>())
                };
                tracing::info!(
                    tasks = counts.0,
                    projects = counts.1,
                    versions = counts.2,
                    "Board loaded"
                );
                self.emit(BoardEvent::Loaded {
                    tasks: counts.0,
                    projects: counts.1,
                    versions: counts.2,
                });
                if let Some(selected) = pruned {
                    self.emit(BoardEvent::SelectionChanged { selected });
                }
                Ok(())
            }
            Err(e) => {
                {
                    let mut st = self.state();
                    if seq < st.applied_fetch {
                        tracing::debug!(seq, applied = st.applied_fetch, error = %e, "Discarding stale failed fetch");
                        return Ok(());
                    }
                    if latest {
                        st.loading = false;
                    }
                    st.load_error = Some(e.to_string());
                }
                tracing::error!(error = %e, "Failed to load board data");
                self.notify(Notice::error("Failed to load board data"));
                Err(BoardError::Load(e))
            }
        }
    }

    /// Re-apply the current project after a load: the in-memory choice wins,
    /// then the stored one, and either is dropped if the project is gone.
    fn restore_scope(&self, st: &mut BoardState) {
        let wanted = st.filter.project_id.clone().or_else(|| {
            st.organization_id
                .as_deref()
                .and_then(|org| self.inner.prefs.current_project(org))
        });
        st.filter.project_id = wanted.filter(|id| st.projects.iter().any(|p| &p.id == id));
        Self::reset_stale_version_filter(st);
    }

    /// Drop selected ids whose tasks are gone. Returns whether any were.
    fn prune_selection(st: &mut BoardState) -> bool {
        let BoardState {
            tasks,
            selected_task_ids,
            ..
        } = st;
        let before = selected_task_ids.len();
        selected_task_ids.retain(|id| tasks.iter().any(|t| &t.id == id));
        selected_task_ids.len() != before
    }

    fn reset_stale_version_filter(st: &mut BoardState) {
        if let VersionFilter::Only(id) = &st.filter.version {
            let offered = filter::version_options(&st.versions, st.filter.project_id.as_deref())
                .iter()
                .any(|v| &v.id == id);
            if !offered {
                st.filter.version = VersionFilter::All;
            }
        }
    }

    // ── Drag and drop ─────────────────────────────────────────────────

    pub fn begin_drag(&self, task_id: &str) {
        self.state().active_drag_id = Some(task_id.to_string());
    }

    /// Resolve a drop. The move set is the whole selection when the dragged
    /// task is selected, otherwise just the dragged task; tasks already in
    /// the target column are left out. An empty move set issues no request
    /// and leaves the selection alone.
    pub async fn end_drag(&self, task_id: &str, target: Option<TaskStatus>) -> MoveOutcome {
        let (moving, target, cleared) = {
            let mut st = self.state();
            st.active_drag_id = None;

            let Some(target) = target else {
                return MoveOutcome::NoTarget;
            };

            let dragging_selected = st.selected_task_ids.contains(task_id);
            let candidates: Vec<String> = if dragging_selected {
                st.selected_task_ids.iter().cloned().collect()
            } else {
                vec![task_id.to_string()]
            };
            let moving: Vec<String> = candidates
                .into_iter()
                .filter(|id| {
                    st.tasks
                        .iter()
                        .any(|t| &t.id == id && t.status != target)
                })
                .collect();
            if moving.is_empty() {
                return MoveOutcome::Unchanged;
            }

            Self::apply_status(&mut st, &moving, target);
            if dragging_selected {
                st.selected_task_ids.clear();
            }
            (moving, target, dragging_selected)
        };

        tracing::debug!(count = moving.len(), status = %target, "Optimistic move");
        self.emit(BoardEvent::TasksMoved {
            task_ids: moving.clone(),
            status: target,
        });
        if cleared {
            self.emit(BoardEvent::SelectionChanged { selected: vec![] });
        }
        self.confirm(moving, target, None).await
    }

    /// Move every selected task to `status`. The selection is cleared
    /// immediately.
    pub async fn bulk_set_status(&self, status: TaskStatus) -> MoveOutcome {
        let ids = {
            let mut st = self.state();
            if st.selected_task_ids.is_empty() {
                return MoveOutcome::Unchanged;
            }
            let ids: Vec<String> = std::mem::take(&mut st.selected_task_ids)
                .into_iter()
                .collect();
            Self::apply_status(&mut st, &ids, status);
            ids
        };

        self.emit(BoardEvent::TasksMoved {
            task_ids: ids.clone(),
            status,
        });
        self.emit(BoardEvent::SelectionChanged { selected: vec![] });
        self.confirm(ids, status, Some("Tasks updated")).await
    }

    fn apply_status(st: &mut BoardState, ids: &[String], status: TaskStatus) {
        for task in st.tasks.iter_mut().filter(|t| ids.contains(&t.id)) {
            task.status = status;
        }
    }

    /// Issue one status update per task, wait for all of them, and reconcile
    /// from the store if any failed.
    async fn confirm(
        &self,
        ids: Vec<String>,
        status: TaskStatus,
        success: Option<&str>,
    ) -> MoveOutcome {
        let repo = &self.inner.repo;
        let results = join_all(ids.iter().map(|id| repo.update_task_status(id, status))).await;

        let failures: Vec<(&String, StoreError)> = ids
            .iter()
            .zip(results)
            .filter_map(|(id, r)| r.err().map(|e| (id, e)))
            .collect();

        let Some((failed_id, first_error)) = failures.first() else {
            if let Some(message) = success
                && !self.is_closed()
            {
                self.notify(Notice::success(message));
            }
            return MoveOutcome::Moved {
                task_ids: ids,
                status,
            };
        };

        let error = first_error.to_string();
        tracing::warn!(
            failed = failures.len(),
            total = ids.len(),
            task_id = %failed_id,
            error = %error,
            "Status confirmation failed, reconciling"
        );

        if !self.is_closed() {
            if let Err(e) = self.load_all().await {
                tracing::error!(error = %e, "Reconciliation fetch failed");
            }
            self.emit(BoardEvent::Reconciled {
                reason: error.clone(),
            });
            self.notify(Notice::error("Failed to update tasks"));
        }

        MoveOutcome::Reconciled {
            task_ids: ids,
            status,
            error,
        }
    }

    // ── Selection and columns ─────────────────────────────────────────

    /// Returns whether the task is selected afterwards.
    pub fn toggle_select(&self, task_id: &str) -> bool {
        let (selected, now_selected) = {
            let mut st = self.state();
            let now_selected = if st.selected_task_ids.remove(task_id) {
                false
            } else {
                st.selected_task_ids.insert(task_id.to_string());
                true
            };
            (st.selected_task_ids.iter().cloned().collect(), now_selected)
        };
        self.emit(BoardEvent::SelectionChanged { selected });
        now_selected
    }

    pub fn clear_selection(&self) {
        let changed = {
            let mut st = self.state();
            let changed = !st.selected_task_ids.is_empty();
            st.selected_task_ids.clear();
            changed
        };
        if changed {
            self.emit(BoardEvent::SelectionChanged { selected: vec![] });
        }
    }

    /// Show or hide a column and persist the new set. The in-memory set is
    /// updated even if persisting fails.
    pub fn toggle_column(&self, status: TaskStatus) -> Result<ColumnSet, BoardError> {
        let (columns, org) = {
            let mut st = self.state();
            st.visible_columns.toggle(status);
            (st.visible_columns.clone(), st.organization_id.clone())
        };
        self.emit(BoardEvent::ColumnsChanged {
            columns: columns.iter().collect(),
        });
        self.inner
            .prefs
            .save_columns(org.as_deref(), &columns)
            .inspect_err(|e| tracing::warn!(error = %e, "Failed to persist visible columns"))?;
        Ok(columns)
    }

    // ── Delete with confirmation ──────────────────────────────────────

    pub fn request_delete(&self, task_id: &str) -> Result<(), BoardError> {
        let mut st = self.state();
        if !st.tasks.iter().any(|t| t.id == task_id) {
            return Err(BoardError::TaskNotFound {
                reference: task_id.to_string(),
            });
        }
        st.pending_delete = Some(task_id.to_string());
        Ok(())
    }

    pub fn cancel_delete(&self) {
        self.state().pending_delete = None;
    }

    pub fn pending_delete(&self) -> Option<String> {
        self.state().pending_delete.clone()
    }

    /// Delete the task awaiting confirmation. The pending slot is cleared
    /// whatever the outcome; on failure the cache is left untouched.
    pub async fn confirm_delete(&self) -> Result<String, BoardError> {
        let task_id = self
            .state()
            .pending_delete
            .take()
            .ok_or(BoardError::NoPendingDelete)?;

        match self.inner.repo.delete_task(&task_id).await {
            Ok(()) => {
                if self.is_closed() {
                    return Ok(task_id);
                }
                {
                    let mut st = self.state();
                    st.tasks.retain(|t| t.id != task_id);
                    st.selected_task_ids.remove(&task_id);
                }
                tracing::info!(task_id = %task_id, "Task deleted");
                self.emit(BoardEvent::TaskDeleted {
                    task_id: task_id.clone(),
                });
                self.notify(Notice::success("Task deleted successfully"));
                Ok(task_id)
            }
            Err(e) => {
                tracing::warn!(task_id = %task_id, error = %e, "Failed to delete task");
                self.notify(Notice::error("Failed to delete task"));
                Err(BoardError::Confirmation(e))
            }
        }
    }

    /// Request and immediately confirm a delete.
    pub async fn delete_task(&self, task_id: &str) -> Result<String, BoardError> {
        self.request_delete(task_id)?;
        self.confirm_delete().await
    }

    // ── Task dialog ───────────────────────────────────────────────────

    /// Create or update tasks from a dialog draft. Returns the ids of the
    /// saved tasks. Invalid drafts are rejected before any request.
    pub async fn save_task(
        &self,
        draft: TaskDraft,
        editing: Option<&str>,
    ) -> Result<Vec<String>, BoardError> {
        if let Err(e) = draft.validate() {
            self.notify(Notice::error(e.to_string()));
            return Err(e);
        }

        let result = match editing {
            Some(task_id) => self.update_from_draft(task_id, &draft).await,
            None => {
                let org = self.organization_id().ok_or(BoardError::NoOrganization)?;
                self.create_from_draft(&org, &draft).await
            }
        };

        match result {
            Ok(ids) => {
                if let Err(e) = self.load_all().await {
                    tracing::warn!(error = %e, "Reload after save failed");
                }
                self.notify(Notice::success("Task saved"));
                Ok(ids)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to save task");
                self.notify(Notice::error("Failed to save task"));
                Err(BoardError::Confirmation(e))
            }
        }
    }

    async fn update_from_draft(&self, task_id: &str, draft: &TaskDraft) -> StoreResult<Vec<String>> {
        let patch = TaskPatch {
            title: Some(draft.title.trim().to_string()),
            description: Some(draft.description()),
            status: Some(draft.status),
            priority: Some(draft.priority),
            kind: Some(draft.kind),
            project_id: draft.project_ids.first().cloned(),
            version_id: Some(draft.effective_version()),
            assignee_id: Some(draft.assignee_id.clone()),
            images: Some(draft.images()),
        };
        self.inner.repo.update_task(task_id, patch).await?;
        Ok(vec![task_id.to_string()])
    }

    async fn create_from_draft(&self, org: &str, draft: &TaskDraft) -> StoreResult<Vec<String>> {
        let mut project_ids: Vec<&String> = Vec::new();
        for id in &draft.project_ids {
            if !project_ids.contains(&id) {
                project_ids.push(id);
            }
        }

        let payloads: Vec<NewTask> = {
            let st = self.state();
            project_ids
                .iter()
                .map(|pid| NewTask {
                    code: st
                        .projects
                        .iter()
                        .find(|p| &&p.id == pid)
                        .map(|p| next_task_code(&p.prefix, pid, &st.tasks)),
                    project_id: (*pid).clone(),
                    version_id: draft.effective_version(),
                    title: draft.title.trim().to_string(),
                    description: draft.description(),
                    status: draft.status,
                    priority: draft.priority,
                    kind: draft.kind,
                    assignee_id: draft.assignee_id.clone(),
                    images: draft.images(),
                })
                .collect()
        };

        let repo = &self.inner.repo;
        let results = join_all(payloads.into_iter().map(|t| repo.create_task(t, org))).await;
        let mut ids = Vec::new();
        for result in results {
            ids.push(result?.id);
        }
        Ok(ids)
    }

    // ── Filters ───────────────────────────────────────────────────────

    fn update_filter(&self, f: impl FnOnce(&mut BoardState)) {
        let filter = {
            let mut st = self.state();
            f(&mut *st);
            st.filter.clone()
        };
        self.emit(BoardEvent::FilterChanged { filter });
    }

    pub fn set_search(&self, search: impl Into<String>) {
        let search = search.into();
        self.update_filter(|st| st.filter.search = search);
    }

    pub fn set_priority_filter(&self, priority: PriorityFilter) {
        self.update_filter(|st| st.filter.priority = priority);
    }

    pub fn set_version_filter(&self, version: VersionFilter) {
        self.update_filter(|st| st.filter.version = version);
    }

    /// Scope the board to one project (`None` for all) and remember the
    /// choice for this organization.
    pub fn set_current_project(&self, project_id: Option<&str>) -> Result<(), BoardError> {
        let org = {
            let st = self.state();
            if let Some(id) = project_id
                && !st.projects.iter().any(|p| p.id == id)
            {
                return Err(BoardError::Validation(format!("Unknown project: {}", id)));
            }
            st.organization_id.clone()
        };

        self.update_filter(|st| {
            st.filter.project_id = project_id.map(str::to_string);
            Self::reset_stale_version_filter(st);
        });

        if let Some(org) = org {
            self.inner.prefs.save_current_project(&org, project_id)?;
        }
        Ok(())
    }

    // ── Read models ───────────────────────────────────────────────────

    pub fn snapshot(&self) -> BoardState {
        self.state().clone()
    }

    pub fn visible_tasks(&self) -> Vec<Task> {
        let st = self.state();
        st.filter.apply(&st.tasks).into_iter().cloned().collect()
    }

    /// Visible columns in canonical order, each holding its filtered tasks.
    pub fn columns(&self) -> Vec<BoardColumn> {
        let st = self.state();
        let visible = st.filter.apply(&st.tasks);
        filter::group_columns(&st.visible_columns, &visible)
    }

    /// Organization-wide totals; ignores the active filter.
    pub fn stats(&self) -> BoardStats {
        let st = self.state();
        dashboard::board_stats(&st.tasks, &st.versions)
    }

    pub fn visible_columns(&self) -> ColumnSet {
        self.state().visible_columns.clone()
    }

    pub fn version_options(&self) -> Vec<Version> {
        let st = self.state();
        filter::version_options(&st.versions, st.filter.project_id.as_deref())
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn selected(&self) -> Vec<String> {
        self.state().selected_task_ids.iter().cloned().collect()
    }

    pub fn active_drag(&self) -> Option<String> {
        self.state().active_drag_id.clone()
    }

    /// Look a task up by id, or by code ignoring case.
    pub fn find_task(&self, reference: &str) -> Option<Task> {
        let st = self.state();
        st.tasks
            .iter()
            .find(|t| t.id == reference)
            .or_else(|| {
                st.tasks
                    .iter()
                    .find(|t| t.code.eq_ignore_ascii_case(reference))
            })
            .cloned()
    }

    /// Like [`find_task`](Self::find_task) but returns the id or a
    /// `TaskNotFound` error.
    pub fn resolve_task(&self, reference: &str) -> Result<String, BoardError> {
        self.find_task(reference)
            .map(|t| t.id)
            .ok_or_else(|| BoardError::TaskNotFound {
                reference: reference.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::events::NoticeKind;
    use crate::board::prefs::{COLUMNS_KEY, MemoryPreferences, PreferenceStore};
    use crate::board::testing::{FlakyStore, seed};
    use crate::store::sqlite::SqliteStore;
    use std::time::Duration;

    struct Fixture {
        store: Arc<FlakyStore>,
        board: BoardController,
        org: String,
        project: String,
        ids: Vec<String>,
    }

    async fn fixture(tasks: &[(&str, TaskStatus, Priority)]) -> Fixture {
        fixture_with_prefs(tasks, ViewPreferences::in_memory()).await
    }

    async fn fixture_with_prefs(
        tasks: &[(&str, TaskStatus, Priority)],
        prefs: ViewPreferences,
    ) -> Fixture {
        let sqlite = SqliteStore::open_in_memory().unwrap();
        let (org, project, ids) = seed(&sqlite, tasks).await;
        let store = Arc::new(FlakyStore::new(sqlite));
        let board = BoardController::new(store.clone(), prefs, Some(org.clone()));
        board.load_all().await.unwrap();
        Fixture {
            store,
            board,
            org,
            project,
            ids,
        }
    }

    fn two_tasks() -> Vec<(&'static str, TaskStatus, Priority)> {
        vec![
            ("One", TaskStatus::Ideas, Priority::Low),
            ("Two", TaskStatus::Backlog, Priority::High),
        ]
    }

    fn status_of(board: &BoardController, id: &str) -> TaskStatus {
        board.find_task(id).unwrap().status
    }

    fn drain_notices(rx: &mut broadcast::Receiver<BoardEvent>) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let BoardEvent::Notice(n) = event {
                notices.push(n);
            }
        }
        notices
    }

    #[tokio::test]
    async fn test_load_all_populates_state() {
        let fx = fixture(&two_tasks()).await;
        let snap = fx.board.snapshot();
        assert_eq!(snap.tasks.len(), 2);
        assert_eq!(snap.projects.len(), 1);
        assert!(!snap.loading);
        assert!(snap.load_error.is_none());
    }

    #[tokio::test]
    async fn test_drop_on_current_column_is_noop() {
        let fx = fixture(&two_tasks()).await;
        let before = fx.board.snapshot().tasks;

        for _ in 0..3 {
            let outcome = fx.board.end_drag(&fx.ids[0], Some(TaskStatus::Ideas)).await;
            assert_eq!(outcome, MoveOutcome::Unchanged);
        }
        assert_eq!(fx.board.snapshot().tasks, before);
        assert_eq!(fx.store.updates(), 0);
    }

    #[tokio::test]
    async fn test_drop_without_target_aborts() {
        let fx = fixture(&two_tasks()).await;
        fx.board.begin_drag(&fx.ids[0]);
        assert_eq!(fx.board.active_drag().as_deref(), Some(fx.ids[0].as_str()));

        let outcome = fx.board.end_drag(&fx.ids[0], None).await;
        assert_eq!(outcome, MoveOutcome::NoTarget);
        assert!(fx.board.active_drag().is_none());
        assert_eq!(fx.store.updates(), 0);
    }

    #[tokio::test]
    async fn test_single_drag_moves_one_task_and_confirms_once() {
        let fx = fixture(&two_tasks()).await;
        fx.board.begin_drag(&fx.ids[0]);
        let outcome = fx.board.end_drag(&fx.ids[0], Some(TaskStatus::Done)).await;

        assert_eq!(
            outcome,
            MoveOutcome::Moved {
                task_ids: vec![fx.ids[0].clone()],
                status: TaskStatus::Done
            }
        );
        assert_eq!(status_of(&fx.board, &fx.ids[0]), TaskStatus::Done);
        assert_eq!(status_of(&fx.board, &fx.ids[1]), TaskStatus::Backlog);
        assert_eq!(fx.store.updates(), 1);
        assert!(fx.board.active_drag().is_none());
    }

    #[tokio::test]
    async fn test_dragging_unselected_task_keeps_selection() {
        let fx = fixture(&[
            ("One", TaskStatus::Ideas, Priority::Low),
            ("Two", TaskStatus::Ideas, Priority::Low),
            ("Three", TaskStatus::Ideas, Priority::Low),
        ])
        .await;
        fx.board.toggle_select(&fx.ids[1]);
        fx.board.toggle_select(&fx.ids[2]);

        fx.board.end_drag(&fx.ids[0], Some(TaskStatus::Done)).await;

        assert_eq!(status_of(&fx.board, &fx.ids[0]), TaskStatus::Done);
        assert_eq!(status_of(&fx.board, &fx.ids[1]), TaskStatus::Ideas);
        assert_eq!(status_of(&fx.board, &fx.ids[2]), TaskStatus::Ideas);
        assert_eq!(fx.board.selected().len(), 2);
    }

    #[tokio::test]
    async fn test_dragging_selected_task_moves_whole_selection() {
        let fx = fixture(&[
            ("One", TaskStatus::Ideas, Priority::Low),
            ("Two", TaskStatus::Backlog, Priority::Low),
            ("Three", TaskStatus::Done, Priority::Low),
            ("Four", TaskStatus::Ideas, Priority::Low),
        ])
        .await;
        for id in &fx.ids[..3] {
            fx.board.toggle_select(id);
        }

        let outcome = fx.board.end_drag(&fx.ids[0], Some(TaskStatus::Done)).await;

        match outcome {
            MoveOutcome::Moved { task_ids, .. } => {
                assert_eq!(task_ids.len(), 2, "task already in Done is excluded");
                assert!(!task_ids.contains(&fx.ids[2]));
            }
            other => panic!("Expected Moved, got {:?}", other),
        }
        for id in &fx.ids[..3] {
            assert_eq!(status_of(&fx.board, id), TaskStatus::Done);
        }
        assert_eq!(status_of(&fx.board, &fx.ids[3]), TaskStatus::Ideas);
        assert!(fx.board.selected().is_empty());
        assert_eq!(fx.store.updates(), 2);
    }

    #[tokio::test]
    async fn test_noop_multi_select_drag_keeps_selection() {
        let fx = fixture(&[
            ("One", TaskStatus::Done, Priority::Low),
            ("Two", TaskStatus::Done, Priority::Low),
        ])
        .await;
        fx.board.toggle_select(&fx.ids[0]);
        fx.board.toggle_select(&fx.ids[1]);

        let outcome = fx.board.end_drag(&fx.ids[0], Some(TaskStatus::Done)).await;
        assert_eq!(outcome, MoveOutcome::Unchanged);
        assert_eq!(fx.board.selected().len(), 2);
        assert_eq!(fx.store.updates(), 0);
    }

    #[tokio::test]
    async fn test_failed_confirmation_reconciles_from_store() {
        let fx = fixture(&two_tasks()).await;
        let mut rx = fx.board.subscribe();
        fx.store.reject_task_update(&fx.ids[0]);
        let lists_before = fx.store.lists();

        let outcome = fx.board.end_drag(&fx.ids[0], Some(TaskStatus::Done)).await;

        assert!(outcome.is_reconciled());
        assert_eq!(fx.store.lists(), lists_before + 1, "one reconciliation fetch");
        // The update never committed, so the authoritative value is still Ideas.
        assert_eq!(status_of(&fx.board, &fx.ids[0]), TaskStatus::Ideas);

        let notices = drain_notices(&mut rx);
        assert!(notices.iter().any(|n| n.kind == NoticeKind::Error));
    }

    #[tokio::test]
    async fn test_partial_bulk_failure_matches_fresh_fetch() {
        let fx = fixture(&[
            ("One", TaskStatus::Ideas, Priority::Low),
            ("Two", TaskStatus::Ideas, Priority::Low),
            ("Three", TaskStatus::Backlog, Priority::Low),
        ])
        .await;
        for id in &fx.ids {
            fx.board.toggle_select(id);
        }
        fx.store.reject_task_update(&fx.ids[1]);

        let outcome = fx.board.bulk_set_status(TaskStatus::Deployed).await;
        assert!(outcome.is_reconciled());
        assert_eq!(fx.store.updates(), 3, "every request runs to completion");

        let fresh = fx.store.list_tasks(Some(fx.org.as_str())).await.unwrap();
        let mut cached = fx.board.snapshot().tasks;
        let mut fresh_sorted = fresh.clone();
        cached.sort_by(|a, b| a.id.cmp(&b.id));
        fresh_sorted.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(cached, fresh_sorted);
        assert_eq!(status_of(&fx.board, &fx.ids[1]), TaskStatus::Ideas);
        assert_eq!(status_of(&fx.board, &fx.ids[0]), TaskStatus::Deployed);
    }

    #[tokio::test]
    async fn test_bulk_set_status_clears_selection_and_notifies() {
        let fx = fixture(&two_tasks()).await;
        let mut rx = fx.board.subscribe();
        fx.board.toggle_select(&fx.ids[0]);
        fx.board.toggle_select(&fx.ids[1]);

        let outcome = fx.board.bulk_set_status(TaskStatus::CodeReview).await;
        assert!(matches!(outcome, MoveOutcome::Moved { .. }));
        assert!(fx.board.selected().is_empty());
        assert_eq!(status_of(&fx.board, &fx.ids[0]), TaskStatus::CodeReview);
        assert_eq!(status_of(&fx.board, &fx.ids[1]), TaskStatus::CodeReview);

        let notices = drain_notices(&mut rx);
        assert_eq!(notices, vec![Notice::success("Tasks updated")]);
    }

    #[tokio::test]
    async fn test_bulk_with_empty_selection_is_unchanged() {
        let fx = fixture(&two_tasks()).await;
        assert_eq!(
            fx.board.bulk_set_status(TaskStatus::Done).await,
            MoveOutcome::Unchanged
        );
        assert_eq!(fx.store.updates(), 0);
    }

    #[tokio::test]
    async fn test_toggle_select_is_symmetric() {
        let fx = fixture(&two_tasks()).await;
        assert!(fx.board.toggle_select(&fx.ids[0]));
        assert!(!fx.board.toggle_select(&fx.ids[0]));
        assert!(fx.board.selected().is_empty());

        fx.board.toggle_select(&fx.ids[1]);
        fx.board.clear_selection();
        assert!(fx.board.selected().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_column_twice_restores_and_persists() {
        let store = Arc::new(MemoryPreferences::new());
        let prefs = ViewPreferences::new(store.clone(), false);
        let fx = fixture_with_prefs(&two_tasks(), prefs).await;
        let original = fx.board.visible_columns();

        let hidden = fx.board.toggle_column(TaskStatus::Deployed).unwrap();
        assert!(!hidden.contains(TaskStatus::Deployed));
        assert_eq!(
            ColumnSet::from_stored(store.get(COLUMNS_KEY).as_deref()),
            hidden
        );

        let restored = fx.board.toggle_column(TaskStatus::Deployed).unwrap();
        assert_eq!(restored, original);
        assert_eq!(
            ColumnSet::from_stored(store.get(COLUMNS_KEY).as_deref()),
            fx.board.visible_columns()
        );
    }

    #[tokio::test]
    async fn test_empty_stored_columns_fall_back_to_all_on_mount() {
        let store = Arc::new(MemoryPreferences::new());
        store.set(COLUMNS_KEY, "[]").unwrap();
        let prefs = ViewPreferences::new(store, false);
        let fx = fixture_with_prefs(&two_tasks(), prefs).await;
        assert_eq!(fx.board.visible_columns().len(), 6);
        assert_eq!(fx.board.columns().len(), 6);
    }

    #[tokio::test]
    async fn test_hiding_every_column_is_allowed_in_memory() {
        let fx = fixture(&two_tasks()).await;
        for status in TaskStatus::ALL {
            fx.board.toggle_column(status).unwrap();
        }
        assert!(fx.board.visible_columns().is_empty());
        assert!(fx.board.columns().is_empty());
    }

    #[tokio::test]
    async fn test_priority_filter_scenario() {
        let fx = fixture(&two_tasks()).await;
        fx.board.set_search("");
        fx.board.set_priority_filter(PriorityFilter::Only(Priority::High));
        fx.board.set_version_filter(VersionFilter::All);

        let visible = fx.board.visible_tasks();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, fx.ids[1]);
    }

    #[tokio::test]
    async fn test_confirm_delete_removes_exactly_one_task() {
        let fx = fixture(&two_tasks()).await;
        fx.board.request_delete(&fx.ids[0]).unwrap();
        assert_eq!(fx.board.pending_delete().as_deref(), Some(fx.ids[0].as_str()));

        let deleted = fx.board.confirm_delete().await.unwrap();
        assert_eq!(deleted, fx.ids[0]);
        let tasks = fx.board.snapshot().tasks;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, fx.ids[1]);
        assert!(fx.board.pending_delete().is_none());
    }

    #[tokio::test]
    async fn test_failed_delete_leaves_tasks_untouched() {
        let fx = fixture(&two_tasks()).await;
        fx.store.faults.lock().unwrap().reject_deletes = true;
        let before = fx.board.snapshot().tasks;

        let err = fx.board.delete_task(&fx.ids[0]).await.unwrap_err();
        assert!(matches!(err, BoardError::Confirmation(_)));
        assert_eq!(fx.board.snapshot().tasks, before);
        assert!(fx.board.pending_delete().is_none());
    }

    #[tokio::test]
    async fn test_cancel_delete_and_missing_pending() {
        let fx = fixture(&two_tasks()).await;
        fx.board.request_delete(&fx.ids[0]).unwrap();
        fx.board.cancel_delete();
        assert!(matches!(
            fx.board.confirm_delete().await,
            Err(BoardError::NoPendingDelete)
        ));
        assert!(matches!(
            fx.board.request_delete("missing"),
            Err(BoardError::TaskNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_draft_issues_no_request() {
        let fx = fixture(&two_tasks()).await;
        let mut rx = fx.board.subscribe();

        let err = fx
            .board
            .save_task(TaskDraft::new("Untethered", vec![]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));

        let err = fx
            .board
            .save_task(TaskDraft::new("   ", vec![fx.project.clone()]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));

        assert_eq!(fx.store.task_creates.load(Ordering::SeqCst), 0);
        let notices = drain_notices(&mut rx);
        assert_eq!(notices[0].message, "Select at least one project");
    }

    #[tokio::test]
    async fn test_save_task_generates_next_code_and_reloads() {
        let fx = fixture(&two_tasks()).await;
        let mut draft = TaskDraft::new("Heart rate zones", vec![fx.project.clone()]);
        draft.image_urls = "https://img/a.png\n\n  https://img/b.png  \n".into();

        let ids = fx.board.save_task(draft, None).await.unwrap();
        assert_eq!(ids.len(), 1);

        let task = fx.board.find_task(&ids[0]).expect("reloaded after save");
        assert_eq!(task.code, "FIT-103");
        assert_eq!(task.images, vec!["https://img/a.png", "https://img/b.png"]);
        assert_eq!(fx.board.find_task("fit-103").unwrap().id, ids[0]);
    }

    #[tokio::test]
    async fn test_save_task_across_projects_drops_version() {
        let fx = fixture(&two_tasks()).await;
        let second = fx
            .store
            .create_project(
                NewProject {
                    name: "Ozmo".into(),
                    prefix: "OZM".into(),
                    color: "#22c55e".into(),
                },
                &fx.org,
            )
            .await
            .unwrap();
        let version = fx
            .store
            .create_version(
                NewVersion {
                    project_id: fx.project.clone(),
                    name: "v1".into(),
                    status: VersionStatus::Planned,
                    release_date: None,
                    notes: None,
                    owner_id: None,
                },
                &fx.org,
            )
            .await
            .unwrap();
        fx.board.load_all().await.unwrap();

        let mut draft = TaskDraft::new("Shared", vec![fx.project.clone(), second.id.clone()]);
        draft.version_id = Some(version.id.clone());
        let ids = fx.board.save_task(draft, None).await.unwrap();

        assert_eq!(ids.len(), 2);
        for id in &ids {
            assert!(fx.board.find_task(id).unwrap().version_id.is_none());
        }
        let codes: Vec<String> = ids
            .iter()
            .map(|id| fx.board.find_task(id).unwrap().code)
            .collect();
        assert!(codes.contains(&"OZM-101".to_string()));
    }

    #[tokio::test]
    async fn test_edit_task_updates_fields() {
        let fx = fixture(&two_tasks()).await;
        let task = fx.board.find_task(&fx.ids[0]).unwrap();
        let mut draft = TaskDraft::from_task(&task);
        draft.title = "Renamed".into();
        draft.priority = Priority::Critical;

        fx.board.save_task(draft, Some(task.id.as_str())).await.unwrap();
        let updated = fx.board.find_task(&task.id).unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.priority, Priority::Critical);
        assert_eq!(updated.code, task.code);
    }

    #[tokio::test]
    async fn test_create_failure_notifies_without_reload() {
        let fx = fixture(&two_tasks()).await;
        fx.store.faults.lock().unwrap().reject_creates = true;
        let lists_before = fx.store.lists();
        let mut rx = fx.board.subscribe();

        let err = fx
            .board
            .save_task(TaskDraft::new("Nope", vec![fx.project.clone()]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Confirmation(_)));
        assert_eq!(fx.store.lists(), lists_before);
        assert_eq!(drain_notices(&mut rx), vec![Notice::error("Failed to save task")]);
    }

    #[tokio::test]
    async fn test_load_failure_is_reported_and_keeps_cache() {
        let fx = fixture(&two_tasks()).await;
        fx.store.fail_lists.store(true, Ordering::SeqCst);

        let err = fx.board.load_all().await.unwrap_err();
        assert!(matches!(err, BoardError::Load(_)));
        let snap = fx.board.snapshot();
        assert_eq!(snap.tasks.len(), 2);
        assert!(snap.load_error.is_some());
        assert!(!snap.loading);
    }

    #[tokio::test]
    async fn test_stale_fetch_never_overwrites_newer_one() {
        let fx = fixture(&two_tasks()).await;
        fx.store
            .faults
            .lock()
            .unwrap()
            .list_delays
            .extend([Duration::from_millis(200), Duration::ZERO]);

        let slow = {
            let board = fx.board.clone();
            tokio::spawn(async move { board.load_all().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        fx.store
            .inner
            .update_task_status(&fx.ids[0], TaskStatus::Deployed)
            .await
            .unwrap();
        fx.board.load_all().await.unwrap();
        assert_eq!(status_of(&fx.board, &fx.ids[0]), TaskStatus::Deployed);

        slow.await.unwrap().unwrap();
        assert_eq!(status_of(&fx.board, &fx.ids[0]), TaskStatus::Deployed);
    }

    #[tokio::test]
    async fn test_stale_failed_fetch_does_not_report_error() {
        let fx = fixture(&two_tasks()).await;
        {
            let mut faults = fx.store.faults.lock().unwrap();
            faults
                .list_delays
                .extend([Duration::from_millis(200), Duration::ZERO]);
            faults.list_failures.extend([true, false]);
        }
        let mut rx = fx.board.subscribe();

        let slow = {
            let board = fx.board.clone();
            tokio::spawn(async move { board.load_all().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        fx.board.load_all().await.unwrap();

        slow.await.unwrap().unwrap();
        let snap = fx.board.snapshot();
        assert!(snap.load_error.is_none());
        assert!(!snap.loading);
        assert_eq!(snap.tasks.len(), 2);
        assert!(drain_notices(&mut rx).iter().all(|n| !n.is_error()));
    }

    #[tokio::test]
    async fn test_reload_drops_selected_tasks_that_are_gone() {
        let fx = fixture(&two_tasks()).await;
        fx.board.toggle_select(&fx.ids[0]);
        fx.board.toggle_select(&fx.ids[1]);

        fx.store.inner.delete_task(&fx.ids[0]).await.unwrap();
        fx.board.load_all().await.unwrap();
        assert_eq!(fx.board.selected(), vec![fx.ids[1].clone()]);

        let outcome = fx.board.bulk_set_status(TaskStatus::Done).await;
        assert_eq!(
            outcome,
            MoveOutcome::Moved {
                task_ids: vec![fx.ids[1].clone()],
                status: TaskStatus::Done
            }
        );
        assert_eq!(fx.store.updates(), 1);
    }

    #[tokio::test]
    async fn test_changing_project_resets_foreign_version_filter() {
        let fx = fixture(&two_tasks()).await;
        let other = fx
            .store
            .create_project(
                NewProject {
                    name: "Ozmo".into(),
                    prefix: "OZM".into(),
                    color: "#22c55e".into(),
                },
                &fx.org,
            )
            .await
            .unwrap();
        let version = fx
            .store
            .create_version(
                NewVersion {
                    project_id: fx.project.clone(),
                    name: "v1".into(),
                    status: VersionStatus::Planned,
                    release_date: None,
                    notes: None,
                    owner_id: None,
                },
                &fx.org,
            )
            .await
            .unwrap();
        fx.store
            .inner
            .update_task(
                &fx.ids[0],
                TaskPatch {
                    version_id: Some(Some(version.id.clone())),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();
        fx.board.load_all().await.unwrap();

        fx.board.set_current_project(Some(fx.project.as_str())).unwrap();
        fx.board
            .set_version_filter(VersionFilter::Only(version.id.clone()));
        assert_eq!(fx.board.visible_tasks().len(), 1);

        fx.board.set_current_project(Some(other.id.as_str())).unwrap();
        assert_eq!(fx.board.snapshot().filter.version, VersionFilter::All);
        assert!(fx.board.version_options().is_empty());

        fx.board.set_current_project(None).unwrap();
        assert_eq!(fx.board.visible_tasks().len(), 2);
    }

    #[tokio::test]
    async fn test_reload_resets_filter_for_deleted_version() {
        let fx = fixture(&two_tasks()).await;
        let version = fx
            .store
            .create_version(
                NewVersion {
                    project_id: fx.project.clone(),
                    name: "v2".into(),
                    status: VersionStatus::Planned,
                    release_date: None,
                    notes: None,
                    owner_id: None,
                },
                &fx.org,
            )
            .await
            .unwrap();
        fx.board.load_all().await.unwrap();
        fx.board
            .set_version_filter(VersionFilter::Only(version.id.clone()));
        assert!(fx.board.visible_tasks().is_empty());

        fx.store.inner.delete_version(&version.id).await.unwrap();
        fx.board.load_all().await.unwrap();
        assert_eq!(fx.board.snapshot().filter.version, VersionFilter::All);
        assert_eq!(fx.board.visible_tasks().len(), 2);
    }

    #[tokio::test]
    async fn test_stats_ignore_active_filter() {
        let fx = fixture(&[
            ("One", TaskStatus::Done, Priority::Low),
            ("Two", TaskStatus::Deployed, Priority::High),
            ("Three", TaskStatus::Backlog, Priority::High),
        ])
        .await;
        fx.board.set_priority_filter(PriorityFilter::Only(Priority::Low));

        let stats = fx.board.stats();
        assert_eq!(stats.total_tasks, 3);
        assert_eq!(stats.completed_tasks, 2);
        assert_eq!(stats.active_versions, 0);
        assert_eq!(stats.recent_tasks.len(), 3);
    }

    #[tokio::test]
    async fn test_closed_controller_ignores_results() {
        let fx = fixture(&two_tasks()).await;
        fx.store.reject_task_update(&fx.ids[0]);
        let lists_before = fx.store.lists();

        fx.board.begin_drag(&fx.ids[0]);
        fx.board.close();
        let outcome = fx.board.end_drag(&fx.ids[0], Some(TaskStatus::Done)).await;

        assert!(outcome.is_reconciled());
        assert_eq!(fx.store.lists(), lists_before, "no reconciliation after close");
    }

    #[tokio::test]
    async fn test_current_project_is_restored_and_validated() {
        let prefs = ViewPreferences::in_memory();
        let fx = fixture_with_prefs(&two_tasks(), prefs.clone()).await;

        fx.board.set_current_project(Some(fx.project.as_str())).unwrap();
        assert_eq!(prefs.current_project(&fx.org).as_deref(), Some(fx.project.as_str()));
        assert!(fx.board.set_current_project(Some("ghost")).is_err());

        let reopened = BoardController::new(fx.store.clone(), prefs.clone(), Some(fx.org.clone()));
        reopened.load_all().await.unwrap();
        assert_eq!(
            reopened.snapshot().filter.project_id.as_deref(),
            Some(fx.project.as_str())
        );

        prefs.save_current_project(&fx.org, Some("deleted-project")).unwrap();
        let stale = BoardController::new(fx.store.clone(), prefs, Some(fx.org.clone()));
        stale.load_all().await.unwrap();
        assert!(stale.snapshot().filter.project_id.is_none());
    }

    #[test]
    fn test_next_task_code() {
        let mut a = crate::board::filter::tests::task("a", TaskStatus::Ideas, Priority::Low);
        a.code = "FIT-117".into();
        let mut b = crate::board::filter::tests::task("b", TaskStatus::Ideas, Priority::Low);
        b.code = "FIT-draft".into();
        let tasks = vec![a, b];

        assert_eq!(next_task_code("FIT", "p-1", &tasks), "FIT-118");
        assert_eq!(next_task_code("FIT", "p-2", &tasks), "FIT-101");
    }

    #[test]
    fn test_draft_images_and_version_rules() {
        let mut draft = TaskDraft::new("x", vec!["p-1".into(), "p-2".into()]);
        draft.version_id = Some("v-1".into());
        assert!(draft.effective_version().is_none());

        draft.project_ids.pop();
        assert_eq!(draft.effective_version().as_deref(), Some("v-1"));

        draft.version_id = Some("none".into());
        assert!(draft.effective_version().is_none());
    }
}
