//! Roadmap controller: versions per project, shown as a list or grouped by
//! version status.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use flowboard_common::*;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::events::{BoardEvent, EVENT_CHANNEL_CAPACITY, Notice, publish};
use super::prefs::{ViewMode, ViewPreferences};
use crate::errors::BoardError;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapState {
    pub organization_id: Option<String>,
    pub versions: Vec<Version>,
    pub projects: Vec<Project>,
    pub members: Vec<TeamMember>,
    pub loading: bool,
    pub view_mode: ViewMode,
    pub pending_delete: Option<String>,
    #[serde(skip)]
    applied_fetch: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VersionStatusOutcome {
    Unchanged,
    Updated,
    Reconciled { error: String },
}

/// Versions sharing one status, for the board layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionColumn {
    pub status: VersionStatus,
    pub versions: Vec<Version>,
}

/// Version dialog contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDraft {
    pub name: String,
    pub project_id: String,
    #[serde(default = "default_version_status")]
    pub status: VersionStatus,
    /// `YYYY-MM-DD`; blank means no date.
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

fn default_version_status() -> VersionStatus {
    VersionStatus::InDevelopment
}

impl VersionDraft {
    pub fn new(name: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project_id: project_id.into(),
            status: default_version_status(),
            release_date: None,
            notes: None,
            owner_id: None,
        }
    }

    pub fn from_version(version: &Version) -> Self {
        Self {
            name: version.name.clone(),
            project_id: version.project_id.clone(),
            status: version.status,
            release_date: version.release_date.clone(),
            notes: version.notes.clone(),
            owner_id: version.owner_id.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), BoardError> {
        if self.name.trim().is_empty() {
            return Err(BoardError::Validation("Version name is required".to_string()));
        }
        if self.project_id.trim().is_empty() {
            return Err(BoardError::Validation("Project is required".to_string()));
        }
        Ok(())
    }

    fn owner(&self) -> Option<String> {
        self.owner_id
            .clone()
            .filter(|o| !o.trim().is_empty() && o != "none")
    }

    fn notes(&self) -> Option<String> {
        self.notes.clone().filter(|n| !n.trim().is_empty())
    }
}

struct Inner {
    repo: Arc<dyn Repository>,
    prefs: ViewPreferences,
    state: Mutex<RoadmapState>,
    events: broadcast::Sender<BoardEvent>,
    fetch_seq: AtomicU64,
    closed: AtomicBool,
}

#[derive(Clone)]
pub struct RoadmapController {
    inner: Arc<Inner>,
}

impl RoadmapController {
    pub fn new(
        repo: Arc<dyn Repository>,
        prefs: ViewPreferences,
        organization_id: Option<String>,
    ) -> Self {
        let view_mode = prefs.view_mode(organization_id.as_deref());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                repo,
                prefs,
                state: Mutex::new(RoadmapState {
                    organization_id,
                    view_mode,
                    loading: true,
                    ..RoadmapState::default()
                }),
                events,
                fetch_seq: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, RoadmapState> {
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

    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Fetch versions, projects and members concurrently. On failure the
    /// cached state is kept and an error notice is emitted.
    pub async fn load_all(&self) -> Result<(), BoardError> {
        let seq = self.inner.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let org = {
            let mut st = self.state();
            st.loading = true;
            st.organization_id.clone()
        };
        let org = org.as_deref();

        let repo = &self.inner.repo;
        let (versions, projects, members) = futures::join!(
            repo.list_versions(org),
            repo.list_projects(org),
            repo.list_members(org)
        );
        if self.is_closed() {
            return Ok(());
        }

        let latest = seq == self.inner.fetch_seq.load(Ordering::SeqCst);
        match (versions, projects, members) {
            (Ok(versions), Ok(projects), Ok(members)) => {
                let count = versions.len();
                {
                    let mut st = self.state();
                    if seq < st.applied_fetch {
                        return Ok(());
                    }
                    st.applied_fetch = seq;
                    st.versions = versions;
                    st.projects = projects;
                    st.members = members;
                    if latest {
                        st.loading = false;
                    }
                }
                tracing::info!(versions = count, "Roadmap loaded");
                Ok(())
            }
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                {
                    let mut st = self.state();
                    if seq < st.applied_fetch {
                        tracing::debug!(seq, applied = st.applied_fetch, error = %e, "Discarding stale failed fetch");
                        return Ok(());
                    }
                    if latest {
                        st.loading = false;
                    }
                }
                tracing::error!(error = %e, "Failed to load roadmap");
                self.notify(Notice::error("Failed to load roadmap"));
                Err(BoardError::Load(e))
            }
        }
    }

    // ── Read models ───────────────────────────────────────────────────

    pub fn snapshot(&self) -> RoadmapState {
        self.state().clone()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.state().view_mode
    }

    /// Versions of one project, or all when `project_id` is `None`.
    pub fn filtered_versions(&self, project_id: Option<&str>) -> Vec<Version> {
        self.state()
            .versions
            .iter()
            .filter(|v| project_id.is_none_or(|p| v.project_id == p))
            .cloned()
            .collect()
    }

    /// One column per version status, in status order.
    pub fn versions_by_status(&self, project_id: Option<&str>) -> Vec<VersionColumn> {
        let versions = self.filtered_versions(project_id);
        VersionStatus::ALL
            .into_iter()
            .map(|status| VersionColumn {
                status,
                versions: versions
                    .iter()
                    .filter(|v| v.status == status)
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    /// Look a version up by id, or by name ignoring case.
    pub fn find_version(&self, reference: &str) -> Option<Version> {
        let st = self.state();
        st.versions
            .iter()
            .find(|v| v.id == reference)
            .or_else(|| {
                st.versions
                    .iter()
                    .find(|v| v.name.eq_ignore_ascii_case(reference))
            })
            .cloned()
    }

    // ── Mutations ─────────────────────────────────────────────────────

    pub fn set_view_mode(&self, mode: ViewMode) -> Result<(), BoardError> {
        let org = {
            let mut st = self.state();
            st.view_mode = mode;
            st.organization_id.clone()
        };
        self.emit(BoardEvent::ViewModeChanged { mode });
        self.inner.prefs.save_view_mode(org.as_deref(), mode)?;
        Ok(())
    }

    /// Optimistically change a version's status, reconciling from the store
    /// if the update is rejected.
    pub async fn set_version_status(
        &self,
        version_id: &str,
        status: VersionStatus,
    ) -> Result<VersionStatusOutcome, BoardError> {
        {
            let mut st = self.state();
            let version = st
                .versions
                .iter_mut()
                .find(|v| v.id == version_id)
                .ok_or_else(|| BoardError::VersionNotFound {
                    id: version_id.to_string(),
                })?;
            if version.status == status {
                return Ok(VersionStatusOutcome::Unchanged);
            }
            version.status = status;
        }
        self.emit(BoardEvent::VersionStatusChanged {
            version_id: version_id.to_string(),
            status,
        });

        match self
            .inner
            .repo
            .update_version(version_id, VersionPatch::status(status))
            .await
        {
            Ok(()) => {
                if !self.is_closed() {
                    self.notify(Notice::success("Version updated"));
                }
                Ok(VersionStatusOutcome::Updated)
            }
            Err(e) => {
                let error = e.to_string();
                tracing::warn!(version_id, error = %error, "Version status update failed, reconciling");
                if !self.is_closed() {
                    self.notify(Notice::error("Failed to update version"));
                    if let Err(e) = self.load_all().await {
                        tracing::error!(error = %e, "Reconciliation fetch failed");
                    }
                    self.emit(BoardEvent::Reconciled {
                        reason: error.clone(),
                    });
                }
                Ok(VersionStatusOutcome::Reconciled { error })
            }
        }
    }

    /// Create or update a version from a dialog draft. Returns the version id.
    pub async fn save_version(
        &self,
        draft: VersionDraft,
        editing: Option<&str>,
    ) -> Result<String, BoardError> {
        if let Err(e) = draft.validate() {
            self.notify(Notice::error(e.to_string()));
            return Err(e);
        }

        let result = match editing {
            Some(id) => {
                let patch = VersionPatch {
                    project_id: Some(draft.project_id.clone()),
                    name: Some(draft.name.trim().to_string()),
                    status: Some(draft.status),
                    release_date: Some(draft.release_date.clone()),
                    notes: Some(draft.notes()),
                    owner_id: Some(draft.owner()),
                };
                self.inner
                    .repo
                    .update_version(id, patch)
                    .await
                    .map(|()| id.to_string())
            }
            None => {
                let org = self
                    .state()
                    .organization_id
                    .clone()
                    .ok_or(BoardError::NoOrganization)?;
                let version = NewVersion {
                    project_id: draft.project_id.clone(),
                    name: draft.name.trim().to_string(),
                    status: draft.status,
                    release_date: draft.release_date.clone(),
                    notes: draft.notes(),
                    owner_id: draft.owner(),
                };
                self.inner
                    .repo
                    .create_version(version, &org)
                    .await
                    .map(|v| v.id)
            }
        };

        match result {
            Ok(id) => {
                self.notify(Notice::success(if editing.is_some() {
                    "Version updated"
                } else {
                    "Version created"
                }));
                if let Err(e) = self.load_all().await {
                    tracing::warn!(error = %e, "Reload after save failed");
                }
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to save version");
                self.notify(Notice::error(if editing.is_some() {
                    "Failed to update version"
                } else {
                    "Failed to create version"
                }));
                Err(BoardError::Confirmation(e))
            }
        }
    }

    pub fn request_delete(&self, version_id: &str) -> Result<(), BoardError> {
        let mut st = self.state();
        if !st.versions.iter().any(|v| v.id == version_id) {
            return Err(BoardError::VersionNotFound {
                id: version_id.to_string(),
            });
        }
        st.pending_delete = Some(version_id.to_string());
        Ok(())
    }

    pub fn cancel_delete(&self) {
        self.state().pending_delete = None;
    }

    /// Delete the version awaiting confirmation and reload. The pending slot
    /// is cleared whatever the outcome.
    pub async fn confirm_delete(&self) -> Result<String, BoardError> {
        let version_id = self
            .state()
            .pending_delete
            .take()
            .ok_or(BoardError::NoPendingDelete)?;

        match self.inner.repo.delete_version(&version_id).await {
            Ok(()) => {
                self.emit(BoardEvent::VersionDeleted {
                    version_id: version_id.clone(),
                });
                self.notify(Notice::success("Version deleted"));
                if let Err(e) = self.load_all().await {
                    tracing::warn!(error = %e, "Reload after delete failed");
                }
                Ok(version_id)
            }
            Err(e) => {
                tracing::warn!(version_id = %version_id, error = %e, "Failed to delete version");
                self.notify(Notice::error("Failed to delete version"));
                Err(BoardError::Confirmation(e))
            }
        }
    }
}
