//! Test double wrapping an in-memory `SqliteStore` with injectable failures,
//! delays and call counters.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use flowboard_common::*;

use crate::store::sqlite::SqliteStore;

#[derive(Default)]
pub struct Faults {
    /// Task ids whose status updates are rejected without committing.
    pub reject_task_updates: HashSet<String>,
    pub reject_version_updates: HashSet<String>,
    pub reject_deletes: bool,
    pub reject_creates: bool,
    /// Delays applied to successive `list_tasks` calls.
    pub list_delays: VecDeque<Duration>,
    /// Per-call failure flags for successive `list_tasks` and
    /// `list_versions` calls; a failing call still waits out its delay.
    pub list_failures: VecDeque<bool>,
    pub version_list_failures: VecDeque<bool>,
    pub version_list_delays: VecDeque<Duration>,
}

pub struct FlakyStore {
    pub inner: SqliteStore,
    pub faults: Mutex<Faults>,
    pub fail_lists: AtomicBool,
    pub task_updates: AtomicUsize,
    pub task_lists: AtomicUsize,
    pub task_creates: AtomicUsize,
    pub version_updates: AtomicUsize,
}

fn rejected() -> StoreError {
    StoreError::Api {
        status: 500,
        code: None,
        message: "injected failure".to_string(),
    }
}

impl FlakyStore {
    pub fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            faults: Mutex::new(Faults::default()),
            fail_lists: AtomicBool::new(false),
            task_updates: AtomicUsize::new(0),
            task_lists: AtomicUsize::new(0),
            task_creates: AtomicUsize::new(0),
            version_updates: AtomicUsize::new(0),
        }
    }

    pub fn reject_task_update(&self, id: &str) {
        self.faults
            .lock()
            .unwrap()
            .reject_task_updates
            .insert(id.to_string());
    }

    pub fn updates(&self) -> usize {
        self.task_updates.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.task_lists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Repository for FlakyStore {
    async fn list_organizations(&self) -> StoreResult<Vec<Organization>> {
        self.inner.list_organizations().await
    }

    async fn create_organization(&self, org: NewOrganization) -> StoreResult<Organization> {
        self.inner.create_organization(org).await
    }

    async fn list_projects(&self, org_id: Option<&str>) -> StoreResult<Vec<Project>> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(rejected());
        }
        self.inner.list_projects(org_id).await
    }

    async fn create_project(&self, project: NewProject, org_id: &str) -> StoreResult<Project> {
        self.inner.create_project(project, org_id).await
    }

    async fn update_project(&self, id: &str, patch: ProjectPatch) -> StoreResult<()> {
        self.inner.update_project(id, patch).await
    }

    async fn delete_project(&self, id: &str) -> StoreResult<()> {
        self.inner.delete_project(id).await
    }

    async fn list_versions(&self, org_id: Option<&str>) -> StoreResult<Vec<Version>> {
        let (delay, fail) = {
            let mut faults = self.faults.lock().unwrap();
            (
                faults.version_list_delays.pop_front(),
                faults.version_list_failures.pop_front().unwrap_or(false),
            )
        };
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(rejected());
        }
        let versions = self.inner.list_versions(org_id).await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(rejected());
        }
        versions
    }

    async fn create_version(&self, version: NewVersion, org_id: &str) -> StoreResult<Version> {
        if self.faults.lock().unwrap().reject_creates {
            return Err(rejected());
        }
        self.inner.create_version(version, org_id).await
    }

    async fn update_version(&self, id: &str, patch: VersionPatch) -> StoreResult<()> {
        self.version_updates.fetch_add(1, Ordering::SeqCst);
        if self.faults.lock().unwrap().reject_version_updates.contains(id) {
            return Err(rejected());
        }
        self.inner.update_version(id, patch).await
    }

    async fn delete_version(&self, id: &str) -> StoreResult<()> {
        if self.faults.lock().unwrap().reject_deletes {
            return Err(rejected());
        }
        self.inner.delete_version(id).await
    }

    async fn list_tasks(&self, org_id: Option<&str>) -> StoreResult<Vec<Task>> {
        self.task_lists.fetch_add(1, Ordering::SeqCst);
        let (delay, fail) = {
            let mut faults = self.faults.lock().unwrap();
            (
                faults.list_delays.pop_front(),
                faults.list_failures.pop_front().unwrap_or(false),
            )
        };
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(rejected());
        }
        // Read before sleeping so a delayed call returns the data it saw.
        let tasks = self.inner.list_tasks(org_id).await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(rejected());
        }
        tasks
    }

    async fn create_task(&self, task: NewTask, org_id: &str) -> StoreResult<Task> {
        self.task_creates.fetch_add(1, Ordering::SeqCst);
        if self.faults.lock().unwrap().reject_creates {
            return Err(rejected());
        }
        self.inner.create_task(task, org_id).await
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> StoreResult<()> {
        self.task_updates.fetch_add(1, Ordering::SeqCst);
        if self.faults.lock().unwrap().reject_task_updates.contains(id) {
            return Err(rejected());
        }
        self.inner.update_task(id, patch).await
    }

    async fn delete_task(&self, id: &str) -> StoreResult<()> {
        if self.faults.lock().unwrap().reject_deletes {
            return Err(rejected());
        }
        self.inner.delete_task(id).await
    }

    async fn list_members(&self, org_id: Option<&str>) -> StoreResult<Vec<TeamMember>> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(rejected());
        }
        self.inner.list_members(org_id).await
    }

    async fn create_member(&self, member: NewMember, org_id: &str) -> StoreResult<TeamMember> {
        self.inner.create_member(member, org_id).await
    }

    async fn update_member(&self, id: &str, patch: MemberPatch) -> StoreResult<()> {
        self.inner.update_member(id, patch).await
    }

    async fn delete_member(&self, id: &str) -> StoreResult<()> {
        self.inner.delete_member(id).await
    }
}

/// Seeded fixture: one organization, one project (`FIT`) and the given tasks
/// as `(title, status, priority)`. Returns the org id, project id and task
/// ids in insertion order.
pub async fn seed(
    store: &SqliteStore,
    tasks: &[(&str, TaskStatus, Priority)],
) -> (String, String, Vec<String>) {
    let org = store
        .create_organization(NewOrganization {
            name: "Acme".into(),
            owner_id: None,
        })
        .await
        .unwrap();
    let project = store
        .create_project(
            NewProject {
                name: "FitTracker".into(),
                prefix: "FIT".into(),
                color: "#3b82f6".into(),
            },
            &org.id,
        )
        .await
        .unwrap();
    let mut ids = Vec::new();
    for (i, (title, status, priority)) in tasks.iter().enumerate() {
        let task = store
            .create_task(
                NewTask {
                    code: Some(format!("FIT-{}", 101 + i)),
                    project_id: project.id.clone(),
                    version_id: None,
                    title: title.to_string(),
                    description: None,
                    status: *status,
                    priority: *priority,
                    kind: None,
                    assignee_id: None,
                    images: vec![],
                },
                &org.id,
            )
            .await
            .unwrap();
        ids.push(task.id);
    }
    (org.id, project.id, ids)
}
