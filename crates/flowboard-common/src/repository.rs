//! The CRUD contract every backing store implements.
//!
//! Callers decide their own recovery policy: nothing here retries.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::*;

/// Errors reported by a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Transport(String),

    #[error("Store returned {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Failed to decode store response: {0}")]
    Decode(String),

    #[error("Invalid {field} value '{value}'")]
    InvalidValue { field: &'static str, value: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Repository: Send + Sync {
    // Organizations
    async fn list_organizations(&self) -> StoreResult<Vec<Organization>>;
    async fn create_organization(&self, org: NewOrganization) -> StoreResult<Organization>;

    // Projects
    async fn list_projects(&self, org_id: Option<&str>) -> StoreResult<Vec<Project>>;
    async fn create_project(&self, project: NewProject, org_id: &str) -> StoreResult<Project>;
    async fn update_project(&self, id: &str, patch: ProjectPatch) -> StoreResult<()>;
    async fn delete_project(&self, id: &str) -> StoreResult<()>;

    // Versions (owner embedded)
    async fn list_versions(&self, org_id: Option<&str>) -> StoreResult<Vec<Version>>;
    async fn create_version(&self, version: NewVersion, org_id: &str) -> StoreResult<Version>;
    async fn update_version(&self, id: &str, patch: VersionPatch) -> StoreResult<()>;
    async fn delete_version(&self, id: &str) -> StoreResult<()>;

    // Tasks (assignee and version embedded)
    async fn list_tasks(&self, org_id: Option<&str>) -> StoreResult<Vec<Task>>;
    async fn create_task(&self, task: NewTask, org_id: &str) -> StoreResult<Task>;
    async fn update_task(&self, id: &str, patch: TaskPatch) -> StoreResult<()>;
    async fn delete_task(&self, id: &str) -> StoreResult<()>;

    async fn update_task_status(&self, id: &str, status: TaskStatus) -> StoreResult<()> {
        self.update_task(id, TaskPatch::status(status)).await
    }

    // Team members
    async fn list_members(&self, org_id: Option<&str>) -> StoreResult<Vec<TeamMember>>;
    async fn create_member(&self, member: NewMember, org_id: &str) -> StoreResult<TeamMember>;
    async fn update_member(&self, id: &str, patch: MemberPatch) -> StoreResult<()>;
    async fn delete_member(&self, id: &str) -> StoreResult<()>;
}
