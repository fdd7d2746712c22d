//! Hosted store client speaking the PostgREST dialect (`/rest/v1/<table>`).
//!
//! Reads embed relations through the `select` parameter, filters use
//! `column=eq.value`, and inserts ask for the created row back with
//! `Prefer: return=representation`.

use std::time::Duration;

use async_trait::async_trait;
use flowboard_common::*;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::rows::*;

const TASK_SELECT: &str = "*,assignee:team_members(*),version:versions(*)";
const VERSION_SELECT: &str = "*,owner:team_members(*)";

/// Error body returned by the REST layer on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    code: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl RestStore {
    pub fn new(
        base_url: &str,
        api_key: &str,
        access_token: Option<String>,
        timeout: Duration,
    ) -> StoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("flowboard")
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token,
        })
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Attach the project key and the caller's bearer token. Without a user
    /// token the project key doubles as the bearer.
    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        req.header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    async fn select<R: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        order: &str,
        org_id: Option<&str>,
    ) -> StoreResult<Vec<R>> {
        let mut query = vec![
            ("select".to_string(), columns.to_string()),
            ("order".to_string(), order.to_string()),
        ];
        if let Some(org) = org_id {
            query.push(("organization_id".to_string(), format!("eq.{}", org)));
        }

        tracing::debug!(table, ?org_id, "REST select");
        let resp = self
            .authorized(self.client.get(self.endpoint(table)))
            .query(&query)
            .send()
            .await
            .map_err(transport)?;
        let resp = check(resp).await?;
        resp.json::<Vec<R>>()
            .await
            .map_err(|e| StoreError::Decode(format!("{} rows: {}", table, e)))
    }

    async fn insert<R: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        payload: serde_json::Map<String, serde_json::Value>,
    ) -> StoreResult<R> {
        tracing::debug!(table, "REST insert");
        let resp = self
            .authorized(self.client.post(self.endpoint(table)))
            .header("Prefer", "return=representation")
            .query(&[("select", columns)])
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;
        let resp = check(resp).await?;
        let mut rows = resp
            .json::<Vec<R>>()
            .await
            .map_err(|e| StoreError::Decode(format!("{} insert: {}", table, e)))?;
        if rows.is_empty() {
            return Err(StoreError::Decode(format!(
                "{} insert returned no row",
                table
            )));
        }
        Ok(rows.swap_remove(0))
    }

    async fn patch(
        &self,
        table: &str,
        id: &str,
        payload: serde_json::Map<String, serde_json::Value>,
    ) -> StoreResult<()> {
        if payload.is_empty() {
            return Ok(());
        }
        tracing::debug!(table, id, "REST update");
        let resp = self
            .authorized(self.client.patch(self.endpoint(table)))
            .query(&[("id", format!("eq.{}", id))])
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;
        check(resp).await.map(|_| ())
    }

    async fn remove(&self, table: &str, id: &str) -> StoreResult<()> {
        tracing::debug!(table, id, "REST delete");
        let resp = self
            .authorized(self.client.delete(self.endpoint(table)))
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await
            .map_err(transport)?;
        check(resp).await.map(|_| ())
    }
}

fn transport(e: reqwest::Error) -> StoreError {
    StoreError::Transport(e.to_string())
}

/// Pass through 2xx responses; turn everything else into `StoreError::Api`.
async fn check(resp: reqwest::Response) -> StoreResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(api_error(status.as_u16(), &body))
}

fn api_error(status: u16, body: &str) -> StoreError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => {
            let mut message = parsed
                .message
                .unwrap_or_else(|| format!("Request failed with status {}", status));
            if let Some(details) = parsed.details.filter(|d| !d.is_empty()) {
                message = format!("{} ({})", message, details);
            }
            if let Some(hint) = parsed.hint.filter(|h| !h.is_empty()) {
                message = format!("{}. Hint: {}", message, hint);
            }
            StoreError::Api {
                status,
                code: parsed.code,
                message,
            }
        }
        Err(_) => StoreError::Api {
            status,
            code: None,
            message: if body.trim().is_empty() {
                format!("Request failed with status {}", status)
            } else {
                body.trim().to_string()
            },
        },
    }
}

#[async_trait]
impl Repository for RestStore {
    async fn list_organizations(&self) -> StoreResult<Vec<Organization>> {
        let rows: Vec<OrganizationRow> = self
            .select("organizations", "*", "name.asc", None)
            .await?;
        Ok(rows.into_iter().map(OrganizationRow::into_organization).collect())
    }

    async fn create_organization(&self, org: NewOrganization) -> StoreResult<Organization> {
        let row: OrganizationRow = self
            .insert(
                "organizations",
                "*",
                to_columns(&OrganizationInsert::from(org))?,
            )
            .await?;
        Ok(row.into_organization())
    }

    async fn list_projects(&self, org_id: Option<&str>) -> StoreResult<Vec<Project>> {
        let rows: Vec<ProjectRow> = self.select("projects", "*", "name.asc", org_id).await?;
        Ok(rows.into_iter().map(ProjectRow::into_project).collect())
    }

    async fn create_project(&self, project: NewProject, org_id: &str) -> StoreResult<Project> {
        let row: ProjectRow = self
            .insert(
                "projects",
                "*",
                to_columns(&ProjectInsert::new(project, org_id))?,
            )
            .await?;
        Ok(row.into_project())
    }

    async fn update_project(&self, id: &str, patch: ProjectPatch) -> StoreResult<()> {
        self.patch("projects", id, to_columns(&ProjectChanges::from(patch))?)
            .await
    }

    async fn delete_project(&self, id: &str) -> StoreResult<()> {
        self.remove("projects", id).await
    }

    async fn list_versions(&self, org_id: Option<&str>) -> StoreResult<Vec<Version>> {
        let rows: Vec<VersionRow> = self
            .select("versions", VERSION_SELECT, "created_at.desc", org_id)
            .await?;
        rows.into_iter().map(VersionRow::into_version).collect()
    }

    async fn create_version(&self, version: NewVersion, org_id: &str) -> StoreResult<Version> {
        let row: VersionRow = self
            .insert(
                "versions",
                VERSION_SELECT,
                to_columns(&VersionInsert::new(version, org_id))?,
            )
            .await?;
        row.into_version()
    }

    async fn update_version(&self, id: &str, patch: VersionPatch) -> StoreResult<()> {
        self.patch("versions", id, to_columns(&VersionChanges::from(patch))?)
            .await
    }

    async fn delete_version(&self, id: &str) -> StoreResult<()> {
        self.remove("versions", id).await
    }

    async fn list_tasks(&self, org_id: Option<&str>) -> StoreResult<Vec<Task>> {
        let rows: Vec<TaskRow> = self
            .select("tasks", TASK_SELECT, "created_at.desc", org_id)
            .await?;
        rows.into_iter().map(TaskRow::into_task).collect()
    }

    async fn create_task(&self, task: NewTask, org_id: &str) -> StoreResult<Task> {
        let row: TaskRow = self
            .insert(
                "tasks",
                TASK_SELECT,
                to_columns(&TaskInsert::new(task, org_id))?,
            )
            .await?;
        row.into_task()
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> StoreResult<()> {
        self.patch("tasks", id, to_columns(&TaskChanges::from(patch))?)
            .await
    }

    async fn delete_task(&self, id: &str) -> StoreResult<()> {
        self.remove("tasks", id).await
    }

    async fn list_members(&self, org_id: Option<&str>) -> StoreResult<Vec<TeamMember>> {
        let rows: Vec<MemberRow> = self
            .select("team_members", "*", "name.asc", org_id)
            .await?;
        Ok(rows.into_iter().map(MemberRow::into_member).collect())
    }

    async fn create_member(&self, member: NewMember, org_id: &str) -> StoreResult<TeamMember> {
        let row: MemberRow = self
            .insert(
                "team_members",
                "*",
                to_columns(&MemberInsert::new(member, org_id))?,
            )
            .await?;
        Ok(row.into_member())
    }

    async fn update_member(&self, id: &str, patch: MemberPatch) -> StoreResult<()> {
        self.patch("team_members", id, to_columns(&MemberChanges::from(patch))?)
            .await
    }

    async fn delete_member(&self, id: &str) -> StoreResult<()> {
        self.remove("team_members", id).await
    }
}
