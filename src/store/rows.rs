//! Row shapes as the store sees them, and the mapping to and from the
//! in-memory entities.
//!
//! Rows carry snake_case foreign keys, string-typed enums and embedded
//! relations; entities carry typed enums and nested objects. Both store
//! backends read into these rows and write from these change sets, so the
//! mapping lives in exactly one place.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use flowboard_common::*;
use serde::{Deserialize, Serialize};

// ── Read side ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl OrganizationRow {
    pub fn into_organization(self) -> Organization {
        Organization {
            id: self.id,
            name: self.name,
            owner_id: self.owner_id,
            created_at: parse_timestamp(self.created_at.as_deref()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub prefix: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ProjectRow {
    pub fn into_project(self) -> Project {
        Project {
            id: self.id,
            name: self.name,
            prefix: self.prefix,
            color: self.color.unwrap_or_else(|| DEFAULT_PROJECT_COLOR.to_string()),
            organization_id: self.organization_id,
            created_at: parse_timestamp(self.created_at.as_deref()),
        }
    }
}

pub const DEFAULT_PROJECT_COLOR: &str = "#3b82f6";

#[derive(Debug, Clone, Deserialize)]
pub struct MemberRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub invitation_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl MemberRow {
    pub fn into_member(self) -> TeamMember {
        TeamMember {
            id: self.id,
            name: self.name,
            nickname: self.nickname,
            role: self.role,
            avatar_url: self.avatar_url,
            user_id: self.user_id,
            invitation_id: self.invitation_id,
            created_at: parse_timestamp(self.created_at.as_deref()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionRow {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub owner: Option<MemberRow>,
}

impl VersionRow {
    pub fn into_version(self) -> StoreResult<Version> {
        let status = parse_enum::<VersionStatus>("version status", &self.status)?;
        Ok(Version {
            id: self.id,
            project_id: self.project_id,
            name: self.name,
            status,
            release_date: self.release_date.map(|d| normalize_date(&d)),
            notes: self.notes,
            owner_id: self.owner_id,
            owner: self.owner.map(MemberRow::into_member),
            created_at: parse_timestamp(self.created_at.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskRow {
    pub id: String,
    #[serde(default)]
    pub code: Option<String>,
    pub project_id: String,
    #[serde(default)]
    pub version_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub assignee: Option<MemberRow>,
    #[serde(default)]
    pub version: Option<VersionRow>,
}

impl TaskRow {
    pub fn into_task(self) -> StoreResult<Task> {
        let status = parse_enum::<TaskStatus>("task status", &self.status)?;
        let priority = parse_enum::<Priority>("priority", &self.priority)?;
        let kind = match self.kind.as_deref() {
            None | Some("") => None,
            Some(k) => Some(parse_enum::<TaskKind>("task type", k)?),
        };
        let version = self.version.map(VersionRow::into_version).transpose()?;

        Ok(Task {
            id: self.id,
            code: self.code.unwrap_or_default(),
            project_id: self.project_id,
            version_id: self.version_id,
            version,
            title: self.title,
            description: self.description,
            status,
            priority,
            kind,
            assignee_id: self.assignee_id,
            assignee: self.assignee.map(MemberRow::into_member),
            images: self.images.unwrap_or_default(),
            created_at: parse_timestamp(self.created_at.as_deref()),
            updated_at: parse_timestamp(self.updated_at.as_deref()),
        })
    }
}

fn parse_enum<T: FromStr>(field: &'static str, value: &str) -> StoreResult<T> {
    T::from_str(value).map_err(|_| StoreError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

/// Accepts RFC 3339, or a naive `timestamp` column rendered with or without
/// fractional seconds (interpreted as UTC). Anything else maps to `None`.
pub fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// Release dates are calendar dates; datetime values are cut to the date.
fn normalize_date(value: &str) -> String {
    let date_part = value.split('T').next().unwrap_or(value);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(_) => value.to_string(),
    }
}

// ── Write side ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct OrganizationInsert {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl From<NewOrganization> for OrganizationInsert {
    fn from(org: NewOrganization) -> Self {
        Self {
            name: org.name,
            owner_id: org.owner_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectInsert {
    pub organization_id: String,
    pub name: String,
    pub prefix: String,
    pub color: String,
}

impl ProjectInsert {
    pub fn new(project: NewProject, org_id: &str) -> Self {
        Self {
            organization_id: org_id.to_string(),
            name: project.name,
            prefix: project.prefix.trim().to_string(),
            color: project.color,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl From<ProjectPatch> for ProjectChanges {
    fn from(patch: ProjectPatch) -> Self {
        Self {
            name: patch.name,
            prefix: patch.prefix,
            color: patch.color,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionInsert {
    pub organization_id: String,
    pub project_id: String,
    pub name: String,
    pub status: &'static str,
    pub release_date: Option<String>,
    pub notes: Option<String>,
    pub owner_id: Option<String>,
}

impl VersionInsert {
    pub fn new(version: NewVersion, org_id: &str) -> Self {
        Self {
            organization_id: org_id.to_string(),
            project_id: version.project_id,
            name: version.name,
            status: version.status.as_str(),
            // An empty date input means "no date".
            release_date: version.release_date.filter(|d| !d.trim().is_empty()),
            notes: version.notes,
            owner_id: version.owner_id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VersionChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Option<String>>,
}

impl From<VersionPatch> for VersionChanges {
    fn from(patch: VersionPatch) -> Self {
        Self {
            project_id: patch.project_id,
            name: patch.name,
            status: patch.status.map(|s| s.as_str()),
            release_date: patch
                .release_date
                .map(|d| d.filter(|d| !d.trim().is_empty())),
            notes: patch.notes,
            owner_id: patch.owner_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskInsert {
    pub organization_id: String,
    pub project_id: String,
    pub version_id: Option<String>,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub status: &'static str,
    pub priority: &'static str,
    #[serde(rename = "type")]
    pub kind: Option<&'static str>,
    pub assignee_id: Option<String>,
    pub images: Vec<String>,
}

impl TaskInsert {
    pub fn new(task: NewTask, org_id: &str) -> Self {
        let code = task
            .code
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(fallback_task_code);
        Self {
            organization_id: org_id.to_string(),
            project_id: task.project_id,
            version_id: task.version_id,
            code,
            title: task.title,
            description: task.description,
            status: task.status.as_str(),
            priority: task.priority.as_str(),
            kind: task.kind.map(|k| k.as_str()),
            assignee_id: task.assignee_id,
            images: task.images,
        }
    }
}

/// Code used when the caller did not derive one from the project prefix.
fn fallback_task_code() -> String {
    let n = uuid::Uuid::new_v4().as_u128() % 10_000;
    format!("TASK-{}", n)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<&'static str>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<Option<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl From<TaskPatch> for TaskChanges {
    fn from(patch: TaskPatch) -> Self {
        Self {
            title: patch.title,
            description: patch.description,
            status: patch.status.map(|s| s.as_str()),
            priority: patch.priority.map(|p| p.as_str()),
            kind: patch.kind.map(|k| k.map(|k| k.as_str())),
            project_id: patch.project_id,
            version_id: patch.version_id,
            assignee_id: patch.assignee_id,
            images: patch.images,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberInsert {
    pub organization_id: String,
    pub name: String,
    pub nickname: Option<String>,
    pub role: Option<String>,
    pub avatar_url: Option<String>,
}

impl MemberInsert {
    pub fn new(member: NewMember, org_id: &str) -> Self {
        Self {
            organization_id: org_id.to_string(),
            name: member.name,
            nickname: member.nickname,
            role: member.role,
            avatar_url: member.avatar_url,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MemberChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Option<String>>,
}

impl From<MemberPatch> for MemberChanges {
    fn from(patch: MemberPatch) -> Self {
        Self {
            name: patch.name,
            nickname: patch.nickname,
            role: patch.role,
            avatar_url: patch.avatar_url,
        }
    }
}

/// Flatten a write payload into column → value pairs.
pub fn to_columns<T: Serialize>(value: &T) -> StoreResult<serde_json::Map<String, serde_json::Value>> {
    match serde_json::to_value(value).map_err(|e| StoreError::Decode(e.to_string()))? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(StoreError::Decode(format!(
            "Expected a JSON object for row payload, got {}",
            other
        ))),
    }
}
