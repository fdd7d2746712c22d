use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Enumerations ──────────────────────────────────────────────────────

/// Board column a task sits in. Declaration order is display order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Ideas,
    Backlog,
    InProgress,
    CodeReview,
    Done,
    Deployed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        Self::Ideas,
        Self::Backlog,
        Self::InProgress,
        Self::CodeReview,
        Self::Done,
        Self::Deployed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ideas => "ideas",
            Self::Backlog => "backlog",
            Self::InProgress => "in_progress",
            Self::CodeReview => "code_review",
            Self::Done => "done",
            Self::Deployed => "deployed",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Ideas => "Ideas",
            Self::Backlog => "Backlog",
            Self::InProgress => "In Progress",
            Self::CodeReview => "Code Review",
            Self::Done => "Done",
            Self::Deployed => "Deployed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ideas" => Ok(Self::Ideas),
            "backlog" => Ok(Self::Backlog),
            "in_progress" => Ok(Self::InProgress),
            "code_review" => Ok(Self::CodeReview),
            "done" => Ok(Self::Done),
            "deployed" => Ok(Self::Deployed),
            _ => Err(format!("Invalid task status: {}", s)),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Planned,
    InDevelopment,
    InStores,
    Deprecated,
}

impl VersionStatus {
    pub const ALL: [VersionStatus; 4] = [
        Self::Planned,
        Self::InDevelopment,
        Self::InStores,
        Self::Deprecated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::InDevelopment => "in_development",
            Self::InStores => "in_stores",
            Self::Deprecated => "deprecated",
        }
    }
}

impl FromStr for VersionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planned" => Ok(Self::Planned),
            "in_development" => Ok(Self::InDevelopment),
            "in_stores" => Ok(Self::InStores),
            "deprecated" => Ok(Self::Deprecated),
            _ => Err(format!("Invalid version status: {}", s)),
        }
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional task classification: user story or bug.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Us,
    Bug,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Us => "us",
            Self::Bug => "bug",
        }
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "us" => Ok(Self::Us),
            "bug" => Ok(Self::Bug),
            _ => Err(format!("Invalid task kind: {}", s)),
        }
    }
}

// ── Entities ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub owner_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub prefix: String,
    pub color: String,
    pub organization_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub nickname: Option<String>,
    pub role: Option<String>,
    pub avatar_url: Option<String>,
    pub user_id: Option<String>,
    pub invitation_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub status: VersionStatus,
    pub release_date: Option<String>,
    pub notes: Option<String>,
    pub owner_id: Option<String>,
    pub owner: Option<TeamMember>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub code: String,
    pub project_id: String,
    pub version_id: Option<String>,
    pub version: Option<Version>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub kind: Option<TaskKind>,
    pub assignee_id: Option<String>,
    pub assignee: Option<TeamMember>,
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

// ── Creation payloads ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganization {
    pub name: String,
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    pub prefix: String,
    pub color: String,
}

impl NewProject {
    /// Prefixes are short uppercase tags used to build task codes.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Project name is required".to_string());
        }
        validate_prefix(&self.prefix)
    }
}

fn validate_prefix(prefix: &str) -> Result<(), String> {
    let prefix = prefix.trim();
    if prefix.is_empty() || prefix.len() > 8 {
        return Err("Project prefix must be 1-8 characters".to_string());
    }
    if !prefix
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(format!("Project prefix must be uppercase: {}", prefix));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewVersion {
    pub project_id: String,
    pub name: String,
    pub status: VersionStatus,
    pub release_date: Option<String>,
    pub notes: Option<String>,
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub code: Option<String>,
    pub project_id: String,
    pub version_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub kind: Option<TaskKind>,
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    pub name: String,
    pub nickname: Option<String>,
    pub role: Option<String>,
    pub avatar_url: Option<String>,
}

// ── Partial updates ───────────────────────────────────────────────────
//
// Outer `None` leaves a field untouched; `Some(None)` clears a nullable field.

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub kind: Option<Option<TaskKind>>,
    pub project_id: Option<String>,
    pub version_id: Option<Option<String>>,
    pub assignee_id: Option<Option<String>>,
    pub images: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionPatch {
    pub project_id: Option<String>,
    pub name: Option<String>,
    pub status: Option<VersionStatus>,
    pub release_date: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub owner_id: Option<Option<String>>,
}

impl VersionPatch {
    pub fn status(status: VersionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub prefix: Option<String>,
    pub color: Option<String>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.prefix.is_none() && self.color.is_none()
    }

    /// Only the fields being changed are checked.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            return Err("Project name is required".to_string());
        }
        if let Some(prefix) = &self.prefix {
            validate_prefix(prefix)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberPatch {
    pub name: Option<String>,
    pub nickname: Option<Option<String>>,
    pub role: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
}

impl MemberPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.nickname.is_none()
            && self.role.is_none()
            && self.avatar_url.is_none()
    }
}
