use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use flowboard_common::*;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use super::rows::*;

/// Async-safe handle to the local board database.
///
/// Wraps `BoardDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O never
/// ties up async worker threads.
#[derive(Clone)]
pub struct SqliteStore {
    inner: Arc<std::sync::Mutex<BoardDb>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        Ok(Self::from_db(BoardDb::new(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_db(BoardDb::new_in_memory()?))
    }

    pub fn from_db(db: BoardDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    async fn call<F, R>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&BoardDb) -> StoreResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|e| StoreError::Database(format!("DB lock poisoned: {}", e)))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Database(format!("DB task panicked: {}", e)))?
    }
}

pub struct BoardDb {
    conn: Connection,
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Convert a JSON column value into a SQLite value. Arrays and objects are
/// stored as JSON text.
fn to_sql(value: &serde_json::Value) -> SqlValue {
    match value {
        serde_json::Value::Null => SqlValue::Null,
        serde_json::Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

impl BoardDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> StoreResult<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(db_err)?;
        self.run_migrations()
    }

    fn run_migrations(&self) -> StoreResult<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS organizations (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    owner_id TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS projects (
                    id TEXT PRIMARY KEY,
                    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    prefix TEXT NOT NULL,
                    color TEXT NOT NULL DEFAULT '#3b82f6',
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS team_members (
                    id TEXT PRIMARY KEY,
                    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    nickname TEXT,
                    role TEXT,
                    avatar_url TEXT,
                    user_id TEXT,
                    invitation_id TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS versions (
                    id TEXT PRIMARY KEY,
                    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
                    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'planned',
                    release_date TEXT,
                    notes TEXT,
                    owner_id TEXT REFERENCES team_members(id) ON DELETE SET NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS tasks (
                    id TEXT PRIMARY KEY,
                    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
                    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    version_id TEXT REFERENCES versions(id) ON DELETE SET NULL,
                    code TEXT NOT NULL,
                    title TEXT NOT NULL,
                    description TEXT,
                    status TEXT NOT NULL DEFAULT 'ideas',
                    priority TEXT NOT NULL DEFAULT 'medium',
                    type TEXT,
                    assignee_id TEXT REFERENCES team_members(id) ON DELETE SET NULL,
                    images TEXT NOT NULL DEFAULT '[]',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_projects_org ON projects(organization_id);
                CREATE INDEX IF NOT EXISTS idx_versions_org ON versions(organization_id);
                CREATE INDEX IF NOT EXISTS idx_tasks_org ON tasks(organization_id);
                CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id, status);
                CREATE INDEX IF NOT EXISTS idx_members_org ON team_members(organization_id);
                ",
            )
            .map_err(db_err)
    }

    // ── Generic row writes ────────────────────────────────────────────

    fn insert(
        &self,
        table: &str,
        mut columns: serde_json::Map<String, serde_json::Value>,
        with_updated_at: bool,
    ) -> StoreResult<String> {
        let id = new_id();
        let stamp = now();
        columns.insert("id".into(), serde_json::Value::String(id.clone()));
        columns.insert("created_at".into(), serde_json::Value::String(stamp.clone()));
        if with_updated_at {
            columns.insert("updated_at".into(), serde_json::Value::String(stamp));
        }

        let names: Vec<&str> = columns.keys().map(String::as_str).collect();
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            names.join(", "),
            placeholders.join(", ")
        );
        let values: Vec<SqlValue> = columns.values().map(to_sql).collect();
        self.conn
            .execute(&sql, params_from_iter(values))
            .map_err(db_err)?;
        Ok(id)
    }

    fn update(
        &self,
        table: &str,
        entity: &'static str,
        id: &str,
        mut columns: serde_json::Map<String, serde_json::Value>,
        touch_updated_at: bool,
    ) -> StoreResult<()> {
        if touch_updated_at {
            columns.insert("updated_at".into(), serde_json::Value::String(now()));
        }
        if columns.is_empty() {
            return self.ensure_exists(table, entity, id);
        }

        let assignments: Vec<String> = columns
            .keys()
            .enumerate()
            .map(|(i, name)| format!("{} = ?{}", name, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table,
            assignments.join(", "),
            columns.len() + 1
        );
        let mut values: Vec<SqlValue> = columns.values().map(to_sql).collect();
        values.push(SqlValue::Text(id.to_string()));

        let count = self
            .conn
            .execute(&sql, params_from_iter(values))
            .map_err(db_err)?;
        if count == 0 {
            return Err(StoreError::NotFound {
                entity,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn delete(&self, table: &str, entity: &'static str, id: &str) -> StoreResult<()> {
        let count = self
            .conn
            .execute(&format!("DELETE FROM {} WHERE id = ?1", table), params![id])
            .map_err(db_err)?;
        if count == 0 {
            return Err(StoreError::NotFound {
                entity,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_exists(&self, table: &str, entity: &'static str, id: &str) -> StoreResult<()> {
        let found: Option<i64> = self
            .conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?1", table),
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        match found {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                entity,
                id: id.to_string(),
            }),
        }
    }

    // ── Organizations ─────────────────────────────────────────────────

    pub fn list_organizations(&self) -> StoreResult<Vec<Organization>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, owner_id, created_at FROM organizations ORDER BY name")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(OrganizationRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    owner_id: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })
            .map_err(db_err)?;
        let mut orgs = Vec::new();
        for row in rows {
            orgs.push(row.map_err(db_err)?.into_organization());
        }
        Ok(orgs)
    }

    pub fn get_organization(&self, id: &str) -> StoreResult<Organization> {
        self.conn
            .query_row(
                "SELECT id, name, owner_id, created_at FROM organizations WHERE id = ?1",
                params![id],
                |row| {
                    Ok(OrganizationRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        owner_id: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(db_err)?
            .map(OrganizationRow::into_organization)
            .ok_or_else(|| StoreError::NotFound {
                entity: "Organization",
                id: id.to_string(),
            })
    }

    pub fn create_organization(&self, org: NewOrganization) -> StoreResult<Organization> {
        let id = self.insert(
            "organizations",
            to_columns(&OrganizationInsert::from(org))?,
            false,
        )?;
        self.get_organization(&id)
    }

    // ── Projects ──────────────────────────────────────────────────────

    pub fn list_projects(&self, org_id: Option<&str>) -> StoreResult<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, prefix, color, organization_id, created_at FROM projects
                 WHERE (?1 IS NULL OR organization_id = ?1) ORDER BY name",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![org_id], |row| {
                Ok(ProjectRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    prefix: row.get(2)?,
                    color: row.get(3)?,
                    organization_id: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .map_err(db_err)?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row.map_err(db_err)?.into_project());
        }
        Ok(projects)
    }

    pub fn create_project(&self, project: NewProject, org_id: &str) -> StoreResult<Project> {
        let id = self.insert(
            "projects",
            to_columns(&ProjectInsert::new(project, org_id))?,
            false,
        )?;
        self.list_projects(Some(org_id))?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound {
                entity: "Project",
                id,
            })
    }

    // ── Team members ──────────────────────────────────────────────────

    pub fn list_members(&self, org_id: Option<&str>) -> StoreResult<Vec<TeamMember>> {
        Ok(self
            .member_rows(org_id)?
            .into_iter()
            .map(MemberRow::into_member)
            .collect())
    }

    fn member_rows(&self, org_id: Option<&str>) -> StoreResult<Vec<MemberRow>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, nickname, role, avatar_url, user_id, invitation_id, created_at
                 FROM team_members WHERE (?1 IS NULL OR organization_id = ?1) ORDER BY name",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![org_id], |row| {
                Ok(MemberRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    nickname: row.get(2)?,
                    role: row.get(3)?,
                    avatar_url: row.get(4)?,
                    user_id: row.get(5)?,
                    invitation_id: row.get(6)?,
                    created_at: row.get(7)?,
                })
            })
            .map_err(db_err)?;
        let mut members = Vec::new();
        for row in rows {
            members.push(row.map_err(db_err)?);
        }
        Ok(members)
    }

    fn members_by_id(&self, org_id: Option<&str>) -> StoreResult<HashMap<String, MemberRow>> {
        Ok(self
            .member_rows(org_id)?
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect())
    }

    pub fn create_member(&self, member: NewMember, org_id: &str) -> StoreResult<TeamMember> {
        let id = self.insert(
            "team_members",
            to_columns(&MemberInsert::new(member, org_id))?,
            false,
        )?;
        self.list_members(Some(org_id))?
            .into_iter()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound {
                entity: "TeamMember",
                id,
            })
    }

    // ── Versions ──────────────────────────────────────────────────────

    fn version_rows(&self, org_id: Option<&str>) -> StoreResult<Vec<VersionRow>> {
        let members = self.members_by_id(org_id)?;
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, project_id, name, status, release_date, notes, owner_id, created_at
                 FROM versions WHERE (?1 IS NULL OR organization_id = ?1)
                 ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![org_id], |row| {
                Ok(VersionRow {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    name: row.get(2)?,
                    status: row.get(3)?,
                    release_date: row.get(4)?,
                    notes: row.get(5)?,
                    owner_id: row.get(6)?,
                    created_at: row.get(7)?,
                    owner: None,
                })
            })
            .map_err(db_err)?;
        let mut versions = Vec::new();
        for row in rows {
            let mut v = row.map_err(db_err)?;
            v.owner = v.owner_id.as_ref().and_then(|id| members.get(id).cloned());
            versions.push(v);
        }
        Ok(versions)
    }

    pub fn list_versions(&self, org_id: Option<&str>) -> StoreResult<Vec<Version>> {
        self.version_rows(org_id)?
            .into_iter()
            .map(VersionRow::into_version)
            .collect()
    }

    pub fn create_version(&self, version: NewVersion, org_id: &str) -> StoreResult<Version> {
        let id = self.insert(
            "versions",
            to_columns(&VersionInsert::new(version, org_id))?,
            false,
        )?;
        self.list_versions(Some(org_id))?
            .into_iter()
            .find(|v| v.id == id)
            .ok_or(StoreError::NotFound {
                entity: "Version",
                id,
            })
    }

    // ── Tasks ─────────────────────────────────────────────────────────

    pub fn list_tasks(&self, org_id: Option<&str>) -> StoreResult<Vec<Task>> {
        let members = self.members_by_id(org_id)?;
        let versions: HashMap<String, VersionRow> = self
            .version_rows(org_id)?
            .into_iter()
            .map(|v| (v.id.clone(), v))
            .collect();

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, code, project_id, version_id, title, description, status, priority,
                        type, assignee_id, images, created_at, updated_at
                 FROM tasks WHERE (?1 IS NULL OR organization_id = ?1)
                 ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![org_id], |row| {
                let images: String = row.get(10)?;
                Ok((
                    TaskRow {
                        id: row.get(0)?,
                        code: row.get(1)?,
                        project_id: row.get(2)?,
                        version_id: row.get(3)?,
                        title: row.get(4)?,
                        description: row.get(5)?,
                        status: row.get(6)?,
                        priority: row.get(7)?,
                        kind: row.get(8)?,
                        assignee_id: row.get(9)?,
                        images: None,
                        created_at: row.get(11)?,
                        updated_at: row.get(12)?,
                        assignee: None,
                        version: None,
                    },
                    images,
                ))
            })
            .map_err(db_err)?;

        let mut tasks = Vec::new();
        for row in rows {
            let (mut task, images) = row.map_err(db_err)?;
            task.images = Some(
                serde_json::from_str(&images)
                    .map_err(|e| StoreError::Decode(format!("task images: {}", e)))?,
            );
            task.assignee = task.assignee_id.as_ref().and_then(|id| members.get(id).cloned());
            task.version = task.version_id.as_ref().and_then(|id| versions.get(id).cloned());
            tasks.push(task.into_task()?);
        }
        Ok(tasks)
    }

    pub fn create_task(&self, task: NewTask, org_id: &str) -> StoreResult<Task> {
        let id = self.insert("tasks", to_columns(&TaskInsert::new(task, org_id))?, true)?;
        self.list_tasks(Some(org_id))?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound { entity: "Task", id })
    }
}

#[async_trait]
impl Repository for SqliteStore {
    async fn list_organizations(&self) -> StoreResult<Vec<Organization>> {
        self.call(|db| db.list_organizations()).await
    }

    async fn create_organization(&self, org: NewOrganization) -> StoreResult<Organization> {
        self.call(move |db| db.create_organization(org)).await
    }

    async fn list_projects(&self, org_id: Option<&str>) -> StoreResult<Vec<Project>> {
        let org_id = org_id.map(str::to_string);
        self.call(move |db| db.list_projects(org_id.as_deref())).await
    }

    async fn create_project(&self, project: NewProject, org_id: &str) -> StoreResult<Project> {
        let org_id = org_id.to_string();
        self.call(move |db| db.create_project(project, &org_id)).await
    }

    async fn update_project(&self, id: &str, patch: ProjectPatch) -> StoreResult<()> {
        let id = id.to_string();
        self.call(move |db| {
            db.update(
                "projects",
                "Project",
                &id,
                to_columns(&ProjectChanges::from(patch))?,
                false,
            )
        })
        .await
    }

    async fn delete_project(&self, id: &str) -> StoreResult<()> {
        let id = id.to_string();
        self.call(move |db| db.delete("projects", "Project", &id)).await
    }

    async fn list_versions(&self, org_id: Option<&str>) -> StoreResult<Vec<Version>> {
        let org_id = org_id.map(str::to_string);
        self.call(move |db| db.list_versions(org_id.as_deref())).await
    }

    async fn create_version(&self, version: NewVersion, org_id: &str) -> StoreResult<Version> {
        let org_id = org_id.to_string();
        self.call(move |db| db.create_version(version, &org_id)).await
    }

    async fn update_version(&self, id: &str, patch: VersionPatch) -> StoreResult<()> {
        let id = id.to_string();
        self.call(move |db| {
            db.update(
                "versions",
                "Version",
                &id,
                to_columns(&VersionChanges::from(patch))?,
                false,
            )
        })
        .await
    }

    async fn delete_version(&self, id: &str) -> StoreResult<()> {
        let id = id.to_string();
        self.call(move |db| db.delete("versions", "Version", &id)).await
    }

    async fn list_tasks(&self, org_id: Option<&str>) -> StoreResult<Vec<Task>> {
        let org_id = org_id.map(str::to_string);
        self.call(move |db| db.list_tasks(org_id.as_deref())).await
    }

    async fn create_task(&self, task: NewTask, org_id: &str) -> StoreResult<Task> {
        let org_id = org_id.to_string();
        self.call(move |db| db.create_task(task, &org_id)).await
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> StoreResult<()> {
        let id = id.to_string();
        self.call(move |db| {
            db.update(
                "tasks",
                "Task",
                &id,
                to_columns(&TaskChanges::from(patch))?,
                true,
            )
        })
        .await
    }

    async fn delete_task(&self, id: &str) -> StoreResult<()> {
        let id = id.to_string();
        self.call(move |db| db.delete("tasks", "Task", &id)).await
    }

    async fn list_members(&self, org_id: Option<&str>) -> StoreResult<Vec<TeamMember>> {
        let org_id = org_id.map(str::to_string);
        self.call(move |db| db.list_members(org_id.as_deref())).await
    }

    async fn create_member(&self, member: NewMember, org_id: &str) -> StoreResult<TeamMember> {
        let org_id = org_id.to_string();
        self.call(move |db| db.create_member(member, &org_id)).await
    }

    async fn update_member(&self, id: &str, patch: MemberPatch) -> StoreResult<()> {
        let id = id.to_string();
        self.call(move |db| {
            db.update(
                "team_members",
                "TeamMember",
                &id,
                to_columns(&MemberChanges::from(patch))?,
                false,
            )
        })
        .await
    }

    async fn delete_member(&self, id: &str) -> StoreResult<()> {
        let id = id.to_string();
        self.call(move |db| db.delete("team_members", "TeamMember", &id))
            .await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn new_task(project_id: &str, title: &str, status: TaskStatus) -> NewTask {
        NewTask {
            code: None,
            project_id: project_id.to_string(),
            version_id: None,
            title: title.to_string(),
            description: None,
            status,
            priority: Priority::Medium,
            kind: None,
            assignee_id: None,
            images: vec![],
        }
    }

    async fn seeded() -> StoreResult<(SqliteStore, Organization, Project)> {
        let store = SqliteStore::open_in_memory()?;
        let org = store
            .create_organization(NewOrganization {
                name: "Acme".into(),
                owner_id: None,
            })
            .await?;
        let project = store
            .create_project(
                NewProject {
                    name: "FitTracker".into(),
                    prefix: "FIT".into(),
                    color: "#3b82f6".into(),
                },
                &org.id,
            )
            .await?;
        Ok((store, org, project))
    }

    #[test]
    fn test_create_database_and_run_migrations() -> StoreResult<()> {
        let db = BoardDb::new_in_memory()?;
        let table_count: i32 = db
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN
                 ('organizations', 'projects', 'team_members', 'versions', 'tasks')",
                [],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        assert_eq!(table_count, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_and_list_tasks_newest_first() -> StoreResult<()> {
        let (store, org, project) = seeded().await?;
        store
            .create_task(new_task(&project.id, "First", TaskStatus::Ideas), &org.id)
            .await?;
        store
            .create_task(new_task(&project.id, "Second", TaskStatus::Backlog), &org.id)
            .await?;

        let tasks = store.list_tasks(Some(org.id.as_str())).await?;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Second");
        assert_eq!(tasks[1].title, "First");
        Ok(())
    }

    #[tokio::test]
    async fn test_list_tasks_embeds_assignee_and_version() -> StoreResult<()> {
        let (store, org, project) = seeded().await?;
        let member = store
            .create_member(
                NewMember {
                    name: "Ana".into(),
                    nickname: None,
                    role: Some("dev".into()),
                    avatar_url: Some("https://img/ana.png".into()),
                },
                &org.id,
            )
            .await?;
        let version = store
            .create_version(
                NewVersion {
                    project_id: project.id.clone(),
                    name: "v1.0.0".into(),
                    status: VersionStatus::InDevelopment,
                    release_date: Some("2024-06-01".into()),
                    notes: None,
                    owner_id: Some(member.id.clone()),
                },
                &org.id,
            )
            .await?;

        let mut task = new_task(&project.id, "Embedded", TaskStatus::Ideas);
        task.assignee_id = Some(member.id.clone());
        task.version_id = Some(version.id.clone());
        task.images = vec!["https://img/1.png".into()];
        store.create_task(task, &org.id).await?;

        let tasks = store.list_tasks(Some(org.id.as_str())).await?;
        let t = &tasks[0];
        assert_eq!(t.assignee.as_ref().map(|a| a.name.as_str()), Some("Ana"));
        let v = t.version.as_ref().expect("version embedded");
        assert_eq!(v.name, "v1.0.0");
        assert_eq!(t.images, vec!["https://img/1.png".to_string()]);

        let versions = store.list_versions(Some(org.id.as_str())).await?;
        assert_eq!(
            versions[0].owner.as_ref().map(|o| o.id.as_str()),
            Some(member.id.as_str())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_update_task_status_and_fields() -> StoreResult<()> {
        let (store, org, project) = seeded().await?;
        let task = store
            .create_task(new_task(&project.id, "Move me", TaskStatus::Ideas), &org.id)
            .await?;

        store.update_task_status(&task.id, TaskStatus::Done).await?;
        store
            .update_task(
                &task.id,
                TaskPatch {
                    title: Some("Moved".into()),
                    description: Some(Some("now with text".into())),
                    ..TaskPatch::default()
                },
            )
            .await?;

        let tasks = store.list_tasks(Some(org.id.as_str())).await?;
        assert_eq!(tasks[0].status, TaskStatus::Done);
        assert_eq!(tasks[0].title, "Moved");
        assert_eq!(tasks[0].description.as_deref(), Some("now with text"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_task_is_not_found() -> StoreResult<()> {
        let (store, _org, _project) = seeded().await?;
        let err = store
            .update_task_status("missing", TaskStatus::Done)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "Task", .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_is_scoped_by_organization() -> StoreResult<()> {
        let (store, org, project) = seeded().await?;
        let other = store
            .create_organization(NewOrganization {
                name: "Other".into(),
                owner_id: None,
            })
            .await?;
        store
            .create_task(new_task(&project.id, "Mine", TaskStatus::Ideas), &org.id)
            .await?;

        assert_eq!(store.list_tasks(Some(org.id.as_str())).await?.len(), 1);
        assert!(store.list_tasks(Some(other.id.as_str())).await?.is_empty());
        assert_eq!(store.list_tasks(None).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_project_cascades_to_tasks() -> StoreResult<()> {
        let (store, org, project) = seeded().await?;
        store
            .create_task(new_task(&project.id, "Gone", TaskStatus::Ideas), &org.id)
            .await?;
        store.delete_project(&project.id).await?;
        assert!(store.list_tasks(Some(org.id.as_str())).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_missing_member_is_not_found() -> StoreResult<()> {
        let (store, _org, _project) = seeded().await?;
        let err = store.delete_member("nobody").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        Ok(())
    }
}
