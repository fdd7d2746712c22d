//! Local view preferences: which columns are visible, the roadmap view mode
//! and the current project per organization.
//!
//! Values are loaded once when a controller starts and written through on
//! every change. Absent, unparsable or (for columns) empty values fall back
//! to defaults; a corrupt preference file is treated as empty.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use flowboard_common::TaskStatus;
use serde::{Deserialize, Serialize};

use crate::errors::PrefsError;

pub const COLUMNS_KEY: &str = "flowboard_board_columns";
pub const ROADMAP_VIEW_KEY: &str = "flowboard_roadmap_view";
pub const CURRENT_PROJECT_KEY_PREFIX: &str = "flowboard_selected_project_id";

/// String key/value storage for preferences. Last write wins.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), PrefsError>;
    fn remove(&self, key: &str) -> Result<(), PrefsError>;
}

// ── File-backed store ─────────────────────────────────────────────────

/// Preferences kept in a single JSON object file.
pub struct FilePreferences {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FilePreferences {
    pub fn open(path: &Path) -> Self {
        let values = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(values) => values,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt preferences file");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self {
            path: path.to_path_buf(),
            values: Mutex::new(values),
        }
    }

    /// `<config dir>/flowboard/preferences.json`, or a relative fallback when
    /// the platform has no config dir.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("flowboard"))
            .unwrap_or_else(|| PathBuf::from(".flowboard"))
            .join("preferences.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| PrefsError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, content).map_err(|source| PrefsError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PrefsError> {
        let mut values = self.values.lock().map_err(|_| PrefsError::LockPoisoned)?;
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> Result<(), PrefsError> {
        let mut values = self.values.lock().map_err(|_| PrefsError::LockPoisoned)?;
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}

/// In-process store, used by the HTTP server when no file is configured and
/// by tests.
#[derive(Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.values
            .lock()
            .map_err(|_| PrefsError::LockPoisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PrefsError> {
        self.values
            .lock()
            .map_err(|_| PrefsError::LockPoisoned)?
            .remove(key);
        Ok(())
    }
}

// ── Typed values ──────────────────────────────────────────────────────

/// Set of visible board columns. Iterates in canonical column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSet(BTreeSet<TaskStatus>);

impl Default for ColumnSet {
    fn default() -> Self {
        Self::all()
    }
}

impl ColumnSet {
    pub fn all() -> Self {
        Self(TaskStatus::ALL.into_iter().collect())
    }

    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, status: TaskStatus) -> bool {
        self.0.contains(&status)
    }

    /// Add the column if hidden, remove it if visible. An empty result is
    /// allowed.
    pub fn toggle(&mut self, status: TaskStatus) {
        if !self.0.remove(&status) {
            self.0.insert(status);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = TaskStatus> + '_ {
        self.0.iter().copied()
    }

    /// Parse a stored JSON array of status strings. Unknown entries are
    /// dropped; an empty or unreadable value yields all six columns.
    pub fn from_stored(value: Option<&str>) -> Self {
        let Some(raw) = value else {
            return Self::all();
        };
        match serde_json::from_str::<Vec<String>>(raw) {
            Ok(items) => {
                let set: BTreeSet<TaskStatus> =
                    items.iter().filter_map(|s| s.parse().ok()).collect();
                if set.is_empty() {
                    Self::all()
                } else {
                    Self(set)
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored column set is not a JSON array, using defaults");
                Self::all()
            }
        }
    }

    pub fn to_stored(&self) -> String {
        let items: Vec<&str> = self.0.iter().map(|s| s.as_str()).collect();
        serde_json::to_string(&items).unwrap_or_else(|_| "[]".to_string())
    }
}

impl FromIterator<TaskStatus> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = TaskStatus>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Roadmap page layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    Board,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Board => "board",
        }
    }
}

impl std::str::FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(Self::List),
            "board" => Ok(Self::Board),
            _ => Err(format!("Invalid view mode: {}", s)),
        }
    }
}

// ── Typed layer ───────────────────────────────────────────────────────

/// Typed access to view preferences over any [`PreferenceStore`].
///
/// With `tenant_scoped` set, column and view-mode keys get an `_<org>`
/// suffix so each organization keeps its own layout. The current-project
/// key is always per organization.
#[derive(Clone)]
pub struct ViewPreferences {
    store: Arc<dyn PreferenceStore>,
    tenant_scoped: bool,
}

impl ViewPreferences {
    pub fn new(store: Arc<dyn PreferenceStore>, tenant_scoped: bool) -> Self {
        Self {
            store,
            tenant_scoped,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPreferences::new()), false)
    }

    fn scoped_key(&self, base: &str, org_id: Option<&str>) -> String {
        match org_id {
            Some(org) if self.tenant_scoped => format!("{}_{}", base, org),
            _ => base.to_string(),
        }
    }

    pub fn columns(&self, org_id: Option<&str>) -> ColumnSet {
        let key = self.scoped_key(COLUMNS_KEY, org_id);
        ColumnSet::from_stored(self.store.get(&key).as_deref())
    }

    pub fn save_columns(&self, org_id: Option<&str>, columns: &ColumnSet) -> Result<(), PrefsError> {
        let key = self.scoped_key(COLUMNS_KEY, org_id);
        self.store.set(&key, &columns.to_stored())
    }

    pub fn view_mode(&self, org_id: Option<&str>) -> ViewMode {
        let key = self.scoped_key(ROADMAP_VIEW_KEY, org_id);
        self.store
            .get(&key)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    pub fn save_view_mode(&self, org_id: Option<&str>, mode: ViewMode) -> Result<(), PrefsError> {
        let key = self.scoped_key(ROADMAP_VIEW_KEY, org_id);
        self.store.set(&key, mode.as_str())
    }

    pub fn current_project(&self, org_id: &str) -> Option<String> {
        self.store
            .get(&format!("{}_{}", CURRENT_PROJECT_KEY_PREFIX, org_id))
            .filter(|id| !id.trim().is_empty())
    }

    /// `None` clears the selection ("all projects").
    pub fn save_current_project(
        &self,
        org_id: &str,
        project_id: Option<&str>,
    ) -> Result<(), PrefsError> {
        let key = format!("{}_{}", CURRENT_PROJECT_KEY_PREFIX, org_id);
        match project_id {
            Some(id) => self.store.set(&key, id),
            None => self.store.remove(&key),
        }
    }

    pub fn store(&self) -> &Arc<dyn PreferenceStore> {
        &self.store
    }
}
