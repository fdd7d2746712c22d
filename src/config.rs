//! Configuration for flowboard.
//!
//! Settings are layered: `flowboard.toml` → environment (`FLOWBOARD_*`, with
//! `.env` files loaded first) → CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [store]
//! backend = "rest"            # or "sqlite"
//! url = "https://xyz.example.co"
//! api_key = "public-anon-key"
//! access_token = "user-jwt"   # optional
//! sqlite_path = "/var/lib/flowboard/board.db"
//! timeout_secs = 30
//!
//! [workspace]
//! organization_id = "7c1e..."
//!
//! [preferences]
//! path = "/home/me/.config/flowboard/preferences.json"
//! tenant_scoped_views = false
//!
//! [logging]
//! level = "info"
//! format = "pretty"           # or "json"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 3141
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "flowboard.toml";

/// Which repository implementation backs the controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Hosted PostgREST-style API
    Rest,
    /// Local SQLite database (default)
    #[default]
    Sqlite,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Rest => write!(f, "rest"),
            StoreBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rest" => Ok(StoreBackend::Rest),
            "sqlite" => Ok(StoreBackend::Sqlite),
            _ => anyhow::bail!("Invalid store backend '{}'. Valid values: rest, sqlite", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Base URL of the hosted store (REST backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Project API key sent as `apikey`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Signed-in user's token; the API key is used as bearer when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Database file (SQLite backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite_path: Option<PathBuf>,
    /// Per-request timeout for the REST backend
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: None,
            api_key: None,
            access_token: None,
            sqlite_path: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceSection {
    /// Organization (tenant) the board is scoped to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Keep column visibility and roadmap view per organization
    #[serde(default)]
    pub tenant_scoped_views: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3141
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// The complete flowboard.toml structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FlowToml {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub workspace: WorkspaceSection,
    #[serde(default)]
    pub preferences: PreferencesSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub server: ServerSection,
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

impl FlowToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse flowboard.toml")
    }

    /// Load configuration from `path`, or defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize flowboard.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Override file values from `FLOWBOARD_*` variables. `lookup` is the
    /// variable source (`std::env::var` in production).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = non_empty("FLOWBOARD_BACKEND") {
            match backend.parse() {
                Ok(b) => self.store.backend = b,
                Err(e) => tracing::warn!(error = %e, "Ignoring FLOWBOARD_BACKEND"),
            }
        }
        if let Some(url) = non_empty("FLOWBOARD_STORE_URL") {
            self.store.url = Some(url);
        }
        if let Some(key) = non_empty("FLOWBOARD_API_KEY") {
            self.store.api_key = Some(key);
        }
        if let Some(token) = non_empty("FLOWBOARD_ACCESS_TOKEN") {
            self.store.access_token = Some(token);
        }
        if let Some(path) = non_empty("FLOWBOARD_SQLITE_PATH") {
            self.store.sqlite_path = Some(PathBuf::from(path));
        }
        if let Some(org) = non_empty("FLOWBOARD_ORG") {
            self.workspace.organization_id = Some(org);
        }
        if let Some(level) = non_empty("FLOWBOARD_LOG") {
            self.logging.level = level;
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.store.backend == StoreBackend::Rest {
            if self.store.url.is_none() {
                warnings.push("store.backend is 'rest' but store.url is not set".to_string());
            }
            if self.store.api_key.is_none() {
                warnings.push("store.backend is 'rest' but store.api_key is not set".to_string());
            }
        }
        if let Some(url) = &self.store.url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            warnings.push(format!("Invalid store.url '{}': must start with http:// or https://", url));
        }
        if self.store.timeout_secs == 0 {
            warnings.push("store.timeout_secs must be greater than 0".to_string());
        }
        if self.workspace.organization_id.is_none() {
            warnings.push(
                "workspace.organization_id is not set; tasks cannot be created".to_string(),
            );
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            warnings.push(format!(
                "Invalid logging.level '{}'. Valid values: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }
        if self.server.port == 0 {
            warnings.push("server.port must be greater than 0".to_string());
        }

        warnings
    }
}

/// Default config file location: `<config dir>/flowboard/flowboard.toml`.
pub fn default_config_path() -> PathBuf {
    app_dir(dirs::config_dir()).join(CONFIG_FILE_NAME)
}

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.map(|dir| dir.join("flowboard"))
        .unwrap_or_else(|| PathBuf::from(".flowboard"))
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// File the settings were read from (may not exist)
    pub config_path: PathBuf,
    pub toml: FlowToml,
    /// CLI override: debug logging
    pub verbose: bool,
}

impl FlowConfig {
    /// Resolve the config path (`--config`, then `$FLOWBOARD_CONFIG`, then
    /// the default location), read it and apply environment overrides.
    pub fn load(cli_path: Option<&Path>, verbose: bool) -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_sources(cli_path, verbose, |key| std::env::var(key).ok())
    }

    pub fn from_sources<F>(cli_path: Option<&Path>, verbose: bool, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = cli_path
            .map(Path::to_path_buf)
            .or_else(|| lookup("FLOWBOARD_CONFIG").map(PathBuf::from))
            .unwrap_or_else(default_config_path);

        let mut toml = FlowToml::load_or_default(&config_path)?;
        toml.apply_env(lookup);

        Ok(Self {
            config_path,
            toml,
            verbose,
        })
    }

    pub fn backend(&self) -> StoreBackend {
        self.toml.store.backend
    }

    pub fn organization_id(&self) -> Option<String> {
        self.toml.workspace.organization_id.clone()
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.toml
            .store
            .sqlite_path
            .clone()
            .unwrap_or_else(|| app_dir(dirs::data_dir()).join("flowboard.db"))
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.toml
            .preferences
            .path
            .clone()
            .unwrap_or_else(crate::board::prefs::FilePreferences::default_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.toml.store.timeout_secs.max(1))
    }

    /// Effective log filter: `--verbose` wins over the configured level.
    pub fn log_level(&self) -> String {
        if self.verbose {
            "debug".to_string()
        } else {
            self.toml.logging.level.clone()
        }
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
