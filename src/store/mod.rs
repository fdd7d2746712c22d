//! Backing stores implementing [`flowboard_common::Repository`].
//!
//! - `rest`: hosted PostgREST-style API (`/rest/v1/<table>`)
//! - `sqlite`: local single-file database with the same schema
//! - `rows`: wire/row shapes shared by both

pub mod rest;
pub mod rows;
pub mod sqlite;

use std::sync::Arc;

use anyhow::{Context, Result};
use flowboard_common::Repository;

use crate::config::{FlowConfig, StoreBackend};

/// Open the repository selected by the configuration.
pub fn open_store(config: &FlowConfig) -> Result<Arc<dyn Repository>> {
    match config.backend() {
        StoreBackend::Rest => {
            let store = &config.toml.store;
            let url = store
                .url
                .as_deref()
                .context("store.url is required for the rest backend")?;
            let api_key = store
                .api_key
                .as_deref()
                .context("store.api_key is required for the rest backend")?;
            let rest = rest::RestStore::new(
                url,
                api_key,
                store.access_token.clone(),
                config.request_timeout(),
            )?;
            tracing::debug!(url, "Using REST store");
            Ok(Arc::new(rest))
        }
        StoreBackend::Sqlite => {
            let path = config.sqlite_path();
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let db = sqlite::SqliteStore::open(&path)
                .with_context(|| format!("Failed to open database at {}", path.display()))?;
            tracing::debug!(path = %path.display(), "Using SQLite store");
            Ok(Arc::new(db))
        }
    }
}
