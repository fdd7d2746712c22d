//! Board API server command: `flowboard serve`.

use anyhow::Result;
use flowboard::config::FlowConfig;
use flowboard::web::server::{ServerConfig, start_server};

use super::open_preferences;
use crate::Cli;

pub async fn cmd_serve(
    cli: &Cli,
    config: &FlowConfig,
    port: Option<u16>,
    host: Option<String>,
    dev: bool,
) -> Result<()> {
    let repo = flowboard::store::open_store(config)?;
    let prefs = open_preferences(config);

    let server = ServerConfig {
        host: host.unwrap_or_else(|| config.toml.server.host.clone()),
        port: port.unwrap_or(config.toml.server.port),
        organization_id: cli.org.clone().or_else(|| config.organization_id()),
        dev_mode: dev,
    };
    if server.organization_id.is_none() {
        tracing::warn!("No organization configured; serving every organization's data");
    }

    start_server(repo, prefs, server).await
}
