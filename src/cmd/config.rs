//! Configuration view and validation commands: `flowboard config`.

use anyhow::Result;
use flowboard::config::{FlowConfig, FlowToml};

use crate::ConfigCommands;

fn mask(secret: &Option<String>) -> String {
    match secret.as_deref() {
        None => "(not set)".to_string(),
        Some(s) if s.chars().count() <= 8 => "********".to_string(),
        Some(s) => format!("{}********", s.chars().take(4).collect::<String>()),
    }
}

fn print_effective(config: &FlowConfig) {
    let toml = &config.toml;
    println!("[store]");
    println!("  backend = \"{}\"", toml.store.backend);
    if let Some(url) = &toml.store.url {
        println!("  url = \"{}\"", url);
    }
    println!("  api_key = {}", mask(&toml.store.api_key));
    println!("  access_token = {}", mask(&toml.store.access_token));
    println!("  sqlite_path = \"{}\"", config.sqlite_path().display());
    println!("  timeout_secs = {}", toml.store.timeout_secs);
    println!();
    println!("[workspace]");
    match &toml.workspace.organization_id {
        Some(org) => println!("  organization_id = \"{}\"", org),
        None => println!("  organization_id = (not set)"),
    }
    println!();
    println!("[preferences]");
    println!("  path = \"{}\"", config.preferences_path().display());
    println!("  tenant_scoped_views = {}", toml.preferences.tenant_scoped_views);
    println!();
    println!("[logging]");
    println!("  level = \"{}\"", config.log_level());
    println!("  format = \"{:?}\"", toml.logging.format);
    println!();
    println!("[server]");
    println!("  host = \"{}\"", toml.server.host);
    println!("  port = {}", toml.server.port);
    println!();
}

pub fn cmd_config(config: &FlowConfig, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = &config.config_path;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("flowboard configuration");
            println!("=======================");
            println!();
            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No flowboard.toml found at {}", config_path.display());
                println!("Run 'flowboard config init' to create one.");
            }
            println!();
            println!("Effective values (with env/CLI overrides):");
            println!();
            print_effective(config);
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("flowboard.toml already exists at {}", config_path.display());
                println!("Edit it directly or delete it first.");
                return Ok(());
            }
            let mut toml = FlowToml::default();
            toml.store.sqlite_path = Some(config.sqlite_path());
            toml.workspace.organization_id = config.organization_id();
            toml.save(config_path)?;
            println!("Created {}", config_path.display());
        }
    }
    Ok(())
}
