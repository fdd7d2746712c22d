//! CLI command implementations.
//!
//! | Module      | Commands handled                                   |
//! |-------------|----------------------------------------------------|
//! | `board`     | `Board`, `Dashboard`, `Move`, `Bulk`, `Select`,    |
//! |             | `Columns`                                          |
//! | `task`      | `Task`                                             |
//! | `roadmap`   | `Roadmap`, `Version`                               |
//! | `workspace` | `Project`, `Member`, `Org`                         |
//! | `config`    | `Config`                                           |
//! | `serve`     | `Serve`                                            |

pub mod board;
pub mod config;
pub mod roadmap;
pub mod serve;
pub mod task;
pub mod workspace;

pub use board::{cmd_board, cmd_bulk, cmd_columns, cmd_dashboard, cmd_move, cmd_select};
pub use config::cmd_config;
pub use roadmap::{cmd_roadmap, cmd_version};
pub use serve::cmd_serve;
pub use task::cmd_task;
pub use workspace::{cmd_member, cmd_org, cmd_project};

use std::sync::Arc;

use anyhow::{Context, Result};
use flowboard::board::{
    BoardController, BoardEvent, FilePreferences, RoadmapController, ViewPreferences,
};
use flowboard::config::FlowConfig;
use flowboard_common::{Project, Repository, TeamMember};
use tokio::sync::broadcast;

use super::Cli;

/// Store, preferences and organization shared by one CLI invocation.
pub struct Session {
    pub repo: Arc<dyn Repository>,
    pub prefs: ViewPreferences,
    pub org: Option<String>,
}

impl Session {
    pub fn open(cli: &Cli, config: &FlowConfig) -> Result<Self> {
        let repo = flowboard::store::open_store(config)?;
        Ok(Self {
            repo,
            prefs: open_preferences(config),
            org: cli.org.clone().or_else(|| config.organization_id()),
        })
    }

    pub fn require_org(&self) -> Result<&str> {
        self.org.as_deref().context(
            "No organization selected. Pass --org or set workspace.organization_id in flowboard.toml",
        )
    }

    /// Board controller with data loaded. The returned receiver sees every
    /// event published after loading.
    pub async fn board(&self) -> Result<(BoardController, broadcast::Receiver<BoardEvent>)> {
        let board = BoardController::new(self.repo.clone(), self.prefs.clone(), self.org.clone());
        board.load_all().await.context("Failed to load board")?;
        let rx = board.subscribe();
        Ok((board, rx))
    }

    pub async fn roadmap(&self) -> Result<(RoadmapController, broadcast::Receiver<BoardEvent>)> {
        let roadmap =
            RoadmapController::new(self.repo.clone(), self.prefs.clone(), self.org.clone());
        roadmap.load_all().await.context("Failed to load roadmap")?;
        let rx = roadmap.subscribe();
        Ok((roadmap, rx))
    }

    pub async fn members(&self) -> Result<Vec<TeamMember>> {
        self.repo
            .list_members(self.org.as_deref())
            .await
            .context("Failed to load team members")
    }
}

pub fn open_preferences(config: &FlowConfig) -> ViewPreferences {
    let store = FilePreferences::open(&config.preferences_path());
    ViewPreferences::new(
        Arc::new(store),
        config.toml.preferences.tenant_scoped_views,
    )
}

/// Print the success and error notices published since the last call.
pub fn print_notices(rx: &mut broadcast::Receiver<BoardEvent>) {
    while let Ok(event) = rx.try_recv() {
        if let BoardEvent::Notice(notice) = event {
            if notice.is_error() {
                eprintln!("{} {}", console::style("✗").red().bold(), notice.message);
            } else {
                println!("{} {}", console::style("✓").green().bold(), notice.message);
            }
        }
    }
}

/// `"none"` or blank clears an optional reference.
pub fn is_none_value(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("none")
}

/// Find a project by id, prefix or name (prefix and name ignore case).
pub fn resolve_project<'a>(projects: &'a [Project], reference: &str) -> Result<&'a Project> {
    projects
        .iter()
        .find(|p| p.id == reference)
        .or_else(|| {
            projects
                .iter()
                .find(|p| p.prefix.eq_ignore_ascii_case(reference))
        })
        .or_else(|| projects.iter().find(|p| p.name.eq_ignore_ascii_case(reference)))
        .with_context(|| format!("Project {} not found", reference))
}

/// Find a team member by id, name or nickname (names ignore case).
pub fn resolve_member<'a>(members: &'a [TeamMember], reference: &str) -> Result<&'a TeamMember> {
    members
        .iter()
        .find(|m| m.id == reference)
        .or_else(|| {
            members.iter().find(|m| {
                m.name.eq_ignore_ascii_case(reference)
                    || m.nickname
                        .as_deref()
                        .is_some_and(|n| n.eq_ignore_ascii_case(reference))
            })
        })
        .with_context(|| format!("Team member {} not found", reference))
}

/// Ask before a destructive action unless `--yes` was given.
pub fn confirm(cli: &Cli, prompt: &str) -> bool {
    if cli.yes {
        return true;
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false)
}
