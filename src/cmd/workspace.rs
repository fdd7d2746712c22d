//! Workspace entities: `project`, `member` and `org` commands.

use anyhow::{Context, Result, bail};
use console::style;
use flowboard::config::{FlowConfig, FlowToml};
use flowboard::store::rows::DEFAULT_PROJECT_COLOR;
use flowboard_common::{MemberPatch, NewMember, NewOrganization, NewProject, ProjectPatch};

use super::{Session, confirm, is_none_value, resolve_member, resolve_project};
use crate::{Cli, MemberCommands, OrgCommands, ProjectCommands};

pub async fn cmd_project(session: &Session, cli: &Cli, command: &ProjectCommands) -> Result<()> {
    match command {
        ProjectCommands::List => {
            let projects = session
                .repo
                .list_projects(session.org.as_deref())
                .await
                .context("Failed to load projects")?;
            let current = session
                .org
                .as_deref()
                .and_then(|org| session.prefs.current_project(org));

            if projects.is_empty() {
                println!("No projects yet. Create one with 'flowboard project add'.");
                return Ok(());
            }
            println!();
            println!("  {:<8} {:<24} {:<9} Id", "Prefix", "Name", "Color");
            for project in &projects {
                let marker = if current.as_deref() == Some(project.id.as_str()) {
                    style("*").green().bold().to_string()
                } else {
                    " ".to_string()
                };
                println!(
                    "{} {:<8} {:<24} {:<9} {}",
                    marker, project.prefix, project.name, project.color, project.id
                );
            }
            println!();
        }
        ProjectCommands::Add {
            name,
            prefix,
            color,
        } => {
            let org = session.require_org()?;
            let project = NewProject {
                name: name.trim().to_string(),
                prefix: prefix.trim().to_uppercase(),
                color: color
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PROJECT_COLOR.to_string()),
            };
            project.validate().map_err(anyhow::Error::msg)?;
            let created = session
                .repo
                .create_project(project, org)
                .await
                .context("Failed to create project")?;
            tracing::info!(project_id = %created.id, "Project created");
            println!("Created project {} ({})", style(&created.name).bold(), created.prefix);
        }
        ProjectCommands::Edit {
            project,
            name,
            prefix,
            color,
        } => {
            let projects = session
                .repo
                .list_projects(session.org.as_deref())
                .await
                .context("Failed to load projects")?;
            let found = resolve_project(&projects, project)?;
            let patch = ProjectPatch {
                name: name.as_ref().map(|n| n.trim().to_string()),
                prefix: prefix.as_ref().map(|p| p.trim().to_uppercase()),
                color: color.clone(),
            };
            if patch.is_empty() {
                bail!("Nothing to change: pass --name, --prefix or --color");
            }
            patch.validate().map_err(anyhow::Error::msg)?;
            session
                .repo
                .update_project(&found.id, patch)
                .await
                .context("Failed to update project")?;
            tracing::info!(project_id = %found.id, "Project updated");
            println!("Updated project {}", style(name.as_deref().unwrap_or(&found.name)).bold());
        }
        ProjectCommands::Use { project } => {
            let (board, _rx) = session.board().await?;
            let projects = board.snapshot().projects;
            let found = resolve_project(&projects, project)?;
            board.set_current_project(Some(found.id.as_str()))?;
            println!("Board scoped to {}", style(&found.name).bold());
        }
        ProjectCommands::Clear => {
            let (board, _rx) = session.board().await?;
            board.set_current_project(None)?;
            println!("Board shows all projects");
        }
        ProjectCommands::Delete { project } => {
            let projects = session
                .repo
                .list_projects(session.org.as_deref())
                .await
                .context("Failed to load projects")?;
            let found = resolve_project(&projects, project)?;
            if !confirm(
                cli,
                &format!("Delete project {} and all of its tasks and versions?", found.name),
            ) {
                println!("Delete cancelled");
                return Ok(());
            }
            session
                .repo
                .delete_project(&found.id)
                .await
                .context("Failed to delete project")?;
            println!("Deleted project {}", found.name);
        }
    }
    Ok(())
}

pub async fn cmd_member(session: &Session, cli: &Cli, command: &MemberCommands) -> Result<()> {
    match command {
        MemberCommands::List => {
            let members = session.members().await?;
            if members.is_empty() {
                println!("No team members yet.");
                return Ok(());
            }
            println!();
            for member in &members {
                let mut line = format!("  {:<24}", member.name);
                if let Some(nickname) = &member.nickname {
                    line.push_str(&format!(" @{:<12}", nickname));
                }
                if let Some(role) = &member.role {
                    line.push_str(&format!(" {}", style(role).dim()));
                }
                println!("{}", line);
            }
            println!();
        }
        MemberCommands::Add {
            name,
            nickname,
            role,
        } => {
            let org = session.require_org()?;
            if name.trim().is_empty() {
                bail!("Member name is required");
            }
            let member = session
                .repo
                .create_member(
                    NewMember {
                        name: name.trim().to_string(),
                        nickname: nickname.clone(),
                        role: role.clone(),
                        avatar_url: None,
                    },
                    org,
                )
                .await
                .context("Failed to add team member")?;
            println!("Added {}", style(&member.name).bold());
        }
        MemberCommands::Edit {
            member,
            name,
            nickname,
            role,
        } => {
            let members = session.members().await?;
            let found = resolve_member(&members, member)?;
            let patch = member_patch(name.as_deref(), nickname.as_deref(), role.as_deref())?;
            if patch.is_empty() {
                bail!("Nothing to change: pass --name, --nickname or --role");
            }
            session
                .repo
                .update_member(&found.id, patch)
                .await
                .context("Failed to update team member")?;
            println!("Updated {}", style(name.as_deref().unwrap_or(&found.name)).bold());
        }
        MemberCommands::Remove { member } => {
            let members = session.members().await?;
            let found = resolve_member(&members, member)?;
            if !confirm(cli, &format!("Remove {} from the team?", found.name)) {
                println!("Remove cancelled");
                return Ok(());
            }
            session
                .repo
                .delete_member(&found.id)
                .await
                .context("Failed to remove team member")?;
            println!("Removed {}", found.name);
        }
    }
    Ok(())
}

/// Build a member update; "none" clears an optional field.
fn member_patch(
    name: Option<&str>,
    nickname: Option<&str>,
    role: Option<&str>,
) -> Result<MemberPatch> {
    if let Some(name) = name
        && name.trim().is_empty()
    {
        bail!("Member name is required");
    }
    let optional = |value: Option<&str>| {
        value.map(|v| (!is_none_value(v)).then(|| v.trim().to_string()))
    };
    Ok(MemberPatch {
        name: name.map(|n| n.trim().to_string()),
        nickname: optional(nickname),
        role: optional(role),
        avatar_url: None,
    })
}

pub async fn cmd_org(cli: &Cli, config: &FlowConfig, command: &OrgCommands) -> Result<()> {
    let repo = flowboard::store::open_store(config)?;
    match command {
        OrgCommands::List => {
            let orgs = repo
                .list_organizations()
                .await
                .context("Failed to load organizations")?;
            let current = cli.org.clone().or_else(|| config.organization_id());
            if orgs.is_empty() {
                println!("No organizations yet. Create one with 'flowboard org add'.");
                return Ok(());
            }
            for org in &orgs {
                let marker = if current.as_deref() == Some(org.id.as_str()) {
                    style("*").green().bold().to_string()
                } else {
                    " ".to_string()
                };
                println!("{} {:<24} {}", marker, org.name, org.id);
            }
        }
        OrgCommands::Add { name, default } => {
            if name.trim().is_empty() {
                bail!("Organization name is required");
            }
            let org = repo
                .create_organization(NewOrganization {
                    name: name.trim().to_string(),
                    owner_id: None,
                })
                .await
                .context("Failed to create organization")?;
            println!("Created organization {} ({})", style(&org.name).bold(), org.id);

            if *default {
                let mut toml = FlowToml::load_or_default(&config.config_path)?;
                toml.workspace.organization_id = Some(org.id.clone());
                toml.save(&config.config_path)?;
                println!("Set as default in {}", config.config_path.display());
            }
        }
    }
    Ok(())
}
