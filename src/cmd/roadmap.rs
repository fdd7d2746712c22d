//! Roadmap commands: `roadmap` and `version new|edit|status|delete`.

use anyhow::{Context, Result, bail};
use console::style;
use flowboard::board::roadmap::VersionStatusOutcome;
use flowboard::board::{RoadmapController, VersionDraft, ViewMode};
use flowboard_common::{Project, Version, VersionStatus};

use super::{Session, confirm, is_none_value, print_notices, resolve_member, resolve_project};
use crate::{Cli, VersionCommands, VersionFields};

fn status_label(status: VersionStatus) -> String {
    let label = status.as_str().replace('_', " ");
    match status {
        VersionStatus::Planned => style(label).dim().to_string(),
        VersionStatus::InDevelopment => style(label).yellow().to_string(),
        VersionStatus::InStores => style(label).green().to_string(),
        VersionStatus::Deprecated => style(label).red().to_string(),
    }
}

fn version_line(version: &Version, projects: &[Project]) -> String {
    let prefix = projects
        .iter()
        .find(|p| p.id == version.project_id)
        .map(|p| p.prefix.as_str())
        .unwrap_or("-");
    let mut line = format!(
        "{:<6} {:<16} {}",
        prefix,
        version.name,
        version.release_date.as_deref().unwrap_or("no date")
    );
    if let Some(owner) = &version.owner {
        line.push_str(&format!("  @{}", owner.name));
    }
    line
}

pub fn render_roadmap(roadmap: &RoadmapController, project_id: Option<&str>) -> String {
    let state = roadmap.snapshot();
    let mut out = String::new();
    match state.view_mode {
        ViewMode::List => {
            let versions = roadmap.filtered_versions(project_id);
            if versions.is_empty() {
                out.push_str("No versions yet.\n");
            }
            for version in &versions {
                out.push_str(&format!(
                    "  {}  {}\n",
                    version_line(version, &state.projects),
                    status_label(version.status)
                ));
            }
        }
        ViewMode::Board => {
            for column in roadmap.versions_by_status(project_id) {
                out.push_str(&format!(
                    "{} {}\n",
                    style(status_label(column.status)).bold(),
                    style(format!("({})", column.versions.len())).dim()
                ));
                for version in &column.versions {
                    out.push_str(&format!("  {}\n", version_line(version, &state.projects)));
                }
                out.push('\n');
            }
        }
    }
    out
}

pub async fn cmd_roadmap(
    session: &Session,
    project: Option<&str>,
    view: Option<&str>,
    json: bool,
) -> Result<()> {
    let (roadmap, _rx) = session.roadmap().await?;
    if let Some(view) = view {
        let mode: ViewMode = view.parse().map_err(anyhow::Error::msg)?;
        roadmap.set_view_mode(mode)?;
    }

    let project_id = match project {
        Some(reference) => {
            let projects = roadmap.snapshot().projects;
            Some(resolve_project(&projects, reference)?.id.clone())
        }
        None => None,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&roadmap.snapshot())?);
        return Ok(());
    }

    println!();
    print!("{}", render_roadmap(&roadmap, project_id.as_deref()));
    println!();
    Ok(())
}

fn find_version(roadmap: &RoadmapController, reference: &str) -> Result<Version> {
    roadmap
        .find_version(reference)
        .with_context(|| format!("Version {} not found", reference))
}

async fn apply_fields(session: &Session, draft: &mut VersionDraft, fields: &VersionFields) -> Result<()> {
    if let Some(status) = fields.status {
        draft.status = status;
    }
    if let Some(date) = &fields.release_date {
        draft.release_date = if is_none_value(date) {
            None
        } else {
            chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("Invalid release date '{}': expected YYYY-MM-DD", date))?;
            Some(date.clone())
        };
    }
    if let Some(notes) = &fields.notes {
        draft.notes = Some(notes.clone());
    }
    if let Some(reference) = &fields.owner {
        draft.owner_id = if is_none_value(reference) {
            None
        } else {
            let members = session.members().await?;
            Some(resolve_member(&members, reference)?.id.clone())
        };
    }
    Ok(())
}

pub async fn cmd_version(session: &Session, cli: &Cli, command: &VersionCommands) -> Result<()> {
    let (roadmap, mut rx) = session.roadmap().await?;
    match command {
        VersionCommands::New {
            name,
            project,
            fields,
        } => {
            session.require_org()?;
            let projects = roadmap.snapshot().projects;
            let project_id = resolve_project(&projects, project)?.id.clone();
            let mut draft = VersionDraft::new(name.clone(), project_id);
            apply_fields(session, &mut draft, fields).await?;
            let result = roadmap.save_version(draft, None).await;
            print_notices(&mut rx);
            result?;
        }
        VersionCommands::Edit {
            version,
            name,
            project,
            fields,
        } => {
            let existing = find_version(&roadmap, version)?;
            let mut draft = VersionDraft::from_version(&existing);
            if let Some(name) = name {
                draft.name = name.clone();
            }
            if let Some(reference) = project {
                let projects = roadmap.snapshot().projects;
                draft.project_id = resolve_project(&projects, reference)?.id.clone();
            }
            apply_fields(session, &mut draft, fields).await?;
            let result = roadmap.save_version(draft, Some(existing.id.as_str())).await;
            print_notices(&mut rx);
            result?;
        }
        VersionCommands::Status { version, status } => {
            let existing = find_version(&roadmap, version)?;
            let outcome = roadmap.set_version_status(&existing.id, *status).await?;
            print_notices(&mut rx);
            match outcome {
                VersionStatusOutcome::Unchanged => {
                    println!("{} is already {}", existing.name, status_label(*status));
                }
                VersionStatusOutcome::Updated => {}
                VersionStatusOutcome::Reconciled { error } => {
                    bail!("Failed to update version: {}", error)
                }
            }
        }
        VersionCommands::Delete { version } => {
            let existing = find_version(&roadmap, version)?;
            roadmap.request_delete(&existing.id)?;
            if !confirm(cli, &format!("Delete version {}?", existing.name)) {
                roadmap.cancel_delete();
                println!("Delete cancelled");
                return Ok(());
            }
            let result = roadmap.confirm_delete().await;
            print_notices(&mut rx);
            result?;
        }
    }
    Ok(())
}
