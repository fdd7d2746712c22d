//! Task dialog commands: `task show|new|edit|delete`.

use anyhow::{Context, Result};
use console::style;
use flowboard::board::{BoardController, TaskDraft};
use flowboard_common::Task;

use super::{Session, confirm, is_none_value, print_notices, resolve_member, resolve_project};
use crate::{Cli, TaskCommands, TaskFields};

pub async fn cmd_task(session: &Session, cli: &Cli, command: &TaskCommands) -> Result<()> {
    match command {
        TaskCommands::Show { task } => {
            let (board, _rx) = session.board().await?;
            let id = board.resolve_task(task)?;
            let task = board
                .find_task(&id)
                .with_context(|| format!("Task {} not found", id))?;
            show_task(&board, &task);
        }
        TaskCommands::New {
            title,
            projects,
            fields,
        } => {
            session.require_org()?;
            let (board, mut rx) = session.board().await?;
            let state = board.snapshot();
            let mut project_ids = Vec::new();
            for reference in projects {
                project_ids.push(resolve_project(&state.projects, reference)?.id.clone());
            }

            let mut draft = TaskDraft::new(title.clone(), project_ids);
            apply_fields(session, &board, &mut draft, fields).await?;
            let result = board.save_task(draft, None).await;
            print_notices(&mut rx);

            for id in result? {
                if let Some(task) = board.find_task(&id) {
                    println!("Created {} {}", style(&task.code).bold(), task.title);
                }
            }
        }
        TaskCommands::Edit {
            task,
            title,
            project,
            fields,
        } => {
            let (board, mut rx) = session.board().await?;
            let id = board.resolve_task(task)?;
            let existing = board
                .find_task(&id)
                .with_context(|| format!("Task {} not found", id))?;

            let mut draft = TaskDraft::from_task(&existing);
            if let Some(title) = title {
                draft.title = title.clone();
            }
            if let Some(reference) = project {
                let projects = board.snapshot().projects;
                draft.project_ids = vec![resolve_project(&projects, reference)?.id.clone()];
            }
            apply_fields(session, &board, &mut draft, fields).await?;
            let result = board.save_task(draft, Some(id.as_str())).await;
            print_notices(&mut rx);
            result?;
            println!("Updated {}", style(&existing.code).bold());
        }
        TaskCommands::Delete { task } => {
            let (board, mut rx) = session.board().await?;
            let id = board.resolve_task(task)?;
            let code = board.find_task(&id).map(|t| t.code).unwrap_or_else(|| id.clone());

            board.request_delete(&id)?;
            if !confirm(cli, &format!("Delete task {}? This cannot be undone.", code)) {
                board.cancel_delete();
                println!("Delete cancelled");
                return Ok(());
            }
            let result = board.confirm_delete().await;
            print_notices(&mut rx);
            result?;
        }
    }
    Ok(())
}

/// Copy the optional CLI fields onto a draft, resolving version and
/// assignee references.
async fn apply_fields(
    session: &Session,
    board: &BoardController,
    draft: &mut TaskDraft,
    fields: &TaskFields,
) -> Result<()> {
    if let Some(description) = &fields.description {
        draft.description = Some(description.clone());
    }
    if let Some(status) = fields.status {
        draft.status = status;
    }
    if let Some(priority) = fields.priority {
        draft.priority = priority;
    }
    if let Some(kind) = fields.kind {
        draft.kind = Some(kind);
    }
    if let Some(reference) = &fields.version {
        draft.version_id = if is_none_value(reference) {
            None
        } else {
            let versions = board.snapshot().versions;
            let version = versions
                .iter()
                .filter(|v| draft.project_ids.contains(&v.project_id))
                .find(|v| v.id == *reference || v.name.eq_ignore_ascii_case(reference))
                .with_context(|| format!("Version {} not found in the task's project", reference))?;
            Some(version.id.clone())
        };
    }
    if let Some(reference) = &fields.assignee {
        draft.assignee_id = if is_none_value(reference) {
            None
        } else {
            let members = session.members().await?;
            Some(resolve_member(&members, reference)?.id.clone())
        };
    }
    if !fields.images.is_empty() {
        draft.image_urls = fields.images.join("\n");
    }
    Ok(())
}

fn show_task(board: &BoardController, task: &Task) {
    let state = board.snapshot();
    let project = state
        .projects
        .iter()
        .find(|p| p.id == task.project_id)
        .map(|p| p.name.as_str())
        .unwrap_or("-");

    println!();
    println!("{} {}", style(&task.code).bold().cyan(), style(&task.title).bold());
    println!();
    println!("  Project:   {}", project);
    println!("  Status:    {}", task.status.title());
    println!("  Priority:  {}", task.priority.as_str());
    if let Some(kind) = task.kind {
        println!("  Type:      {}", kind.as_str());
    }
    if let Some(version) = &task.version {
        println!("  Version:   {}", version.name);
    }
    if let Some(assignee) = &task.assignee {
        println!("  Assignee:  {}", assignee.name);
    }
    if let Some(created) = task.created_at {
        println!("  Created:   {}", created.format("%Y-%m-%d %H:%M"));
    }
    if let Some(description) = &task.description {
        println!();
        for line in description.lines() {
            println!("  {}", line);
        }
    }
    if !task.images.is_empty() {
        println!();
        println!("  Images:");
        for url in &task.images {
            println!("    {}", url);
        }
    }
    println!();
}
