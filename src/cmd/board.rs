//! Board view and status changes: `board`, `dashboard`, `move`, `bulk`,
//! `select`, `columns`.

use anyhow::{Context, Result, bail};
use console::style;
use flowboard::board::filter::BoardColumn;
use flowboard::board::{BoardController, BoardStats, MoveOutcome, PriorityFilter, VersionFilter};
use flowboard_common::{Priority, Task, TaskStatus};

use super::{Session, print_notices, resolve_project};
use crate::FilterArgs;

/// Apply CLI filter flags through the controller. `--project` is remembered
/// as the current project for the organization.
pub fn apply_filter(board: &BoardController, filter: &FilterArgs) -> Result<()> {
    if let Some(reference) = &filter.project {
        let projects = board.snapshot().projects;
        let id = resolve_project(&projects, reference)?.id.clone();
        board.set_current_project(Some(id.as_str()))?;
    }
    if let Some(search) = &filter.search {
        board.set_search(search.clone());
    }
    if let Some(priority) = &filter.priority {
        let priority: PriorityFilter = priority.parse().map_err(anyhow::Error::msg)?;
        board.set_priority_filter(priority);
    }
    if let Some(version) = &filter.version {
        let version = match VersionFilter::from(version.as_str()) {
            VersionFilter::All => VersionFilter::All,
            VersionFilter::Only(reference) => {
                let found = board
                    .version_options()
                    .into_iter()
                    .find(|v| v.id == reference || v.name.eq_ignore_ascii_case(&reference))
                    .with_context(|| format!("Version {} not found", reference))?;
                VersionFilter::Only(found.id)
            }
        };
        board.set_version_filter(version);
    }
    Ok(())
}

fn priority_tag(priority: Priority) -> String {
    let tag = format!("[{}]", priority.as_str());
    match priority {
        Priority::Critical => style(tag).red().bold().to_string(),
        Priority::High => style(tag).yellow().to_string(),
        Priority::Medium => tag,
        Priority::Low => style(tag).dim().to_string(),
    }
}

pub fn task_line(task: &Task) -> String {
    let mut line = format!(
        "{:<10} {:<11} {}",
        task.code,
        priority_tag(task.priority),
        task.title
    );
    if let Some(assignee) = &task.assignee {
        line.push_str(&format!(" @{}", assignee.nickname.as_deref().unwrap_or(&assignee.name)));
    }
    if let Some(version) = &task.version {
        line.push_str(&format!(" {}", style(format!("v{}", version.name)).cyan()));
    }
    line
}

pub fn render_board(columns: &[BoardColumn]) -> String {
    let mut out = String::new();
    for column in columns {
        out.push_str(&format!(
            "{} {}\n",
            style(column.title).bold(),
            style(format!("({})", column.tasks.len())).dim()
        ));
        if column.tasks.is_empty() {
            out.push_str(&format!("  {}\n", style("-").dim()));
        }
        for task in &column.tasks {
            out.push_str(&format!("  {}\n", task_line(task)));
        }
        out.push('\n');
    }
    out
}

pub async fn cmd_board(session: &Session, filter: &FilterArgs, json: bool) -> Result<()> {
    let (board, _rx) = session.board().await?;
    apply_filter(&board, filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&board.snapshot())?);
        return Ok(());
    }

    let state = board.snapshot();
    println!();
    if let Some(project) = state
        .filter
        .project_id
        .as_deref()
        .and_then(|id| state.projects.iter().find(|p| p.id == id))
    {
        println!("{} {}", style("Project:").dim(), project.name);
    }
    if !state.filter.search.is_empty() {
        println!("{} \"{}\"", style("Search:").dim(), state.filter.search);
    }
    if state.filter.priority != PriorityFilter::All {
        println!("{} {}", style("Priority:").dim(), state.filter.priority);
    }
    println!();
    print!("{}", render_board(&board.columns()));
    Ok(())
}

pub fn render_dashboard(stats: &BoardStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("  {:<17}{}\n", "Total tasks:", stats.total_tasks));
    out.push_str(&format!("  {:<17}{}\n", "Completed:", stats.completed_tasks));
    out.push_str(&format!("  {:<17}{}\n", "Active versions:", stats.active_versions));
    out.push('\n');
    out.push_str(&format!("{}\n", style("Recent tasks").bold()));
    if stats.recent_tasks.is_empty() {
        out.push_str("  No tasks yet.\n");
    }
    for task in &stats.recent_tasks {
        out.push_str(&format!(
            "  {}  {}\n",
            task_line(task),
            style(task.status.title()).dim()
        ));
    }
    out
}

pub async fn cmd_dashboard(session: &Session, json: bool) -> Result<()> {
    let (board, _rx) = session.board().await?;
    let stats = board.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!();
    print!("{}", render_dashboard(&stats));
    println!();
    Ok(())
}

fn report_outcome(outcome: MoveOutcome, status: TaskStatus) -> Result<()> {
    match outcome {
        MoveOutcome::Moved { task_ids, .. } => {
            println!(
                "Moved {} task{} to {}",
                task_ids.len(),
                if task_ids.len() == 1 { "" } else { "s" },
                status.title()
            );
            Ok(())
        }
        MoveOutcome::Unchanged => {
            println!("Nothing to change: already in {}", status.title());
            Ok(())
        }
        MoveOutcome::Reconciled { error, .. } => {
            bail!("Failed to update tasks: {}. Board reloaded from the store.", error)
        }
        MoveOutcome::NoTarget => bail!("No target column"),
    }
}

pub async fn cmd_move(session: &Session, task: &str, status: TaskStatus) -> Result<()> {
    let (board, mut rx) = session.board().await?;
    let id = board.resolve_task(task)?;

    board.begin_drag(&id);
    let outcome = board.end_drag(&id, Some(status)).await;
    print_notices(&mut rx);
    report_outcome(outcome, status)
}

pub async fn cmd_bulk(session: &Session, status: TaskStatus, tasks: &[String]) -> Result<()> {
    let (board, mut rx) = session.board().await?;
    for reference in tasks {
        let id = board.resolve_task(reference)?;
        if !board.selected().contains(&id) {
            board.toggle_select(&id);
        }
    }

    let outcome = board.bulk_set_status(status).await;
    print_notices(&mut rx);
    report_outcome(outcome, status)
}

pub async fn cmd_select(session: &Session, filter: &FilterArgs) -> Result<()> {
    use dialoguer::{MultiSelect, Select};

    let (board, mut rx) = session.board().await?;
    apply_filter(&board, filter)?;

    let tasks = board.visible_tasks();
    if tasks.is_empty() {
        println!("No tasks match the current filter.");
        return Ok(());
    }

    let items: Vec<String> = tasks
        .iter()
        .map(|t| format!("{:<10} {} ({})", t.code, t.title, t.status.title()))
        .collect();
    let chosen = MultiSelect::new()
        .with_prompt("Select tasks (space to toggle, enter to confirm)")
        .items(&items)
        .interact()
        .context("Failed to read selection")?;
    if chosen.is_empty() {
        println!("No tasks selected.");
        return Ok(());
    }

    let titles: Vec<&str> = TaskStatus::ALL.iter().map(|s| s.title()).collect();
    let target = Select::new()
        .with_prompt("Move to")
        .items(&titles)
        .default(0)
        .interact()
        .context("Failed to read target column")?;
    let status = TaskStatus::ALL[target];

    for index in chosen {
        board.toggle_select(&tasks[index].id);
    }
    let outcome = board.bulk_set_status(status).await;
    print_notices(&mut rx);
    report_outcome(outcome, status)
}

pub async fn cmd_columns(session: &Session, toggle: &[TaskStatus]) -> Result<()> {
    let board = BoardController::new(session.repo.clone(), session.prefs.clone(), session.org.clone());
    for status in toggle {
        board.toggle_column(*status)?;
    }

    let visible = board.visible_columns();
    println!();
    for status in TaskStatus::ALL {
        let mark = if visible.contains(status) {
            style("[x]").green().to_string()
        } else {
            "[ ]".to_string()
        };
        println!("  {} {:<12} {}", mark, status.as_str(), status.title());
    }
    println!();
    if visible.is_empty() {
        println!("All columns are hidden; the board will show every column next time.");
    }
    Ok(())
}
