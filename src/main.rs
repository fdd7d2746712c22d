use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use flowboard_common::{Priority, TaskKind, TaskStatus, VersionStatus};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "flowboard")]
#[command(version, about = "Kanban board and release roadmap for your team")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip confirmation prompts
    #[arg(long, global = true)]
    pub yes: bool,

    /// Path to flowboard.toml (defaults to $FLOWBOARD_CONFIG or the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Organization id; overrides workspace.organization_id
    #[arg(long, global = true)]
    pub org: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the board
    Board {
        #[command(flatten)]
        filter: FilterArgs,
        /// Print the board state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show organization totals and the newest tasks
    Dashboard {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a task to another column
    Move {
        /// Task id or code (e.g. FIT-101)
        task: String,
        status: TaskStatus,
    },
    /// Move several tasks to one column
    Bulk {
        status: TaskStatus,
        /// Task ids or codes
        #[arg(required = true)]
        tasks: Vec<String>,
    },
    /// Pick tasks interactively and move them together
    Select {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Show or toggle visible columns
    Columns {
        /// Columns to toggle
        toggle: Vec<TaskStatus>,
    },
    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Show the release roadmap
    Roadmap {
        /// Only versions of this project (id or prefix)
        #[arg(long)]
        project: Option<String>,
        /// Switch and remember the layout: list or board
        #[arg(long)]
        view: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Manage versions
    Version {
        #[command(subcommand)]
        command: VersionCommands,
    },
    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Manage team members
    Member {
        #[command(subcommand)]
        command: MemberCommands,
    },
    /// Manage organizations
    Org {
        #[command(subcommand)]
        command: OrgCommands,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Serve the board API and event stream
    Serve {
        /// Port to serve on (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind (defaults to server.host)
        #[arg(long)]
        host: Option<String>,
        /// Allow cross-origin requests
        #[arg(long)]
        dev: bool,
    },
}

#[derive(Args, Clone, Default)]
pub struct FilterArgs {
    /// Only this project (id or prefix)
    #[arg(long)]
    pub project: Option<String>,
    /// Match title or description
    #[arg(short, long)]
    pub search: Option<String>,
    /// Priority or "all"
    #[arg(long)]
    pub priority: Option<String>,
    /// Version id, name or "all"
    #[arg(long)]
    pub version: Option<String>,
}

#[derive(Args, Clone, Default)]
pub struct TaskFields {
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub status: Option<TaskStatus>,
    #[arg(long)]
    pub priority: Option<Priority>,
    #[arg(long)]
    pub kind: Option<TaskKind>,
    /// Version id or name ("none" clears it)
    #[arg(long)]
    pub version: Option<String>,
    /// Assignee id or name ("none" clears it)
    #[arg(long)]
    pub assignee: Option<String>,
    /// Image URL; repeat for several
    #[arg(long = "image")]
    pub images: Vec<String>,
}

#[derive(Subcommand, Clone)]
pub enum TaskCommands {
    /// Show one task
    Show { task: String },
    /// Create a task in one or more projects
    New {
        title: String,
        /// Project id or prefix; repeat to create one task per project
        #[arg(short, long = "project", required = true)]
        projects: Vec<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Edit a task
    Edit {
        task: String,
        #[arg(long)]
        title: Option<String>,
        /// Move the task to another project
        #[arg(long)]
        project: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Delete a task
    Delete { task: String },
}

#[derive(Args, Clone, Default)]
pub struct VersionFields {
    #[arg(long)]
    pub status: Option<VersionStatus>,
    /// YYYY-MM-DD ("none" clears it)
    #[arg(long)]
    pub release_date: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Owner id or name ("none" clears it)
    #[arg(long)]
    pub owner: Option<String>,
}

#[derive(Subcommand, Clone)]
pub enum VersionCommands {
    /// Create a version
    New {
        name: String,
        #[arg(short, long)]
        project: String,
        #[command(flatten)]
        fields: VersionFields,
    },
    /// Edit a version
    Edit {
        version: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[command(flatten)]
        fields: VersionFields,
    },
    /// Change a version's status
    Status {
        version: String,
        status: VersionStatus,
    },
    /// Delete a version
    Delete { version: String },
}

#[derive(Subcommand, Clone)]
pub enum ProjectCommands {
    /// List projects
    List,
    /// Create a project
    Add {
        name: String,
        /// Task code prefix, e.g. FIT
        #[arg(long)]
        prefix: String,
        #[arg(long)]
        color: Option<String>,
    },
    /// Rename a project or change its prefix or color
    Edit {
        project: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Scope the board to one project
    Use { project: String },
    /// Show all projects on the board again
    Clear,
    /// Delete a project and its tasks
    Delete { project: String },
}

#[derive(Subcommand, Clone)]
pub enum MemberCommands {
    /// List team members
    List,
    /// Add a team member
    Add {
        name: String,
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    /// Update a member's name, nickname or role ("none" clears)
    Edit {
        member: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    /// Remove a team member
    Remove { member: String },
}

#[derive(Subcommand, Clone)]
pub enum OrgCommands {
    /// List organizations
    List,
    /// Create an organization
    Add {
        name: String,
        /// Make it the default in flowboard.toml
        #[arg(long)]
        default: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default flowboard.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = flowboard::config::FlowConfig::load(cli.config.as_deref(), cli.verbose)?;
    flowboard::logging::init(&config)?;

    match &cli.command {
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
        Commands::Org { command } => cmd::cmd_org(&cli, &config, command).await?,
        Commands::Serve { port, host, dev } => {
            cmd::cmd_serve(&cli, &config, *port, host.clone(), *dev).await?
        }
        Commands::Board { filter, json } => {
            let session = cmd::Session::open(&cli, &config)?;
            cmd::cmd_board(&session, filter, *json).await?
        }
        Commands::Dashboard { json } => {
            let session = cmd::Session::open(&cli, &config)?;
            cmd::cmd_dashboard(&session, *json).await?
        }
        Commands::Move { task, status } => {
            let session = cmd::Session::open(&cli, &config)?;
            cmd::cmd_move(&session, task, *status).await?
        }
        Commands::Bulk { status, tasks } => {
            let session = cmd::Session::open(&cli, &config)?;
            cmd::cmd_bulk(&session, *status, tasks).await?
        }
        Commands::Select { filter } => {
            let session = cmd::Session::open(&cli, &config)?;
            cmd::cmd_select(&session, filter).await?
        }
        Commands::Columns { toggle } => {
            let session = cmd::Session::open(&cli, &config)?;
            cmd::cmd_columns(&session, toggle).await?
        }
        Commands::Task { command } => {
            let session = cmd::Session::open(&cli, &config)?;
            cmd::cmd_task(&session, &cli, command).await?
        }
        Commands::Roadmap {
            project,
            view,
            json,
        } => {
            let session = cmd::Session::open(&cli, &config)?;
            cmd::cmd_roadmap(&session, project.as_deref(), view.as_deref(), *json).await?
        }
        Commands::Version { command } => {
            let session = cmd::Session::open(&cli, &config)?;
            cmd::cmd_version(&session, &cli, command).await?
        }
        Commands::Project { command } => {
            let session = cmd::Session::open(&cli, &config)?;
            cmd::cmd_project(&session, &cli, command).await?
        }
        Commands::Member { command } => {
            let session = cmd::Session::open(&cli, &config)?;
            cmd::cmd_member(&session, &cli, command).await?
        }
    }

    Ok(())
}
