use clap::{Args, Parser, Subcommand};

use crate::model::task::TaskId;
use crate::ops::task_ops::Direction;

#[derive(Parser)]
#[command(name = "tai", about = concat!("taskai v", env!("CARGO_PKG_VERSION"), " - a two-level to-do list with suggested tasks"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different project directory
    #[arg(short = 'C', long = "project-dir", global = true)]
    pub project_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new taskai project in the current directory
    Init(InitArgs),
    /// List tasks, optionally filtered by tag
    List(ListArgs),
    /// Add a top-level task
    Add(AddArgs),
    /// Add a subtask
    Sub(SubArgs),
    /// Change a task's text
    Edit(EditArgs),
    /// Delete a task (and its subtasks)
    Rm(AddressArgs),
    /// Toggle a task's completion
    Done(AddressArgs),
    /// Move a task up or down among its siblings
    Mv(MvArgs),
    /// Replace a top-level task's tags
    Retag(RetagArgs),
    /// Tag management
    Tag(TagCmd),
    /// Ask the text generator for a task or subtask
    Suggest(SuggestCmd),
    /// Edit the project config
    Config(ConfigCmd),
}

// ---------------------------------------------------------------------------
// Init args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// User id to store tasks under (default: local)
    #[arg(long)]
    pub user: Option<String>,
    /// Reinitialize even if .taskai/ already exists
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArgs {
    /// Show only tasks with this tag, by id or name (repeatable)
    #[arg(long)]
    pub tag: Vec<String>,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Task text
    pub text: String,
    /// Tag by id or name (repeatable)
    #[arg(long)]
    pub tag: Vec<String>,
}

#[derive(Args)]
pub struct SubArgs {
    /// Parent task id
    pub parent: TaskId,
    /// Subtask text
    pub text: String,
    /// Insert right after this sibling (default: first)
    #[arg(long)]
    pub after: Option<TaskId>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task id
    pub id: TaskId,
    /// New text
    pub text: String,
    /// Parent id, when the task is a subtask
    #[arg(long)]
    pub parent: Option<TaskId>,
}

#[derive(Args)]
pub struct AddressArgs {
    /// Task id
    pub id: TaskId,
    /// Parent id, when the task is a subtask
    #[arg(long)]
    pub parent: Option<TaskId>,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task id
    pub id: TaskId,
    /// up or down
    pub direction: Direction,
    /// Parent id, when the task is a subtask
    #[arg(long)]
    pub parent: Option<TaskId>,
}

#[derive(Args)]
pub struct RetagArgs {
    /// Top-level task id
    pub id: TaskId,
    /// Tags by id or name; none clears every tag
    pub tags: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tag management
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TagCmd {
    #[command(subcommand)]
    pub action: TagAction,
}

#[derive(Subcommand)]
pub enum TagAction {
    /// List tags in creation order
    List,
    /// Create a tag
    Create(TagCreateArgs),
    /// Delete tags and remove them from every task
    Delete(TagDeleteArgs),
}

#[derive(Args)]
pub struct TagCreateArgs {
    /// Tag name
    pub name: String,
    /// Hex color (default: #3B82F6)
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args)]
pub struct TagDeleteArgs {
    /// Tags by id or name
    #[arg(required = true)]
    pub tags: Vec<String>,
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct SuggestCmd {
    #[command(subcommand)]
    pub action: SuggestAction,
}

#[derive(Subcommand)]
pub enum SuggestAction {
    /// Suggest a top-level task from some context text
    Task(SuggestTaskArgs),
    /// Suggest and add a subtask under a task
    Sub(SuggestSubArgs),
}

#[derive(Args)]
pub struct SuggestTaskArgs {
    /// What the task is about
    pub prompt: String,
    /// Add the combined text as a new task
    #[arg(long)]
    pub add: bool,
}

#[derive(Args)]
pub struct SuggestSubArgs {
    /// Parent task id
    pub parent: TaskId,
    /// Continue from this subtask and insert after it (default: last subtask)
    #[arg(long)]
    pub after: Option<TaskId>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Set the user id tasks are stored under
    User(ConfigValueArgs),
    /// Set the text-generation model
    Model(ConfigValueArgs),
}

#[derive(Args)]
pub struct ConfigValueArgs {
    pub value: String,
}
