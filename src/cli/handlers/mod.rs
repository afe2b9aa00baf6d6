mod init;
pub use init::{cmd_init, validate_user_id};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assist::{self, ChatCompletionsClient};
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::{self, ConfigError};
use crate::io::file_store::JsonFileStore;
use crate::model::config::AppConfig;
use crate::model::task::{TagId, TaskId};
use crate::session::{Session, SessionError};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let start = start_dir(cli.project_dir.as_deref())?;

    match cli.command {
        // Init and config work on the config file only
        Commands::Init(args) => cmd_init(args, &start),
        Commands::Config(args) => cmd_config(args, &start),

        // Read commands
        Commands::List(args) => cmd_list(args, &start, json),

        // Write commands
        Commands::Add(args) => cmd_add(args, &start),
        Commands::Sub(args) => cmd_sub(args, &start),
        Commands::Edit(args) => cmd_edit(args, &start),
        Commands::Rm(args) => cmd_rm(args, &start),
        Commands::Done(args) => cmd_done(args, &start),
        Commands::Mv(args) => cmd_mv(args, &start),
        Commands::Retag(args) => cmd_retag(args, &start),

        Commands::Tag(args) => cmd_tag(args, &start, json),
        Commands::Suggest(args) => cmd_suggest(args, &start),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Directory to start project discovery from (`-C` or the working directory)
pub fn start_dir(project_dir: Option<&str>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match project_dir {
        Some(dir) => Ok(std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?),
        None => Ok(std::env::current_dir()?),
    }
}

/// Log filter named in the project config, if a project can be found
pub fn configured_log_filter(project_dir: Option<&str>) -> Option<String> {
    let start = start_dir(project_dir).ok()?;
    let config_dir = config_io::discover_config_dir(&start).ok()?;
    let (config, _) = config_io::read_config(&config_dir).ok()?;
    Some(config.log.filter)
}

struct Project {
    config_dir: PathBuf,
    config: AppConfig,
}

fn load_project(start: &Path) -> Result<Project, ConfigError> {
    let config_dir = config_io::discover_config_dir(start)?;
    let (config, _) = config_io::read_config(&config_dir)?;
    Ok(Project { config_dir, config })
}

fn open_session(project: &Project) -> Result<Session, SessionError> {
    let store = JsonFileStore::new(config_io::store_path(&project.config_dir, &project.config));
    Session::open(Arc::new(store), &project.config.user.id)
}

/// Resolve a tag given by id or by name
fn resolve_tag(session: &Session, key: &str) -> Result<TagId, SessionError> {
    let tags = session.tags();
    if tags.contains(key) {
        return Ok(key.to_string());
    }
    tags.find_by_name(key)
        .map(|t| t.id.clone())
        .ok_or_else(|| SessionError::UnknownTag(key.to_string()))
}

fn resolve_tags(session: &Session, keys: &[String]) -> Result<Vec<TagId>, SessionError> {
    keys.iter().map(|k| resolve_tag(session, k)).collect()
}

fn describe(id: TaskId, parent: Option<TaskId>) -> String {
    match parent {
        Some(p) => format!("{} (under {})", id, p),
        None => id.to_string(),
    }
}

/// Wait for the save and report the outcome of an addressed mutation
fn finish(
    session: &Session,
    changed: bool,
    verb: &str,
    id: TaskId,
    parent: Option<TaskId>,
) -> Result<(), Box<dyn std::error::Error>> {
    session.flush()?;
    if changed {
        println!("{} {}", verb, describe(id, parent));
    } else {
        println!("no change: no task {} at that position", describe(id, parent));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(args: ListArgs, start: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let project = load_project(start)?;
    let mut session = open_session(&project)?;
    for id in resolve_tags(&session, &args.tag)? {
        if !session.filter().selected().contains(&id) {
            session.toggle_filter(&id)?;
        }
    }

    let view = session.view();
    if json {
        let listing = listing_to_json(&view, session.tags());
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        for line in format_listing(&view, session.tags()) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(args: AddArgs, start: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let project = load_project(start)?;
    let mut session = open_session(&project)?;
    let tags = resolve_tags(&session, &args.tag)?;
    let id = session.add_task(&args.text, &tags)?;
    session.flush()?;
    println!("{}", id);
    Ok(())
}

fn cmd_sub(args: SubArgs, start: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let project = load_project(start)?;
    let mut session = open_session(&project)?;
    let id = session
        .add_subtask(args.parent, &args.text, args.after)?
        .ok_or_else(|| format!("task not found: {}", args.parent))?;
    session.flush()?;
    println!("{}", id);
    Ok(())
}

fn cmd_edit(args: EditArgs, start: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let project = load_project(start)?;
    let mut session = open_session(&project)?;
    let changed = session.edit(args.id, &args.text, args.parent)?;
    finish(&session, changed, "edited", args.id, args.parent)
}

fn cmd_rm(args: AddressArgs, start: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let project = load_project(start)?;
    let mut session = open_session(&project)?;
    let changed = session.delete(args.id, args.parent);
    finish(&session, changed, "deleted", args.id, args.parent)
}

fn cmd_done(args: AddressArgs, start: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let project = load_project(start)?;
    let mut session = open_session(&project)?;
    let changed = session.toggle(args.id, args.parent);
    let verb = match session.tree().find(args.id, args.parent) {
        Some(task) if task.completed => "completed",
        _ => "reopened",
    };
    finish(&session, changed, verb, args.id, args.parent)
}

fn cmd_mv(args: MvArgs, start: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let project = load_project(start)?;
    let mut session = open_session(&project)?;
    let changed = session.reorder(args.id, args.direction, args.parent);
    finish(&session, changed, "moved", args.id, args.parent)
}

fn cmd_retag(args: RetagArgs, start: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let project = load_project(start)?;
    let mut session = open_session(&project)?;
    let tags = resolve_tags(&session, &args.tags)?;
    let changed = session.retag(args.id, &tags)?;
    finish(&session, changed, "retagged", args.id, None)
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

fn cmd_tag(args: TagCmd, start: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let project = load_project(start)?;
    let mut session = open_session(&project)?;

    match args.action {
        TagAction::List => {
            if json {
                let tags: Vec<TagJson> = session.tags().iter().map(tag_to_json).collect();
                println!("{}", serde_json::to_string_pretty(&tags)?);
            } else {
                for tag in session.tags().iter() {
                    println!("{}", format_tag_line(tag));
                }
            }
        }
        TagAction::Create(create) => {
            if session.tags().find_by_name(create.name.trim()).is_some() {
                return Err(format!("tag already exists: {}", create.name.trim()).into());
            }
            let tag = session.create_tag(&create.name, create.color.as_deref())?;
            session.flush()?;
            println!("{}", tag.id);
        }
        TagAction::Delete(delete) => {
            let ids = resolve_tags(&session, &delete.tags)?;
            let removed = session.delete_tags(&ids);
            session.flush()?;
            for tag in &removed {
                println!("deleted {} ({})", tag.id, tag.name);
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

fn cmd_suggest(args: SuggestCmd, start: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let project = load_project(start)?;
    let client = ChatCompletionsClient::from_env(&project.config.ai)?;

    match args.action {
        SuggestAction::Task(task) => {
            let prompt = task.prompt.trim();
            if prompt.is_empty() {
                return Err("prompt cannot be empty".into());
            }
            let suggestion = assist::suggest_main_task(&client, prompt);
            if assist::is_fallback(&suggestion) {
                return Err(suggestion.into());
            }
            let combined = assist::append_generated(prompt, &suggestion);
            if task.add {
                let mut session = open_session(&project)?;
                let id = session.add_task(&combined, &[])?;
                session.flush()?;
                println!("{}", id);
            } else {
                println!("{}", combined);
            }
        }
        SuggestAction::Sub(sub) => {
            let mut session = open_session(&project)?;
            let parent = session
                .tree()
                .find_top_level(sub.parent)
                .cloned()
                .ok_or_else(|| format!("task not found: {}", sub.parent))?;
            let suggestion = assist::suggest_subtask_for(&client, &parent, sub.after);
            if assist::is_fallback(&suggestion) {
                return Err(suggestion.into());
            }
            let after = sub.after.or_else(|| parent.subtasks.last().map(|s| s.id));
            let id = session
                .add_subtask(parent.id, &suggestion, after)?
                .ok_or_else(|| format!("task not found: {}", parent.id))?;
            session.flush()?;
            println!("{} {}", id, suggestion);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config(args: ConfigCmd, start: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = config_io::discover_config_dir(start)?;
    let (_, mut doc) = config_io::read_config(&config_dir)?;

    match args.action {
        ConfigAction::User(user) => {
            validate_user_id(&user.value)?;
            config_io::set_user(&mut doc, &user.value);
            println!("user: {}", user.value);
        }
        ConfigAction::Model(model) => {
            if model.value.trim().is_empty() {
                return Err("model cannot be empty".into());
            }
            config_io::set_ai_model(&mut doc, model.value.trim());
            println!("model: {}", model.value.trim());
        }
    }
    config_io::write_config(&config_dir, &doc)?;
    Ok(())
}
