use std::fs;
use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::config_io::{self, CONFIG_DIR, CONFIG_FILE};
use crate::io::file_store::JsonFileStore;
use crate::model::config::AppConfig;

const CONFIG_TEMPLATE: &str = r##"# taskai project config

[store]
# Store file, relative to this directory
path = "board.json"

[user]
# Tasks and tags are kept under users/<id>/ in the store
id = "{user}"

[ai]
# endpoint = "https://api.openai.com/v1/chat/completions"
model = "gpt-3.5-turbo"
# max_tokens = 100
# temperature = 0.7
# The API key is read from this environment variable, never from this file
api_key_env = "OPENAI_API_KEY"

[log]
# tracing filter directive; the TAI_LOG environment variable overrides it
filter = "warn"
"##;

/// Validate a user id: non-empty, no path separators, quotes, whitespace or
/// control characters. Accepted ids drop into the config template as-is.
pub fn validate_user_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("user id cannot be empty".to_string());
    }
    if id
        .chars()
        .any(|c| matches!(c, '/' | '\\' | '"') || c.is_whitespace() || c.is_control())
    {
        return Err(format!(
            "invalid user id {:?}: no slashes, quotes or spaces (e.g. \"ana\")",
            id
        ));
    }
    Ok(())
}

fn render_config(user: &str) -> String {
    CONFIG_TEMPLATE.replace("{user}", user)
}

pub fn cmd_init(args: InitArgs, start: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = start.join(CONFIG_DIR);

    if config_dir.join(CONFIG_FILE).exists() && !args.force {
        return Err(format!("taskai project already exists in {}/", config_dir.display()).into());
    }

    // Note an enclosing project that this one will shadow
    if let Some(parent) = start.parent()
        && let Ok(outer) = config_io::discover_config_dir(parent)
    {
        eprintln!("Note: parent project found at {}/", outer.display());
        eprintln!("Creating new project in ./{}/", CONFIG_DIR);
    }

    let user = args.user.unwrap_or_else(|| AppConfig::default().user.id);
    validate_user_id(&user)?;

    fs::create_dir_all(&config_dir)?;
    fs::write(config_dir.join(CONFIG_FILE), render_config(&user))?;

    // Existing board data survives --force
    let (config, _) = config_io::read_config(&config_dir)?;
    let store = JsonFileStore::new(config_io::store_path(&config_dir, &config));
    store.ensure_exists()?;

    println!("Initialized taskai project for user {}", user);
    println!("  store: {}", store.path().display());
    Ok(())
}
