use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::AppConfig;

/// Directory holding the config file and the default store
pub const CONFIG_DIR: &str = ".taskai";
pub const CONFIG_FILE: &str = "config.toml";

/// Error type for config file operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("not a taskai project: no {CONFIG_DIR}/{CONFIG_FILE} found (run `tai init`)")]
    NotAProject,
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {CONFIG_FILE}: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not parse {CONFIG_FILE} for editing: {0}")]
    EditError(#[from] toml_edit::TomlError),
}

/// Walk up from `start` looking for a `.taskai/config.toml`.
/// Returns the `.taskai` directory.
pub fn discover_config_dir(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        let dir = current.join(CONFIG_DIR);
        if dir.is_dir() && dir.join(CONFIG_FILE).exists() {
            return Ok(dir);
        }
        if !current.pop() {
            return Err(ConfigError::NotAProject);
        }
    }
}

/// Read the config, returning both the parsed config and the raw
/// toml_edit document for round-trip-safe editing.
pub fn read_config(config_dir: &Path) -> Result<(AppConfig, toml_edit::DocumentMut), ConfigError> {
    let path = config_dir.join(CONFIG_FILE);
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    let config: AppConfig = toml::from_str(&text)?;
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((config, doc))
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(config_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    let path = config_dir.join(CONFIG_FILE);
    fs::write(&path, doc.to_string()).map_err(|e| ConfigError::WriteError { path, source: e })
}

/// Absolute location of the store file named by the config
pub fn store_path(config_dir: &Path, config: &AppConfig) -> PathBuf {
    config_dir.join(&config.store.path)
}

fn set_value(doc: &mut toml_edit::DocumentMut, section: &str, key: &str, value: &str) {
    if !doc.contains_key(section) {
        doc[section] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc[section][key] = toml_edit::value(value);
}

pub fn set_user(doc: &mut toml_edit::DocumentMut, user_id: &str) {
    set_value(doc, "user", "id", user_id);
}

pub fn set_ai_model(doc: &mut toml_edit::DocumentMut, model: &str) {
    set_value(doc, "ai", "model", model);
}
