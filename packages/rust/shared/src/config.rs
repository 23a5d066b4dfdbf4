//! Application configuration for Draftmill.
//!
//! User config lives at `~/.draftmill/draftmill.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DraftmillError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "draftmill.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".draftmill";

// ---------------------------------------------------------------------------
// Config structs (matching draftmill.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generation defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Collaborator service settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Local storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum readiness-poll attempts before giving up.
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,

    /// Fixed wait between readiness polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Character budget for derived excerpts.
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_max_chars: usize,

    /// Role used to look up the default author for attribution.
    #[serde(default = "default_author_role")]
    pub author_role: String,

    /// Instructions passed to the generation provider alongside the subject.
    #[serde(default = "default_instructions")]
    pub instructions: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            poll_attempts: default_poll_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
            excerpt_max_chars: default_excerpt_chars(),
            author_role: default_author_role(),
            instructions: default_instructions(),
        }
    }
}

fn default_poll_attempts() -> u32 {
    120
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_excerpt_chars() -> usize {
    500
}
fn default_author_role() -> String {
    "author".into()
}
fn default_instructions() -> String {
    "Write a well-structured article about the subject, drawing only on the \
     indexed source material. Start with a level-1 heading."
        .into()
}

/// `[service]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the content-index / generation service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:4000".into()
}
fn default_api_key_env() -> String {
    "DRAFTMILL_API_KEY".into()
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the local database file. A leading `~/` expands to the home dir.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.draftmill/draftmill.db".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.draftmill/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DraftmillError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.draftmill/draftmill.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DraftmillError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        DraftmillError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DraftmillError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DraftmillError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DraftmillError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the configured database path, expanding a leading `~/`.
pub fn resolve_db_path(config: &AppConfig) -> Result<PathBuf> {
    let raw = &config.storage.db_path;
    if let Some(rest) = raw.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| DraftmillError::config("could not determine home directory"))?;
        Ok(home.join(rest))
    } else {
        Ok(PathBuf::from(raw))
    }
}

/// Read the service API key from the configured env var, if set and non-empty.
pub fn service_api_key(config: &AppConfig) -> Option<String> {
    std::env::var(&config.service.api_key_env)
        .ok()
        .filter(|v| !v.is_empty())
}

/// Check that the service API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.service.api_key_env;
    match service_api_key(config) {
        Some(_) => Ok(()),
        None => Err(DraftmillError::config(format!(
            "service API key not found. Set the {var_name} environment variable."
        ))),
    }
}
