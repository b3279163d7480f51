//! Configuration for the registry endpoint.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CHORUS_BASE_URL, CHORUS_TOKEN)
//! 2. Config file (.chorus/config.yaml)
//! 3. Defaults (local registry, no token)
//!
//! Config file discovery:
//! - Searches the current directory and parents for .chorus/config.yaml
//! - Falls back to ~/.chorus/config.yaml

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default registry endpoint
pub const DEFAULT_BASE_URL: &str = "http://localhost:20000/api/v1";

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendConfig {
    /// Registry base URL
    pub base_url: Option<String>,
    /// Bearer token
    pub token: Option<String>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Registry base URL
    pub base_url: String,
    /// Bearer token, if any
    pub token: Option<String>,
    /// Path to the config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find a config file by searching the current directory and parents,
/// then the home directory
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".chorus").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let home_config = dirs::home_dir()?.join(".chorus").join("config.yaml");
    if home_config.exists() {
        return Some(home_config);
    }

    None
}

/// Load and parse a config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();

    let file = match &config_file {
        Some(path) => Some(load_config_file(path)?),
        None => None,
    };

    let base_url = std::env::var("CHORUS_BASE_URL")
        .ok()
        .or_else(|| file.as_ref().and_then(|f| f.backend.base_url.clone()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let token = std::env::var("CHORUS_TOKEN")
        .ok()
        .or_else(|| file.as_ref().and_then(|f| f.backend.token.clone()));

    Ok(ResolvedConfig {
        base_url,
        token,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
