use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyFileConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub no_verify: Option<bool>,
    #[serde(default)]
    pub ca_bundle: Option<String>,
}

/// Non-secret settings read from `.celonis-mcp.yaml`.
///
/// Credentials are deliberately absent: they only come from the command
/// line, the process environment or a `.env` file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub team_url: Option<String>,
    #[serde(default)]
    pub server_id: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub handshake_timeout: Option<u64>,
    #[serde(default)]
    pub rpc_timeout: Option<u64>,
    #[serde(default)]
    pub token_timeout: Option<u64>,
    #[serde(default)]
    pub verbose: Option<bool>,
    #[serde(default)]
    pub proxy: ProxyFileConfig,
}

impl FileConfig {
    /// Load the first settings file that exists, or an explicit path.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        for path in Self::get_config_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(FileConfig::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if contents.trim().is_empty() {
            return Ok(FileConfig::default());
        }

        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config file: {}", path.display()))
    }

    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Current directory first (local override)
        paths.push(PathBuf::from(".celonis-mcp.yaml"));
        paths.push(PathBuf::from(".celonis-mcp.yml"));

        if let Some(home_dir) = dirs::home_dir() {
            let config_dir = home_dir.join(".config").join("celonis-mcp");
            paths.push(config_dir.join("config.yaml"));
            paths.push(config_dir.join("config.yml"));
        }

        paths
    }
}
