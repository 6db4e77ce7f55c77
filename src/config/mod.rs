mod auth;
pub mod defaults;
mod endpoint;
mod file;
mod network;
mod validation;

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::cli::Args;
use crate::error::{McpError, Result};
use defaults::{
    default_env_file, default_handshake_timeout, default_rpc_timeout, default_token_timeout,
    DEFAULT_OAUTH_SCOPE, ENV_HANDSHAKE_TIMEOUT, ENV_OAUTH_SCOPE, ENV_RPC_TIMEOUT,
    ENV_TOKEN_TIMEOUT, ENV_VERBOSE, KNOWN_ENV_VARS,
};

pub use auth::{resolve_auth, AuthMode};
pub use endpoint::{resolve_endpoints, with_draft_flag, Endpoints};
pub use file::{FileConfig, ProxyFileConfig};
pub use network::{build_http_client, resolve_proxy, resolve_tls, ProxyConfig, TlsConfig};
pub use validation::{expand_env_var_in_string, parse_flag, parse_seconds};

/// Raw configuration inputs below the command line: environment variables
/// (process environment over `.env`) and the YAML settings file.
#[derive(Clone, Default)]
pub struct ConfigSources {
    env: HashMap<String, String>,
    file: FileConfig,
}

impl ConfigSources {
    /// Read `.env`, the process environment and the settings file.
    ///
    /// The `.env` file is parsed without touching the process environment;
    /// variables already set in the environment win over it.
    pub fn load(args: &Args) -> Result<Self> {
        let mut env_map = HashMap::new();

        match &args.env_file {
            Some(path) => env_map.extend(read_env_file(path)?),
            None => {
                let path = PathBuf::from(default_env_file());
                if path.exists() {
                    env_map.extend(read_env_file(&path)?);
                }
            }
        }

        for key in KNOWN_ENV_VARS {
            if let Ok(value) = env::var(key) {
                env_map.insert(key.to_string(), value);
            }
        }

        let file = FileConfig::load(args.config_file.as_deref())
            .map_err(|e| McpError::Config(format!("{:#}", e)))?;

        Ok(Self::from_parts(env_map, file))
    }

    pub fn from_parts(env: HashMap<String, String>, file: FileConfig) -> Self {
        Self { env, file }
    }

    /// A non-blank environment value.
    pub fn env(&self, key: &str) -> Option<&str> {
        self.env
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn file(&self) -> &FileConfig {
        &self.file
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let iter = dotenvy::from_path_iter(path).map_err(|e| {
        McpError::Config(format!("cannot read env file {}: {}", path.display(), e))
    })?;

    let mut values = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| {
            McpError::Config(format!("cannot parse env file {}: {}", path.display(), e))
        })?;
        values.insert(key, value);
    }
    tracing::debug!(path = %path.display(), entries = values.len(), "loaded env file");
    Ok(values)
}

/// Everything one run needs, resolved once and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub sse_url: Url,
    pub token_url: Url,
    pub auth: AuthMode,
    pub scope: String,
    pub handshake_timeout: Duration,
    pub rpc_timeout: Duration,
    /// Bound on the client-credentials exchange.
    pub token_timeout: Duration,
    pub proxy: Option<ProxyConfig>,
    pub tls: TlsConfig,
    pub verbose: bool,
}

impl Config {
    pub fn from_env_and_args(args: &Args) -> Result<Self> {
        let sources = ConfigSources::load(args)?;
        Self::resolve(args, &sources)
    }

    /// Resolve configuration from CLI args over the given sources.
    pub fn resolve(args: &Args, sources: &ConfigSources) -> Result<Self> {
        let endpoints = resolve_endpoints(args, sources).map_err(McpError::Config)?;
        let auth = resolve_auth(args, sources).map_err(McpError::Config)?;

        let scope = sources
            .env(ENV_OAUTH_SCOPE)
            .map(str::to_string)
            .or_else(|| validation::expand_optional(sources.file().scope.as_ref()))
            .unwrap_or_else(|| DEFAULT_OAUTH_SCOPE.to_string());

        let handshake_timeout = resolve_seconds(
            args.handshake_timeout,
            sources.env(ENV_HANDSHAKE_TIMEOUT),
            ENV_HANDSHAKE_TIMEOUT,
            sources.file().handshake_timeout,
            default_handshake_timeout(),
        )?;

        let rpc_timeout = resolve_seconds(
            args.rpc_timeout,
            sources.env(ENV_RPC_TIMEOUT),
            ENV_RPC_TIMEOUT,
            sources.file().rpc_timeout,
            default_rpc_timeout(),
        )?;

        let token_timeout = resolve_seconds(
            args.token_timeout,
            sources.env(ENV_TOKEN_TIMEOUT),
            ENV_TOKEN_TIMEOUT,
            sources.file().token_timeout,
            default_token_timeout(),
        )?;

        let verbose = args.verbose
            || sources
                .env(ENV_VERBOSE)
                .map(parse_flag)
                .or(sources.file().verbose)
                .unwrap_or(false);

        Ok(Config {
            sse_url: endpoints.sse_url,
            token_url: endpoints.token_url,
            auth,
            scope,
            handshake_timeout,
            rpc_timeout,
            token_timeout,
            proxy: resolve_proxy(args, sources)?,
            tls: resolve_tls(args, sources),
            verbose,
        })
    }

    pub fn http_client(&self) -> Result<reqwest::Client> {
        build_http_client(self.proxy.as_ref(), &self.tls)
    }
}

fn resolve_seconds(
    cli: Option<u64>,
    env_value: Option<&str>,
    env_name: &str,
    file_value: Option<u64>,
    default: u64,
) -> Result<Duration> {
    if let Some(secs) = cli {
        if secs == 0 {
            return Err(McpError::Config(format!(
                "timeouts must be positive, got 0 for {}",
                env_name
            )));
        }
        return Ok(Duration::from_secs(secs));
    }
    if let Some(raw) = env_value {
        return parse_seconds(env_name, raw)
            .map(Duration::from_secs)
            .map_err(McpError::Config);
    }
    Ok(Duration::from_secs(file_value.filter(|s| *s > 0).unwrap_or(default)))
}
