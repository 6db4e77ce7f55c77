use std::fmt;

use super::defaults::{ENV_API_KEY, ENV_CLIENT_ID, ENV_CLIENT_SECRET};
use super::ConfigSources;
use crate::cli::Args;

/// How the client obtains its bearer token.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// OAuth2 client-credentials grant against the team's token endpoint.
    OAuth {
        client_id: String,
        client_secret: String,
    },
    /// Static application key used directly as the bearer token.
    ApiKey(String),
}

impl AuthMode {
    pub fn label(&self) -> &'static str {
        match self {
            AuthMode::OAuth { .. } => "oauth2",
            AuthMode::ApiKey(_) => "api-key",
        }
    }
}

// Secrets stay out of logs and panics.
impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::OAuth { client_id, .. } => f
                .debug_struct("OAuth")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
            AuthMode::ApiKey(_) => f.debug_tuple("ApiKey").field(&"<redacted>").finish(),
        }
    }
}

/// Resolve the auth mode.
///
/// Command-line credentials win outright. Otherwise a complete OAuth2 pair
/// from the environment takes precedence over `CELONIS_API_KEY`.
pub fn resolve_auth(args: &Args, sources: &ConfigSources) -> Result<AuthMode, String> {
    if let Some((client_id, client_secret)) = args.oauth_pair() {
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err("--oauth needs a non-empty client id and secret".to_string());
        }
        return Ok(AuthMode::OAuth {
            client_id,
            client_secret,
        });
    }
    if let Some(key) = &args.api_key {
        if key.trim().is_empty() {
            return Err("--api-key is empty".to_string());
        }
        return Ok(AuthMode::ApiKey(key.clone()));
    }

    let client_id = sources.env(ENV_CLIENT_ID);
    let client_secret = sources.env(ENV_CLIENT_SECRET);
    let api_key = sources.env(ENV_API_KEY);

    match (client_id, client_secret, api_key) {
        (Some(client_id), Some(client_secret), api_key) => {
            if api_key.is_some() {
                tracing::warn!(
                    "both OAuth2 credentials and {} are set; using OAuth2",
                    ENV_API_KEY
                );
            }
            Ok(AuthMode::OAuth {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
            })
        }
        (_, _, Some(key)) => Ok(AuthMode::ApiKey(key.to_string())),
        (Some(_), None, None) => Err(format!(
            "{} is set but {} is missing",
            ENV_CLIENT_ID, ENV_CLIENT_SECRET
        )),
        (None, Some(_), None) => Err(format!(
            "{} is set but {} is missing",
            ENV_CLIENT_SECRET, ENV_CLIENT_ID
        )),
        (None, None, None) => Err(format!(
            "missing credentials: pass --oauth or --api-key, or set {}/{} or {}",
            ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_API_KEY
        )),
    }
}
