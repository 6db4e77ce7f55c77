//! OAuth2 client-credentials exchange.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::config::{AuthMode, Config};
use crate::error::{AuthError, Result};

/// A bearer token plus what the token endpoint told us about it.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub scope: Option<String>,
    pub token_type: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Wrap a static application key. No network call, no known lifetime.
    pub fn from_api_key(key: impl Into<String>) -> Self {
        Self {
            token: key.into(),
            scope: None,
            token_type: Some("Bearer".to_string()),
            expires_at: None,
        }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Resolve the bearer token for this run: the static key as-is, or one
/// client-credentials exchange.
pub async fn resolve_token(http: &reqwest::Client, config: &Config) -> Result<AccessToken> {
    match &config.auth {
        AuthMode::ApiKey(key) => {
            tracing::debug!("using static API key as bearer token");
            Ok(AccessToken::from_api_key(key.clone()))
        }
        AuthMode::OAuth {
            client_id,
            client_secret,
        } => {
            acquire_token(
                http,
                &config.token_url,
                client_id,
                client_secret,
                &config.scope,
                config.token_timeout,
            )
            .await
        }
    }
}

/// Perform the client-credentials grant against `token_url`.
pub async fn acquire_token(
    http: &reqwest::Client,
    token_url: &Url,
    client_id: &str,
    client_secret: &str,
    scope: &str,
    timeout: Duration,
) -> Result<AccessToken> {
    tracing::info!(url = %token_url, scope, "requesting OAuth2 token");

    let form = [
        ("grant_type", "client_credentials"),
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("scope", scope),
    ];

    let response = http
        .post(token_url.clone())
        .timeout(timeout)
        .form(&form)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        tracing::debug!(status = status.as_u16(), %body, "token request rejected");
        return Err(auth_error_for(status, body, scope).into());
    }

    let parsed: TokenResponse = response.json().await?;
    let token = parsed
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MalformedResponse)?;

    if let Some(granted) = parsed.scope.as_deref() {
        if !granted.split_whitespace().any(|s| s == scope) {
            tracing::warn!(granted, requested = scope, "token was granted without the requested scope");
        }
    }

    let expires_at = parsed
        .expires_in
        .filter(|secs| *secs > 0)
        .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

    tracing::debug!(?expires_at, "OAuth2 token acquired");

    Ok(AccessToken {
        token,
        scope: parsed.scope,
        token_type: parsed.token_type,
        expires_at,
    })
}

/// Map a rejected status to the auth failure users see.
pub fn auth_error_for(status: StatusCode, body: String, scope: &str) -> AuthError {
    match status {
        StatusCode::UNAUTHORIZED => AuthError::BadCredentials { body },
        StatusCode::FORBIDDEN => AuthError::InsufficientScope {
            scope: scope.to_string(),
            body,
        },
        other => AuthError::Rejected {
            status: other.as_u16(),
            body,
        },
    }
}
