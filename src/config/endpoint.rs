use url::Url;

use super::defaults::{
    ENV_ENDPOINT_URL, ENV_SERVER_ID, ENV_TEAM_URL, MCP_SERVER_PATH, TOKEN_PATH,
};
use super::validation::expand_optional;
use super::ConfigSources;
use crate::cli::Args;

/// Where the event stream lives and where tokens are minted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// SSE URL, always carrying a `draft` query parameter.
    pub sse_url: Url,
    pub token_url: Url,
}

enum Source {
    Url { field: &'static str, url: String },
    Team { team_url: String, server_id: String },
}

/// Resolve endpoints with the precedence `--endpoint-url` > `--team-info` >
/// `CELONIS_ENDPOINT_URL` > `CELONIS_TEAM_URL`+`CELONIS_SERVER_ID` > settings file.
pub fn resolve_endpoints(args: &Args, sources: &ConfigSources) -> Result<Endpoints, String> {
    let source = pick_source(args, sources)?;

    match source {
        Source::Url { field, url } => {
            let parsed = Url::parse(url.trim())
                .map_err(|e| format!("{} is not a valid URL ('{}'): {}", field, url, e))?;
            let origin = origin_of(&parsed, field)?;
            Ok(Endpoints {
                token_url: join(&origin, TOKEN_PATH, field)?,
                sse_url: with_draft_flag(parsed),
            })
        }
        Source::Team {
            team_url,
            server_id,
        } => {
            let base = team_url.trim().trim_end_matches('/');
            let server_id = server_id.trim().trim_matches('/');
            let sse = format!("{}/{}/{}", base, MCP_SERVER_PATH, server_id);
            let sse_url = Url::parse(&sse)
                .map_err(|e| format!("{} is not a valid URL ('{}'): {}", ENV_TEAM_URL, team_url, e))?;
            let token_url = Url::parse(&format!("{}/{}", base, TOKEN_PATH))
                .map_err(|e| format!("{} is not a valid URL ('{}'): {}", ENV_TEAM_URL, team_url, e))?;
            Ok(Endpoints {
                sse_url: with_draft_flag(sse_url),
                token_url,
            })
        }
    }
}

fn pick_source(args: &Args, sources: &ConfigSources) -> Result<Source, String> {
    if let Some(url) = args.endpoint_url.clone() {
        return Ok(Source::Url {
            field: "--endpoint-url",
            url,
        });
    }
    if let Some((team_url, server_id)) = args.team_pair() {
        return Ok(Source::Team {
            team_url,
            server_id,
        });
    }
    if let Some(url) = sources.env(ENV_ENDPOINT_URL) {
        return Ok(Source::Url {
            field: ENV_ENDPOINT_URL,
            url: url.to_string(),
        });
    }

    let team_url = sources.env(ENV_TEAM_URL).map(str::to_string);
    let server_id = sources.env(ENV_SERVER_ID).map(str::to_string);
    if let Some(source) = team_source(team_url, server_id, ENV_TEAM_URL, ENV_SERVER_ID)? {
        return Ok(source);
    }

    let file = sources.file();
    if let Some(url) = expand_optional(file.endpoint_url.as_ref()) {
        return Ok(Source::Url {
            field: "endpoint_url",
            url,
        });
    }
    let team_url = expand_optional(file.team_url.as_ref());
    let server_id = expand_optional(file.server_id.as_ref());
    if let Some(source) = team_source(team_url, server_id, "team_url", "server_id")? {
        return Ok(source);
    }

    Err(format!(
        "missing endpoint: pass --endpoint-url or --team-info, or set {} (or {} and {})",
        ENV_ENDPOINT_URL, ENV_TEAM_URL, ENV_SERVER_ID
    ))
}

fn team_source(
    team_url: Option<String>,
    server_id: Option<String>,
    team_field: &str,
    server_field: &str,
) -> Result<Option<Source>, String> {
    match (team_url, server_id) {
        (Some(team_url), Some(server_id)) => Ok(Some(Source::Team {
            team_url,
            server_id,
        })),
        (Some(_), None) => Err(format!("{} is set but {} is missing", team_field, server_field)),
        (None, Some(_)) => Err(format!("{} is set but {} is missing", server_field, team_field)),
        (None, None) => Ok(None),
    }
}

fn origin_of(url: &Url, field: &str) -> Result<Url, String> {
    let host = url
        .host_str()
        .ok_or_else(|| format!("{} has no host: {}", field, url))?;
    let origin = match url.port() {
        Some(port) => format!("{}://{}:{}/", url.scheme(), host, port),
        None => format!("{}://{}/", url.scheme(), host),
    };
    Url::parse(&origin).map_err(|e| format!("{} has an invalid origin: {}", field, e))
}

fn join(base: &Url, path: &str, field: &str) -> Result<Url, String> {
    base.join(path)
        .map_err(|e| format!("cannot derive token URL from {}: {}", field, e))
}

/// Append `draft=false` unless the caller already chose a draft mode.
pub fn with_draft_flag(mut url: Url) -> Url {
    let has_draft = url.query_pairs().any(|(key, _)| key == "draft");
    if !has_draft {
        url.query_pairs_mut().append_pair("draft", "false");
    }
    url
}
