use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::{
    default_connect_timeout, ENV_PROXY_HOST, ENV_PROXY_PASS, ENV_PROXY_PORT, ENV_PROXY_URL,
    ENV_PROXY_USER,
};
use super::validation::expand_optional;
use super::ConfigSources;
use crate::cli::Args;
use crate::error::{McpError, Result};

#[derive(Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("url", &redact_userinfo(&self.url))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    pub no_verify: bool,
    pub ca_bundle: Option<PathBuf>,
}

/// Resolve the proxy: `--proxy-url` > `--proxy-host`/`--proxy-port` >
/// `PROXY_URL` > `PROXY_HOST`/`PROXY_PORT` > settings file.
pub fn resolve_proxy(args: &Args, sources: &ConfigSources) -> Result<Option<ProxyConfig>> {
    let username = args
        .proxy_user
        .clone()
        .or_else(|| sources.env(ENV_PROXY_USER).map(str::to_string));
    let password = args
        .proxy_pass
        .clone()
        .or_else(|| sources.env(ENV_PROXY_PASS).map(str::to_string));

    let url = if let Some(url) = args.proxy_url.clone() {
        Some(url)
    } else if let (Some(host), Some(port)) = (args.proxy_host.as_deref(), args.proxy_port) {
        Some(build_proxy_url(host, &port.to_string(), &username, &password))
    } else if let Some(url) = sources.env(ENV_PROXY_URL) {
        Some(url.to_string())
    } else if let (Some(host), Some(port)) =
        (sources.env(ENV_PROXY_HOST), sources.env(ENV_PROXY_PORT))
    {
        port.parse::<u16>().map_err(|_| {
            McpError::Config(format!("{} must be a port number, got '{}'", ENV_PROXY_PORT, port))
        })?;
        Some(build_proxy_url(host, port, &username, &password))
    } else {
        expand_optional(sources.file().proxy.url.as_ref())
    };

    Ok(url.map(|url| ProxyConfig {
        url,
        username,
        password,
    }))
}

pub fn resolve_tls(args: &Args, sources: &ConfigSources) -> TlsConfig {
    let file = &sources.file().proxy;
    let ca_bundle = args
        .ca_bundle
        .clone()
        .or_else(|| expand_optional(file.ca_bundle.as_ref()).map(PathBuf::from));
    TlsConfig {
        no_verify: args.no_verify || (ca_bundle.is_none() && file.no_verify.unwrap_or(false)),
        ca_bundle,
    }
}

fn build_proxy_url(
    host: &str,
    port: &str,
    username: &Option<String>,
    password: &Option<String>,
) -> String {
    match (username, password) {
        (Some(user), Some(pass)) => format!("http://{}:{}@{}:{}", user, pass, host, port),
        _ => format!("http://{}:{}", host, port),
    }
}

fn redact_userinfo(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("redacted"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

/// Build the HTTP client shared by the token request, the event stream and
/// the RPC channel.
///
/// No overall request timeout is set: the event stream stays open for the
/// whole run, so each blocking point applies its own bound.
pub fn build_http_client(
    proxy: Option<&ProxyConfig>,
    tls: &TlsConfig,
) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(default_connect_timeout()))
        .user_agent(concat!("celonis-mcp/", env!("CARGO_PKG_VERSION")));

    if let Some(proxy) = proxy {
        let mut p = reqwest::Proxy::all(&proxy.url)
            .map_err(|e| McpError::Config(format!("invalid proxy URL: {}", e)))?;
        if let (Some(user), Some(pass)) = (&proxy.username, &proxy.password) {
            p = p.basic_auth(user, pass);
        }
        tracing::debug!(proxy = %redact_userinfo(&proxy.url), "routing requests through proxy");
        builder = builder.proxy(p);
    }

    if tls.no_verify {
        tracing::warn!("TLS certificate verification is disabled");
        builder = builder.danger_accept_invalid_certs(true);
    }

    if let Some(path) = &tls.ca_bundle {
        let pem = std::fs::read(path).map_err(|e| {
            McpError::Config(format!("cannot read CA bundle {}: {}", path.display(), e))
        })?;
        let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
            McpError::Config(format!("invalid CA bundle {}: {}", path.display(), e))
        })?;
        builder = builder.add_root_certificate(cert);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfig;
    use std::collections::HashMap;

    fn sources(pairs: &[(&str, &str)]) -> ConfigSources {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConfigSources::from_parts(env, FileConfig::default())
    }

    #[test]
    fn no_proxy_by_default() {
        assert_eq!(resolve_proxy(&Args::default(), &sources(&[])).unwrap(), None);
    }

    #[test]
    fn cli_host_and_port_build_url_with_credentials() {
        let args = Args {
            proxy_host: Some("proxy.corp".into()),
            proxy_port: Some(3128),
            proxy_user: Some("alice".into()),
            proxy_pass: Some("pw".into()),
            ..Default::default()
        };
        let proxy = resolve_proxy(&args, &sources(&[])).unwrap().unwrap();
        assert_eq!(proxy.url, "http://alice:pw@proxy.corp:3128");
        assert!(!format!("{:?}", proxy).contains("pw@"));
    }

    #[test]
    fn environment_proxy_url_is_used() {
        let proxy = resolve_proxy(
            &Args::default(),
            &sources(&[(ENV_PROXY_URL, "http://env-proxy:8080")]),
        )
        .unwrap()
        .unwrap();
        assert_eq!(proxy.url, "http://env-proxy:8080");
    }

    #[test]
    fn environment_port_must_be_numeric() {
        let result = resolve_proxy(
            &Args::default(),
            &sources(&[(ENV_PROXY_HOST, "h"), (ENV_PROXY_PORT, "eighty")]),
        );
        assert!(matches!(result, Err(McpError::Config(_))));
    }

    #[test]
    fn missing_ca_bundle_is_a_config_error() {
        let tls = TlsConfig {
            no_verify: false,
            ca_bundle: Some(PathBuf::from("/definitely/not/here.pem")),
        };
        let err = build_http_client(None, &tls).unwrap_err();
        assert!(matches!(err, McpError::Config(_)));
    }
}
