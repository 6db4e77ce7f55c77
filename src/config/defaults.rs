// Environment variable names
pub const ENV_ENDPOINT_URL: &str = "CELONIS_ENDPOINT_URL";
pub const ENV_API_KEY: &str = "CELONIS_API_KEY";
pub const ENV_CLIENT_ID: &str = "CELONIS_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "CELONIS_CLIENT_SECRET";
pub const ENV_TEAM_URL: &str = "CELONIS_TEAM_URL";
pub const ENV_SERVER_ID: &str = "CELONIS_SERVER_ID";
pub const ENV_OAUTH_SCOPE: &str = "CELONIS_OAUTH_SCOPE";
pub const ENV_HANDSHAKE_TIMEOUT: &str = "CELONIS_HANDSHAKE_TIMEOUT";
pub const ENV_RPC_TIMEOUT: &str = "CELONIS_RPC_TIMEOUT";
pub const ENV_TOKEN_TIMEOUT: &str = "CELONIS_TOKEN_TIMEOUT";
pub const ENV_VERBOSE: &str = "CELONIS_VERBOSE";
pub const ENV_PROXY_URL: &str = "PROXY_URL";
pub const ENV_PROXY_HOST: &str = "PROXY_HOST";
pub const ENV_PROXY_PORT: &str = "PROXY_PORT";
pub const ENV_PROXY_USER: &str = "PROXY_USER";
pub const ENV_PROXY_PASS: &str = "PROXY_PASS";

/// Every variable the loader reads from the process environment or `.env`.
pub const KNOWN_ENV_VARS: &[&str] = &[
    ENV_ENDPOINT_URL,
    ENV_API_KEY,
    ENV_CLIENT_ID,
    ENV_CLIENT_SECRET,
    ENV_TEAM_URL,
    ENV_SERVER_ID,
    ENV_OAUTH_SCOPE,
    ENV_HANDSHAKE_TIMEOUT,
    ENV_RPC_TIMEOUT,
    ENV_TOKEN_TIMEOUT,
    ENV_VERBOSE,
    ENV_PROXY_URL,
    ENV_PROXY_HOST,
    ENV_PROXY_PORT,
    ENV_PROXY_USER,
    ENV_PROXY_PASS,
];

/// Scope required to execute MCP tools.
pub const DEFAULT_OAUTH_SCOPE: &str = "mcp-asset.tools:execute";

/// Path appended to a team URL to reach its MCP server.
pub const MCP_SERVER_PATH: &str = "studio-copilot/api/v1/mcp-servers/mcp";

pub const TOKEN_PATH: &str = "oauth2/token";

pub fn default_handshake_timeout() -> u64 {
    10
}

pub fn default_rpc_timeout() -> u64 {
    30
}

pub fn default_token_timeout() -> u64 {
    15
}

pub fn default_connect_timeout() -> u64 {
    10
}

pub fn default_env_file() -> &'static str {
    ".env"
}
