use regex::Regex;
use std::env;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex"));

/// Expand environment variables in a string using ${VAR_NAME} syntax.
/// Unknown variables are left as-is.
pub fn expand_env_var_in_string(value: &str) -> String {
    let mut result = value.to_string();

    for cap in ENV_VAR_PATTERN.captures_iter(value) {
        let var_name = &cap[1];
        let replacement = env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name));
        result = result.replace(&cap[0], &replacement);
    }

    result
}

/// Expand an optional setting and drop it when it ends up blank.
pub fn expand_optional(value: Option<&String>) -> Option<String> {
    value
        .map(|v| expand_env_var_in_string(v))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a number of seconds, naming the offending setting on failure.
pub fn parse_seconds(field: &str, raw: &str) -> Result<u64, String> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .ok_or_else(|| format!("{} must be a positive number of seconds, got '{}'", field, raw))
}

/// Parse a boolean flag the way the environment usually spells it.
pub fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
