use std::io::IsTerminal;

use colored::*;
use serde_json::Value;

use super::highlight::Highlighter;
use crate::error::{AuthError, McpError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputStyle {
    #[default]
    Pretty,
    Compact,
}

impl OutputStyle {
    pub fn from_compact_flag(compact: bool) -> Self {
        if compact {
            OutputStyle::Compact
        } else {
            OutputStyle::Pretty
        }
    }
}

/// Serialize a result. Key order is whatever the server sent.
pub fn render_result(result: &Value, style: OutputStyle) -> String {
    let rendered = match style {
        OutputStyle::Pretty => serde_json::to_string_pretty(result),
        OutputStyle::Compact => serde_json::to_string(result),
    };
    // Serializing a `Value` cannot fail; fall back to Display all the same.
    rendered.unwrap_or_else(|_| result.to_string())
}

/// Print a result to stdout, highlighted when stdout is a color terminal.
pub fn print_result(result: &Value, style: OutputStyle) {
    let text = render_result(result, style);
    if style == OutputStyle::Pretty && colors_on_stdout() {
        print!("{}", Highlighter::new().json(&format!("{}\n", text)));
    } else {
        println!("{}", text);
    }
}

fn colors_on_stdout() -> bool {
    std::io::stdout().is_terminal() && colored::control::SHOULD_COLORIZE.should_colorize()
}

/// `Error (<kind>): <message>` followed by hint lines where one helps.
pub fn render_error(err: &McpError) -> String {
    let mut out = format!("Error ({}): {}", err.kind(), err);
    for hint in error_hints(err) {
        out.push_str("\n  hint: ");
        out.push_str(hint);
    }
    out
}

pub fn print_error(err: &McpError) {
    let rendered = render_error(err);
    let mut lines = rendered.lines();
    if let Some(first) = lines.next() {
        eprintln!("{}", first.red().bold());
    }
    for line in lines {
        eprintln!("{}", line.dimmed());
    }
}

fn error_hints(err: &McpError) -> Vec<&'static str> {
    match err {
        McpError::HandshakeTimeout { .. } => vec![
            "the server accepted the connection but never announced its RPC endpoint",
            "check that the endpoint URL points at an MCP server and that the server is deployed (not a draft)",
            "raise --handshake-timeout if the server is slow to start",
        ],
        McpError::Auth(AuthError::BadCredentials { .. }) => {
            vec!["check CELONIS_CLIENT_ID / CELONIS_CLIENT_SECRET or the --oauth pair"]
        }
        McpError::Auth(AuthError::InsufficientScope { .. }) => {
            vec!["grant the OAuth client the MCP tools scope, or set CELONIS_OAUTH_SCOPE"]
        }
        McpError::RpcTimeout { .. } => {
            vec!["the request was accepted but no matching response arrived; raise --rpc-timeout for slow tools"]
        }
        McpError::Config(_) => vec!["run with --help to see every flag and environment variable"],
        McpError::Network(_) => vec!["check connectivity, proxy settings (--proxy-url) and TLS options"],
        _ => Vec::new(),
    }
}

/// Status line on stderr, kept off stdout so results stay parseable.
pub fn print_status(message: &str) {
    eprintln!("{} {}", "[MCP]".cyan(), message);
}

/// Details shown only with --verbose.
pub fn print_verbose(verbose: bool, message: &str) {
    if verbose {
        eprintln!("{}", format!("[MCP] {}", message).dimmed());
    }
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "Warning:".yellow(), message);
}

pub fn tools_summary(count: usize) -> String {
    match count {
        1 => "1 tool available".to_string(),
        n => format!("{} tools available", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn pretty_output_is_deterministic_and_ordered() {
        let value: Value = serde_json::from_str(r#"{"zeta":1,"alpha":{"b":2,"a":1}}"#).unwrap();
        let rendered = render_result(&value, OutputStyle::Pretty);
        assert_eq!(
            rendered,
            "{\n  \"zeta\": 1,\n  \"alpha\": {\n    \"b\": 2,\n    \"a\": 1\n  }\n}"
        );
        assert_eq!(rendered, render_result(&value, OutputStyle::Pretty));
    }

    #[test]
    fn compact_output_is_one_line() {
        let rendered = render_result(&json!({"ok": true}), OutputStyle::Compact);
        assert_eq!(rendered, r#"{"ok":true}"#);
    }

    #[test]
    fn handshake_timeout_error_explains_missing_endpoint() {
        let rendered = render_error(&McpError::HandshakeTimeout {
            waited: Duration::from_secs(10),
        });
        assert!(rendered.starts_with("Error (handshake timeout): "));
        assert!(rendered.contains("never announced its RPC endpoint"));
    }

    #[test]
    fn rpc_error_has_no_hints() {
        let rendered = render_error(&McpError::Rpc {
            code: -32602,
            message: "Invalid params".into(),
        });
        assert_eq!(rendered, "Error (rpc): JSON-RPC error -32602: Invalid params");
    }

    #[test]
    fn summary_pluralizes() {
        assert_eq!(tools_summary(1), "1 tool available");
        assert_eq!(tools_summary(3), "3 tools available");
        assert_eq!(tools_summary(0), "0 tools available");
    }

    #[test]
    fn compact_flag_maps_to_style() {
        assert_eq!(OutputStyle::from_compact_flag(true), OutputStyle::Compact);
        assert_eq!(OutputStyle::from_compact_flag(false), OutputStyle::Pretty);
    }
}
