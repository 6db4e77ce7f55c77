use serde_json::Value;

use crate::cli::{Action, Args};
use crate::config::Config;
use crate::error::Result;
use crate::mcp::tools::{build_tool_call, summarize_tools, tool_names};
use crate::mcp::types::McpToolResult;
use crate::mcp::{McpClient, McpToolCall};
use crate::ui::output::{print_status, print_verbose, print_warning, tools_summary};

/// What one invocation asks the server to do, validated up front.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    ListTools,
    CallTool(McpToolCall),
}

impl Request {
    pub fn from_args(args: &Args) -> Result<Self> {
        match args.action {
            Action::List => Ok(Request::ListTools),
            Action::Call => build_tool_call(args).map(Request::CallTool),
        }
    }
}

/// Validate arguments and configuration, then run the request. Nothing
/// touches the network until both have passed.
pub async fn run(args: &Args) -> Result<Value> {
    let request = Request::from_args(args)?;
    let config = Config::from_env_and_args(args)?;
    run_with_config(&config, request).await
}

pub async fn run_with_config(config: &Config, request: Request) -> Result<Value> {
    let http = config.http_client()?;
    run_with_client(http, config, request).await
}

/// Connect, dispatch and close. The session is closed whether or not the
/// request succeeds.
pub async fn run_with_client(
    http: reqwest::Client,
    config: &Config,
    request: Request,
) -> Result<Value> {
    print_verbose(
        config.verbose,
        &format!("Connecting to {} ({})", config.sse_url, config.auth.label()),
    );

    let client = McpClient::connect_with(http, config).await?;
    print_verbose(
        config.verbose,
        &format!("RPC endpoint: {}", client.endpoint()),
    );

    let outcome = dispatch(&client, config, &request).await;
    let final_state = client.shutdown();
    tracing::debug!(state = ?final_state, "session finished");
    outcome
}

async fn dispatch(client: &McpClient, config: &Config, request: &Request) -> Result<Value> {
    match request {
        Request::ListTools => {
            let result = client.list_tools().await?;
            print_status(&tools_summary(tool_names(&result).len()));
            for line in summarize_tools(&result) {
                print_verbose(config.verbose, &format!("  - {}", line));
            }
            Ok(result)
        }
        Request::CallTool(call) => {
            print_verbose(config.verbose, &format!("Calling tool '{}'", call.name));
            let result = client.call_tool(call).await?;
            if McpToolResult::is_error_result(&result) {
                print_warning(&format!("tool '{}' reported an error", call.name));
            }
            Ok(result)
        }
    }
}
