use serde_json::Value;
use url::Url;

use super::dispatcher::RpcDispatcher;
use super::session::{SessionState, SseSession};
use super::types::McpToolCall;
use crate::auth::resolve_token;
use crate::config::Config;
use crate::error::Result;

/// A connected MCP session: event stream plus the POST channel it announced.
pub struct McpClient {
    session: SseSession,
    dispatcher: RpcDispatcher,
}

impl McpClient {
    /// Authenticate, open the stream and wait for the endpoint using the
    /// given HTTP client.
    pub async fn connect_with(http: reqwest::Client, config: &Config) -> Result<Self> {
        let token = resolve_token(&http, config).await?;
        let session =
            SseSession::open(&http, &config.sse_url, &token, config.handshake_timeout).await?;

        let dispatcher = RpcDispatcher::new(
            http,
            session.endpoint().clone(),
            token,
            session.pending().clone(),
            config.rpc_timeout,
        );

        Ok(Self {
            session,
            dispatcher,
        })
    }

    pub fn endpoint(&self) -> &Url {
        self.session.endpoint()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Raw `tools/list` result.
    pub async fn list_tools(&self) -> Result<Value> {
        self.dispatcher.request("tools/list", None).await
    }

    /// Raw `tools/call` result. A result flagged `isError` is still a
    /// successful round trip and is returned as-is.
    pub async fn call_tool(&self, tool_call: &McpToolCall) -> Result<Value> {
        self.dispatcher
            .request("tools/call", Some(tool_call.to_params()))
            .await
    }

    /// Close the session and report the state it ended in.
    pub fn shutdown(mut self) -> SessionState {
        self.session.close();
        self.session.state()
    }
}
