use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tokio::time::{timeout_at, Instant};
use url::Url;

use super::pending::PendingRequests;
use super::sse::inline_responses;
use super::types::JsonRpcRequest;
use crate::auth::{auth_error_for, AccessToken};
use crate::error::{McpError, Result};

/// Sends JSON-RPC requests to the discovered endpoint and waits for the
/// answer to come back through the event stream.
#[derive(Clone)]
pub struct RpcDispatcher {
    http: reqwest::Client,
    endpoint: Url,
    token: AccessToken,
    pending: PendingRequests,
    timeout: Duration,
}

/// Removes the pending slot however the wait ends.
struct PendingGuard<'a> {
    pending: &'a PendingRequests,
    id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.cancel(self.id);
    }
}

impl RpcDispatcher {
    pub fn new(
        http: reqwest::Client,
        endpoint: Url,
        token: AccessToken,
        pending: PendingRequests,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            endpoint,
            token,
            pending,
            timeout,
        }
    }

    /// Send `method` with a fresh id and return its `result`.
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        self.send(JsonRpcRequest::new(method, params)).await
    }

    pub async fn send(&self, request: JsonRpcRequest) -> Result<Value> {
        let id = request.id.clone();
        let method = request.method.clone();
        let deadline = Instant::now() + self.timeout;

        // A dead stream refuses new slots, so nothing is POSTed.
        let rx = self.pending.register(&id)?;
        let _guard = PendingGuard {
            pending: &self.pending,
            id: &id,
        };

        tracing::debug!(%method, %id, endpoint = %self.endpoint, "sending JSON-RPC request");

        let timed_out = || McpError::RpcTimeout {
            method: method.clone(),
            id: id.clone(),
            waited: self.timeout,
        };

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, self.token.bearer())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { timed_out() } else { e.into() })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| if e.is_timeout() { timed_out() } else { e.into() })?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), %body, "POST rejected");
            if status.as_u16() == 401 || status.as_u16() == 403 {
                let scope = self.token.scope.clone().unwrap_or_default();
                return Err(auth_error_for(status, body, &scope).into());
            }
            return Err(McpError::Http {
                status: status.as_u16(),
                body,
            });
        }

        // Some servers answer on the POST itself instead of the stream.
        for inline in inline_responses(&body, content_type.as_deref()).await {
            if self.pending.fulfill(inline) {
                tracing::debug!(%id, "response arrived inline on the POST");
            }
        }

        match timeout_at(deadline, rx).await {
            Ok(Ok(response)) => {
                tracing::debug!(%method, %id, "received correlated response");
                response.into_result()
            }
            Ok(Err(_)) => Err(McpError::StreamClosed(format!(
                "{} before the response to {} arrived",
                self.pending
                    .closed_reason()
                    .unwrap_or_else(|| "stream closed".to_string()),
                method
            ))),
            Err(_) => Err(timed_out()),
        }
    }
}
