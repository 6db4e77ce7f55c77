//! The SSE half of the MCP connection.
//!
//! The server announces the URL for JSON-RPC POSTs as an `endpoint` event on
//! the stream, then pushes each response back onto the same stream. A session
//! therefore moves through two phases before it is usable:
//!
//! ```text
//! Connecting -> AwaitingEndpoint -> Ready -> Closed
//!      \               \              \
//!       +---------------+--------------+--> Failed
//! ```
//!
//! A server that never sends `endpoint` is a known failure mode; it ends in
//! `Failed` with [`McpError::HandshakeTimeout`] rather than hanging.

use std::sync::Arc;
use std::time::Duration;

use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use url::Url;

use super::pending::PendingRequests;
use super::sse::{classify_event, SseFrame};
use crate::auth::{auth_error_for, AccessToken};
use crate::error::{McpError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    AwaitingEndpoint,
    Ready,
    Closed,
    Failed(String),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed(_))
    }
}

type EndpointResult = std::result::Result<Url, String>;

/// Aborts the stream reader when dropped, which drops the response and
/// releases the connection.
struct ReaderHandle(JoinHandle<()>);

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// An open event stream with a discovered RPC endpoint.
pub struct SseSession {
    endpoint: Url,
    pending: PendingRequests,
    state: Arc<watch::Sender<SessionState>>,
    reader: Option<ReaderHandle>,
}

impl SseSession {
    /// Open the stream and wait for the `endpoint` event.
    ///
    /// `handshake_timeout` bounds connecting and endpoint discovery
    /// together; heartbeats do not extend it.
    pub async fn open(
        http: &reqwest::Client,
        stream_url: &Url,
        token: &AccessToken,
        handshake_timeout: Duration,
    ) -> Result<Self> {
        let (state_tx, _) = watch::channel(SessionState::Connecting);
        let state = Arc::new(state_tx);
        let deadline = Instant::now() + handshake_timeout;

        tracing::info!(url = %stream_url, "connecting to event stream");

        let response = match timeout_at(deadline, connect(http, stream_url, token)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(fail(&state, e)),
            Err(_) => {
                return Err(fail(
                    &state,
                    McpError::HandshakeTimeout {
                        waited: handshake_timeout,
                    },
                ))
            }
        };

        state.send_replace(SessionState::AwaitingEndpoint);
        tracing::debug!("stream open, waiting for 'endpoint' event");

        let pending = PendingRequests::new();
        let (endpoint_tx, endpoint_rx) = oneshot::channel();
        let reader = ReaderHandle(tokio::spawn(read_stream(
            response,
            stream_url.clone(),
            pending.clone(),
            Arc::clone(&state),
            endpoint_tx,
        )));

        // Dropping `reader` on any early return tears the stream down.
        let endpoint = match timeout_at(deadline, endpoint_rx).await {
            Ok(Ok(Ok(url))) => url,
            Ok(Ok(Err(reason))) => return Err(fail(&state, McpError::StreamClosed(reason))),
            Ok(Err(_)) => {
                return Err(fail(
                    &state,
                    McpError::StreamClosed("stream reader stopped before 'endpoint'".to_string()),
                ))
            }
            Err(_) => {
                tracing::warn!(
                    waited = ?handshake_timeout,
                    "server accepted the stream but never sent 'endpoint'"
                );
                return Err(fail(
                    &state,
                    McpError::HandshakeTimeout {
                        waited: handshake_timeout,
                    },
                ));
            }
        };

        // The reader may already have seen the stream end.
        if !mark_ready(&state) {
            let reason = pending
                .closed_reason()
                .unwrap_or_else(|| "event stream ended during the handshake".to_string());
            return Err(McpError::StreamClosed(reason));
        }
        tracing::info!(endpoint = %endpoint, "session ready");

        Ok(Self {
            endpoint,
            pending,
            state,
            reader: Some(reader),
        })
    }

    /// URL for JSON-RPC POSTs, as announced by the server.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Stop reading, release the connection and fail any waiters.
    pub fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            drop(reader);
            self.pending.close_all("session closed");
            set_terminal(&self.state, SessionState::Closed);
            tracing::debug!("session closed");
        }
    }
}

impl Drop for SseSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// `AwaitingEndpoint -> Ready`. False if the session already ended.
fn mark_ready(state: &watch::Sender<SessionState>) -> bool {
    state.send_if_modified(|current| {
        if *current == SessionState::AwaitingEndpoint {
            *current = SessionState::Ready;
            true
        } else {
            false
        }
    })
}

/// Move to `next` unless a terminal state was already reached.
fn set_terminal(state: &watch::Sender<SessionState>, next: SessionState) {
    state.send_if_modified(|current| {
        if current.is_terminal() {
            false
        } else {
            *current = next;
            true
        }
    });
}

fn fail(state: &watch::Sender<SessionState>, err: McpError) -> McpError {
    state.send_replace(SessionState::Failed(err.to_string()));
    err
}

async fn connect(
    http: &reqwest::Client,
    stream_url: &Url,
    token: &AccessToken,
) -> Result<reqwest::Response> {
    let response = http
        .get(stream_url.clone())
        .header(AUTHORIZATION, token.bearer())
        .header(ACCEPT, "text/event-stream")
        .header(CACHE_CONTROL, "no-cache")
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(auth_error_for(status, body, token.scope.as_deref().unwrap_or("")).into());
    }
    Err(McpError::Http {
        status: status.as_u16(),
        body,
    })
}

/// Drain the stream until it ends or the task is aborted.
async fn read_stream(
    response: reqwest::Response,
    stream_url: Url,
    pending: PendingRequests,
    state: Arc<watch::Sender<SessionState>>,
    endpoint_tx: oneshot::Sender<EndpointResult>,
) {
    let mut endpoint_tx = Some(endpoint_tx);
    let mut events = response.bytes_stream().eventsource();

    while let Some(item) = events.next().await {
        let event = match item {
            Ok(event) => event,
            Err(e) => {
                let reason = format!("stream error: {}", e);
                tracing::warn!(%reason, "event stream failed");
                finish(&state, &pending, endpoint_tx.take(), reason, true);
                return;
            }
        };

        match classify_event(&event.event, &event.data, &stream_url) {
            SseFrame::Endpoint(url) => match endpoint_tx.take() {
                Some(tx) => {
                    tracing::debug!(endpoint = %url, "discovered RPC endpoint");
                    let _ = tx.send(Ok(url));
                }
                None => tracing::debug!(endpoint = %url, "ignoring repeated 'endpoint' event"),
            },
            SseFrame::Response(response) => {
                pending.fulfill(response);
            }
            SseFrame::Notification(message) => {
                tracing::debug!(method = ?message.get("method"), "server notification");
            }
            SseFrame::Heartbeat => {
                tracing::trace!(event = %event.event, "heartbeat");
            }
            SseFrame::Ignored(reason) => {
                tracing::debug!(%reason, "ignoring event");
            }
        }
    }

    let failed = endpoint_tx.is_some();
    let reason = if failed {
        "server ended the stream before sending 'endpoint'"
    } else {
        "server ended the event stream"
    };
    finish(&state, &pending, endpoint_tx.take(), reason.to_string(), failed);
}

fn finish(
    state: &watch::Sender<SessionState>,
    pending: &PendingRequests,
    endpoint_tx: Option<oneshot::Sender<EndpointResult>>,
    reason: String,
    failed: bool,
) {
    pending.close_all(reason.clone());
    if let Some(tx) = endpoint_tx {
        let _ = tx.send(Err(reason.clone()));
    }
    if failed {
        set_terminal(state, SessionState::Failed(reason));
    } else {
        tracing::debug!("server ended the event stream");
        set_terminal(state, SessionState::Closed);
    }
}
