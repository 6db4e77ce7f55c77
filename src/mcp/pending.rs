use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::types::JsonRpcResponse;
use crate::error::{McpError, Result};

#[derive(Default)]
struct Table {
    slots: HashMap<String, oneshot::Sender<JsonRpcResponse>>,
    /// Set once the stream is gone; no new slots after that.
    closed: Option<String>,
}

/// Requests waiting for their answer on the event stream, keyed by id.
///
/// Each slot is fulfilled at most once. Shared between the stream reader
/// task and whoever sends requests.
#[derive(Clone, Default)]
pub struct PendingRequests {
    inner: Arc<Mutex<Table>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a slot for `id`. The receiver resolves with the matching
    /// response, or errors once the table is closed. Fails with
    /// `StreamClosed` if the table is already closed.
    pub fn register(&self, id: &str) -> Result<oneshot::Receiver<JsonRpcResponse>> {
        let mut table = self.inner.lock();
        if let Some(reason) = &table.closed {
            return Err(McpError::StreamClosed(reason.clone()));
        }
        let (tx, rx) = oneshot::channel();
        if table.slots.insert(id.to_string(), tx).is_some() {
            tracing::warn!(id, "replaced an existing pending request");
        }
        Ok(rx)
    }

    /// Hand a response to its waiter. Returns false when no request with
    /// that id is pending (unknown, duplicate or already timed out).
    pub fn fulfill(&self, response: JsonRpcResponse) -> bool {
        let Some(id) = response.id_key() else {
            tracing::debug!("ignoring response without a usable id");
            return false;
        };

        let slot = self.inner.lock().slots.remove(&id);
        match slot {
            Some(tx) => {
                let delivered = tx.send(response).is_ok();
                if !delivered {
                    tracing::debug!(id = %id, "waiter went away before its response arrived");
                }
                delivered
            }
            None => {
                tracing::debug!(id = %id, "ignoring response for unknown request id");
                false
            }
        }
    }

    pub fn cancel(&self, id: &str) -> bool {
        self.inner.lock().slots.remove(id).is_some()
    }

    /// Refuse new slots and drop every open one; waiters see a closed
    /// channel. The first reason sticks.
    pub fn close_all(&self, reason: impl Into<String>) {
        let drained = {
            let mut table = self.inner.lock();
            if table.closed.is_none() {
                table.closed = Some(reason.into());
            }
            std::mem::take(&mut table.slots)
        };
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "closing pending requests");
        }
    }

    /// Why the table was closed, if it was.
    pub fn closed_reason(&self) -> Option<String> {
        self.inner.lock().closed.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().slots.is_empty()
    }
}
