use std::convert::Infallible;

use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde_json::Value;
use url::Url;

use super::types::JsonRpcResponse;

/// Event names servers use for keep-alives.
const HEARTBEAT_EVENTS: &[&str] = &["ping", "heartbeat", "keepalive", "keep-alive"];

/// What a single server-sent event means to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame {
    /// The POST channel announcement, resolved to an absolute URL.
    Endpoint(Url),
    Response(JsonRpcResponse),
    /// A server-initiated message (notification or request).
    Notification(Value),
    Heartbeat,
    Ignored(String),
}

/// Classify one event by name and payload.
///
/// Relative `endpoint` payloads are resolved against the stream URL.
pub fn classify_event(event: &str, data: &str, stream_url: &Url) -> SseFrame {
    let data = data.trim();

    if event == "endpoint" {
        if data.is_empty() {
            return SseFrame::Ignored("empty 'endpoint' event".to_string());
        }
        return match stream_url.join(data) {
            Ok(url) => SseFrame::Endpoint(url),
            Err(e) => SseFrame::Ignored(format!("unusable endpoint '{}': {}", data, e)),
        };
    }

    if HEARTBEAT_EVENTS.contains(&event) || data.is_empty() {
        return SseFrame::Heartbeat;
    }

    match serde_json::from_str::<Value>(data) {
        Ok(message) => match JsonRpcResponse::from_message(&message) {
            Some(response) => SseFrame::Response(response),
            None if message.get("method").is_some() => SseFrame::Notification(message),
            None => SseFrame::Ignored(format!("unrecognised '{}' payload", event)),
        },
        Err(_) => SseFrame::Ignored(format!("non-JSON '{}' payload", event)),
    }
}

/// Extract JSON-RPC responses from a POST body, whether the server sent
/// plain JSON (single or batch) or an SSE stream.
pub async fn inline_responses(body: &str, content_type: Option<&str>) -> Vec<JsonRpcResponse> {
    let body = body.trim();
    if body.is_empty() {
        return Vec::new();
    }

    let is_event_stream = content_type
        .map(|ct| ct.starts_with("text/event-stream"))
        .unwrap_or(false)
        || body.starts_with("data:")
        || body.starts_with("event:");

    let payloads = if is_event_stream {
        event_payloads(body).await
    } else {
        vec![body.to_string()]
    };

    payloads
        .iter()
        .filter_map(|p| serde_json::from_str::<Value>(p).ok())
        .flat_map(|message| match message {
            Value::Array(batch) => batch,
            single => vec![single],
        })
        .filter_map(|m| JsonRpcResponse::from_message(&m))
        .collect()
}

/// `data` of every non-heartbeat event in a complete SSE body, decoded with
/// the same parser as the live stream.
async fn event_payloads(body: &str) -> Vec<String> {
    // The trailing blank line dispatches a final event the server left open.
    let complete = format!("{}\n\n", body);
    futures::stream::once(async move { Ok::<_, Infallible>(complete) })
        .eventsource()
        .filter_map(|item| async move {
            let event = item.ok()?;
            if HEARTBEAT_EVENTS.contains(&event.event.as_str()) || event.data.trim().is_empty() {
                return None;
            }
            Some(event.data)
        })
        .collect()
        .await
}
