#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use celonis_mcp::config::{AuthMode, Config, TlsConfig};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use url::Url;

/// How the mock answers a POST to the RPC endpoint.
pub enum PostReply {
    /// 202 with an empty body; these frames then go out on the stream.
    Stream(Vec<String>),
    /// 200 with this body as `text/event-stream`.
    Inline(String),
    /// Any status with a plain body.
    Status(u16, String),
}

type PostHandler = Arc<dyn Fn(&Value) -> PostReply + Send + Sync>;

/// Minimal SSE + JSON-RPC server: GET /mcp streams events, POST /rpc/*
/// receives requests.
pub struct MockMcpServer {
    pub addr: SocketAddr,
    pub posts: Arc<Mutex<Vec<Value>>>,
    pub auth_headers: Arc<Mutex<Vec<String>>>,
}

#[derive(Clone)]
pub struct MockBehavior {
    /// Data of the `endpoint` event sent right after the stream opens.
    pub endpoint: Option<String>,
    pub heartbeat: Option<Duration>,
    /// End the event stream this long after it opens.
    pub close_after: Option<Duration>,
    pub on_post: PostHandler,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            endpoint: Some("/rpc/abc123".to_string()),
            heartbeat: None,
            close_after: None,
            on_post: Arc::new(|_| PostReply::Stream(Vec::new())),
        }
    }
}

impl MockBehavior {
    pub fn on_post(mut self, f: impl Fn(&Value) -> PostReply + Send + Sync + 'static) -> Self {
        self.on_post = Arc::new(f);
        self
    }

    /// Answer every request with `result` under its own id.
    pub fn echo_result(self, result: Value) -> Self {
        self.on_post(move |req| PostReply::Stream(vec![message_frame(&success(req, result.clone()))]))
    }
}

impl MockMcpServer {
    pub async fn start(behavior: MockBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let posts = Arc::new(Mutex::new(Vec::new()));
        let auth_headers = Arc::new(Mutex::new(Vec::new()));
        let (frames, _) = broadcast::channel::<String>(64);

        let server_posts = Arc::clone(&posts);
        let server_auth = Arc::clone(&auth_headers);
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                let behavior = behavior.clone();
                let frames = frames.clone();
                let posts = Arc::clone(&server_posts);
                let auth = Arc::clone(&server_auth);
                tokio::spawn(async move {
                    let _ = handle_connection(socket, behavior, frames, posts, auth).await;
                });
            }
        });

        Self {
            addr,
            posts,
            auth_headers,
        }
    }

    pub fn sse_url(&self) -> Url {
        Url::parse(&format!("http://{}/mcp?draft=false", self.addr)).unwrap()
    }

    pub fn posted(&self) -> Vec<Value> {
        self.posts.lock().clone()
    }
}

struct RawRequest {
    method: String,
    path: String,
    authorization: Option<String>,
    body: Vec<u8>,
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<RawRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            if name == "content-length" {
                content_length = value.trim().parse().unwrap_or(0);
            } else if name == "authorization" {
                authorization = Some(value.trim().to_string());
            }
        }
    }

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Ok(RawRequest {
        method,
        path,
        authorization,
        body,
    })
}

async fn handle_connection(
    mut socket: TcpStream,
    behavior: MockBehavior,
    frames: broadcast::Sender<String>,
    posts: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    let request = read_request(&mut socket).await?;
    if let Some(header) = &request.authorization {
        auth.lock().push(header.clone());
    }

    if request.method == "GET" && request.path.starts_with("/mcp") {
        // Subscribe before announcing the endpoint so no response is missed.
        let mut rx = frames.subscribe();
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n",
            )
            .await?;
        if let Some(endpoint) = &behavior.endpoint {
            socket
                .write_all(format!("event: endpoint\ndata: {}\n\n", endpoint).as_bytes())
                .await?;
        }
        socket.flush().await?;

        let mut ticker = tokio::time::interval(behavior.heartbeat.unwrap_or(Duration::from_secs(3600)));
        ticker.tick().await;
        let close_at = tokio::time::sleep(behavior.close_after.unwrap_or(Duration::from_secs(3600)));
        tokio::pin!(close_at);
        loop {
            tokio::select! {
                // Dropping the socket ends the close-delimited body.
                _ = &mut close_at, if behavior.close_after.is_some() => return Ok(()),
                frame = rx.recv() => match frame {
                    Ok(frame) => socket.write_all(frame.as_bytes()).await?,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return Ok(()),
                },
                _ = ticker.tick(), if behavior.heartbeat.is_some() => {
                    socket.write_all(b"event: ping\ndata: {}\n\n").await?;
                }
            }
            socket.flush().await?;
        }
    }

    if request.method == "POST" && request.path.starts_with("/rpc/") {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        posts.lock().push(body.clone());

        match (behavior.on_post)(&body) {
            PostReply::Stream(out) => {
                write_response(&mut socket, 202, "text/plain", "").await?;
                for frame in out {
                    let _ = frames.send(frame);
                }
            }
            PostReply::Inline(text) => {
                write_response(&mut socket, 200, "text/event-stream", &text).await?;
            }
            PostReply::Status(status, text) => {
                write_response(&mut socket, status, "text/plain", &text).await?;
            }
        }
        return Ok(());
    }

    write_response(&mut socket, 404, "text/plain", "not found").await
}

async fn write_response(
    socket: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &str,
) -> std::io::Result<()> {
    let head = format!(
        "HTTP/1.1 {} Mock\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        body.len()
    );
    socket.write_all(head.as_bytes()).await?;
    socket.write_all(body.as_bytes()).await?;
    socket.flush().await
}

pub fn message_frame(message: &Value) -> String {
    format!("event: message\ndata: {}\n\n", message)
}

pub fn success(request: &Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": request["id"], "result": result})
}

/// Config for tests: API key auth against the mock, short timeouts.
pub fn test_config(sse_url: Url) -> Config {
    let token_url = sse_url.join("/oauth2/token").unwrap();
    Config {
        sse_url,
        token_url,
        auth: AuthMode::ApiKey("test-key".to_string()),
        scope: "mcp-asset.tools:execute".to_string(),
        handshake_timeout: Duration::from_secs(2),
        rpc_timeout: Duration::from_secs(2),
        token_timeout: Duration::from_secs(2),
        proxy: None,
        tls: TlsConfig::default(),
        verbose: false,
    }
}
