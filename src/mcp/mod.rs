pub mod client;
pub mod dispatcher;
pub mod pending;
pub mod session;
pub mod sse;
pub mod tools;
pub mod types;

pub use client::McpClient;
pub use dispatcher::RpcDispatcher;
pub use pending::PendingRequests;
pub use session::{SessionState, SseSession};
pub use types::{JsonRpcRequest, JsonRpcResponse, McpTool, McpToolCall};
