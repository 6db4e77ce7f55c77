pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod orchestrator;
pub mod ui;

pub use error::{AuthError, McpError, Result};
