//! `mcp-toolbox`: a small MCP (Model Context Protocol) server.
//!
//! Exposes a handful of stateless operations behind the standard MCP
//! tool/resource/prompt interface:
//!
//! * tools `greeting`, `calc`, `current-time` and `generate-image`
//! * resource `server-info` (`server://info`)
//! * prompt `code_review`
//!
//! Descriptors live in `tools.json`, `resources.json` and `prompts.json` and
//! are embedded at compile time. The [`Server`] validates arguments against
//! each descriptor's input schema before dispatching to a handler.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mcp_toolbox::{Config, Deps, JsonRpcRequest, build_server};
//!
//! # async fn example() -> Result<(), mcp_toolbox::McpError> {
//! let config = Config::from_env()?;
//! let deps = Deps::from_config(&config)?;
//! let server = build_server(&config.server_name, &config.server_version, deps)?;
//!
//! let req: JsonRpcRequest = serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)?;
//! let resp = server.handle(req).await;
//! println!("{}", serde_json::to_string(&resp)?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod loader;
pub mod server;
pub mod tools;
pub mod transport_http;
pub mod transport_stdio;
pub mod types;
mod validate;

// Re-export the most commonly used items at the crate root.
pub use config::{Config, TransportMode};
pub use loader::{load_resources, load_tools, parse_prompts, parse_resources, parse_tools};
pub use server::{
    FnToolHandler, PromptHandler, ResourceHandler, Server, ServerBuilder, ToolHandler,
};
pub use tools::{Deps, build_server};
pub use transport_http::{http_router, serve_http};
pub use transport_stdio::serve_stdio;
pub use types::{
    ContentBlock, JsonRpcRequest, JsonRpcResponse, McpError, McpResponse, PROTOCOL_VERSION,
    Prompt, PromptResult, Resource, ResourceContent, RpcError, Tool, ToolResult, error_result,
    image_result, new_error_response, structured_result, text_result,
};
