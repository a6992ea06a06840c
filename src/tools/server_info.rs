use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::server::{ResourceHandler, Server};
use crate::types::{McpError, ResourceContent};

/// Placeholder status document. The figures are illustrative, not telemetry.
pub fn server_info_document() -> Value {
    json!({
        "status": "online",
        "uptime": "3 days, 4 hours, 12 minutes",
        "cpu_usage": "23%",
        "memory_usage": "45%",
        "disk_usage": "67%",
        "active_connections": 42,
        "total_requests": 15847,
    })
}

struct ServerInfoHandler;

#[async_trait]
impl ResourceHandler for ServerInfoHandler {
    async fn call(&self, uri: &str) -> Result<ResourceContent, McpError> {
        Ok(ResourceContent {
            uri: uri.to_string(),
            mime_type: Some("application/json".into()),
            text: Some(serde_json::to_string_pretty(&server_info_document())?),
            blob: None,
        })
    }
}

pub fn register(srv: &mut Server) -> Result<(), McpError> {
    srv.handle_resource("server-info", Arc::new(ServerInfoHandler))
}
