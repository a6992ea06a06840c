use std::net::SocketAddr;

use crate::types::McpError;

/// Which transport the binary serves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Stdio,
    Http,
}

/// Server configuration, read once at startup.
///
/// Handlers never look at the environment; they receive what they need from
/// this struct through [`Deps`](crate::tools::Deps).
#[derive(Debug, Clone)]
pub struct Config {
    /// Hugging Face access token used by `generate-image`.
    pub hf_token: String,
    pub transport: TransportMode,
    pub bind_addr: SocketAddr,
    pub server_name: String,
    pub server_version: String,
}

impl Config {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, McpError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, McpError> {
        let hf_token = lookup("HF_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| McpError::Config("HF_TOKEN must be set".into()))?;

        let transport = match lookup("MCP_TRANSPORT").as_deref() {
            None | Some("stdio") => TransportMode::Stdio,
            Some("http") => TransportMode::Http,
            Some(other) => {
                return Err(McpError::Config(format!(
                    "MCP_TRANSPORT must be 'stdio' or 'http', got '{}'",
                    other
                )));
            }
        };

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = lookup("PORT").unwrap_or_else(|| "8080".into());
        let bind_addr = format!("{}:{}", host, port)
            .parse::<SocketAddr>()
            .map_err(|e| McpError::Config(format!("invalid bind address {}:{}: {}", host, port, e)))?;

        Ok(Config {
            hf_token,
            transport,
            bind_addr,
            server_name: lookup("SERVER_NAME").unwrap_or_else(|| env!("CARGO_PKG_NAME").into()),
            server_version: lookup("SERVER_VERSION")
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").into()),
        })
    }
}
