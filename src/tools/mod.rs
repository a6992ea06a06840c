pub mod calc;
pub mod clock;
pub mod code_review;
pub mod greeting;
pub mod image;
pub mod server_info;

use std::sync::Arc;

use crate::config::Config;
use crate::server::Server;
use crate::types::McpError;
use self::image::{HfImageClient, ImageGenerator};

const TOOLS_JSON: &[u8] = include_bytes!("../../tools.json");
const RESOURCES_JSON: &[u8] = include_bytes!("../../resources.json");
const PROMPTS_JSON: &[u8] = include_bytes!("../../prompts.json");

/// Shared dependencies for the tool handlers.
pub struct Deps {
    pub images: Arc<dyn ImageGenerator>,
}

impl Deps {
    /// Wire the real backends from configuration.
    pub fn from_config(config: &Config) -> Result<Arc<Self>, McpError> {
        let images = HfImageClient::new(config.hf_token.clone())
            .map_err(|e| McpError::Config(format!("image client: {}", e)))?;
        Ok(Arc::new(Deps {
            images: Arc::new(images),
        }))
    }
}

/// Register every tool, resource and prompt handler on the given server.
pub fn register_all(srv: &mut Server, deps: Arc<Deps>) -> Result<(), McpError> {
    greeting::register(srv)?;
    calc::register(srv)?;
    clock::register(srv)?;
    image::register(srv, deps.images.clone())?;
    server_info::register(srv)?;
    code_review::register(srv)?;

    let missing = srv.unhandled();
    if !missing.is_empty() {
        return Err(McpError::Other(format!(
            "declared without a handler: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Build the server from the embedded descriptors and register all handlers.
pub fn build_server(
    name: impl Into<String>,
    version: impl Into<String>,
    deps: Arc<Deps>,
) -> Result<Server, McpError> {
    let mut srv = Server::builder()
        .tools_json(TOOLS_JSON)
        .resources_json(RESOURCES_JSON)
        .prompts_json(PROMPTS_JSON)
        .server_info(name, version)
        .build()?;

    register_all(&mut srv, deps)?;
    Ok(srv)
}
