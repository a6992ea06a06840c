use std::sync::Arc;

use mcp_toolbox::{Config, Deps, McpError, TransportMode, build_server, serve_http, serve_stdio};

async fn run(config: Config) -> Result<(), McpError> {
    let deps = Deps::from_config(&config)?;
    let server = Arc::new(build_server(
        &config.server_name,
        &config.server_version,
        deps,
    )?);

    tracing::info!(
        name = server.name(),
        version = server.version(),
        tools = server.tools().len(),
        transport = ?config.transport,
        "starting MCP server"
    );

    match config.transport {
        TransportMode::Stdio => serve_stdio(server).await?,
        TransportMode::Http => serve_http(server, config.bind_addr).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // stdout carries protocol messages in stdio mode; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let result = match Config::from_env() {
        Ok(config) => run(config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}
