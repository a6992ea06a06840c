use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::server::Server;
use crate::types::{ERR_CODE_INVALID_REQ, JsonRpcRequest, new_error_response};

const SESSION_HEADER: &str = "mcp-session-id";

/// Shared state for the HTTP handler.
pub(crate) struct HttpState {
    server: Arc<Server>,
    sessions: RwLock<HashSet<String>>,
}

/// Create an Axum router for the MCP server.
///
/// `POST /mcp` takes one JSON-RPC message, `DELETE /mcp` ends the session
/// named by the `mcp-session-id` header, `GET /healthz` reports liveness.
pub fn http_router(server: Arc<Server>) -> Router {
    let state = Arc::new(HttpState {
        server,
        sessions: RwLock::new(HashSet::new()),
    });

    Router::new()
        .route("/mcp", post(handle_mcp).delete(handle_end_session))
        .route("/healthz", get(handle_healthz))
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve_http(server: Arc<Server>, addr: std::net::SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "serving MCP over HTTP");
    axum::serve(listener, http_router(server)).await
}

async fn handle_healthz() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn handle_mcp(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    Json(req): Json<JsonRpcRequest>,
) -> Response {
    let is_initialize = req.method == "initialize";

    // Outside initialize, a session id must be one we minted and not ended.
    if !is_initialize {
        if let Some(id) = session_header(&headers) {
            if !state.sessions.read().await.contains(id) {
                tracing::debug!(session = %id, "unknown session");
                let body = new_error_response(req.id, ERR_CODE_INVALID_REQ, "unknown session");
                return (StatusCode::NOT_FOUND, Json(body)).into_response();
            }
        }
    }

    let resp = state.server.handle(req).await;

    if resp.is_notification() {
        return (StatusCode::ACCEPTED, Body::empty()).into_response();
    }

    let mut response = Json(&resp).into_response();

    if is_initialize && resp.rpc_error().is_none() {
        let sid = Uuid::new_v4().to_string();
        if let Ok(value) = HeaderValue::from_str(&sid) {
            state.sessions.write().await.insert(sid);
            response.headers_mut().insert(SESSION_HEADER, value);
        }
    }

    response
}

async fn handle_end_session(State(state): State<Arc<HttpState>>, headers: HeaderMap) -> StatusCode {
    let Some(id) = session_header(&headers) else {
        return StatusCode::BAD_REQUEST;
    };
    if state.sessions.write().await.remove(id) {
        tracing::debug!(session = %id, "session ended");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

fn session_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).map(|h| h.to_str().unwrap_or_default())
}
