use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

/// JSON-RPC 2.0 error codes.
pub const ERR_CODE_PARSE: i32 = -32700;
pub const ERR_CODE_INVALID_REQ: i32 = -32600;
pub const ERR_CODE_NO_METHOD: i32 = -32601;
pub const ERR_CODE_BAD_PARAMS: i32 = -32602;
pub const ERR_CODE_INTERNAL: i32 = -32603;

/// MCP protocol version this server implements.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

// ── Request ──

/// Inbound JSON-RPC 2.0 request or notification.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

// ── Response ──

/// Response from [`Server::handle()`](crate::Server::handle).
///
/// Listings and the `initialize` result are pre-serialized when the server is
/// built and shared via `Arc<RawValue>`, so answering them costs a ref-count
/// increment.
///
/// Implements [`Serialize`]; hand it straight to `axum::Json` or
/// `serde_json::to_writer`. For structured inspection call
/// [`into_json_rpc()`](McpResponse::into_json_rpc).
#[derive(Debug)]
pub struct McpResponse {
    id: Option<Value>,
    kind: ResponseKind,
}

#[derive(Debug)]
enum ResponseKind {
    Cached(Arc<RawValue>),
    Result(Value),
    Error(RpcError),
    /// No response body.
    Notification,
}

impl McpResponse {
    /// True when the request was a notification (no response body needed).
    pub fn is_notification(&self) -> bool {
        matches!(self.kind, ResponseKind::Notification)
    }

    /// The JSON-RPC error, if this response carries one.
    pub fn rpc_error(&self) -> Option<&RpcError> {
        match &self.kind {
            ResponseKind::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Convert to a [`JsonRpcResponse`] for structured inspection.
    pub fn into_json_rpc(self) -> JsonRpcResponse {
        let (result, error) = match self.kind {
            ResponseKind::Cached(raw) => (
                Some(serde_json::from_str(raw.get()).unwrap_or_default()),
                None,
            ),
            ResponseKind::Result(value) => (Some(value), None),
            ResponseKind::Error(err) => (None, Some(err)),
            ResponseKind::Notification => (None, None),
        };
        JsonRpcResponse {
            jsonrpc: "2.0".into(),
            id: self.id,
            result,
            error,
        }
    }

    pub(crate) fn cached(id: Option<Value>, raw: &Arc<RawValue>) -> Self {
        McpResponse {
            id,
            kind: ResponseKind::Cached(Arc::clone(raw)),
        }
    }

    pub(crate) fn ok(id: Option<Value>, result: Value) -> Self {
        McpResponse {
            id,
            kind: ResponseKind::Result(result),
        }
    }

    pub(crate) fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        McpResponse {
            id,
            kind: ResponseKind::Error(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    pub(crate) fn notification() -> Self {
        McpResponse {
            id: None,
            kind: ResponseKind::Notification,
        }
    }
}

impl Serialize for McpResponse {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let has_id = self.id.is_some();
        let has_payload = !matches!(self.kind, ResponseKind::Notification);
        let len = 1 + has_id as usize + has_payload as usize;

        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("jsonrpc", "2.0")?;

        if let Some(ref id) = self.id {
            map.serialize_entry("id", id)?;
        }

        match &self.kind {
            ResponseKind::Cached(raw) => map.serialize_entry("result", raw.as_ref())?,
            ResponseKind::Result(value) => map.serialize_entry("result", value)?,
            ResponseKind::Error(err) => map.serialize_entry("error", err)?,
            ResponseKind::Notification => {}
        }

        map.end()
    }
}

/// Structured JSON-RPC 2.0 response, used by tests and by transports that
/// need to report errors before a request reaches the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ── MCP domain types ──

/// Tool descriptor, usually loaded from `tools.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    /// Parsed input schema used for argument validation.
    #[serde(skip)]
    pub input_meta: SchemaMeta,
    /// Parsed output schema used to check structured results.
    #[serde(skip)]
    pub output_meta: Option<SchemaMeta>,
}

/// Resource descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    pub uri: String,
    pub mime_type: String,
}

/// Prompt descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

/// Tool call result returned by handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    /// Text of the first text block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Single content block in a tool result or prompt message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        /// Base64-encoded image bytes.
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

/// Resource content returned by resource handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContent {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

/// Result of `prompts/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: ContentBlock,
}

// ── Schema metadata ──

/// JSON Schema primitive types understood by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

impl JsonType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(JsonType::String),
            "number" => Some(JsonType::Number),
            "integer" => Some(JsonType::Integer),
            "boolean" => Some(JsonType::Boolean),
            "object" => Some(JsonType::Object),
            "array" => Some(JsonType::Array),
            "null" => Some(JsonType::Null),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JsonType::String => "string",
            JsonType::Number => "number",
            JsonType::Integer => "integer",
            JsonType::Boolean => "boolean",
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::Null => "null",
        }
    }
}

/// Declared shape of one property.
#[derive(Debug, Clone)]
pub struct PropertyMeta {
    pub name: String,
    /// `None` means any type is accepted.
    pub kind: Option<JsonType>,
    pub enum_values: Option<Vec<Value>>,
}

/// Parsed schema metadata used for validation.
#[derive(Debug, Clone, Default)]
pub struct SchemaMeta {
    pub required: Vec<String>,
    pub properties: Vec<PropertyMeta>,
}

// ── Convenience constructors ──

/// Create a simple text tool result.
pub fn text_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![ContentBlock::Text { text: text.into() }],
        structured_content: None,
        is_error: false,
    }
}

/// Create a text tool result that also carries structured output.
pub fn structured_result(text: impl Into<String>, structured: Value) -> ToolResult {
    ToolResult {
        content: vec![ContentBlock::Text { text: text.into() }],
        structured_content: Some(structured),
        is_error: false,
    }
}

/// Create an image tool result from already-encoded data.
pub fn image_result(data: impl Into<String>, mime_type: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![ContentBlock::Image {
            data: data.into(),
            mime_type: mime_type.into(),
        }],
        structured_content: None,
        is_error: false,
    }
}

/// Create an error tool result.
pub fn error_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![ContentBlock::Text { text: text.into() }],
        structured_content: None,
        is_error: true,
    }
}

/// Build a JSON-RPC error response.
pub fn new_error_response(
    id: Option<Value>,
    code: i32,
    message: impl Into<String>,
) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".into(),
        id,
        result: None,
        error: Some(RpcError {
            code,
            message: message.into(),
            data: None,
        }),
    }
}

/// Crate error type.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments: field \"{field}\" {reason}")]
    InvalidArguments { field: String, reason: String },
    #[error("duplicate registration: {0}")]
    DuplicateRegistration(String),
    #[error("structured output of {tool} does not match its output schema: {reason}")]
    OutputMismatch { tool: String, reason: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("tool error: {0}")]
    ToolError(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

// Internal params structs for deserialization.

#[derive(Debug, Deserialize)]
pub(crate) struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResourceReadParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PromptGetParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClientInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_block_serializes_mime_type_camel_case() {
        let result = image_result("aGVsbG8=", "image/png");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({"content": [{"type": "image", "data": "aGVsbG8=", "mimeType": "image/png"}]})
        );
    }

    #[test]
    fn test_error_result_sets_flag() {
        let value = serde_json::to_value(error_result("boom")).unwrap();
        assert_eq!(value["isError"], true);
        assert_eq!(value["content"][0]["text"], "boom");
    }

    #[test]
    fn test_success_omits_is_error() {
        let value = serde_json::to_value(text_result("ok")).unwrap();
        assert!(value.get("isError").is_none());
        assert!(value.get("structuredContent").is_none());
    }

    #[test]
    fn test_notification_serializes_without_payload() {
        let resp = McpResponse::notification();
        assert_eq!(serde_json::to_value(&resp).unwrap(), json!({"jsonrpc": "2.0"}));
    }

    #[test]
    fn test_cached_response_embeds_raw_json() {
        let raw: Arc<RawValue> = Arc::from(RawValue::from_string(r#"{"a":1}"#.into()).unwrap());
        let resp = McpResponse::cached(Some(json!(7)), &raw);
        let text = serde_json::to_string(&resp).unwrap();
        assert_eq!(text, r#"{"jsonrpc":"2.0","id":7,"result":{"a":1}}"#);
    }
}
