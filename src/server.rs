use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::{Map, Value, json};

use crate::loader;
use crate::types::*;

/// Handler trait for MCP tools. Implement this or use closures.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Value) -> Result<ToolResult, McpError>;
}

/// Handler trait for MCP resources.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn call(&self, uri: &str) -> Result<ResourceContent, McpError>;
}

/// Handler trait for MCP prompts. Arguments arrive as a string map.
#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn call(&self, args: &Map<String, Value>) -> Result<PromptResult, McpError>;
}

/// Wraps an async closure into a ToolHandler.
pub struct FnToolHandler<F> {
    f: F,
}

impl<F, Fut> FnToolHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<ToolResult, McpError>> + Send + 'static,
{
    pub fn new(f: F) -> Arc<dyn ToolHandler> {
        Arc::new(Self { f })
    }
}

#[async_trait]
impl<F, Fut> ToolHandler for FnToolHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<ToolResult, McpError>> + Send + 'static,
{
    async fn call(&self, args: Value) -> Result<ToolResult, McpError> {
        (self.f)(args).await
    }
}

/// Pre-serialized listing payloads, rebuilt whenever a descriptor is added.
#[derive(Debug)]
struct Listings {
    initialize: Arc<RawValue>,
    tools: Arc<RawValue>,
    resources: Arc<RawValue>,
    prompts: Arc<RawValue>,
}

/// The MCP server: a table of named tools, resources and prompts plus the
/// JSON-RPC routing in front of it.
///
/// Create with [`Server::builder`], attach handlers, then share it behind an
/// `Arc` with a transport. Handlers are stateless from the server's point of
/// view; the server itself is immutable once serving starts.
pub struct Server {
    server_name: String,
    server_version: String,
    tools: HashMap<String, Tool>,
    tool_list: Vec<Tool>,
    resources: HashMap<String, Resource>,
    resource_list: Vec<Resource>,
    prompts: HashMap<String, Prompt>,
    prompt_list: Vec<Prompt>,
    tool_handlers: HashMap<String, Arc<dyn ToolHandler>>,
    resource_handlers: HashMap<String, Arc<dyn ResourceHandler>>,
    prompt_handlers: HashMap<String, Arc<dyn PromptHandler>>,
    listings: Listings,
}

impl Server {
    /// Create a new server builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.server_name
    }

    pub fn version(&self) -> &str {
        &self.server_version
    }

    /// Tool descriptors in registration order.
    pub fn tools(&self) -> &[Tool] {
        &self.tool_list
    }

    /// Register a tool descriptor together with its handler.
    pub fn register_tool(
        &mut self,
        tool: Tool,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), McpError> {
        if self.tools.contains_key(&tool.name) {
            return Err(McpError::DuplicateRegistration(tool.name));
        }
        let mut tool = tool;
        tool.input_meta = loader::parse_schema_meta(&tool.input_schema);
        tool.output_meta = tool.output_schema.as_ref().map(loader::parse_schema_meta);

        self.tool_handlers.insert(tool.name.clone(), handler);
        self.tools.insert(tool.name.clone(), tool.clone());
        self.tool_list.push(tool);
        self.refresh_listings()
    }

    /// Register a resource descriptor together with its handler.
    pub fn register_resource(
        &mut self,
        resource: Resource,
        handler: Arc<dyn ResourceHandler>,
    ) -> Result<(), McpError> {
        if self.resources.contains_key(&resource.name) {
            return Err(McpError::DuplicateRegistration(resource.name));
        }
        if self.resource_list.iter().any(|r| r.uri == resource.uri) {
            return Err(McpError::DuplicateRegistration(resource.uri));
        }
        self.resource_handlers.insert(resource.name.clone(), handler);
        self.resources.insert(resource.name.clone(), resource.clone());
        self.resource_list.push(resource);
        self.refresh_listings()
    }

    /// Register a prompt descriptor together with its handler.
    pub fn register_prompt(
        &mut self,
        prompt: Prompt,
        handler: Arc<dyn PromptHandler>,
    ) -> Result<(), McpError> {
        if self.prompts.contains_key(&prompt.name) {
            return Err(McpError::DuplicateRegistration(prompt.name));
        }
        self.prompt_handlers.insert(prompt.name.clone(), handler);
        self.prompts.insert(prompt.name.clone(), prompt.clone());
        self.prompt_list.push(prompt);
        self.refresh_listings()
    }

    /// Attach a handler to a tool declared in the descriptor files.
    pub fn handle_tool(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), McpError> {
        attach(&self.tools, &mut self.tool_handlers, name.into(), handler)
    }

    /// Attach a handler to a resource declared in the descriptor files.
    pub fn handle_resource(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn ResourceHandler>,
    ) -> Result<(), McpError> {
        attach(&self.resources, &mut self.resource_handlers, name.into(), handler)
    }

    /// Attach a handler to a prompt declared in the descriptor files.
    pub fn handle_prompt(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn PromptHandler>,
    ) -> Result<(), McpError> {
        attach(&self.prompts, &mut self.prompt_handlers, name.into(), handler)
    }

    /// Names of declared tools, resources and prompts that have no handler.
    pub fn unhandled(&self) -> Vec<&str> {
        let tools = self
            .tool_list
            .iter()
            .map(|t| t.name.as_str())
            .filter(|n| !self.tool_handlers.contains_key(*n));
        let resources = self
            .resource_list
            .iter()
            .map(|r| r.name.as_str())
            .filter(|n| !self.resource_handlers.contains_key(*n));
        let prompts = self
            .prompt_list
            .iter()
            .map(|p| p.name.as_str())
            .filter(|n| !self.prompt_handlers.contains_key(*n));
        tools.chain(resources).chain(prompts).collect()
    }

    /// Dispatch a tool call by name.
    ///
    /// Unknown names never reach a handler. Arguments are validated against
    /// the declared input schema before the handler runs; the handler's
    /// result is returned as-is once its structured output has been checked
    /// against the declared output schema.
    pub async fn call_tool(&self, name: &str, args: Value) -> Result<ToolResult, McpError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| McpError::UnknownTool(name.to_string()))?;

        let args = if args.is_null() { json!({}) } else { args };
        tool.validate_arguments(&args)?;

        let handler = self
            .tool_handlers
            .get(name)
            .ok_or_else(|| McpError::Other(format!("no handler for tool: {}", name)))?;

        tracing::debug!(tool = name, "dispatch");
        let result = handler.call(args).await?;

        if !result.is_error {
            tool.validate_output(result.structured_content.as_ref())?;
        }
        Ok(result)
    }

    /// Route a JSON-RPC request to the appropriate MCP handler.
    pub async fn handle(&self, req: JsonRpcRequest) -> McpResponse {
        if req.jsonrpc != "2.0" {
            return McpResponse::error(req.id, ERR_CODE_INVALID_REQ, "jsonrpc must be '2.0'");
        }

        // A notifications/* message carrying an id is a request and falls
        // through to method-not-found below.
        if req.method.starts_with("notifications/") && req.id.is_none() {
            tracing::debug!(method = %req.method, "notification");
            return McpResponse::notification();
        }

        match req.method.as_str() {
            "initialize" => self.handle_initialize(req),
            "ping" => McpResponse::ok(req.id, json!({})),
            "tools/list" => McpResponse::cached(req.id, &self.listings.tools),
            "tools/call" => self.handle_tools_call(req).await,
            "resources/list" => McpResponse::cached(req.id, &self.listings.resources),
            "resources/read" => self.handle_resources_read(req).await,
            "prompts/list" => McpResponse::cached(req.id, &self.listings.prompts),
            "prompts/get" => self.handle_prompts_get(req).await,
            _ => McpResponse::error(
                req.id,
                ERR_CODE_NO_METHOD,
                format!("Method not found: {}", req.method),
            ),
        }
    }

    fn handle_initialize(&self, req: JsonRpcRequest) -> McpResponse {
        if let Some(params) = &req.params {
            if let Ok(p) = serde_json::from_value::<InitializeParams>(params.clone()) {
                let client_name = p.client_info.as_ref().map_or("", |c| c.name.as_str());
                let client_version = p.client_info.as_ref().map_or("", |c| c.version.as_str());
                tracing::info!(
                    client_name,
                    client_version,
                    protocol_version = ?p.protocol_version,
                    "initialize"
                );
            }
        }
        McpResponse::cached(req.id, &self.listings.initialize)
    }

    async fn handle_tools_call(&self, req: JsonRpcRequest) -> McpResponse {
        let params: ToolCallParams = match parse_params(req.params.as_ref()) {
            Ok(p) => p,
            Err(msg) => return McpResponse::error(req.id, ERR_CODE_BAD_PARAMS, msg),
        };

        let result = match self.call_tool(&params.name, params.arguments).await {
            Ok(r) => r,
            Err(McpError::UnknownTool(name)) => {
                return McpResponse::error(
                    req.id,
                    ERR_CODE_BAD_PARAMS,
                    format!("Unknown tool: {}", name),
                );
            }
            Err(e @ McpError::InvalidArguments { .. }) => {
                tracing::warn!(tool = %params.name, error = %e, "rejected arguments");
                error_result(e.to_string())
            }
            Err(e) => {
                tracing::error!(tool = %params.name, error = %e, "tool failed");
                error_result(e.to_string())
            }
        };

        match serde_json::to_value(&result) {
            Ok(value) => McpResponse::ok(req.id, value),
            Err(e) => McpResponse::error(req.id, ERR_CODE_INTERNAL, e.to_string()),
        }
    }

    async fn handle_resources_read(&self, req: JsonRpcRequest) -> McpResponse {
        let params: ResourceReadParams = match parse_params(req.params.as_ref()) {
            Ok(p) => p,
            Err(msg) => return McpResponse::error(req.id, ERR_CODE_BAD_PARAMS, msg),
        };

        let target = match (&params.uri, &params.name) {
            (Some(uri), _) => self.resource_list.iter().find(|r| &r.uri == uri),
            (None, Some(name)) => self.resources.get(name),
            (None, None) => {
                return McpResponse::error(
                    req.id,
                    ERR_CODE_BAD_PARAMS,
                    "either name or uri must be provided",
                );
            }
        };

        let Some(target) = target else {
            return McpResponse::error(req.id, ERR_CODE_BAD_PARAMS, "resource not found");
        };

        let Some(handler) = self.resource_handlers.get(&target.name) else {
            return McpResponse::error(
                req.id,
                ERR_CODE_INTERNAL,
                format!("no handler for resource: {}", target.name),
            );
        };

        match handler.call(&target.uri).await {
            Ok(content) => McpResponse::ok(req.id, json!({ "contents": [content] })),
            Err(e) => McpResponse::error(req.id, ERR_CODE_INTERNAL, format!("read resource: {}", e)),
        }
    }

    async fn handle_prompts_get(&self, req: JsonRpcRequest) -> McpResponse {
        let params: PromptGetParams = match parse_params(req.params.as_ref()) {
            Ok(p) => p,
            Err(msg) => return McpResponse::error(req.id, ERR_CODE_BAD_PARAMS, msg),
        };

        let Some(prompt) = self.prompts.get(&params.name) else {
            return McpResponse::error(
                req.id,
                ERR_CODE_BAD_PARAMS,
                format!("Unknown prompt: {}", params.name),
            );
        };

        for arg in &prompt.arguments {
            match params.arguments.get(&arg.name) {
                None if arg.required => {
                    return McpResponse::error(
                        req.id,
                        ERR_CODE_BAD_PARAMS,
                        format!("missing required argument \"{}\"", arg.name),
                    );
                }
                Some(v) if !v.is_string() => {
                    return McpResponse::error(
                        req.id,
                        ERR_CODE_BAD_PARAMS,
                        format!("argument \"{}\" must be a string", arg.name),
                    );
                }
                _ => {}
            }
        }

        let Some(handler) = self.prompt_handlers.get(&prompt.name) else {
            return McpResponse::error(
                req.id,
                ERR_CODE_INTERNAL,
                format!("no handler for prompt: {}", prompt.name),
            );
        };

        let result = handler
            .call(&params.arguments)
            .await
            .and_then(|r| serde_json::to_value(r).map_err(McpError::from));
        match result {
            Ok(value) => McpResponse::ok(req.id, value),
            Err(e) => McpResponse::error(req.id, ERR_CODE_INTERNAL, format!("get prompt: {}", e)),
        }
    }

    fn refresh_listings(&mut self) -> Result<(), McpError> {
        self.listings = build_listings(
            &self.server_name,
            &self.server_version,
            &self.tool_list,
            &self.resource_list,
            &self.prompt_list,
        )?;
        Ok(())
    }
}

fn attach<D, H: ?Sized>(
    descriptors: &HashMap<String, D>,
    handlers: &mut HashMap<String, Arc<H>>,
    name: String,
    handler: Arc<H>,
) -> Result<(), McpError> {
    if !descriptors.contains_key(&name) {
        return Err(McpError::Other(format!("no descriptor declared for {}", name)));
    }
    if handlers.contains_key(&name) {
        return Err(McpError::DuplicateRegistration(name));
    }
    handlers.insert(name, handler);
    Ok(())
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<&Value>) -> Result<T, String> {
    let params = params.ok_or_else(|| "params required".to_string())?;
    serde_json::from_value(params.clone()).map_err(|e| format!("invalid params: {}", e))
}

fn to_raw(value: &impl Serialize) -> Result<Arc<RawValue>, McpError> {
    Ok(Arc::from(serde_json::value::to_raw_value(value)?))
}

fn build_listings(
    name: &str,
    version: &str,
    tools: &[Tool],
    resources: &[Resource],
    prompts: &[Prompt],
) -> Result<Listings, McpError> {
    let initialize = json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {"listChanged": false},
            "resources": {"subscribe": false, "listChanged": false},
            "prompts": {"listChanged": false},
        },
        "serverInfo": {
            "name": name,
            "version": version,
        },
    });

    Ok(Listings {
        initialize: to_raw(&initialize)?,
        tools: to_raw(&json!({ "tools": tools }))?,
        resources: to_raw(&json!({ "resources": resources }))?,
        prompts: to_raw(&json!({ "prompts": prompts }))?,
    })
}

/// Builder for constructing an MCP Server from descriptor files.
///
/// Parse failures are remembered and reported by [`build`](Self::build), so
/// a malformed descriptor file stops the server at startup.
#[derive(Default)]
pub struct ServerBuilder {
    tools: Vec<Tool>,
    resources: Vec<Resource>,
    prompts: Vec<Prompt>,
    server_name: Option<String>,
    server_version: Option<String>,
    error: Option<McpError>,
}

impl ServerBuilder {
    /// Load tool descriptors from a JSON file.
    pub fn tools_file(mut self, path: impl AsRef<std::path::Path>) -> Self {
        match loader::load_tools(path) {
            Ok(tools) => self.tools.extend(tools),
            Err(e) => self.fail(e),
        }
        self
    }

    /// Add tool descriptors directly.
    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Parse tool descriptors from raw JSON bytes.
    pub fn tools_json(mut self, data: &[u8]) -> Self {
        match loader::parse_tools(data) {
            Ok(tools) => self.tools.extend(tools),
            Err(e) => self.fail(e),
        }
        self
    }

    /// Parse resource descriptors from raw JSON bytes.
    pub fn resources_json(mut self, data: &[u8]) -> Self {
        match loader::parse_resources(data) {
            Ok(resources) => self.resources.extend(resources),
            Err(e) => self.fail(e),
        }
        self
    }

    /// Parse prompt descriptors from raw JSON bytes.
    pub fn prompts_json(mut self, data: &[u8]) -> Self {
        match loader::parse_prompts(data) {
            Ok(prompts) => self.prompts.extend(prompts),
            Err(e) => self.fail(e),
        }
        self
    }

    /// Set server name and version.
    pub fn server_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self.server_version = Some(version.into());
        self
    }

    fn fail(&mut self, e: McpError) {
        tracing::error!("load descriptors: {}", e);
        self.error.get_or_insert(e);
    }

    /// Build the server, rejecting unreadable or duplicate descriptors.
    pub fn build(self) -> Result<Server, McpError> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let tools = index_unique(&self.tools, |t| &t.name)?;
        let resources = index_unique(&self.resources, |r| &r.name)?;
        let prompts = index_unique(&self.prompts, |p| &p.name)?;

        {
            let mut uris = HashSet::new();
            if let Some(dup) = self.resources.iter().find(|r| !uris.insert(r.uri.as_str())) {
                return Err(McpError::DuplicateRegistration(dup.uri.clone()));
            }
        }

        let server_name = self
            .server_name
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").into());
        let server_version = self
            .server_version
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").into());
        let listings = build_listings(
            &server_name,
            &server_version,
            &self.tools,
            &self.resources,
            &self.prompts,
        )?;

        Ok(Server {
            server_name,
            server_version,
            tools,
            tool_list: self.tools,
            resources,
            resource_list: self.resources,
            prompts,
            prompt_list: self.prompts,
            tool_handlers: HashMap::new(),
            resource_handlers: HashMap::new(),
            prompt_handlers: HashMap::new(),
            listings,
        })
    }
}

fn index_unique<T: Clone>(
    items: &[T],
    name: impl Fn(&T) -> &String,
) -> Result<HashMap<String, T>, McpError> {
    let mut map = HashMap::with_capacity(items.len());
    for item in items {
        let key = name(item).clone();
        if map.insert(key.clone(), item.clone()).is_some() {
            return Err(McpError::DuplicateRegistration(key));
        }
    }
    Ok(map)
}
