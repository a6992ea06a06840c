use std::path::Path;

use serde_json::Value;

use crate::types::{JsonType, McpError, Prompt, PropertyMeta, Resource, SchemaMeta, Tool};

/// Load tool descriptors from a JSON file on disk.
pub fn load_tools(path: impl AsRef<Path>) -> Result<Vec<Tool>, McpError> {
    let data = std::fs::read(path)?;
    parse_tools(&data)
}

/// Parse tool descriptors from raw JSON bytes.
pub fn parse_tools(data: &[u8]) -> Result<Vec<Tool>, McpError> {
    let mut tools: Vec<Tool> = serde_json::from_slice(data)?;

    for tool in &mut tools {
        if tool.name.is_empty() {
            return Err(McpError::Other("tool definition without a name".into()));
        }
        tool.input_meta = parse_schema_meta(&tool.input_schema);
        tool.output_meta = tool.output_schema.as_ref().map(parse_schema_meta);
    }

    Ok(tools)
}

/// Load resource descriptors from a JSON file on disk.
pub fn load_resources(path: impl AsRef<Path>) -> Result<Vec<Resource>, McpError> {
    let data = std::fs::read(path)?;
    parse_resources(&data)
}

/// Parse resource descriptors from raw JSON bytes.
pub fn parse_resources(data: &[u8]) -> Result<Vec<Resource>, McpError> {
    let resources: Vec<Resource> = serde_json::from_slice(data)?;
    Ok(resources)
}

/// Parse prompt descriptors from raw JSON bytes.
pub fn parse_prompts(data: &[u8]) -> Result<Vec<Prompt>, McpError> {
    let prompts: Vec<Prompt> = serde_json::from_slice(data)?;
    Ok(prompts)
}

/// Extract validation metadata from a JSON Schema object.
pub(crate) fn parse_schema_meta(schema: &Value) -> SchemaMeta {
    let mut meta = SchemaMeta::default();

    if let Some(arr) = schema.get("required").and_then(|v| v.as_array()) {
        meta.required = arr
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
    }

    if let Some(props) = schema.get("properties").and_then(|v| v.as_object()) {
        meta.properties = props
            .iter()
            .map(|(name, prop)| PropertyMeta {
                name: name.clone(),
                kind: prop
                    .get("type")
                    .and_then(|t| t.as_str())
                    .and_then(JsonType::parse),
                enum_values: prop.get("enum").and_then(|e| e.as_array()).cloned(),
            })
            .collect();
    }

    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tools() {
        let json = r#"[{"name":"greeting","description":"greets","inputSchema":{"type":"object","properties":{"name":{"type":"string"}},"required":["name"]}}]"#;
        let tools = parse_tools(json.as_bytes()).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "greeting");
        assert_eq!(tools[0].input_meta.required, vec!["name"]);
        assert_eq!(tools[0].input_meta.properties[0].kind, Some(JsonType::String));
        assert!(tools[0].output_meta.is_none());
    }

    #[test]
    fn test_parse_tools_with_enum_and_output_schema() {
        let json = r#"[{"name":"calc","title":"Calculator","description":"math",
            "inputSchema":{"type":"object","properties":{"operator":{"type":"string","enum":["+","-"]}}},
            "outputSchema":{"type":"object","properties":{"result":{"type":"number"}},"required":["result"]}}]"#;
        let tools = parse_tools(json.as_bytes()).unwrap();
        let op = &tools[0].input_meta.properties[0];
        assert_eq!(op.enum_values.as_ref().map(Vec::len), Some(2));
        let out = tools[0].output_meta.as_ref().unwrap();
        assert_eq!(out.required, vec!["result"]);
        assert_eq!(tools[0].title.as_deref(), Some("Calculator"));
    }

    #[test]
    fn test_parse_tools_rejects_nameless() {
        let json = r#"[{"name":"","description":"x","inputSchema":{"type":"object"}}]"#;
        assert!(parse_tools(json.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_resources() {
        let json = r#"[{"name":"server-info","description":"status","uri":"server://info","mimeType":"application/json"}]"#;
        let resources = parse_resources(json.as_bytes()).unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].uri, "server://info");
    }

    #[test]
    fn test_parse_prompts() {
        let json = r#"[{"name":"code_review","description":"review","arguments":[{"name":"code","required":true},{"name":"language"}]}]"#;
        let prompts = parse_prompts(json.as_bytes()).unwrap();
        assert_eq!(prompts[0].arguments.len(), 2);
        assert!(prompts[0].arguments[0].required);
        assert!(!prompts[0].arguments[1].required);
    }

    #[test]
    fn test_load_tools_missing_file() {
        assert!(load_tools("/nonexistent/path.json").is_err());
    }

    #[test]
    fn test_parse_tools_malformed() {
        assert!(parse_tools(b"{not valid json").is_err());
    }
}
