use serde_json::{Map, Value};

use crate::types::{JsonType, McpError, SchemaMeta, Tool};

impl Tool {
    /// Validate call arguments against the tool's input schema.
    ///
    /// Types are checked exactly: `"3"` is not a number and `1.5` is not an
    /// integer. Properties the schema does not declare are ignored.
    pub fn validate_arguments(&self, args: &Value) -> Result<(), McpError> {
        let obj = args.as_object().ok_or_else(|| McpError::InvalidArguments {
            field: "arguments".into(),
            reason: "must be an object".into(),
        })?;
        check_object(&self.input_meta, obj).map_err(|(field, reason)| {
            McpError::InvalidArguments { field, reason }
        })
    }

    /// Check a successful call's structured output against `outputSchema`.
    pub fn validate_output(&self, structured: Option<&Value>) -> Result<(), McpError> {
        let Some(meta) = &self.output_meta else {
            return Ok(());
        };
        let mismatch = |reason: String| McpError::OutputMismatch {
            tool: self.name.clone(),
            reason,
        };
        let obj = structured
            .ok_or_else(|| mismatch("missing structured content".into()))?
            .as_object()
            .ok_or_else(|| mismatch("structured content must be an object".into()))?;
        check_object(meta, obj).map_err(|(field, reason)| mismatch(format!("{field} {reason}")))
    }
}

fn check_object(meta: &SchemaMeta, obj: &Map<String, Value>) -> Result<(), (String, String)> {
    for field in &meta.required {
        if !obj.contains_key(field) {
            return Err((field.clone(), "is required".into()));
        }
    }

    for prop in &meta.properties {
        let Some(value) = obj.get(&prop.name) else {
            continue;
        };
        if let Some(kind) = prop.kind {
            if !matches_type(kind, value) {
                return Err((prop.name.clone(), format!("must be of type {}", kind.as_str())));
            }
        }
        if let Some(allowed) = &prop.enum_values {
            if !allowed.contains(value) {
                return Err((
                    prop.name.clone(),
                    format!("must be one of {}", Value::Array(allowed.clone())),
                ));
            }
        }
    }

    Ok(())
}

fn matches_type(kind: JsonType, value: &Value) -> bool {
    match kind {
        JsonType::String => value.is_string(),
        JsonType::Number => value.is_number(),
        JsonType::Integer => value.is_i64() || value.is_u64(),
        JsonType::Boolean => value.is_boolean(),
        JsonType::Object => value.is_object(),
        JsonType::Array => value.is_array(),
        JsonType::Null => value.is_null(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_tools;
    use serde_json::json;

    fn make_tool(input: &str, output: Option<&str>) -> Tool {
        let output = output
            .map(|o| format!(r#","outputSchema":{o}"#))
            .unwrap_or_default();
        let json = format!(
            r#"[{{"name":"test","description":"test","inputSchema":{input}{output}}}]"#
        );
        parse_tools(json.as_bytes()).unwrap().remove(0)
    }

    fn field_of(err: McpError) -> String {
        match err {
            McpError::InvalidArguments { field, .. } => field,
            other => panic!("unexpected error: {other}"),
        }
    }

    const CALC: &str = r#"{"type":"object","properties":{
        "num1":{"type":"number"},"num2":{"type":"number"},
        "operator":{"type":"string","enum":["+","-","*","/"]},
        "count":{"type":"integer"}},
        "required":["num1","num2","operator"]}"#;

    #[test]
    fn test_validate_ok() {
        let tool = make_tool(CALC, None);
        let args = json!({"num1": 1, "num2": 2.5, "operator": "+"});
        assert!(tool.validate_arguments(&args).is_ok());
    }

    #[test]
    fn test_validate_required_missing_names_field() {
        let tool = make_tool(CALC, None);
        let err = tool
            .validate_arguments(&json!({"num1": 1, "operator": "+"}))
            .unwrap_err();
        assert_eq!(field_of(err), "num2");
    }

    #[test]
    fn test_validate_does_not_coerce_strings() {
        let tool = make_tool(CALC, None);
        let err = tool
            .validate_arguments(&json!({"num1": "1", "num2": 2, "operator": "+"}))
            .unwrap_err();
        assert!(err.to_string().contains("must be of type number"));
        assert_eq!(field_of(err), "num1");
    }

    #[test]
    fn test_validate_integer_rejects_fraction() {
        let tool = make_tool(CALC, None);
        let args = json!({"num1": 1, "num2": 2, "operator": "+", "count": 1.5});
        assert_eq!(field_of(tool.validate_arguments(&args).unwrap_err()), "count");
    }

    #[test]
    fn test_validate_enum() {
        let tool = make_tool(CALC, None);
        let args = json!({"num1": 1, "num2": 2, "operator": "%"});
        let err = tool.validate_arguments(&args).unwrap_err();
        assert!(err.to_string().contains("must be one of"));
        assert_eq!(field_of(err), "operator");
    }

    #[test]
    fn test_validate_non_object_arguments() {
        let tool = make_tool(CALC, None);
        let err = tool.validate_arguments(&json!([1, 2])).unwrap_err();
        assert_eq!(field_of(err), "arguments");
    }

    #[test]
    fn test_validate_ignores_undeclared_fields() {
        let tool = make_tool(r#"{"type":"object","properties":{}}"#, None);
        assert!(tool.validate_arguments(&json!({"extra": true})).is_ok());
    }

    #[test]
    fn test_validate_output() {
        let tool = make_tool(
            r#"{"type":"object"}"#,
            Some(r#"{"type":"object","properties":{"result":{"type":"number"}},"required":["result"]}"#),
        );
        assert!(tool.validate_output(Some(&json!({"result": 3}))).is_ok());
        assert!(tool.validate_output(Some(&json!({"result": "3"}))).is_err());
        assert!(tool.validate_output(None).is_err());
    }

    #[test]
    fn test_validate_output_without_schema() {
        let tool = make_tool(r#"{"type":"object"}"#, None);
        assert!(tool.validate_output(None).is_ok());
    }
}
