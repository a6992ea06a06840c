use serde_json::{Value, json};

use crate::server::{FnToolHandler, Server};
use crate::types::{McpError, ToolResult, structured_result};

/// Greeting words keyed by lowercase language name.
const GREETINGS: [(&str, &str); 10] = [
    ("english", "Hello"),
    ("spanish", "Hola"),
    ("french", "Bonjour"),
    ("german", "Hallo"),
    ("italian", "Ciao"),
    ("portuguese", "Olá"),
    ("japanese", "こんにちは"),
    ("chinese", "你好"),
    ("korean", "안녕하세요"),
    ("russian", "Привет"),
];

const FALLBACK: &str = "Hello";

pub fn register(srv: &mut Server) -> Result<(), McpError> {
    srv.handle_tool(
        "greeting",
        FnToolHandler::new(|args: Value| async move { handle_greeting(args) }),
    )
}

/// Look up the greeting word for `language`, case-insensitively.
pub fn greeting_word(language: &str) -> &'static str {
    let language = language.trim().to_lowercase();
    GREETINGS
        .iter()
        .find(|(lang, _)| *lang == language)
        .map_or(FALLBACK, |(_, word)| *word)
}

fn handle_greeting(args: Value) -> Result<ToolResult, McpError> {
    let name = args.get("name").and_then(|v| v.as_str()).unwrap_or("");
    let language = args
        .get("language")
        .and_then(|v| v.as_str())
        .unwrap_or("english");

    let greeting = format!("{}, {}!", greeting_word(language), name);
    Ok(structured_result(greeting.clone(), json!({ "greeting": greeting })))
}
