use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::server::{PromptHandler, Server};
use crate::types::{ContentBlock, McpError, PromptMessage, PromptResult};

/// Build the review instructions for `code`.
pub fn review_instructions(code: &str, language: Option<&str>) -> String {
    let language = language.map(str::trim).filter(|l| !l.is_empty());
    let subject = match language {
        Some(lang) => format!("the following {} code", lang),
        None => "the following code".to_string(),
    };

    format!(
        "Please review {subject}.\n\
         \n\
         ```{fence}\n\
         {code}\n\
         ```\n\
         \n\
         Structure the review in these sections:\n\
         \n\
         1. Summary: what the code does, in two or three sentences.\n\
         2. Correctness: bugs, unhandled edge cases and error paths.\n\
         3. Readability: naming, structure and comments.\n\
         4. Performance: unnecessary work, allocations or complexity.\n\
         5. Security: input handling, secrets and unsafe operations.\n\
         6. Suggestions: concrete changes, with short code examples where useful.",
        subject = subject,
        fence = language.unwrap_or(""),
        code = code,
    )
}

struct CodeReviewPrompt;

#[async_trait]
impl PromptHandler for CodeReviewPrompt {
    async fn call(&self, args: &Map<String, Value>) -> Result<PromptResult, McpError> {
        let code = args.get("code").and_then(|v| v.as_str()).unwrap_or("");
        let language = args.get("language").and_then(|v| v.as_str());

        Ok(PromptResult {
            description: Some("Code review instructions".into()),
            messages: vec![PromptMessage {
                role: "user".into(),
                content: ContentBlock::Text {
                    text: review_instructions(code, language),
                },
            }],
        })
    }
}

pub fn register(srv: &mut Server) -> Result<(), McpError> {
    srv.handle_prompt("code_review", Arc::new(CodeReviewPrompt))
}
