use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Value, json};

use crate::server::{FnToolHandler, Server};
use crate::types::{McpError, ToolResult, error_result, image_result};

const HF_INFERENCE_BASE: &str = "https://router.huggingface.co/hf-inference/models";
pub const IMAGE_MODEL: &str = "black-forest-labs/FLUX.1-schnell";
pub const INFERENCE_STEPS: u32 = 4;
const DEFAULT_MIME: &str = "image/png";

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("inference API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("inference API returned an empty image")]
    EmptyBody,
}

/// Raw image bytes plus their MIME type.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Trait abstracting the text-to-image backend for testing.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn text_to_image(&self, prompt: &str) -> Result<GeneratedImage, ImageError>;
}

/// Hugging Face inference client.
pub struct HfImageClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl HfImageClient {
    pub fn new(token: impl Into<String>) -> Result<Self, ImageError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            token: token.into(),
            base_url: HF_INFERENCE_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl ImageGenerator for HfImageClient {
    async fn text_to_image(&self, prompt: &str) -> Result<GeneratedImage, ImageError> {
        let url = format!("{}/{}", self.base_url, IMAGE_MODEL);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({
                "inputs": prompt,
                "parameters": { "num_inference_steps": INFERENCE_STEPS },
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ImageError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mime_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|m| m.starts_with("image/"))
            .unwrap_or(DEFAULT_MIME)
            .to_string();
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(ImageError::EmptyBody);
        }

        Ok(GeneratedImage {
            bytes: bytes.to_vec(),
            mime_type,
        })
    }
}

pub fn register(srv: &mut Server, images: Arc<dyn ImageGenerator>) -> Result<(), McpError> {
    srv.handle_tool(
        "generate-image",
        FnToolHandler::new(move |args: Value| {
            let images = images.clone();
            async move { handle_generate_image(images.as_ref(), args).await }
        }),
    )
}

async fn handle_generate_image(
    images: &dyn ImageGenerator,
    args: Value,
) -> Result<ToolResult, McpError> {
    let prompt = args.get("prompt").and_then(|v| v.as_str()).unwrap_or("");

    match images.text_to_image(prompt).await {
        Ok(image) => {
            tracing::info!(bytes = image.bytes.len(), mime = %image.mime_type, "image generated");
            Ok(image_result(BASE64.encode(&image.bytes), image.mime_type))
        }
        Err(e) => {
            tracing::error!("generate-image: {}", e);
            Ok(error_result(format!("Error generating image: {}", e)))
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Records prompts and answers with a canned image or failure.
    #[derive(Default)]
    pub struct MockImages {
        pub prompts: Mutex<Vec<String>>,
        pub fail_with: Option<String>,
    }

    impl MockImages {
        pub fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.into()),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ImageGenerator for MockImages {
        async fn text_to_image(&self, prompt: &str) -> Result<GeneratedImage, ImageError> {
            self.prompts.lock().unwrap().push(prompt.into());
            match &self.fail_with {
                Some(msg) => Err(ImageError::Status {
                    status: 401,
                    body: msg.clone(),
                }),
                None => Ok(GeneratedImage {
                    bytes: b"\x89PNG fake".to_vec(),
                    mime_type: "image/png".into(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockImages;
    use super::*;
    use crate::types::ContentBlock;

    #[tokio::test]
    async fn test_success_returns_base64_image_block() {
        let images = MockImages::default();
        let result = handle_generate_image(&images, json!({"prompt": "a red fox"}))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(
            result.content,
            vec![ContentBlock::Image {
                data: BASE64.encode(b"\x89PNG fake"),
                mime_type: "image/png".into(),
            }]
        );
        assert_eq!(images.prompts.lock().unwrap().as_slice(), ["a red fox"]);
    }

    #[tokio::test]
    async fn test_failure_carries_underlying_message() {
        let images = MockImages::failing("Invalid credentials in Authorization header");
        let result = handle_generate_image(&images, json!({"prompt": "x"}))
            .await
            .unwrap();
        assert!(result.is_error);
        let text = result.first_text().unwrap();
        assert!(text.contains("Invalid credentials in Authorization header"));
        assert!(text.contains("401"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error_result() {
        let client = HfImageClient::new("hf_test")
            .unwrap()
            .with_base_url("http://127.0.0.1:1");
        let result = handle_generate_image(&client, json!({"prompt": "x"}))
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.first_text().unwrap().contains("request failed"));
    }
}
