//! Vision model adapter for card field extraction
//!
//! Wraps the chat client behind the pipeline's [`VisionService`]
//! contract: one image in, the model's free-text reply out. The
//! pipeline, not this adapter, decides what counts as a usable reply.

use crate::client::{ChatClient, ChatMessage, ChatRequest};
use anyhow::Result;
use async_trait::async_trait;
use scan_core::extract::{VisionCallError, VisionService};
use scan_core::EncodedImage;

/// Vision-capable model used to read card fields from a photo.
pub struct CardVisionModel {
    client: ChatClient,
    model_name: String,
}

impl CardVisionModel {
    pub fn new(client: ChatClient, model_name: String) -> Self {
        Self { client, model_name }
    }

    /// Default local setup (qwen2.5vl:7b via Ollama)
    pub fn default_model() -> Result<Self> {
        Ok(Self::new(
            ChatClient::default_client()?,
            "qwen2.5vl:7b".to_string(),
        ))
    }
}

#[async_trait]
impl VisionService for CardVisionModel {
    async fn submit(&self, image: &EncodedImage, prompt: &str) -> Result<String, VisionCallError> {
        let request = ChatRequest {
            model: self.model_name.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            images: Some(vec![image.base64.clone()]),
            stream: Some(false),
        };

        let response = self
            .client
            .chat(request)
            .await
            .map_err(|e| VisionCallError(e.to_string()))?;

        tracing::debug!(
            model = %response.model,
            chars = response.message.content.len(),
            "vision reply received"
        );

        Ok(response.message.content)
    }
}
