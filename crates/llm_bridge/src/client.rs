//! Ollama-compatible chat API client

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Configuration for the chat client
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Base URL of the chat API (default: http://localhost:11434)
    pub base_url: String,
    /// Timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Chat API client
pub struct ChatClient {
    config: ChatConfig,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn default_client() -> Result<Self> {
        Self::new(ChatConfig::default())
    }

    /// Send a chat request, non-streaming.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/api/chat", self.config.base_url);

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("chat API error: {}", response.status());
        }

        let chat_response: ChatResponse = response.json().await?;
        Ok(chat_response)
    }
}

/// Chat request payload
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Base64 images attached to the request (vision models)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// A chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat response payload
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub model: String,
    pub message: ChatMessage,
    pub done: bool,
}
