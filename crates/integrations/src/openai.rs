use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use slotdesk_core::errors::{BookingError, BookingResult};
use slotdesk_core::ports::ChatModel;
use tracing::debug;

use crate::config::OpenAiConfig;
use crate::{check_status, request_failed};

const SERVICE: &str = "Azure OpenAI";
pub const TEMPERATURE: f32 = 0.4;
pub const MAX_TOKENS: u32 = 600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system: &str, user: &str) -> Self {
        Self {
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChatMessage,
}

impl CompletionResponse {
    pub fn into_text(self) -> BookingResult<String> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| BookingError::Upstream("The language model returned no answer".to_string()))
    }
}

/// Chat completions from an Azure OpenAI deployment.
pub struct AzureOpenAi {
    config: OpenAiConfig,
    http: Client,
}

impl AzureOpenAi {
    pub fn new(config: OpenAiConfig, http: Client) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl ChatModel for AzureOpenAi {
    async fn complete(&self, system: &str, user: &str) -> BookingResult<String> {
        debug!("Requesting completion from deployment {}", self.config.deployment);
        let response = self
            .http
            .post(self.config.completions_url())
            .header("api-key", &self.config.api_key)
            .json(&CompletionRequest::new(system, user))
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;

        let completion: CompletionResponse = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| BookingError::Upstream(format!("Invalid completion response: {}", e)))?;
        completion.into_text()
    }
}
