use crate::llm::{ChatClient, LlmError};
use crate::providers::truncate_for_log;
use async_trait::async_trait;
use locatr_common::protocol::CompletionResponse;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

/// Chat completions client for OpenAI and OpenAI-compatible endpoints.
pub struct OpenAiChatClient {
    api_key: String,
    model: String,
    api_url: String,
    client: reqwest::Client,
}

impl OpenAiChatClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_url(api_key, model, DEFAULT_API_URL.to_string())
    }

    pub fn with_url(api_key: String, model: String, api_url: String) -> Self {
        Self {
            api_key,
            model,
            api_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn chat_completion(&self, prompt: &str) -> Result<CompletionResponse, LlmError> {
        let start = Instant::now();
        let request = ApiRequest {
            model: &self.model,
            messages: vec![ApiMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status,
                message: truncate_for_log(&text),
            });
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let completion = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response has no choices".into()))?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        debug!(
            model = %self.model,
            "OpenAI completion: {} prompt / {} completion tokens in {}ms",
            body.usage.prompt_tokens, body.usage.completion_tokens, elapsed_ms
        );

        Ok(CompletionResponse {
            completion,
            input_tokens: body.usage.prompt_tokens,
            output_tokens: body.usage.completion_tokens,
            total_tokens: body.usage.total_tokens,
            elapsed_ms,
        })
    }
}
