use crate::llm::{ChatClient, LlmError};
use crate::providers::{MAX_COMPLETION_TOKENS, truncate_for_log};
use async_trait::async_trait;
use locatr_common::protocol::CompletionResponse;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Messages API client.
pub struct AnthropicChatClient {
    api_key: String,
    model: String,
    api_url: String,
    client: reqwest::Client,
}

impl AnthropicChatClient {
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
impl ChatClient for AnthropicChatClient {
    async fn chat_completion(&self, prompt: &str) -> Result<CompletionResponse, LlmError> {
        let start = Instant::now();
        let request = ApiRequest {
            model: &self.model,
            max_tokens: MAX_COMPLETION_TOKENS,
            messages: vec![ApiMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
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
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .ok_or_else(|| LlmError::InvalidResponse("response has no text block".into()))?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        debug!(
            model = %self.model,
            "Anthropic completion: {} input / {} output tokens in {}ms",
            body.usage.input_tokens, body.usage.output_tokens, elapsed_ms
        );

        Ok(CompletionResponse {
            completion,
            input_tokens: body.usage.input_tokens,
            output_tokens: body.usage.output_tokens,
            total_tokens: body.usage.input_tokens + body.usage.output_tokens,
            elapsed_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

    fn client_for(server: &MockServer) -> AnthropicChatClient {
        AnthropicChatClient::with_url(
            "sk-ant".to_string(),
            "claude-3-5-sonnet-latest".to_string(),
            format!("{}/v1/messages", server.uri()),
        )
    }

    #[tokio::test]
    async fn test_completion_sums_tokens() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "id": "msg_1",
            "type": "message",
            "content": [{"type": "text", "text": "{\"locator_id\": \"el_3\"}"}],
            "usage": {"input_tokens": 90, "output_tokens": 10}
        });
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/v1/messages"))
            .and(matchers::header("x-api-key", "sk-ant"))
            .and(matchers::header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server).chat_completion("find").await.unwrap();
        assert_eq!(response.completion, "{\"locator_id\": \"el_3\"}");
        assert_eq!(response.total_tokens, 100);
    }

    #[tokio::test]
    async fn test_skips_non_text_blocks() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "answer"}
            ],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        });
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let response = client_for(&server).chat_completion("x").await.unwrap();
        assert_eq!(response.completion, "answer");
    }

    #[tokio::test]
    async fn test_rate_limit_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        assert!(matches!(
            client_for(&server).chat_completion("x").await,
            Err(LlmError::Api { status: 429, .. })
        ));
    }
}
