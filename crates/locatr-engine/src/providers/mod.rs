//! HTTP clients for the identification and rerank services.

pub mod anthropic;
pub mod cohere;
pub mod openai;

pub use anthropic::AnthropicChatClient;
pub use cohere::CohereReranker;
pub use openai::OpenAiChatClient;

use crate::llm::{ChatClient, LlmError};
use std::sync::Arc;

pub const LLM_PROVIDER_ENV: &str = "LLM_PROVIDER";
pub const LLM_MODEL_ENV: &str = "LLM_MODEL";
pub const LLM_API_KEY_ENV: &str = "LLM_API_KEY";

/// Completion budget for a single identification request.
pub const MAX_COMPLETION_TOKENS: u32 = 256;

/// Build a chat client from `LLM_PROVIDER`, `LLM_MODEL` and `LLM_API_KEY`.
pub fn chat_client_from_env() -> Result<Arc<dyn ChatClient>, LlmError> {
    chat_client_from_lookup(|key| std::env::var(key).ok())
}

/// Same as [`chat_client_from_env`] with a caller-supplied variable source.
pub fn chat_client_from_lookup<F>(lookup: F) -> Result<Arc<dyn ChatClient>, LlmError>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &str| {
        lookup(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| LlmError::Config(format!("{} is not set", key)))
    };

    let provider = required(LLM_PROVIDER_ENV)?;
    let model = required(LLM_MODEL_ENV)?;
    let api_key = required(LLM_API_KEY_ENV)?;

    match provider.trim().to_lowercase().as_str() {
        "openai" => Ok(Arc::new(OpenAiChatClient::new(api_key, model))),
        "anthropic" => Ok(Arc::new(AnthropicChatClient::new(api_key, model))),
        other => Err(LlmError::Config(format!(
            "Unsupported LLM provider `{}` (expected openai or anthropic)",
            other
        ))),
    }
}

fn truncate_for_log(text: &str) -> String {
    const LIMIT: usize = 500;
    if text.chars().count() <= LIMIT {
        text.to_string()
    } else {
        let head: String = text.chars().take(LIMIT).collect();
        format!("{}...", head)
    }
}
