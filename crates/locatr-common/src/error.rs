use thiserror::Error;

/// Errors raised by a DOM adapter (one implementation per automation backend).
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// Script injection or evaluation failed inside the page.
    #[error("Script error: {0}")]
    Script(String),

    /// The page could not be reached: closed connection, missing response.
    #[error("Driver error: {0}")]
    Driver(String),

    /// The evaluated value did not have the expected shape.
    #[error("Unexpected payload: {0}")]
    Payload(String),
}

/// Errors raised by an identification (chat completion) client.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised by a reranking client.
#[derive(Debug, Clone, Error)]
pub enum RerankError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
