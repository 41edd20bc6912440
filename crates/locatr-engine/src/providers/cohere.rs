use crate::providers::truncate_for_log;
use crate::rerank::{RerankError, Reranker};
use async_trait::async_trait;
use locatr_common::protocol::{RerankRequest, RerankResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_API_URL: &str = "https://api.cohere.com/v1/rerank";
pub const DEFAULT_RERANK_MODEL: &str = "rerank-english-v3.0";
/// Results requested per rerank call.
pub const DEFAULT_TOP_N: usize = 8;

pub const COHERE_API_KEY_ENVS: &[&str] = &["LOCATR_COHERE_API_KEY", "COHERE_API_KEY"];

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    results: Vec<ApiResult>,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    index: usize,
    relevance_score: f64,
}

pub struct CohereReranker {
    api_key: String,
    model: String,
    api_url: String,
    top_n: usize,
    client: reqwest::Client,
}

impl CohereReranker {
    pub fn new(api_key: String) -> Self {
        Self::with_url(api_key, DEFAULT_API_URL.to_string())
    }

    pub fn with_url(api_key: String, api_url: String) -> Self {
        Self {
            api_key,
            model: DEFAULT_RERANK_MODEL.to_string(),
            api_url,
            top_n: DEFAULT_TOP_N,
            client: reqwest::Client::new(),
        }
    }

    /// Read the key from `LOCATR_COHERE_API_KEY`, falling back to `COHERE_API_KEY`.
    pub fn from_env() -> Result<Self, RerankError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, RerankError>
    where
        F: Fn(&str) -> Option<String>,
    {
        COHERE_API_KEY_ENVS
            .iter()
            .find_map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
            .map(Self::new)
            .ok_or_else(|| {
                RerankError::Config(format!("none of {} is set", COHERE_API_KEY_ENVS.join(", ")))
            })
    }
}

#[async_trait]
impl Reranker for CohereReranker {
    async fn rerank(&self, request: &RerankRequest) -> Result<Vec<RerankResult>, RerankError> {
        let body = ApiRequest {
            model: &self.model,
            query: &request.query,
            documents: &request.documents,
            top_n: self.top_n.min(request.documents.len().max(1)),
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RerankError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(RerankError::Api {
                status,
                message: truncate_for_log(&text),
            });
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| RerankError::InvalidResponse(e.to_string()))?;
        debug!("Cohere returned {} rerank result(s)", parsed.results.len());

        Ok(parsed
            .results
            .into_iter()
            .map(|r| RerankResult {
                index: r.index,
                score: r.relevance_score,
            })
            .collect())
    }
}
