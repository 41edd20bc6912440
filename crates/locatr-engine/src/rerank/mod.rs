pub mod chunker;

pub use chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, HTML_SEPARATORS, HtmlChunker};

use async_trait::async_trait;
pub use locatr_common::error::RerankError;
use locatr_common::protocol::{RerankRequest, RerankResult};
use tracing::debug;

pub const DEFAULT_RERANK_THRESHOLD: f64 = 0.8;

/// Scores documents against a query. Results come back in rank order.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, request: &RerankRequest) -> Result<Vec<RerankResult>, RerankError>;
}

/// A chunk that survived the threshold, with its relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct RerankedChunk {
    pub text: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct RelevanceFilter {
    threshold: f64,
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::new(DEFAULT_RERANK_THRESHOLD)
    }
}

impl RelevanceFilter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Rerank `chunks` against `query` and keep the ones scoring at least the threshold.
    pub async fn filter<R: Reranker + ?Sized>(
        &self,
        reranker: &R,
        query: &str,
        chunks: &[String],
    ) -> Result<Vec<RerankedChunk>, RerankError> {
        let request = RerankRequest {
            query: query.to_string(),
            documents: chunks.to_vec(),
        };
        let results = reranker.rerank(&request).await?;
        for r in &results {
            debug!("Rerank result index: {}, score: {:.3}", r.index, r.score);
        }
        self.select(chunks, &results)
    }

    /// Keep results at or above the threshold, in the reranker's order.
    pub fn select(
        &self,
        chunks: &[String],
        results: &[RerankResult],
    ) -> Result<Vec<RerankedChunk>, RerankError> {
        let mut kept = Vec::new();
        for result in results {
            let text = chunks.get(result.index).ok_or_else(|| {
                RerankError::InvalidResponse(format!(
                    "result index {} out of range for {} documents",
                    result.index,
                    chunks.len()
                ))
            })?;
            if result.score >= self.threshold {
                kept.push(RerankedChunk {
                    text: text.clone(),
                    score: result.score,
                });
            }
        }
        Ok(kept)
    }

    pub fn join(chunks: &[RerankedChunk]) -> String {
        chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
