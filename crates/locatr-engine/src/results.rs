//! Per-session telemetry: one record per resolution call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_RESULTS_PATH: &str = "locatr_results.json";

#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("Failed to write results file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub description: String,
    pub cache_hit: bool,
    /// Chosen locator; empty when the call failed.
    pub locator: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    /// Time spent in identification requests, in milliseconds.
    pub completion_time: u64,
    pub url: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Identification attempts made; 0 for cache hits.
    pub attempt_number: u32,
    pub error_message: Option<String>,
    pub all_candidates: Vec<String>,
}

impl ResolutionRecord {
    pub fn new(description: &str, url: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            description: description.to_string(),
            cache_hit: false,
            locator: String::new(),
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            completion_time: 0,
            url: url.to_string(),
            started_at,
            completed_at: started_at,
            attempt_number: 0,
            error_message: None,
            all_candidates: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_message.is_none()
    }
}

/// Append-only record list, flushed to disk on demand.
#[derive(Debug, Clone, Default)]
pub struct ResultsLog {
    records: Vec<ResolutionRecord>,
}

impl ResultsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ResolutionRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ResolutionRecord] {
        &self.records
    }

    /// Overwrite `path` with every record as a JSON array.
    pub async fn write(&self, path: &Path) -> Result<(), ResultsError> {
        let json = serde_json::to_vec_pretty(&self.records)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ResultsError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(path, json)
            .await
            .map_err(|source| ResultsError::Write {
                path: path.to_path_buf(),
                source,
            })
    }
}
