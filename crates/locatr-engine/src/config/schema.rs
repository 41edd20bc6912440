use crate::cache::DEFAULT_CACHE_PATH;
use crate::rerank::chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, default_separators};
use crate::rerank::DEFAULT_RERANK_THRESHOLD;
use crate::results::DEFAULT_RESULTS_PATH;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatrConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub identification: IdentificationConfig,
    /// Deadline applied to each adapter, rerank and identification call. 0 disables it.
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: u64,
}

impl Default for LocatrConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            results_path: default_results_path(),
            chunking: ChunkingConfig::default(),
            rerank: RerankConfig::default(),
            identification: IdentificationConfig::default(),
            step_timeout_ms: default_step_timeout_ms(),
        }
    }
}

impl LocatrConfig {
    pub fn step_timeout(&self) -> Option<Duration> {
        (self.step_timeout_ms > 0).then(|| Duration::from_millis(self.step_timeout_ms))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.chunking.chunk_size == 0 {
            return Err("chunking.chunk_size must be at least 1".into());
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            ));
        }
        if !(0.0..=1.0).contains(&self.rerank.threshold) {
            return Err(format!(
                "rerank.threshold must be within [0, 1], got {}",
                self.rerank.threshold
            ));
        }
        if self.identification.max_attempts == 0 {
            return Err("identification.max_attempts must be at least 1".into());
        }
        Ok(())
    }
}

fn default_results_path() -> PathBuf {
    PathBuf::from(DEFAULT_RESULTS_PATH)
}

fn default_step_timeout_ms() -> u64 {
    30000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            path: default_cache_path(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_path() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_PATH)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            separators: default_separators(),
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_RERANK_THRESHOLD
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentificationConfig {
    /// Attempts allowed when the model reports the element missing from a filtered DOM.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for IdentificationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_max_attempts() -> u32 {
    2
}
