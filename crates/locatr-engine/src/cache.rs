//! Per-origin cache of description -> candidate selectors.
//!
//! File format: `{ "<page url>": [ { "locatr_name": "...", "locatrs": ["..."] } ] }`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CACHE_PATH: &str = ".locatr.cache";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to read cache file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse cache file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedLocatrs {
    pub locatr_name: String,
    pub locatrs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStore {
    entries: BTreeMap<String, Vec<CachedLocatrs>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a cache file. A missing or blank file is an empty cache, not an error.
    pub async fn load(path: &Path) -> Result<Self, CacheError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Cache file {} not found, starting empty", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(CacheError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            debug!("Cache file {} is empty", path.display());
            return Ok(Self::default());
        }

        let entries = serde_json::from_str(&content).map_err(|source| CacheError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { entries })
    }

    pub fn lookup(&self, origin: &str, description: &str) -> Option<&[String]> {
        self.entries
            .get(origin)?
            .iter()
            .find(|entry| entry.locatr_name == description)
            .map(|entry| entry.locatrs.as_slice())
    }

    /// Merge `candidates` into the entry for (origin, description).
    /// The stored list stays duplicate-free in first-seen order.
    pub fn upsert(&mut self, origin: &str, description: &str, candidates: &[String]) {
        let entries = self.entries.entry(origin.to_string()).or_default();

        match entries.iter_mut().find(|e| e.locatr_name == description) {
            Some(entry) => {
                debug!("Updating cached locatrs of `{}` for {}", description, origin);
                for candidate in candidates {
                    if !entry.locatrs.contains(candidate) {
                        entry.locatrs.push(candidate.clone());
                    }
                }
            }
            None => {
                debug!("Caching new locatr `{}` for {}", description, origin);
                let mut locatrs: Vec<String> = Vec::with_capacity(candidates.len());
                for candidate in candidates {
                    if !locatrs.contains(candidate) {
                        locatrs.push(candidate.clone());
                    }
                }
                entries.push(CachedLocatrs {
                    locatr_name: description.to_string(),
                    locatrs,
                });
            }
        }
    }

    /// Write the full snapshot, creating parent directories and truncating any previous file.
    pub async fn persist(&self, path: &Path) -> Result<(), CacheError> {
        let json = serde_json::to_vec_pretty(&self.entries)?;
        let write_err = |source| CacheError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(path, json).await.map_err(write_err)
    }

    pub fn entries_for(&self, origin: &str) -> &[CachedLocatrs] {
        self.entries.get(origin).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
