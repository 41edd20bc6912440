use crate::adapter::{self, DomAdapter, HELPER_SCRIPT};
use crate::cache::CacheStore;
use crate::config::LocatrConfig;
use crate::llm::{self, ChatClient};
use crate::rerank::{HtmlChunker, RelevanceFilter, Reranker};
use crate::resolution::error::{LocatrError, Step};
use crate::results::{ResolutionRecord, ResultsError, ResultsLog};
use crate::validator;

use chrono::Utc;
use locatr_common::protocol::LocatorOutput;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

enum CacheState {
    Unloaded,
    Ready(CacheStore),
    Disabled,
}

/// One resolution session: owns the cache, the result log and the collaborators.
///
/// Calls may run concurrently through `&self`. The cache merge and its file
/// write run under one acquisition of an async lock, so concurrent calls
/// never interleave writes. The result log lock is never held across an await.
pub struct LocatrEngine {
    adapter: Arc<dyn DomAdapter>,
    chat: Arc<dyn ChatClient>,
    reranker: Option<Arc<dyn Reranker>>,
    config: LocatrConfig,
    chunker: HtmlChunker,
    filter: RelevanceFilter,
    cache: tokio::sync::Mutex<CacheState>,
    results: Mutex<ResultsLog>,
}

impl LocatrEngine {
    pub fn new(
        adapter: Arc<dyn DomAdapter>,
        chat: Arc<dyn ChatClient>,
        config: LocatrConfig,
    ) -> Self {
        let chunker = HtmlChunker::new(
            config.chunking.chunk_size,
            config.chunking.chunk_overlap,
            config.chunking.separators.clone(),
        );
        let filter = RelevanceFilter::new(config.rerank.threshold);
        let cache = if config.cache.enabled {
            CacheState::Unloaded
        } else {
            CacheState::Disabled
        };

        Self {
            adapter,
            chat,
            reranker: None,
            config,
            chunker,
            filter,
            cache: tokio::sync::Mutex::new(cache),
            results: Mutex::new(ResultsLog::new()),
        }
    }

    /// Enable chunking and relevance filtering before identification.
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Resolve a natural-language description to a selector that is valid right now.
    pub async fn resolve(&self, description: &str) -> Result<String, LocatrError> {
        self.resolve_with_deadline(description, None).await
    }

    /// Like [`resolve`](Self::resolve) but gives up once `deadline` elapses.
    /// An abandoned call is still recorded, with whatever it captured so far.
    pub async fn resolve_within(
        &self,
        description: &str,
        deadline: Duration,
    ) -> Result<String, LocatrError> {
        self.resolve_with_deadline(description, Some(deadline)).await
    }

    async fn resolve_with_deadline(
        &self,
        description: &str,
        deadline: Option<Duration>,
    ) -> Result<String, LocatrError> {
        info!("Getting locator for user request: `{}`", description);
        let mut record = ResolutionRecord::new(description, "", Utc::now());

        let outcome = match deadline {
            None => self.run(description, &mut record).await,
            Some(after) => tokio::time::timeout(after, self.run(description, &mut record))
                .await
                .unwrap_or(Err(LocatrError::StepTimeout {
                    step: Step::Resolution,
                    after,
                })),
        };

        record.completed_at = Utc::now();
        match &outcome {
            Ok(locator) => record.locator = locator.clone(),
            Err(e) => {
                error!("Failed to resolve `{}` at {}: {}", description, e.step(), e);
                record.error_message = Some(e.to_string());
            }
        }
        self.lock_results().push(record);
        outcome
    }

    async fn run(
        &self,
        description: &str,
        record: &mut ResolutionRecord,
    ) -> Result<String, LocatrError> {
        self.within(Step::ScriptLoad, self.adapter.run_script(HELPER_SCRIPT))
            .await?
            .map_err(LocatrError::ScriptLoadFailure)?;

        let url = self
            .within(Step::CacheLookup, adapter::current_url(self.adapter.as_ref()))
            .await?
            .map_err(|source| LocatrError::DomSerializationFailure {
                step: Step::CacheLookup,
                source,
            })?;
        record.url = url.clone();

        if let Some(cached) = self.cached_candidates(&url, description).await {
            match self
                .within(Step::Validate, validator::first_valid(self.adapter.as_ref(), &cached))
                .await?
            {
                Ok(locator) => {
                    info!("Cache hit, key: `{}`, value: `{}`", description, locator);
                    record.cache_hit = true;
                    record.all_candidates = cached;
                    return Ok(locator);
                }
                Err(e) => info!("All cached locators are outdated ({}), resolving again", e),
            }
        }

        info!("Cache miss, starting DOM minification");
        let snapshot = self
            .within(Step::Serialize, adapter::snapshot(self.adapter.as_ref()))
            .await?
            .map_err(|source| LocatrError::DomSerializationFailure {
                step: Step::Serialize,
                source,
            })?;
        let dom = snapshot.root.content_str();
        debug!(
            "Minified DOM has {} nodes, {} chars",
            snapshot.root.node_count(),
            dom.chars().count()
        );

        let contexts = self.identification_contexts(&dom, description).await?;
        let output = self.identify(&contexts, description, record).await?;

        let candidates = snapshot
            .locators
            .get(&output.locator_id)
            .cloned()
            .ok_or_else(|| LocatrError::UnknownElementId(output.locator_id.clone()))?;
        record.all_candidates = candidates.clone();

        let locator = self
            .within(Step::Validate, validator::first_valid(self.adapter.as_ref(), &candidates))
            .await?
            .map_err(LocatrError::NoValidCandidate)?;

        self.write_cache(&url, description, &candidates).await;
        Ok(locator)
    }

    /// DOM texts to try in order: the relevance-filtered DOM (when a reranker
    /// is configured and kept something), then the full DOM.
    async fn identification_contexts(
        &self,
        dom: &str,
        description: &str,
    ) -> Result<Vec<String>, LocatrError> {
        let Some(reranker) = &self.reranker else {
            debug!("No rerank client configured, sending full DOM to LLM");
            return Ok(vec![dom.to_string()]);
        };

        let chunks = self.chunker.split(dom);
        debug!("Split DOM into {} chunk(s)", chunks.len());
        if chunks.len() <= 1 {
            return Ok(vec![dom.to_string()]);
        }

        let kept = self
            .within(
                Step::Rerank,
                self.filter.filter(reranker.as_ref(), description, &chunks),
            )
            .await?
            .map_err(LocatrError::RerankFailure)?;

        if kept.is_empty() {
            debug!(
                "No chunk reached rerank threshold {}, using full DOM",
                self.filter.threshold()
            );
            return Ok(vec![dom.to_string()]);
        }

        debug!("Kept {} of {} chunk(s) after reranking", kept.len(), chunks.len());
        Ok(vec![RelevanceFilter::join(&kept), dom.to_string()])
    }

    async fn identify(
        &self,
        contexts: &[String],
        description: &str,
        record: &mut ResolutionRecord,
    ) -> Result<LocatorOutput, LocatrError> {
        let max_attempts = self.config.identification.max_attempts.max(1) as usize;
        let mut reason = String::from("model returned no locator id");

        for (attempt, html) in contexts.iter().take(max_attempts).enumerate() {
            debug!("Attempt no ({}) to identify element", attempt + 1);
            record.attempt_number = attempt as u32 + 1;

            let prompt = llm::build_prompt(html, description);
            let response = self
                .within(Step::Identify, self.chat.chat_completion(&prompt))
                .await??;

            record.input_tokens += response.input_tokens;
            record.output_tokens += response.output_tokens;
            record.total_tokens += response.total_tokens;
            record.completion_time += response.elapsed_ms;
            debug!("LLM response: {}", response.completion);

            let output = llm::parse_locator_output(&response.completion).map_err(|e| {
                LocatrError::MalformedModelOutput {
                    raw: response.completion.clone(),
                    reason: e.to_string(),
                }
            })?;
            if output.is_found() {
                return Ok(output);
            }

            if !output.error.is_empty() {
                reason = output.error;
            }
            warn!(
                "Failed to get locatr in {} attempt(s): {}",
                attempt + 1,
                reason
            );
        }

        Err(LocatrError::ElementNotIdentified(reason))
    }

    /// Run a step future under the configured per-step deadline.
    async fn within<T, E, F>(&self, step: Step, fut: F) -> Result<Result<T, E>, LocatrError>
    where
        F: Future<Output = Result<T, E>>,
    {
        match self.config.step_timeout() {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| LocatrError::StepTimeout { step, after: limit }),
            None => Ok(fut.await),
        }
    }

    async fn cached_candidates(&self, url: &str, description: &str) -> Option<Vec<String>> {
        let mut state = self.cache.lock().await;
        let store = self.loaded_cache(&mut state).await?;
        let hit = store.lookup(url, description).map(<[String]>::to_vec);
        if hit.is_none() {
            debug!("Key `{}` not found in cache", description);
        }
        hit.filter(|c| !c.is_empty())
    }

    async fn write_cache(&self, url: &str, description: &str, candidates: &[String]) {
        let mut state = self.cache.lock().await;
        let Some(store) = self.loaded_cache(&mut state).await else {
            return;
        };
        info!("Adding locatrs of `{}` to cache", description);
        store.upsert(url, description, candidates);
        if let Err(e) = store.persist(&self.config.cache.path).await {
            // the resolved locator is still returned
            error!("Failed to write cache ({}): {}", Step::CacheWrite, e);
        }
    }

    /// Load the cache file on first use. A malformed file disables the cache
    /// for the rest of the session instead of failing resolution.
    async fn loaded_cache<'a>(&self, state: &'a mut CacheState) -> Option<&'a mut CacheStore> {
        if matches!(state, CacheState::Unloaded) {
            *state = match CacheStore::load(&self.config.cache.path).await {
                Ok(store) => {
                    debug!("Cache loaded from {}", self.config.cache.path.display());
                    CacheState::Ready(store)
                }
                Err(e) => {
                    warn!("Cache unavailable, continuing without cache: {}", e);
                    CacheState::Disabled
                }
            };
        }
        match state {
            CacheState::Ready(store) => Some(store),
            _ => None,
        }
    }

    /// Copy of the in-memory cache, if caching is active and loaded.
    pub async fn cache_snapshot(&self) -> Option<CacheStore> {
        match &*self.cache.lock().await {
            CacheState::Ready(store) => Some(store.clone()),
            _ => None,
        }
    }

    pub fn results(&self) -> Vec<ResolutionRecord> {
        self.lock_results().records().to_vec()
    }

    /// Overwrite the configured results file with every record of this session.
    pub async fn write_results(&self) -> Result<(), ResultsError> {
        self.write_results_to(&self.config.results_path).await
    }

    pub async fn write_results_to(&self, path: &Path) -> Result<(), ResultsError> {
        info!("Writing locatr results to file: {}", path.display());
        let log = self.lock_results().clone();
        log.write(path).await
    }

    fn lock_results(&self) -> MutexGuard<'_, ResultsLog> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
