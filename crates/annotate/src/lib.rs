pub mod cache;
pub mod codec;
pub mod config;
pub mod llm;
pub mod prompt;
pub mod retry;
pub mod usage;

pub use cache::ResponseCache;
pub use config::{AnnotateConfig, CacheConfig, ConcurrencyConfig, LlmConfig, RetryConfig};
pub use llm::{ChatClient, Completion, LanguageModel};
pub use retry::RetryPolicy;
pub use usage::{TokenBudget, UsageError};

use annotation::{Annotation, AnnotationSlicer, Span, merge};
use anyhow::{Context, Result};
use chunking::{ChunkError, ChunkGenerator, ChunkOutcome};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Result of an annotation request.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotateOutcome {
    Annotated {
        annotation: Annotation,
        tokens_used: u64,
    },
    /// Chunking would lose a denotation or relation. Retry with `force` to
    /// accept the loss.
    NeedsConfirmation { reason: ChunkError },
}

/// Annotates documents with a language model, one chunk at a time.
pub struct Annotator<M> {
    model: Arc<M>,
    config: AnnotateConfig,
    retry: Arc<RetryPolicy>,
    cache: Option<Arc<ResponseCache>>,
    budget: Option<(Arc<TokenBudget>, String)>,
}

impl<M: LanguageModel + 'static> Annotator<M> {
    pub fn new(model: M, config: AnnotateConfig) -> Self {
        let retry = Arc::new(RetryPolicy::from_config(&config.retry));
        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(ResponseCache::new(config.cache.max_entries)));

        Self {
            model: Arc::new(model),
            config,
            retry,
            cache,
            budget: None,
        }
    }

    /// Charge token usage to `client` and refuse work once its daily limit
    /// is spent.
    pub fn with_budget(mut self, budget: Arc<TokenBudget>, client: impl Into<String>) -> Self {
        self.budget = Some((budget, client.into()));
        self
    }

    pub fn config(&self) -> &AnnotateConfig {
        &self.config
    }

    /// Annotate the whole text through a sliding window of sentence-aligned
    /// chunks, then merge the answers in order.
    pub async fn annotate(
        &self,
        annotation: &Annotation,
        prompt: &str,
        force: bool,
    ) -> Result<AnnotateOutcome> {
        self.check_budget()?;

        let generator = ChunkGenerator::new(self.config.chunker());
        let chunks = match generator.generate_or_confirm(annotation, force)? {
            ChunkOutcome::Chunked(chunks) => chunks,
            ChunkOutcome::NeedsConfirmation { reason, .. } => {
                info!(reason = %reason, "Chunking needs confirmation");
                return Ok(AnnotateOutcome::NeedsConfirmation { reason });
            }
        };

        if chunks.is_empty() {
            return Ok(AnnotateOutcome::Annotated {
                annotation: annotation.clone(),
                tokens_used: 0,
            });
        }

        let total = chunks.len();
        info!(chunks = total, window_size = self.config.window_size, "Annotating chunks");

        let semaphore = Arc::new(Semaphore::new(
            self.config.concurrency.max_concurrent_llm_calls.max(1),
        ));
        let mut tasks = JoinSet::new();

        for (index, chunk) in chunks.into_iter().enumerate() {
            let worker = self.worker();
            let semaphore = semaphore.clone();
            let prompt = prompt.to_string();
            let part = (total > 1).then_some(index + 1);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await?;
                let result = worker.annotate_chunk(&chunk, &prompt, part).await;
                result
                    .with_context(|| format!("Failed to annotate chunk {}", index))
                    .map(|annotated| (index, annotated))
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            results.push(joined.context("Chunk task panicked")??);
        }
        results.sort_by_key(|(index, _)| *index);

        let tokens_used: u64 = results.iter().map(|(_, (_, tokens))| tokens).sum();
        let annotated: Vec<Annotation> = results.into_iter().map(|(_, (a, _))| a).collect();

        self.record_usage(tokens_used);
        info!(chunks = total, tokens_used, "Annotation complete");

        Ok(AnnotateOutcome::Annotated {
            annotation: merge(&annotated),
            tokens_used,
        })
    }

    /// Annotate only `selection`, keeping the text on either side as it is.
    pub async fn annotate_selection(
        &self,
        annotation: &Annotation,
        selection: Span,
        prompt: &str,
        force: bool,
    ) -> Result<AnnotateOutcome> {
        self.check_budget()?;

        let slicer = AnnotationSlicer::new(annotation).strict_mode(!force);
        let ranges = [
            0..selection.begin,
            selection.begin..selection.end,
            selection.end..annotation.char_len(),
        ];

        let mut pieces = Vec::with_capacity(ranges.len());
        let mut fragmented = None;
        for (index, range) in ranges.into_iter().enumerate() {
            let span = Span::new(range.start, range.end);
            match slicer.annotation_in(range) {
                Ok(piece) => pieces.push(piece),
                Err(e) if e.is_fragmentation() => {
                    fragmented.get_or_insert((index, span, e));
                }
                Err(e) => return Err(e).context("Invalid selection"),
            }
        }

        if let Some((chunk_index, range, source)) = fragmented {
            let reason = ChunkError::Slice {
                chunk_index,
                range,
                source,
            };
            info!(reason = %reason, "Selection needs confirmation");
            return Ok(AnnotateOutcome::NeedsConfirmation { reason });
        }

        debug!(selection = %selection, "Annotating selection");
        let (selected, tokens_used) = self.worker().annotate_chunk(&pieces[1], prompt, None).await?;
        pieces[1] = selected;
        self.record_usage(tokens_used);

        Ok(AnnotateOutcome::Annotated {
            annotation: merge(&pieces),
            tokens_used,
        })
    }

    fn worker(&self) -> ChunkWorker<M> {
        ChunkWorker {
            model: self.model.clone(),
            retry: self.retry.clone(),
            cache: self.cache.clone(),
        }
    }

    fn check_budget(&self) -> Result<()> {
        if let Some((budget, client)) = &self.budget {
            budget.check(client)?;
        }
        Ok(())
    }

    fn record_usage(&self, tokens: u64) {
        if let Some((budget, client)) = &self.budget {
            budget.record(client, tokens);
        }
    }
}

/// The per-chunk half of an [`Annotator`], owned by each spawned task.
struct ChunkWorker<M> {
    model: Arc<M>,
    retry: Arc<RetryPolicy>,
    cache: Option<Arc<ResponseCache>>,
}

impl<M: LanguageModel> ChunkWorker<M> {
    /// Annotated chunk and the tokens spent on it. An answer that stays
    /// unusable after one repair request is replaced by the source chunk.
    async fn annotate_chunk(
        &self,
        chunk: &Annotation,
        prompt: &str,
        part: Option<usize>,
    ) -> Result<(Annotation, u64)> {
        let chunk_json = codec::encode_chunk(chunk)?;
        let user = prompt::build_user_content(&chunk_json, prompt, part);

        let first = self.complete(prompt::SYSTEM_PROMPT, &user).await?;
        let mut tokens = first.total_tokens;
        debug!(part, tokens = first.total_tokens, "Chunk answered");

        let error = match codec::decode_chunk(&first.content, &chunk.text) {
            Ok(annotated) => {
                self.remember(&user, &first.content);
                return Ok((annotated, tokens));
            }
            Err(e) => e,
        };

        warn!(part, error = %error, "Invalid annotation, requesting repair");
        let repair = prompt::build_repair_prompt(&first.content, &format!("{:#}", error));
        let second = self.complete(prompt::SYSTEM_PROMPT, &repair).await?;
        tokens += second.total_tokens;

        match codec::decode_chunk(&second.content, &chunk.text) {
            Ok(annotated) => {
                self.remember(&user, &second.content);
                Ok((annotated, tokens))
            }
            Err(e) => {
                warn!(part, error = %e, "Repair failed, keeping chunk unannotated");
                Ok((chunk.clone(), tokens))
            }
        }
    }

    async fn complete(&self, system: &str, user: &str) -> Result<Completion> {
        if let Some(content) = self.cache.as_ref().and_then(|c| c.get(system, user)) {
            debug!("Cache hit");
            return Ok(Completion {
                total_tokens: 0,
                content,
            });
        }

        self.retry
            .retry("llm_complete", || self.model.complete(system, user))
            .await
    }

    fn remember(&self, user: &str, content: &str) {
        if let Some(cache) = &self.cache {
            cache.insert(prompt::SYSTEM_PROMPT, user, content.to_string());
        }
    }
}
