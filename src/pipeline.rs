// src/pipeline.rs
//! Request orchestration:
//! validate → cache lookup → fetch (concurrent) → no-data guard → summarize
//! → synthesize → cache store → respond.
//!
//! Two concurrent misses on the same fingerprint may both run the full
//! pipeline; the later `put` wins.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::cache::{DigestResult, ResultCache};
use crate::config::RateLimitPolicy;
use crate::error::{DigestError, Upstream};
use crate::fingerprint::{fingerprint, short};
use crate::request::{DigestRequest, SourceSelector};
use crate::sources::{FetchOutcome, SourceFetcher};
use crate::speech::SpeechSynthesizer;
use crate::summarize::Summarizer;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_requests_total", "Digest requests received.");
        describe_counter!(
            "digest_failures_total",
            "Digest requests that ended in a failure, by status class."
        );
        describe_counter!("digest_cache_hits_total", "Result cache hits.");
        describe_counter!("digest_cache_misses_total", "Result cache misses.");
        describe_counter!(
            "digest_cache_evictions_total",
            "Expired cache entries removed on read."
        );
        describe_histogram!(
            "digest_pipeline_ms",
            "End-to-end pipeline time in milliseconds."
        );
    });
}

pub struct DigestPipeline {
    cache: Arc<ResultCache>,
    content: Arc<dyn SourceFetcher>,
    social: Arc<dyn SourceFetcher>,
    summarizer: Arc<dyn Summarizer>,
    speech: Arc<dyn SpeechSynthesizer>,
    social_rate_limit: RateLimitPolicy,
}

impl DigestPipeline {
    pub fn new(
        cache: Arc<ResultCache>,
        content: Arc<dyn SourceFetcher>,
        social: Arc<dyn SourceFetcher>,
        summarizer: Arc<dyn Summarizer>,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            cache,
            content,
            social,
            summarizer,
            speech,
            social_rate_limit: RateLimitPolicy::default(),
        }
    }

    pub fn with_social_rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.social_rate_limit = policy;
        self
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Run one request to completion. Cache hits make no upstream calls.
    pub async fn run(&self, req: &DigestRequest) -> Result<Arc<DigestResult>, DigestError> {
        ensure_metrics_described();
        counter!("digest_requests_total").increment(1);
        let t0 = Instant::now();

        let out = self.run_stages(req).await;

        histogram!("digest_pipeline_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        if let Err(e) = &out {
            counter!("digest_failures_total", "class" => e.status_class()).increment(1);
            warn!(target: "pipeline", class = e.status_class(), error = %e, "digest failed");
        }
        out
    }

    async fn run_stages(&self, req: &DigestRequest) -> Result<Arc<DigestResult>, DigestError> {
        // ValidateInput
        let norm = req.normalize()?;
        let key = fingerprint(&norm);
        let fp = short(&key);

        // CheckCache
        if let Some(hit) = self.cache.get(&key) {
            info!(target: "pipeline", fp, "cache hit");
            return Ok(hit);
        }
        debug!(
            target: "pipeline",
            fp,
            topics = norm.topics.len(),
            selector = %norm.selector,
            "cache miss"
        );

        // Only fatal when no other source is selected.
        if norm.selector == SourceSelector::ContentOnly {
            if let Some(var) = self.content.missing_credential() {
                return Err(DigestError::ConfigMissing(var));
            }
        }

        // Fetch
        let topics = &norm.topics;
        let content_fut = async {
            if norm.selector.wants_content() {
                self.content.fetch(topics).await
            } else {
                FetchOutcome::Empty
            }
        };
        let social_fut = async {
            if norm.selector.wants_social() {
                self.social.fetch(topics).await
            } else {
                FetchOutcome::Empty
            }
        };
        let (content_out, social_out) = tokio::join!(content_fut, social_fut);

        let content_text = resolve(content_out, Upstream::News, RateLimitPolicy::Propagate)?;
        let social_text = resolve(social_out, Upstream::X, self.social_rate_limit)?;

        // GuardNoData
        if content_text.is_empty() && social_text.is_empty() {
            return Err(DigestError::NoData);
        }
        debug!(
            target: "pipeline",
            fp,
            content_chars = content_text.len(),
            social_chars = social_text.len(),
            "sources fetched"
        );

        // Summarize → Synthesize
        let summary = self.summarizer.summarize(&content_text, &social_text).await?;
        let audio = self.speech.synthesize(&summary).await?;

        // StoreCache
        let result = Arc::new(DigestResult { summary, audio });
        self.cache.put(key.clone(), Arc::clone(&result));
        info!(
            target: "pipeline",
            fp,
            summary_chars = result.summary.len(),
            audio_bytes = result.audio.len(),
            "digest computed"
        );
        Ok(result)
    }
}

/// Map one source outcome to text, or a request-level failure.
fn resolve(
    outcome: FetchOutcome,
    service: Upstream,
    on_429: RateLimitPolicy,
) -> Result<String, DigestError> {
    match outcome {
        FetchOutcome::Text(t) => Ok(t),
        FetchOutcome::Empty => Ok(String::new()),
        FetchOutcome::Failed(detail) => {
            warn!(target: "pipeline", source = %service, %detail, "source degraded to empty");
            Ok(String::new())
        }
        FetchOutcome::RateLimited(detail) => match on_429 {
            RateLimitPolicy::Propagate => Err(DigestError::rate_limited(service, detail)),
            RateLimitPolicy::Degrade => {
                warn!(
                    target: "pipeline",
                    source = %service,
                    %detail,
                    "rate limited source degraded to empty"
                );
                Ok(String::new())
            }
        },
    }
}
