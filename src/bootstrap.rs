// src/bootstrap.rs
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::cache::ResultCache;
use crate::config::DigestConfig;
use crate::pipeline::DigestPipeline;
use crate::sources::{http_client, NewsApiFetcher, XRecentFetcher};
use crate::speech::GoogleTranslateTts;
use crate::summarize::GroqSummarizer;

/// Wire the production pipeline from resolved configuration.
pub fn build_pipeline(cfg: &DigestConfig) -> anyhow::Result<DigestPipeline> {
    let connect = Duration::from_secs(cfg.connect_timeout_secs);
    let http = http_client(Duration::from_secs(cfg.http_timeout_secs), connect)?;
    // LLM calls get a longer budget than search/TTS.
    let llm_http = http_client(Duration::from_secs(cfg.summarizer_timeout_secs), connect)?;

    let creds = &cfg.credentials;
    // Safe diagnostics: presence only, never values.
    info!(
        news_key = creds.news_api_key.is_some(),
        x_token = creds.x_bearer_token.is_some(),
        groq_key = creds.groq_api_key.is_some(),
        ttl_secs = cfg.cache_ttl_secs,
        social_rate_limit = ?cfg.social_rate_limit,
        "digest config loaded"
    );
    if creds.news_api_key.is_none() {
        warn!("NEWS_API_KEY not set: content-only requests will fail with config_missing");
    }
    if creds.x_bearer_token.is_none() {
        warn!("X_BEARER_TOKEN not set: social source disabled");
    }
    if creds.groq_api_key.is_none() {
        warn!("GROQ_API_KEY not set: uncached requests will fail with config_missing");
    }

    let content = NewsApiFetcher::new(
        http.clone(),
        cfg.news_base_url.clone(),
        creds.news_api_key.clone(),
        cfg.language.clone(),
    );
    let social = XRecentFetcher::new(
        http.clone(),
        cfg.x_base_url.clone(),
        creds.x_bearer_token.clone(),
    );
    let summarizer = GroqSummarizer::new(
        llm_http,
        cfg.groq_url.clone(),
        creds.groq_api_key.clone(),
        cfg.groq_model.clone(),
        cfg.max_block_chars,
    );
    let speech = GoogleTranslateTts::new(http, cfg.tts_base_url.clone(), cfg.language.clone());

    let cache = Arc::new(ResultCache::new(Duration::from_secs(cfg.cache_ttl_secs)));
    Ok(DigestPipeline::new(
        cache,
        Arc::new(content),
        Arc::new(social),
        Arc::new(summarizer),
        Arc::new(speech),
    )
    .with_social_rate_limit(cfg.social_rate_limit))
}
