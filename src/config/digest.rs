// src/config/digest.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

use crate::cache::DEFAULT_CACHE_TTL_SECS;

pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/digest.toml";

pub const ENV_NEWS_API_KEY: &str = "NEWS_API_KEY";
pub const ENV_X_BEARER_TOKEN: &str = "X_BEARER_TOKEN";
pub const ENV_GROQ_API_KEY: &str = "GROQ_API_KEY";

/// How a 429 from the social source is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitPolicy {
    /// Abort the request with `RateLimited`.
    #[default]
    Propagate,
    /// Treat the social source as empty and continue.
    Degrade,
}

impl RateLimitPolicy {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "propagate" => Some(Self::Propagate),
            "degrade" => Some(Self::Degrade),
            _ => None,
        }
    }
}

fn default_news_base_url() -> String {
    "https://newsapi.org".into()
}
fn default_x_base_url() -> String {
    "https://api.twitter.com".into()
}
fn default_groq_url() -> String {
    "https://api.groq.com/openai/v1/chat/completions".into()
}
fn default_groq_model() -> String {
    "deepseek-r1-distill-llama-70b".into()
}
fn default_tts_base_url() -> String {
    "https://translate.google.com".into()
}
fn default_language() -> String {
    "en".into()
}
fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}
fn default_http_timeout_secs() -> u64 {
    15
}
fn default_connect_timeout_secs() -> u64 {
    4
}
fn default_summarizer_timeout_secs() -> u64 {
    60
}
fn default_max_block_chars() -> usize {
    12_000
}

/// Non-secret settings. Credentials never come from the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    #[serde(default = "default_news_base_url")]
    pub news_base_url: String,
    #[serde(default = "default_x_base_url")]
    pub x_base_url: String,
    #[serde(default = "default_groq_url")]
    pub groq_url: String,
    #[serde(default = "default_groq_model")]
    pub groq_model: String,
    #[serde(default = "default_tts_base_url")]
    pub tts_base_url: String,
    /// Language pinned for news search and speech.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_summarizer_timeout_secs")]
    pub summarizer_timeout_secs: u64,
    /// Per-source char budget sent to the summarizer.
    #[serde(default = "default_max_block_chars")]
    pub max_block_chars: usize,
    #[serde(default)]
    pub social_rate_limit: RateLimitPolicy,

    #[serde(skip)]
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub news_api_key: Option<String>,
    pub x_bearer_token: Option<String>,
    pub groq_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            news_api_key: non_blank_env(ENV_NEWS_API_KEY),
            x_bearer_token: non_blank_env(ENV_X_BEARER_TOKEN),
            groq_api_key: non_blank_env(ENV_GROQ_API_KEY),
        }
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            news_base_url: default_news_base_url(),
            x_base_url: default_x_base_url(),
            groq_url: default_groq_url(),
            groq_model: default_groq_model(),
            tts_base_url: default_tts_base_url(),
            language: default_language(),
            cache_ttl_secs: default_cache_ttl_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            summarizer_timeout_secs: default_summarizer_timeout_secs(),
            max_block_chars: default_max_block_chars(),
            social_rate_limit: RateLimitPolicy::default(),
            credentials: Credentials::default(),
        }
    }
}

impl DigestConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading digest config from {}", path.display()))?;
        let cfg: DigestConfig = toml::from_str(&data)
            .with_context(|| format!("parsing digest config {}", path.display()))?;
        Ok(cfg)
    }

    /// Resolve settings in order:
    /// 1) $DIGEST_CONFIG_PATH (must exist if set)
    /// 2) config/digest.toml when present
    /// 3) built-in defaults
    ///
    /// then apply env overrides and read credentials from env.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_CONFIG_PATH)?
        } else {
            Self::default()
        };

        cfg.apply_env_overrides()?;
        cfg.credentials = Credentials::from_env();
        cfg.sanitize();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = non_blank_env("NEWS_BASE_URL") {
            self.news_base_url = v;
        }
        if let Some(v) = non_blank_env("X_BASE_URL") {
            self.x_base_url = v;
        }
        if let Some(v) = non_blank_env("GROQ_URL") {
            self.groq_url = v;
        }
        if let Some(v) = non_blank_env("GROQ_MODEL") {
            self.groq_model = v;
        }
        if let Some(v) = non_blank_env("TTS_BASE_URL") {
            self.tts_base_url = v;
        }
        if let Some(v) = non_blank_env("DIGEST_CACHE_TTL_SECS") {
            self.cache_ttl_secs = v
                .parse()
                .with_context(|| format!("DIGEST_CACHE_TTL_SECS is not a number: {v}"))?;
        }
        if let Some(v) = non_blank_env("DIGEST_HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = v
                .parse()
                .with_context(|| format!("DIGEST_HTTP_TIMEOUT_SECS is not a number: {v}"))?;
        }
        if let Some(v) = non_blank_env("DIGEST_SOCIAL_RATE_LIMIT") {
            self.social_rate_limit = RateLimitPolicy::parse(&v).ok_or_else(|| {
                anyhow!("DIGEST_SOCIAL_RATE_LIMIT must be 'propagate' or 'degrade', got {v}")
            })?;
        }
        Ok(())
    }

    fn sanitize(&mut self) {
        // Every outbound call needs a bounded timeout.
        if self.http_timeout_secs == 0 {
            self.http_timeout_secs = default_http_timeout_secs();
        }
        if self.connect_timeout_secs == 0 {
            self.connect_timeout_secs = default_connect_timeout_secs();
        }
        if self.summarizer_timeout_secs == 0 {
            self.summarizer_timeout_secs = default_summarizer_timeout_secs();
        }
        if self.max_block_chars == 0 {
            self.max_block_chars = default_max_block_chars();
        }
        for url in [
            &mut self.news_base_url,
            &mut self.x_base_url,
            &mut self.tts_base_url,
        ] {
            while url.ends_with('/') {
                url.pop();
            }
        }
    }
}

fn non_blank_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
