// src/sources/mod.rs
//! Upstream text sources. Each fetcher reports a [`FetchOutcome`] instead of an
//! error so a single source outage never aborts the whole request.

pub mod news_api;
pub mod x_recent;

use std::time::Duration;

use anyhow::Context;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

pub use news_api::NewsApiFetcher;
pub use x_recent::XRecentFetcher;

/// Result of one source fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Text(String),
    /// Nothing usable, or the source is disabled/not selected.
    Empty,
    /// Upstream answered 429.
    RateLimited(String),
    /// Non-2xx, malformed body, transport error or timeout.
    Failed(String),
}

impl FetchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Text(_) => "text",
            FetchOutcome::Empty => "empty",
            FetchOutcome::RateLimited(_) => "rate_limited",
            FetchOutcome::Failed(_) => "failed",
        }
    }

    /// Wrap collected text, mapping blank output to `Empty`.
    pub fn from_text(text: String) -> Self {
        if text.trim().is_empty() {
            FetchOutcome::Empty
        } else {
            FetchOutcome::Text(text)
        }
    }
}

#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, topics: &[String]) -> FetchOutcome;
    fn name(&self) -> &'static str;

    /// Env var of a credential this source cannot work without, when absent.
    /// Optional sources return `None` and report `Empty` instead.
    fn missing_credential(&self) -> Option<&'static str> {
        None
    }
}

/// Shared reqwest client builder; every outbound call carries a bounded timeout.
pub fn http_client(
    timeout: Duration,
    connect_timeout: Duration,
) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("news-audio-digest/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(connect_timeout)
        .timeout(timeout)
        .build()
        .context("building HTTP client")
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "digest_source_outcomes_total",
            "Source fetch outcomes by source and outcome."
        );
    });
}

pub(crate) fn record_outcome(source: &'static str, outcome: &FetchOutcome) {
    ensure_metrics_described();
    counter!(
        "digest_source_outcomes_total",
        "source" => source,
        "outcome" => outcome.label()
    )
    .increment(1);
}

/// Combine topics into one upstream query: `a OR "multi word" OR c`.
pub fn or_query(topics: &[String]) -> String {
    topics
        .iter()
        .map(|t| t.replace('"', "").trim().to_string())
        .filter(|t| !t.is_empty())
        .map(|t| {
            if t.chars().any(char::is_whitespace) {
                format!("\"{t}\"")
            } else {
                t
            }
        })
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Normalize snippet text: decode entities, strip tags, collapse whitespace.
pub fn normalize_snippet(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| {
        regex::Regex::new(r"(?is)</?[a-z][^>]*>").expect("static tag regex")
    });
    let stripped = re_tags.replace_all(&decoded, " ");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("static ws regex"));
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

/// Truncate the body of an upstream error for logs.
pub(crate) fn snippet_of(body: &str) -> String {
    const MAX: usize = 200;
    let t = body.trim();
    match t.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &t[..idx]),
        None => t.to_string(),
    }
}
