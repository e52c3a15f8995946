// src/sources/x_recent.rs
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::sources::{
    normalize_snippet, or_query, record_outcome, snippet_of, FetchOutcome, SourceFetcher,
};

/// Posts taken from one search.
pub const X_MAX_ITEMS: usize = 15;

#[derive(Debug, Deserialize)]
struct RecentSearchResp {
    #[serde(default)]
    data: Option<Vec<Post>>,
    #[serde(default)]
    meta: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Post {
    text: Option<String>,
}

/// Social source: X API v2 recent search. Optional; disabled without a bearer token.
pub struct XRecentFetcher {
    http: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl XRecentFetcher {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        bearer_token: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            bearer_token,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.bearer_token.is_some()
    }

    async fn fetch_inner(&self, topics: &[String]) -> FetchOutcome {
        let Some(token) = self.bearer_token.as_deref() else {
            return FetchOutcome::Empty;
        };
        let query = or_query(topics);
        if query.is_empty() {
            return FetchOutcome::Empty;
        }

        let url = format!("{}/2/tweets/search/recent", self.base_url);
        let max_results = X_MAX_ITEMS.to_string();
        let resp = match self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("query", query.as_str()), ("max_results", max_results.as_str())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return FetchOutcome::Failed(format!("request failed: {e}")),
        };

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = resp.text().await.unwrap_or_default();
            return FetchOutcome::RateLimited(snippet_of(&body));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return FetchOutcome::Failed(format!("HTTP {status}: {}", snippet_of(&body)));
        }

        let body: RecentSearchResp = match resp.json().await {
            Ok(b) => b,
            Err(e) => return FetchOutcome::Failed(format!("malformed response: {e}")),
        };
        let posts = match (body.data, body.meta) {
            (Some(posts), _) => posts,
            // X omits `data` when nothing matched but still sends `meta`.
            (None, Some(_)) => return FetchOutcome::Empty,
            (None, None) => return FetchOutcome::Failed("response has no data field".into()),
        };

        let text = posts
            .iter()
            .take(X_MAX_ITEMS)
            .filter_map(|p| p.text.as_deref())
            .map(normalize_snippet)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        FetchOutcome::from_text(text)
    }
}

#[async_trait]
impl SourceFetcher for XRecentFetcher {
    async fn fetch(&self, topics: &[String]) -> FetchOutcome {
        let out = self.fetch_inner(topics).await;
        match &out {
            FetchOutcome::Text(t) => {
                debug!(target: "sources", source = "x", chars = t.len(), "fetched")
            }
            FetchOutcome::Empty => {
                debug!(target: "sources", source = "x", enabled = self.is_enabled(), "no posts")
            }
            FetchOutcome::RateLimited(d) => {
                warn!(target: "sources", source = "x", detail = %d, "rate limited")
            }
            FetchOutcome::Failed(d) => {
                warn!(target: "sources", source = "x", error = %d, "fetch failed")
            }
        }
        record_outcome(self.name(), &out);
        out
    }

    fn name(&self) -> &'static str {
        "x"
    }
}
