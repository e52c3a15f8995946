// src/sources/news_api.rs
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::digest::ENV_NEWS_API_KEY;
use crate::sources::{
    normalize_snippet, or_query, record_outcome, snippet_of, FetchOutcome, SourceFetcher,
};

/// Articles taken from one search.
pub const NEWS_MAX_ITEMS: usize = 5;

#[derive(Debug, Deserialize)]
struct EverythingResp {
    #[serde(default)]
    articles: Option<Vec<Article>>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
}

/// Content source: NewsAPI `/v2/everything`.
pub struct NewsApiFetcher {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    language: String,
}

impl NewsApiFetcher {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
            language: language.into(),
        }
    }

    async fn fetch_inner(&self, topics: &[String]) -> FetchOutcome {
        let Some(key) = self.api_key.as_deref() else {
            return FetchOutcome::Failed("NEWS_API_KEY not configured".into());
        };
        let query = or_query(topics);
        if query.is_empty() {
            return FetchOutcome::Empty;
        }

        let url = format!("{}/v2/everything", self.base_url);
        let page_size = NEWS_MAX_ITEMS.to_string();
        let resp = match self
            .http
            .get(&url)
            .query(&[
                ("q", query.as_str()),
                ("language", self.language.as_str()),
                ("pageSize", page_size.as_str()),
                ("apiKey", key),
            ])
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

        let body: EverythingResp = match resp.json().await {
            Ok(b) => b,
            Err(e) => return FetchOutcome::Failed(format!("malformed response: {e}")),
        };
        let Some(articles) = body.articles else {
            return FetchOutcome::Failed("response has no articles field".into());
        };

        let text = articles
            .iter()
            .take(NEWS_MAX_ITEMS)
            .filter_map(|a| {
                let title = normalize_snippet(a.title.as_deref().unwrap_or_default());
                let desc = normalize_snippet(a.description.as_deref().unwrap_or_default());
                match (title.is_empty(), desc.is_empty()) {
                    (true, true) => None,
                    (false, true) => Some(format!("{title}.")),
                    (true, false) => Some(desc),
                    (false, false) => Some(format!("{title}. {desc}")),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        FetchOutcome::from_text(text)
    }
}

#[async_trait]
impl SourceFetcher for NewsApiFetcher {
    async fn fetch(&self, topics: &[String]) -> FetchOutcome {
        let out = self.fetch_inner(topics).await;
        match &out {
            FetchOutcome::Text(t) => {
                debug!(target: "sources", source = "news", chars = t.len(), "fetched")
            }
            FetchOutcome::Empty => debug!(target: "sources", source = "news", "no articles"),
            FetchOutcome::RateLimited(d) => {
                warn!(target: "sources", source = "news", detail = %d, "rate limited")
            }
            FetchOutcome::Failed(d) => {
                warn!(target: "sources", source = "news", error = %d, "fetch failed")
            }
        }
        record_outcome(self.name(), &out);
        out
    }

    fn name(&self) -> &'static str {
        "news"
    }

    fn missing_credential(&self) -> Option<&'static str> {
        self.api_key.is_none().then_some(ENV_NEWS_API_KEY)
    }
}
