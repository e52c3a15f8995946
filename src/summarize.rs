// src/summarize.rs
//! Summarizer client: one chat-completions call turning source text into bullet points.

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::digest::ENV_GROQ_API_KEY;
use crate::error::{DigestError, Upstream};
use crate::sources::snippet_of;

const SYSTEM_DIRECTIVE: &str = "You are a precise summarization assistant. \
Only use the information given in the news and tweets. \
Do not add unrelated facts, opinions, or assumptions. \
Summarize in 10-15 bullet points, each under 50 words.";

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Bullet-point digest of the two source texts. Either text may be empty, not both.
    async fn summarize(&self, content_text: &str, social_text: &str)
        -> Result<String, DigestError>;
}

/// OpenAI-compatible chat completions client (Groq by default).
pub struct GroqSummarizer {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    max_block_chars: usize,
}

impl GroqSummarizer {
    pub fn new(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        max_block_chars: usize,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
            max_block_chars,
        }
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMsg>,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// User turn with the two labeled source blocks.
pub fn build_user_prompt(content_text: &str, social_text: &str) -> String {
    format!("NEWS:\n{content_text}\n\nTWEETS:\n{social_text}\n\nNow summarize.")
}

/// Drop `<think>...</think>` deliberation blocks and trim.
pub fn clean_summary(raw: &str) -> String {
    static RE_THINK: OnceCell<Regex> = OnceCell::new();
    let re = RE_THINK
        .get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("static think regex"));
    re.replace_all(raw, "").trim().to_string()
}

/// Cap `s` at `max` chars without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.message)
}

fn upstream_message(body: &str) -> String {
    error_message(body).unwrap_or_else(|| snippet_of(body))
}

#[async_trait]
impl Summarizer for GroqSummarizer {
    async fn summarize(
        &self,
        content_text: &str,
        social_text: &str,
    ) -> Result<String, DigestError> {
        if content_text.trim().is_empty() && social_text.trim().is_empty() {
            return Err(DigestError::NoData);
        }
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(DigestError::ConfigMissing(ENV_GROQ_API_KEY))?;

        let user = build_user_prompt(
            truncate_chars(content_text, self.max_block_chars),
            truncate_chars(social_text, self.max_block_chars),
        );
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_DIRECTIVE,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.0,
        };

        debug!(
            target: "summarize",
            model = %self.model,
            prompt_chars = user.len(),
            "calling summarizer"
        );
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "summarize", error = %e, "summarizer request failed");
                DigestError::upstream(Upstream::Summarizer, format!("request failed: {e}"))
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            DigestError::upstream(Upstream::Summarizer, format!("reading body: {e}"))
        })?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(target: "summarize", "summarizer rate limited");
            return Err(DigestError::rate_limited(Upstream::Summarizer, upstream_message(&body)));
        }
        if !status.is_success() {
            warn!(target: "summarize", %status, "summarizer returned error status");
            return Err(DigestError::upstream(
                Upstream::Summarizer,
                format!("HTTP {status}: {}", upstream_message(&body)),
            ));
        }

        let parsed: Resp = serde_json::from_str(&body).map_err(|e| {
            DigestError::upstream(Upstream::Summarizer, format!("invalid JSON: {e}"))
        })?;
        let raw = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| {
                // some gateways answer 200 with an error envelope
                let detail = error_message(&body)
                    .unwrap_or_else(|| "no choices/message in response".to_string());
                DigestError::upstream(Upstream::Summarizer, detail)
            })?;

        let cleaned = clean_summary(&raw);
        if cleaned.is_empty() {
            return Err(DigestError::SummaryEmpty);
        }
        info!(target: "summarize", raw_chars = raw.len(), chars = cleaned.len(), "summary ready");
        Ok(cleaned)
    }
}
