// src/speech.rs
//! Speech synthesis collaborator: summary text in, MP3 bytes out.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::{DigestError, Upstream};
use crate::sources::snippet_of;

/// The translate TTS endpoint rejects longer `q` values.
pub const TTS_MAX_CHUNK_CHARS: usize = 200;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, DigestError>;
}

/// Google Translate TTS (`client=tw-ob`). MP3 frames of each chunk are concatenated.
pub struct GoogleTranslateTts {
    http: reqwest::Client,
    base_url: String,
    lang: String,
}

impl GoogleTranslateTts {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        lang: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            lang: lang.into(),
        }
    }

    async fn fetch_chunk(
        &self,
        idx: usize,
        total: usize,
        chunk: &str,
    ) -> Result<Vec<u8>, DigestError> {
        let url = format!("{}/translate_tts", self.base_url);
        let idx_s = idx.to_string();
        let total_s = total.to_string();
        let textlen = chunk.chars().count().to_string();
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", self.lang.as_str()),
                ("total", total_s.as_str()),
                ("idx", idx_s.as_str()),
                ("textlen", textlen.as_str()),
                ("client", "tw-ob"),
            ])
            .send()
            .await
            .map_err(|e| DigestError::upstream(Upstream::Speech, format!("request failed: {e}")))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = resp.text().await.unwrap_or_default();
            return Err(DigestError::rate_limited(Upstream::Speech, snippet_of(&body)));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DigestError::upstream(
                Upstream::Speech,
                format!("HTTP {status}: {}", snippet_of(&body)),
            ));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| DigestError::upstream(Upstream::Speech, format!("reading audio: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, DigestError> {
        let chunks = split_for_tts(text, TTS_MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(DigestError::upstream(Upstream::Speech, "nothing to speak"));
        }

        let mut audio = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let part = self.fetch_chunk(i, chunks.len(), chunk).await.map_err(|e| {
                warn!(target: "speech", chunk = i, error = %e, "tts chunk failed");
                e
            })?;
            audio.extend_from_slice(&part);
        }
        if audio.is_empty() {
            return Err(DigestError::upstream(Upstream::Speech, "empty audio stream"));
        }
        debug!(target: "speech", chunks = chunks.len(), bytes = audio.len(), "audio ready");
        Ok(audio)
    }
}

/// Split on whitespace into chunks of at most `max` chars; overlong words are cut.
pub fn split_for_tts(text: &str, max: usize) -> Vec<String> {
    let max = max.max(1);
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut cur_len = 0usize;

    for word in text.split_whitespace() {
        let mut word_chars: Vec<char> = word.chars().collect();
        while word_chars.len() > max {
            if cur_len > 0 {
                out.push(std::mem::take(&mut cur));
                cur_len = 0;
            }
            let rest = word_chars.split_off(max);
            out.push(word_chars.into_iter().collect());
            word_chars = rest;
        }
        let wlen = word_chars.len();
        if wlen == 0 {
            continue;
        }
        let needed = if cur_len == 0 { wlen } else { cur_len + 1 + wlen };
        if needed > max {
            out.push(std::mem::take(&mut cur));
            cur_len = 0;
        }
        if cur_len > 0 {
            cur.push(' ');
            cur_len += 1;
        }
        cur.extend(word_chars);
        cur_len += wlen;
    }
    if cur_len > 0 {
        out.push(cur);
    }
    out
}
