// tests/support/mod.rs
//
// In-process stand-in for the four upstream services (news search, X search,
// chat completions, translate TTS), served by axum on 127.0.0.1:0.
// Each test spawns its own stub, so tests do not share state.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use news_audio_digest::config::{Credentials, DigestConfig};

pub const FAKE_MP3: &[u8] = b"ID3\x04\x00fake-mp3-frame";

#[derive(Clone, Debug)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
    pub delay_ms: u64,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
            delay_ms: 0,
        }
    }

    pub fn raw(status: u16, body: &[u8]) -> Self {
        Self {
            status,
            body: body.to_vec(),
            delay_ms: 0,
        }
    }

    pub fn delayed(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    pub fn too_many() -> Self {
        Self::json(429, json!({"error": {"message": "rate limit exceeded"}}))
    }
}

pub fn news_ok(items: &[(&str, &str)]) -> Reply {
    let articles: Vec<Value> = items
        .iter()
        .map(|(t, d)| json!({"title": t, "description": d, "url": "https://example.test"}))
        .collect();
    Reply::json(
        200,
        json!({"status": "ok", "totalResults": articles.len(), "articles": articles}),
    )
}

pub fn x_ok(texts: &[&str]) -> Reply {
    let data: Vec<Value> = texts
        .iter()
        .enumerate()
        .map(|(i, t)| json!({"id": i.to_string(), "text": t}))
        .collect();
    Reply::json(200, json!({"data": data, "meta": {"result_count": texts.len()}}))
}

pub fn x_no_matches() -> Reply {
    Reply::json(200, json!({"meta": {"result_count": 0}}))
}

pub fn chat_ok(content: &str) -> Reply {
    Reply::json(
        200,
        json!({
            "id": "chatcmpl-test",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        }),
    )
}

#[derive(Default)]
pub struct Recorded {
    pub news_query: Option<HashMap<String, String>>,
    pub x_query: Option<HashMap<String, String>>,
    pub x_auth: Option<String>,
    pub chat_body: Option<Value>,
    pub chat_auth: Option<String>,
    pub tts_queries: Vec<HashMap<String, String>>,
}

pub struct StubState {
    pub news: Mutex<Reply>,
    pub x: Mutex<Reply>,
    pub chat: Mutex<Reply>,
    pub tts: Mutex<Reply>,
    pub news_hits: AtomicUsize,
    pub x_hits: AtomicUsize,
    pub chat_hits: AtomicUsize,
    pub tts_hits: AtomicUsize,
    pub recorded: Mutex<Recorded>,
}

pub struct Stub {
    pub base_url: String,
    pub state: Arc<StubState>,
}

impl Stub {
    /// Healthy defaults: every service answers with usable data.
    pub async fn start() -> Self {
        let state = Arc::new(StubState {
            news: Mutex::new(news_ok(&[(
                "AI chip demand surges",
                "Vendors report record orders.",
            )])),
            x: Mutex::new(x_ok(&["New open model released today", "AI regulation debate"])),
            chat: Mutex::new(chat_ok("- point one\n- point two")),
            tts: Mutex::new(Reply::raw(200, FAKE_MP3)),
            news_hits: AtomicUsize::new(0),
            x_hits: AtomicUsize::new(0),
            chat_hits: AtomicUsize::new(0),
            tts_hits: AtomicUsize::new(0),
            recorded: Mutex::new(Recorded::default()),
        });

        let router = Router::new()
            .route("/v2/everything", get(news))
            .route("/2/tweets/search/recent", get(x_search))
            .route("/openai/v1/chat/completions", post(chat))
            .route("/translate_tts", get(tts))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("stub server");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn set_news(&self, r: Reply) {
        *self.state.news.lock().unwrap() = r;
    }
    pub fn set_x(&self, r: Reply) {
        *self.state.x.lock().unwrap() = r;
    }
    pub fn set_chat(&self, r: Reply) {
        *self.state.chat.lock().unwrap() = r;
    }
    pub fn set_tts(&self, r: Reply) {
        *self.state.tts.lock().unwrap() = r;
    }

    pub fn hits(&self) -> (usize, usize, usize, usize) {
        (
            self.state.news_hits.load(Ordering::SeqCst),
            self.state.x_hits.load(Ordering::SeqCst),
            self.state.chat_hits.load(Ordering::SeqCst),
            self.state.tts_hits.load(Ordering::SeqCst),
        )
    }

    /// Config pointing every upstream at this stub, with all credentials present.
    pub fn config(&self) -> DigestConfig {
        DigestConfig {
            news_base_url: self.base_url.clone(),
            x_base_url: self.base_url.clone(),
            groq_url: format!("{}/openai/v1/chat/completions", self.base_url),
            tts_base_url: self.base_url.clone(),
            http_timeout_secs: 1,
            connect_timeout_secs: 1,
            summarizer_timeout_secs: 2,
            credentials: Credentials {
                news_api_key: Some("news-key".into()),
                x_bearer_token: Some("x-token".into()),
                groq_api_key: Some("gsk-test".into()),
            },
            ..DigestConfig::default()
        }
    }
}

async fn reply(r: Reply) -> Response {
    if r.delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(r.delay_ms)).await;
    }
    let status = StatusCode::from_u16(r.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, r.body).into_response()
}

fn auth_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn news(
    State(s): State<Arc<StubState>>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    s.news_hits.fetch_add(1, Ordering::SeqCst);
    s.recorded.lock().unwrap().news_query = Some(q);
    let r = s.news.lock().unwrap().clone();
    reply(r).await
}

async fn x_search(
    State(s): State<Arc<StubState>>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    s.x_hits.fetch_add(1, Ordering::SeqCst);
    {
        let mut rec = s.recorded.lock().unwrap();
        rec.x_query = Some(q);
        rec.x_auth = auth_of(&headers);
    }
    let r = s.x.lock().unwrap().clone();
    reply(r).await
}

async fn chat(
    State(s): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    s.chat_hits.fetch_add(1, Ordering::SeqCst);
    {
        let mut rec = s.recorded.lock().unwrap();
        rec.chat_body = Some(body);
        rec.chat_auth = auth_of(&headers);
    }
    let r = s.chat.lock().unwrap().clone();
    reply(r).await
}

async fn tts(
    State(s): State<Arc<StubState>>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    s.tts_hits.fetch_add(1, Ordering::SeqCst);
    s.recorded.lock().unwrap().tts_queries.push(q);
    let r = s.tts.lock().unwrap().clone();
    reply(r).await
}
