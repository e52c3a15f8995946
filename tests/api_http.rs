// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets on our side.
// The router is exercised via tower::ServiceExt::oneshot; upstreams are the stub.
//
// Covered:
// - GET /health
// - POST /generate-audio success body (summary + base64 audio)
// - bad JSON / bad selector / empty topics -> 400 bad_request
// - upstream 429 -> 429 rate_limited + Retry-After
// - no data -> 404 no_data
// - panic inside the pipeline task -> 500 internal

mod support;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tower::ServiceExt as _; // for `oneshot`

use news_audio_digest::api::{create_router, AppState};
use news_audio_digest::sources::{http_client, NewsApiFetcher, XRecentFetcher};
use news_audio_digest::speech::GoogleTranslateTts;
use news_audio_digest::summarize::Summarizer;
use news_audio_digest::{DigestError, DigestPipeline, ResultCache};

use support::{news_ok, x_no_matches, Reply, Stub, FAKE_MP3};

const BODY_LIMIT: usize = 1024 * 1024;

fn app_for(stub: &Stub) -> Router {
    news_audio_digest::app_with_config(&stub.config()).expect("router builds")
}

async fn post_json(app: &Router, body: Body) -> (StatusCode, axum::http::HeaderMap, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/generate-audio")
        .header("content-type", "application/json")
        .body(body)
        .expect("request build");
    let resp = app.clone().oneshot(req).await.expect("router response");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), BODY_LIMIT).await.expect("body");
    let v: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, v)
}

fn body_of(v: Value) -> Body {
    Body::from(serde_json::to_vec(&v).expect("serialize payload"))
}

#[tokio::test]
async fn health_is_ok() {
    let stub = Stub::start().await;
    let app = app_for(&stub);
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn generate_audio_returns_summary_and_base64_audio() {
    let stub = Stub::start().await;
    let app = app_for(&stub);

    let (status, _h, v) = post_json(
        &app,
        body_of(json!({"topics": ["AI", "ai"], "source_type": "both"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {v}");
    assert_eq!(v["summary"], "- point one\n- point two");
    let audio = BASE64
        .decode(v["audio"].as_str().expect("audio string"))
        .expect("valid base64");
    assert_eq!(audio, FAKE_MP3);

    // identical second call: same payload, served from cache
    let (status2, _h2, v2) = post_json(
        &app,
        body_of(json!({"topics": ["ai"], "source_type": "both"})),
    )
    .await;
    assert_eq!(status2, StatusCode::OK);
    assert_eq!(v2, v);
    assert_eq!(stub.hits(), (1, 1, 1, 1));
}

#[tokio::test]
async fn legacy_selector_values_are_accepted() {
    let stub = Stub::start().await;
    let app = app_for(&stub);
    let (status, _h, _v) = post_json(
        &app,
        body_of(json!({"topics": ["ai"], "source_type": "news"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stub.hits().1, 0, "news selector skips X");
}

#[tokio::test]
async fn bad_requests_are_400() {
    let stub = Stub::start().await;
    let app = app_for(&stub);

    for body in [
        Body::from("{not json"),
        body_of(json!({"topics": ["ai"]})),
        body_of(json!({"topics": ["ai"], "source_type": "rss"})),
        body_of(json!({"topics": ["  ", ""], "source_type": "both"})),
        body_of(json!({"topics": [], "source_type": "both"})),
        body_of(json!({"topics": ["a", "b", "c", "d"], "source_type": "both"})),
    ] {
        let (status, _h, v) = post_json(&app, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {v}");
        assert_eq!(v["status"], "bad_request");
        assert!(v["detail"].as_str().is_some_and(|d| !d.is_empty()));
    }
    assert_eq!(stub.hits(), (0, 0, 0, 0));
}

#[tokio::test]
async fn rate_limit_is_distinguishable() {
    let stub = Stub::start().await;
    stub.set_chat(Reply::too_many());
    let app = app_for(&stub);

    let (status, headers, v) = post_json(
        &app,
        body_of(json!({"topics": ["ai"], "source_type": "both"})),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(v["status"], "rate_limited");
    assert!(headers.get(header::RETRY_AFTER).is_some());
}

#[tokio::test]
async fn no_data_is_404() {
    let stub = Stub::start().await;
    stub.set_news(news_ok(&[]));
    stub.set_x(x_no_matches());
    let app = app_for(&stub);

    let (status, _h, v) = post_json(
        &app,
        body_of(json!({"topics": ["zzqx"], "source_type": "both"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(v["status"], "no_data");
}

struct PanickingSummarizer;

#[async_trait]
impl Summarizer for PanickingSummarizer {
    async fn summarize(&self, _content: &str, _social: &str) -> Result<String, DigestError> {
        panic!("summarizer blew up");
    }
}

#[tokio::test]
async fn panic_in_pipeline_is_500_internal() {
    let stub = Stub::start().await;
    let http = http_client(Duration::from_secs(1), Duration::from_secs(1)).unwrap();
    let pipeline = DigestPipeline::new(
        Arc::new(ResultCache::default()),
        Arc::new(NewsApiFetcher::new(
            http.clone(),
            stub.base_url.clone(),
            Some("news-key".into()),
            "en",
        )),
        Arc::new(XRecentFetcher::new(
            http.clone(),
            stub.base_url.clone(),
            Some("x-token".into()),
        )),
        Arc::new(PanickingSummarizer),
        Arc::new(GoogleTranslateTts::new(http, stub.base_url.clone(), "en")),
    );
    let app = create_router(AppState {
        pipeline: Arc::new(pipeline),
    });

    let (status, _h, v) = post_json(
        &app,
        body_of(json!({"topics": ["ai"], "source_type": "both"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(v["status"], "internal");
    assert_eq!(stub.hits().3, 0, "no speech after the panic");

    // the router keeps serving after a failed task
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
