// tests/metrics_http.rs
//
// `/metrics` exposition after one real request. The Prometheus recorder is
// process-global, so this binary holds a single test.

mod support;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use serial_test::serial;
use tower::ServiceExt;

use support::Stub;

#[tokio::test]
#[serial]
async fn metrics_route_exposes_pipeline_and_source_series() {
    std::env::set_var("DIGEST_METRICS", "1");
    let stub = Stub::start().await;
    let app = news_audio_digest::app_with_config(&stub.config()).expect("router builds");

    let r = app
        .clone()
        .oneshot(
            Request::post("/generate-audio")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"topics":["ai"],"source_type":"both"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(r.status(), StatusCode::OK);

    let m = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    std::env::remove_var("DIGEST_METRICS");
    assert_eq!(m.status(), StatusCode::OK);
    let body = body::to_bytes(m.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "digest_requests_total",
        "digest_cache_misses_total",
        "digest_pipeline_ms",
        "digest_cache_ttl_seconds",
    ] {
        assert!(
            text.contains(needle),
            "metrics exposition missing '{needle}'\n{text}"
        );
    }
    let news_line = text
        .lines()
        .find(|l| l.starts_with("digest_source_outcomes_total{") && l.contains(r#"source="news""#));
    assert!(
        news_line.is_some_and(|l| l.contains(r#"outcome="text""#)),
        "no news outcome series\n{text}"
    );
}
