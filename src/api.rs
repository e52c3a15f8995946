use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::cache::DigestResult;
use crate::error::DigestError;
use crate::pipeline::DigestPipeline;
use crate::request::DigestRequest;

/// Seconds a client should wait after a 429 before retrying.
const RETRY_AFTER_SECS: &str = "60";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DigestPipeline>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/generate-audio", post(generate_audio))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct DigestResp {
    pub summary: String,
    /// MP3 bytes, base64.
    pub audio: String,
}

impl From<&DigestResult> for DigestResp {
    fn from(r: &DigestResult) -> Self {
        Self {
            summary: r.summary.clone(),
            audio: BASE64.encode(&r.audio),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResp {
    pub status: &'static str,
    pub detail: String,
}

impl IntoResponse for DigestError {
    fn into_response(self) -> Response {
        let code = self.http_status();
        let body = ErrorResp {
            status: self.status_class(),
            detail: self.to_string(),
        };
        let mut resp = (code, Json(body)).into_response();
        if code == StatusCode::TOO_MANY_REQUESTS {
            resp.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        resp
    }
}

async fn generate_audio(
    State(state): State<AppState>,
    body: Result<Json<DigestRequest>, JsonRejection>,
) -> Result<Json<DigestResp>, DigestError> {
    let Json(req) = body.map_err(|e| DigestError::BadRequest(e.body_text()))?;

    // Detached task: a dropped client connection does not cancel the pipeline,
    // and a panic inside it becomes an `Internal` failure instead of tearing down the handler.
    let pipeline = Arc::clone(&state.pipeline);
    let joined = tokio::spawn(async move { pipeline.run(&req).await }).await;

    let result = match joined {
        Ok(r) => r?,
        Err(e) => {
            error!(target: "api", error = %e, "digest task aborted");
            return Err(DigestError::Internal("digest task aborted".into()));
        }
    };
    Ok(Json(DigestResp::from(result.as_ref())))
}
