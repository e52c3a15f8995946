// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod metrics;
pub mod pipeline;
pub mod request;
pub mod sources;
pub mod speech;
pub mod summarize;

pub use crate::cache::{DigestResult, ResultCache};
pub use crate::config::DigestConfig;
pub use crate::error::{DigestError, Upstream};
pub use crate::pipeline::DigestPipeline;
pub use crate::request::{DigestRequest, SourceSelector};

use std::sync::Arc;

use axum::Router;
use tracing::warn;

/// Build the full in-process router from `DigestConfig::load()`.
///
/// `/metrics` is mounted only when `DIGEST_METRICS=1`; the recorder is global,
/// so a second install in the same process is skipped with a warning.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = DigestConfig::load()?;
    app_with_config(&cfg)
}

pub fn app_with_config(cfg: &DigestConfig) -> anyhow::Result<Router> {
    let pipeline = bootstrap::build_pipeline(cfg)?;
    let mut router = api::create_router(api::AppState {
        pipeline: Arc::new(pipeline),
    });

    let metrics_on = std::env::var("DIGEST_METRICS").ok().as_deref() == Some("1");
    if metrics_on {
        match crate::metrics::Metrics::init(cfg.cache_ttl_secs) {
            Ok(m) => router = router.merge(m.router()),
            Err(e) => warn!(error = ?e, "metrics disabled"),
        }
    }
    Ok(router)
}
