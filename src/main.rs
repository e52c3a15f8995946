//! News Audio Digest: binary entrypoint.
//! Boots the Axum HTTP server, wiring the digest pipeline, shared cache, and middleware.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - DIGEST_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("DIGEST_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_audio_digest=info,warn"));

    // Shuttle may already own the global subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> shuttle_axum::ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // Credentials (NEWS_API_KEY, X_BEARER_TOKEN, GROQ_API_KEY) are read from env.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let router = news_audio_digest::app().await?;

    Ok(router.into())
}
