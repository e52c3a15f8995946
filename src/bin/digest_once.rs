//! Run the digest pipeline once from the command line and write the audio to disk.
//!
//! Usage: digest-once <source_type> <topic> [topic] [topic]
//!   source_type: content-only | social-only | both  (also: news, X)
//! Writes `summary.mp3` (or $DIGEST_OUT) and prints the summary.

use std::process::ExitCode;

use news_audio_digest::{bootstrap::build_pipeline, DigestConfig, DigestRequest};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("news_audio_digest=info,warn")
            }),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(source_type) = args.next() else {
        eprintln!("usage: digest-once <content-only|social-only|both> <topic> [topic] [topic]");
        return ExitCode::from(2);
    };
    let topics: Vec<String> = args.collect();

    match run(&source_type, topics).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("digest-once failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(source_type: &str, topics: Vec<String>) -> anyhow::Result<()> {
    let cfg = DigestConfig::load()?;
    let pipeline = build_pipeline(&cfg)?;

    let req = DigestRequest {
        topics,
        source_type: source_type.to_string(),
    };
    let result = pipeline.run(&req).await?;

    let out = std::env::var("DIGEST_OUT").unwrap_or_else(|_| "summary.mp3".to_string());
    tokio::fs::write(&out, &result.audio).await?;

    println!("{}", result.summary);
    println!("\naudio: {out} ({} bytes)", result.audio.len());
    Ok(())
}
