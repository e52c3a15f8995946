// src/error.rs
//! Error taxonomy for the digest pipeline.
//!
//! Source-local failures never show up here: fetchers report them as
//! [`crate::sources::FetchOutcome`] and the pipeline degrades them to empty
//! text. Everything in [`DigestError`] reaches the caller.

use std::fmt;

use axum::http::StatusCode;
use thiserror::Error;

/// Remote service that produced a rate-limit or upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upstream {
    News,
    X,
    Summarizer,
    Speech,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Upstream::News => "news",
            Upstream::X => "x",
            Upstream::Summarizer => "summarizer",
            Upstream::Speech => "speech",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("{service} is rate limiting requests, try again later: {detail}")]
    RateLimited { service: Upstream, detail: String },
    #[error("no content found for the given topics")]
    NoData,
    #[error("summary generation returned no text")]
    SummaryEmpty,
    #[error("{service} upstream error: {detail}")]
    Upstream { service: Upstream, detail: String },
    #[error("missing configuration: {0} is not set")]
    ConfigMissing(&'static str),
    #[error("internal error: {0}")]
    Internal(String),
}

impl DigestError {
    pub fn rate_limited(service: Upstream, detail: impl Into<String>) -> Self {
        DigestError::RateLimited {
            service,
            detail: detail.into(),
        }
    }

    pub fn upstream(service: Upstream, detail: impl Into<String>) -> Self {
        DigestError::Upstream {
            service,
            detail: detail.into(),
        }
    }

    /// Stable tag exposed to clients and used as a metrics label.
    pub fn status_class(&self) -> &'static str {
        match self {
            DigestError::BadRequest(_) => "bad_request",
            DigestError::RateLimited { .. } => "rate_limited",
            DigestError::NoData => "no_data",
            DigestError::SummaryEmpty => "summary_empty",
            DigestError::Upstream { .. } => "upstream_error",
            DigestError::ConfigMissing(_) => "config_missing",
            DigestError::Internal(_) => "internal",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            DigestError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DigestError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            DigestError::NoData => StatusCode::NOT_FOUND,
            DigestError::SummaryEmpty => StatusCode::BAD_GATEWAY,
            DigestError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            DigestError::ConfigMissing(_) => StatusCode::SERVICE_UNAVAILABLE,
            DigestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, DigestError::RateLimited { .. })
    }
}
