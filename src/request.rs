// src/request.rs
//! Inbound request shape, source selector, and topic normalization.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DigestError;

/// Upper bound on topics a caller may submit in one request.
pub const MAX_TOPICS: usize = 3;

/// Which upstream sources a request draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SourceSelector {
    #[serde(rename = "content-only")]
    ContentOnly,
    #[serde(rename = "social-only")]
    SocialOnly,
    #[serde(rename = "both")]
    Both,
}

impl SourceSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSelector::ContentOnly => "content-only",
            SourceSelector::SocialOnly => "social-only",
            SourceSelector::Both => "both",
        }
    }

    pub fn wants_content(&self) -> bool {
        matches!(self, SourceSelector::ContentOnly | SourceSelector::Both)
    }

    pub fn wants_social(&self) -> bool {
        matches!(self, SourceSelector::SocialOnly | SourceSelector::Both)
    }
}

impl fmt::Display for SourceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceSelector {
    type Err = DigestError;

    /// Accepts the canonical names plus the legacy UI values `news` and `X`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content-only" | "news" => Ok(SourceSelector::ContentOnly),
            "social-only" | "x" => Ok(SourceSelector::SocialOnly),
            "both" => Ok(SourceSelector::Both),
            other => Err(DigestError::BadRequest(format!(
                "unknown source_type '{other}' (expected content-only, social-only or both)"
            ))),
        }
    }
}

/// Wire body of `POST /generate-audio`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DigestRequest {
    pub topics: Vec<String>,
    pub source_type: String,
}

impl DigestRequest {
    pub fn new<I, S>(topics: I, source_type: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topics: topics.into_iter().map(Into::into).collect(),
            source_type: source_type.to_string(),
        }
    }

    /// Validate and canonicalize: trimmed, lower-cased, sorted, deduplicated.
    pub fn normalize(&self) -> Result<NormalizedRequest, DigestError> {
        if self.topics.len() > MAX_TOPICS {
            return Err(DigestError::BadRequest(format!(
                "at most {MAX_TOPICS} topics are allowed, got {}",
                self.topics.len()
            )));
        }
        let selector: SourceSelector = self.source_type.parse()?;

        let topics: BTreeSet<String> = self
            .topics
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect();
        if topics.is_empty() {
            return Err(DigestError::BadRequest(
                "at least one non-empty topic is required".into(),
            ));
        }

        Ok(NormalizedRequest {
            topics: topics.into_iter().collect(),
            selector,
        })
    }
}

/// Request after validation. Topics are unique, lower-case and sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRequest {
    pub topics: Vec<String>,
    pub selector: SourceSelector,
}
