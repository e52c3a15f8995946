// src/fingerprint.rs
//! Stable, order-independent identity of a normalized request. Used as the cache key.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::request::NormalizedRequest;

#[derive(Serialize)]
struct Canonical<'a> {
    topics: &'a [String],
    source_type: &'a str,
}

/// SHA-256 over the canonical JSON of `{topics, source_type}`, as 64 lower-case hex chars.
///
/// `NormalizedRequest` already carries sorted, lower-cased, unique topics, so any
/// permutation or case variant of the same topic set maps to the same key.
pub fn fingerprint(req: &NormalizedRequest) -> String {
    let canonical = Canonical {
        topics: &req.topics,
        source_type: req.selector.as_str(),
    };
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    format!("{:x}", hasher.finalize())
}

/// Short prefix for log lines.
pub fn short(fp: &str) -> &str {
    fp.get(..12).unwrap_or(fp)
}
