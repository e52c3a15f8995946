// src/config/mod.rs
pub mod digest;

pub use digest::{Credentials, DigestConfig, RateLimitPolicy};
