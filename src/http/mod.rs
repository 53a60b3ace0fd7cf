//! HTTP client module: JSON request/response helpers and streaming downloads
//! with bounded redirect following.

mod client;

pub use client::{DEFAULT_MAX_REDIRECTS, HttpClient, is_followed_redirect};
