use thiserror::Error;

pub use self::codeforces::CodeforcesClient;
pub use self::github::GitHubClient;

pub mod codeforces;
pub mod github;
pub mod stats;

/// Errors surfaced by the upstream API clients. A failed call is reported
/// directly to the caller; there is no retry or backoff layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("API rate limit hit (remaining: {remaining}). Try again later.")]
    RateLimited { remaining: String },
    #[error("{0}")]
    Upstream(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response shape: {0}")]
    Decode(String),
}
