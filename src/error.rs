use reqwest::StatusCode;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while talking to the catalog API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The host could not be reached at all. Not retried within a call.
    #[error("cannot reach {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("credential was rejected (status {0})")]
    InvalidCredential(StatusCode),

    #[error("no x-csrf-token header in token response (status {0})")]
    TokenUnavailable(StatusCode),

    /// Every retry was spent without getting the expected status.
    #[error("gave up on {url} after retries (last status: {last_status:?})")]
    Degraded {
        url: String,
        last_status: Option<StatusCode>,
    },

    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Top-level failure of a monitoring session.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("authentication failed: {0}")]
    Authentication(ApiError),

    #[error("item {0} does not exist")]
    ItemNotFound(u64),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl MonitorError {
    /// Process exit status for a failure that stopped the monitor.
    pub fn exit_code(&self) -> i32 {
        match self {
            MonitorError::Config(_) => 2,
            MonitorError::Authentication(_) => 3,
            MonitorError::ItemNotFound(_) => 4,
            MonitorError::Api(_) => 1,
        }
    }
}
