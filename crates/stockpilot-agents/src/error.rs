use stockpilot_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Claude CLI error: {0}")]
    Cli(String),

    #[error("Oracle timed out after {0} seconds")]
    Timeout(u64),

    #[error("Malformed oracle response: {0}")]
    MalformedOracleResponse(String),

    #[error("Product data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Backend rejected request with HTTP {status}: {body}")]
    BackendExecutionFailure { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
