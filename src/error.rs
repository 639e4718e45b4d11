use thiserror::Error;

/// Errors raised while talking to the risk service or the session store.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with a non-2xx status
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not match the expected shape
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured base URL cannot carry endpoint paths
    #[error("invalid service URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The service rejected the supplied username/password
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Upload input rejected before any request was made
    #[error("invalid upload: {0}")]
    InvalidUpload(String),
}

pub type ApiResult<T> = Result<T, ApiError>;
