use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
    /// The registry answered, but refused the request
    #[error("registry error: {0}")]
    Registry(String),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("session credentials lack {0}")]
    MissingCredential(&'static str),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
