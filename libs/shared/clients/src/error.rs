use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{service} is not configured")]
    NotConfigured { service: &'static str },

    #[error("{service} request failed: {message}")]
    Api { service: &'static str, message: String },

    #[error("{service} returned a malformed response: {message}")]
    Malformed { service: &'static str, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}
