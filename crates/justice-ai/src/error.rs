use thiserror::Error;

/// Longest server error body kept in an [`AiError::Server`].
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response contained no text")]
    EmptyResponse,

    #[error("prompt blocked: {0}")]
    Blocked(String),
}

impl AiError {
    /// Classify a transport error, separating timeouts from other failures.
    pub fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(e)
        }
    }

    pub(crate) fn server(status: u16, body: &str) -> Self {
        Self::Server {
            status,
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        }
    }
}
