use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuizClientError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("server rejected the request: {0}")]
    Rejected(String),
    #[error("invalid quiz state: {0}")]
    InvalidState(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("a quiz is already being prepared")]
    WorkflowInFlight,
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl QuizClientError {
    pub fn is_server_reported(&self) -> bool {
        matches!(
            self,
            Self::Status { .. } | Self::Decode { .. } | Self::Rejected(_)
        )
    }
}

pub type Result<T, E = QuizClientError> = std::result::Result<T, E>;
