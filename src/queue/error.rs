use thiserror::Error;

/// Failures inside a single lease/delete round trip.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Task queue returned status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Malformed task queue response: {0}")]
    Parse(String),
    #[error("Task payload could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for QueueError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse(error.to_string())
    }
}

impl From<base64::DecodeError> for QueueError {
    fn from(error: base64::DecodeError) -> Self {
        Self::Decode(error.to_string())
    }
}

impl From<std::string::FromUtf8Error> for QueueError {
    fn from(error: std::string::FromUtf8Error) -> Self {
        Self::Decode(error.to_string())
    }
}
