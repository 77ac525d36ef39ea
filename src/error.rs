use thiserror::Error;

#[derive(Debug, Error)]
pub enum MinerError {
    /// A field the caller relies on is missing from a remote response.
    #[error("unexpected response shape: missing `{0}`")]
    ShapeMismatch(String),
    #[error("channel {0} not found")]
    ChannelNotFound(String),
    #[error("error while spade_url extraction: step #{step}")]
    Extraction { step: u8 },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("gql error: {0}")]
    Gql(String),
    #[error("request failed with status {0}")]
    Status(u16),
}

impl MinerError {
    pub fn missing(field: impl Into<String>) -> Self {
        MinerError::ShapeMismatch(field.into())
    }
}

pub type Result<T> = std::result::Result<T, MinerError>;
