use crate::retry::AttemptFailure;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Method outside of `GET`, `POST`, `PUT`, `DELETE`.
    #[error("invalid or unsupported http method: {0}")]
    InvalidMethod(String),
    /// URI that could not be parsed as an absolute URL.
    #[error("invalid url {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },
    /// Header name or value rejected by HTTP encoding rules.
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
    /// `send` was called before a URI was set.
    #[error("request uri must be specified")]
    MissingUri,
    /// JSON payload serialization failed.
    #[error("encode error: {0}")]
    Encode(String),
    /// Streaming request body could not be read into memory.
    #[error("failed to read request body: {0}")]
    BodyRead(#[source] std::io::Error),
    /// The HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    /// The response arrived but its body could not be drained.
    #[error("failed to read response body: {0}")]
    ResponseBody(#[source] reqwest::Error),
    /// The attached context was cancelled or its deadline passed.
    #[error("request cancelled")]
    Cancelled,
    /// Every attempt in the retry budget failed.
    #[error("request failed after {attempts} attempts")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// One entry per failed attempt, in order.
        failures: Vec<AttemptFailure>,
    },
    /// Response body decoding error.
    #[error("decode error: {0}")]
    Decode(String),
    /// Invalid configuration value.
    #[error("config error: {0}")]
    Config(String),
}

impl RequestError {
    /// Per-attempt failures collected before the retry budget ran out.
    ///
    /// Empty for every variant other than [`RequestError::Exhausted`].
    pub fn failures(&self) -> &[AttemptFailure] {
        match self {
            Self::Exhausted { failures, .. } => failures,
            _ => &[],
        }
    }
}
