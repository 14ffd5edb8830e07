//! Error types for the Elasticsearch adapter.

use logpost_core::LogError;
use thiserror::Error;

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, ElasticError>;

/// Errors raised while talking to Elasticsearch.
///
/// These carry full backend detail for the server log. Converting into
/// [`LogError`] keeps only a stable, backend-agnostic message.
#[derive(Debug, Error)]
pub enum ElasticError {
    /// The adapter configuration is unusable.
    #[error("invalid elasticsearch config: {0}")]
    Config(String),

    /// The request never produced a response.
    #[error("elasticsearch transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Elasticsearch answered with a status the adapter does not accept.
    #[error("elasticsearch returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("malformed elasticsearch response: {0}")]
    MalformedResponse(String),

    /// A document could not be encoded.
    #[error("document encoding failed: {0}")]
    Encoding(#[from] LogError),
}

impl ElasticError {
    /// Returns true if Elasticsearch reported that the index already exists.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::Status { status: 400, body } if body.contains("resource_already_exists_exception"))
    }

    /// Returns true for a 404 status.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

impl From<ElasticError> for LogError {
    fn from(err: ElasticError) -> Self {
        let message = match err {
            ElasticError::Config(_) => "search backend is misconfigured",
            ElasticError::Transport(_) => "search backend unreachable",
            ElasticError::Status { .. } => "search backend rejected the request",
            ElasticError::MalformedResponse(_) => "search backend returned an unreadable response",
            ElasticError::Encoding(inner) => return inner,
        };
        Self::Backend(message.to_string())
    }
}
