//! Error types for the log collector core.

use thiserror::Error;

/// Errors that can occur while ingesting or querying messages.
#[derive(Debug, Error)]
pub enum LogError {
    /// A required message field was empty or zero.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A query parameter could not be interpreted.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter as the client sent it.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The requested sort key is not a sortable field.
    #[error("invalid parameter sortBy: unknown sort key '{0}'")]
    UnknownSortKey(String),

    /// The backing store failed. The message is safe to show to clients.
    #[error("backend error: {0}")]
    Backend(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LogError {
    /// Builds an [`LogError::InvalidParameter`].
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Returns true if the error was caused by the caller rather than the service.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_) | Self::InvalidParameter { .. } | Self::UnknownSortKey(_)
        )
    }
}

/// Result type alias for collector operations.
pub type Result<T> = std::result::Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = LogError::MissingField("service");
        assert_eq!(err.to_string(), "missing required field: service");

        let err = LogError::invalid_parameter("perPage", "not a number");
        assert_eq!(err.to_string(), "invalid parameter perPage: not a number");

        let err = LogError::UnknownSortKey("address".to_string());
        assert_eq!(err.to_string(), "invalid parameter sortBy: unknown sort key 'address'");

        let err = LogError::Backend("search backend unavailable".to_string());
        assert_eq!(err.to_string(), "backend error: search backend unavailable");
    }

    #[test]
    fn client_errors_are_classified() {
        assert!(LogError::MissingField("message").is_client_error());
        assert!(LogError::invalid_parameter("page", "negative").is_client_error());
        assert!(LogError::UnknownSortKey("x".into()).is_client_error());
        assert!(!LogError::Backend("down".into()).is_client_error());
    }

    #[test]
    fn serde_errors_are_not_client_errors() {
        let serde_err = serde_json::from_str::<i32>("nope");
        assert!(serde_err.is_err());
        if let Err(e) = serde_err {
            let err = LogError::from(e);
            assert!(matches!(err, LogError::Serialization(_)));
            assert!(!err.is_client_error());
        }
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LogError>();
    }
}
