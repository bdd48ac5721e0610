use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("failed to create store: {0}")]
    StoreCreate(String),

    #[error("failed to upload file: {0}")]
    Upload(String),

    #[error("operation {operation} timed out after {timeout:?}")]
    OperationTimeout { operation: String, timeout: Duration },

    #[error("remote operation failed: {0}")]
    OperationFailed(String),

    #[error("failed to query model: {0}")]
    Query(String),

    #[error("failed to cleanup store: {0}")]
    Cleanup(String),

    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("response parsing failed: {0}")]
    ResponseParse(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GeminiError {
    /// True when the credential itself was refused, either locally or by
    /// the service.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Re-wrap a remote failure under an operation-specific variant.
    /// A rejected credential stays [`GeminiError::Auth`].
    pub(crate) fn wrap(self, kind: fn(String) -> GeminiError) -> GeminiError {
        match self {
            Self::Auth(_) => self,
            other => kind(other.to_string()),
        }
    }

    /// True for the two ways an upload can fail after it was accepted:
    /// the poller gave up, or the remote operation reported an error.
    pub fn is_operation_failure(&self) -> bool {
        matches!(
            self,
            Self::OperationTimeout { .. } | Self::OperationFailed(_)
        )
    }
}
