//! Error types for the evaluation pipeline.

use thiserror::Error;

/// Errors that can occur when talking to a recognition service.
///
/// Every variant belongs to the same caller-facing category: the sheet could
/// not be recognized and nothing was scored.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response body was not the JSON document we asked for.
    #[error("malformed recognition response: {0}")]
    MalformedResponse(String),

    /// The response parsed as JSON but broke the answer schema.
    #[error("recognition response violates answer schema: {0}")]
    SchemaViolation(String),

    /// The caller abandoned the request before it completed.
    #[error("recognition cancelled")]
    Cancelled,
}

impl RecognitionError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            RecognitionError::AuthenticationFailed(_)
                | RecognitionError::ModelNotFound(_)
                | RecognitionError::Cancelled
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            RecognitionError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// Failures of the key-value persistence layer.
///
/// Only writes surface these; unreadable or malformed blobs are read as
/// empty collections.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed for '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize '{name}': {source}")]
    Serialization {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors surfaced by the registry and the evaluation pipeline.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Caller input violates a precondition.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Creation collides with a built-in identity.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The selected answer key does not exist.
    #[error("answer key not found: {0}")]
    AnswerKeyNotFound(String),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl EvalError {
    /// Short stable label for the failure category.
    pub fn category(&self) -> &'static str {
        match self {
            EvalError::Validation(_) => "validation",
            EvalError::Conflict(_) => "conflict",
            EvalError::AnswerKeyNotFound(_) => "missing-key",
            EvalError::Recognition(_) => "recognition",
            EvalError::Persistence(_) => "persistence",
        }
    }
}

/// Result alias for registry and pipeline operations.
pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_recognition_errors() {
        assert!(RecognitionError::AuthenticationFailed("bad key".into()).is_permanent());
        assert!(RecognitionError::ModelNotFound("x".into()).is_permanent());
        assert!(!RecognitionError::Timeout(30).is_permanent());
        assert!(!RecognitionError::SchemaViolation("q3".into()).is_permanent());
    }

    #[test]
    fn retry_hint_only_on_rate_limit() {
        let err = RecognitionError::RateLimited {
            retry_after_ms: 2500,
        };
        assert_eq!(err.retry_after_ms(), Some(2500));
        assert_eq!(RecognitionError::Timeout(5).retry_after_ms(), None);
    }

    #[test]
    fn categories_are_distinct() {
        let errors = [
            EvalError::Validation("no image selected".into()),
            EvalError::Conflict("Set A".into()),
            EvalError::AnswerKeyNotFound("Set Z".into()),
            EvalError::Recognition(RecognitionError::Cancelled),
            EvalError::Persistence(StoreError::Io {
                name: "results".into(),
                source: std::io::Error::other("disk full"),
            }),
        ];
        let labels: std::collections::HashSet<_> = errors.iter().map(|e| e.category()).collect();
        assert_eq!(labels.len(), errors.len());
    }

    #[test]
    fn recognition_error_displays_through_eval_error() {
        let err: EvalError = RecognitionError::Timeout(120).into();
        assert_eq!(err.to_string(), "request timed out after 120s");
    }
}
