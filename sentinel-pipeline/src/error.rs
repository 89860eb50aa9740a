//! Error types for sentinel-pipeline
//!
//! None of the per-record errors here is fatal to the process. Validation
//! failures are contained by the domain services, dispatch and task failures by
//! the orchestrator. Only startup failures (e.g. a worker pool that cannot
//! spawn its threads) propagate to `main`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// A raw record failed normalization
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid field '{field}': {reason}")]
pub struct ValidationError {
    /// Offending input field
    pub field: String,
    /// Why the field was rejected
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Required field absent from the raw record
    pub fn missing(field: impl Into<String>) -> Self {
        let field = field.into();
        let reason = format!("missing {}", field);
        Self { field, reason }
    }
}

/// The orchestrator could not route a record
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// `type` discriminant is not one of the known domains
    #[error("unknown record type: {0}")]
    UnknownType(String),
}

/// Worker pool failures
#[derive(Debug, Error)]
pub enum PoolError {
    /// Pool no longer accepts work
    #[error("worker pool is shut down")]
    ShutDown,

    /// Pool was configured with zero workers
    #[error("worker pool size must be at least 1")]
    InvalidSize,

    /// Worker thread could not be created
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Worker dropped the job without reporting a result
    #[error("worker dropped the job before completing it")]
    WorkerLost,

    /// Job panicked inside the pool
    #[error("job panicked: {0}")]
    Panicked(String),
}

/// Persistence sink failures
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("persistence I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("persistence backend unavailable: {0}")]
    Unavailable(String),
}

/// Failure inside one dispatched analysis or I/O task
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Render a panic payload as text
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// API error type for the HTTP presentation surface
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("toxin_level", "invalid toxin_level format");
        assert_eq!(
            err.to_string(),
            "invalid field 'toxin_level': invalid toxin_level format"
        );
        assert_eq!(ValidationError::missing("subject_id").reason, "missing subject_id");
    }

    #[test]
    fn test_panic_message_extracts_text() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(payload.as_ref()), "owned boom");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
