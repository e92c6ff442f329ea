use thiserror::Error;
use warp::reject;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents a request body that failed schema validation. The
    /// message names the first violated constraint.
    #[error("{message}")]
    Validation { message: String },

    /// Represents an id with no matching record in the collection.
    #[error("no record with id {id}")]
    NotFound { id: String },

    /// Represents a failure to read or write a backing document.
    #[error("storage error")]
    Storage { source: std::io::Error },

    /// Represents a collection document that could not be serialized.
    #[error("malformed collection document")]
    MalformedDocument { source: serde_json::Error },
}

impl BackendError {
    pub fn validation(message: impl Into<String>) -> Self {
        BackendError::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(id: impl ToString) -> Self {
        BackendError::NotFound {
            id: id.to_string(),
        }
    }
}

impl reject::Reject for BackendError {}
