use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    /// The response body pinned for each failure class. The shapes
    /// are deliberately inconsistent (bare `{error}` for validation,
    /// an empty object for a missing record) because clients depend
    /// on them.
    pub fn body(&self) -> ErrorBody {
        match &self.error {
            BackendError::Validation { message } => ErrorBody::Validation {
                error: message.clone(),
            },
            BackendError::NotFound { .. } => ErrorBody::NotFound {},
            _ => ErrorBody::failure("Something went wrong!"),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Validation { error: String },
    NotFound {},
    Failure { success: bool, message: &'static str },
}

impl ErrorBody {
    pub fn failure(message: &'static str) -> Self {
        ErrorBody::Failure {
            success: false,
            message,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Context {
    List { resource: &'static str },
    Retrieve { resource: &'static str, id: String },
    Create { resource: &'static str },
    Replace { resource: &'static str, id: String },
    Patch { resource: &'static str, id: String },
    Delete { resource: &'static str, id: String },
}

impl Context {
    pub fn list(resource: &'static str) -> Context {
        Context::List { resource }
    }

    pub fn retrieve(resource: &'static str, id: String) -> Context {
        Context::Retrieve { resource, id }
    }

    pub fn create(resource: &'static str) -> Context {
        Context::Create { resource }
    }

    pub fn replace(resource: &'static str, id: String) -> Context {
        Context::Replace { resource, id }
    }

    pub fn patch(resource: &'static str, id: String) -> Context {
        Context::Patch { resource, id }
    }

    pub fn delete(resource: &'static str, id: String) -> Context {
        Context::Delete { resource, id }
    }
}
