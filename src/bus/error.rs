//! Error types for command and event dispatch.

use std::error::Error;

use thiserror::Error;

use crate::error::RepositoryError;

use super::context::ContextError;

/// Failure reported by a command handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Payload decode / deserialization failed.
    #[error("decode failed: {0}")]
    DecodeFailed(String),
    /// Business logic rejected the command (validation, invariant violation).
    #[error("rejected: {0}")]
    Rejected(String),
    /// Aggregate or resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Missing or invalid identity on the context.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Repository error.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    /// The handler saw its context done and gave up before acting.
    #[error("aborted: {0}")]
    Aborted(#[from] ContextError),
    /// The handler panicked; carries the panic message.
    #[error("handler panicked: {0}")]
    Panicked(String),
    /// Other error.
    #[error("handler error: {0}")]
    Other(#[from] Box<dyn Error + Send + Sync>),
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::DecodeFailed(err.to_string())
    }
}

impl HandlerError {
    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            HandlerError::DecodeFailed(_) => 400,
            HandlerError::Rejected(_) => 422,
            HandlerError::NotFound(_) => 404,
            HandlerError::Unauthorized(_) => 401,
            HandlerError::Repository(RepositoryError::NotFound(_)) => 404,
            HandlerError::Repository(RepositoryError::AlreadyExists(_)) => 409,
            HandlerError::Repository(_) => 500,
            HandlerError::Aborted(_) => 408,
            HandlerError::Panicked(_) => 500,
            HandlerError::Other(_) => 500,
        }
    }
}

/// Error returned from registering handlers or publishing commands.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No command handler is registered under this name.
    #[error("no handler registered for command: {name}")]
    NoHandler { name: String },
    /// A command handler is already registered under this name.
    #[error("handler already registered for command: {name}")]
    AlreadyRegistered { name: String },
    /// The caller's deadline passed before the handler reported.
    #[error("command timed out")]
    Timeout,
    /// The caller's context was cancelled before the handler reported.
    #[error("command cancelled")]
    Cancelled,
    /// The handler reported a failure (or panicked).
    #[error(transparent)]
    Handler(#[from] HandlerError),
    /// The handler task went away without reporting a result.
    #[error("command result channel closed")]
    ChannelClosed,
}

impl DispatchError {
    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::NoHandler { .. } => 404,
            DispatchError::AlreadyRegistered { .. } => 500,
            DispatchError::Timeout => 408,
            DispatchError::Cancelled => 499,
            DispatchError::Handler(e) => e.status_code(),
            DispatchError::ChannelClosed => 500,
        }
    }

    /// Whether the caller stopped waiting (deadline or cancellation).
    pub fn is_timeout(&self) -> bool {
        matches!(self, DispatchError::Timeout | DispatchError::Cancelled)
    }
}
