//! Service error model.
//!
//! Every controller operation returns [`ServiceResult`]. Callers branch on
//! [`ErrorKind`], never on message text: the message is only meant for the
//! HTTP boundary (and for tests).

use core::fmt::Display;

use thiserror::Error;

use crate::store::StoreError;

/// Result type used across the service layer.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Message returned for every internal failure that reaches a caller.
pub const INTERNAL_MESSAGE: &str = "an internal error occurred";

/// Classification of an operation outcome.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The operation succeeded.
    None,
    /// The caller's input or state is invalid; the message is safe to show.
    Client,
    /// An unexpected failure; details were logged, the caller sees a generic message.
    Internal,
}

impl ErrorKind {
    /// Kind of a result: `None` for `Ok`, the error's kind otherwise.
    pub fn of<T>(result: &ServiceResult<T>) -> Self {
        match result {
            Ok(_) => ErrorKind::None,
            Err(e) => e.kind(),
        }
    }
}

/// A failed service operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ServiceError {
    kind: ErrorKind,
    message: String,
}

impl ServiceError {
    /// Invalid input or disallowed state. The message is shown to the caller verbatim.
    pub fn client(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Client,
            message: message.into(),
        }
    }

    /// Unexpected failure. `detail` is logged here, at the point of origin, and
    /// never leaves the service layer.
    pub fn internal(context: impl Into<String>, detail: impl Display) -> Self {
        let context = context.into();
        tracing::error!(error = %detail, "{context}");
        Self {
            kind: ErrorKind::Internal,
            message: context,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Context message. For `Internal` errors this is server-side context and
    /// must be replaced with [`INTERNAL_MESSAGE`] before it reaches a caller.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_client(&self) -> bool {
        self.kind == ErrorKind::Client
    }

    /// Message suitable for the caller.
    pub fn public_message(&self) -> &str {
        match self.kind {
            ErrorKind::Internal => INTERNAL_MESSAGE,
            _ => &self.message,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::internal("storage error", err)
    }
}
