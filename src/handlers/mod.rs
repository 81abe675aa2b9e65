//! Request handlers - the boundary between a transport layer and the core.
//!
//! Each handler takes a deserialized request, runs the matching core operation and
//! folds the outcome into an [`OperationResult`]. Business failures are reported with
//! their message and [`ErrorKind`]; infrastructure failures are logged and replaced
//! by a generic message.

/// Add, remove, total and checkout handlers
pub mod cart;
/// Coupon attachment handlers
pub mod coupon;

use crate::core::pricing;
use crate::errors::{Error, ErrorKind, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::error;

const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred, please try again later";

/// Outcome of a handler: either `data` or an error message with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult<T> {
    /// Whether the operation succeeded
    pub success: bool,
    /// Payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// User-facing message on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Error classification on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl<T> OperationResult<T> {
    /// A successful result carrying `data`.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error_message: None,
            error_kind: None,
        }
    }

    /// A failed result describing `err`.
    #[must_use]
    pub fn from_error(err: &Error) -> Self {
        let kind = err.kind();
        let message = if kind == ErrorKind::Internal {
            error!("Request failed: {}", err);
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            err.to_string()
        };

        Self {
            success: false,
            data: None,
            error_message: Some(message),
            error_kind: Some(kind),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::from_error(&err),
        }
    }
}

/// Resolves the pricing date, defaulting to today.
fn resolve_date(as_of: Option<NaiveDate>) -> NaiveDate {
    as_of.unwrap_or_else(pricing::today)
}
