//! Unified error types for the storefront.
//!
//! Business failures are split into three recoverable kinds (validation, not found,
//! invalid coupon) so the request layer can classify them without string matching.

use serde::Serialize;
use thiserror::Error;

/// All errors produced by the storefront.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller supplied invalid input (non-positive quantity, blank code, ...)
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// A cart, catalog entry, line or coupon could not be resolved
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up
        entity: &'static str,
        /// Identifier that failed to resolve
        id: String,
    },

    /// Coupon is inactive, expired or exhausted
    #[error("Coupon '{code}' is not valid: {reason}")]
    CouponInvalid {
        /// Coupon code presented by the caller
        code: String,
        /// Why the coupon was rejected
        reason: String,
    },

    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Details of the configuration failure
        message: String,
    },

    /// Database failure from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or unreadable environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

/// Coarse classification of an [`Error`] handed across the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid caller input
    Validation,
    /// Referenced record does not exist
    NotFound,
    /// Coupon failed its eligibility checks
    CouponInvalid,
    /// Infrastructure failure (database, configuration, I/O)
    Internal,
}

impl Error {
    /// Builds a [`Error::Validation`] from any message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Builds a [`Error::NotFound`] for the given record kind and id.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::CouponInvalid { .. } => ErrorKind::CouponInvalid,
            Self::Config { .. } | Self::Database(_) | Self::Io(_) | Self::EnvVar(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::validation("bad").kind(), ErrorKind::Validation);
        assert_eq!(Error::not_found("Cart", 3).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::CouponInvalid {
                code: "X".to_string(),
                reason: "expired".to_string(),
            }
            .kind(),
            ErrorKind::CouponInvalid
        );
        assert_eq!(
            Error::Config {
                message: "missing".to_string()
            }
            .kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = Error::not_found("Catalog entry", 42);
        assert_eq!(err.to_string(), "Catalog entry not found: 42");
    }
}
