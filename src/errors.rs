//! Unified error type for the PetForce service.
//!
//! Every core operation returns [`Result`]. The variants fall into two groups:
//! client-facing categories (unauthorized, forbidden, not-found, conflict, bad-request)
//! that are surfaced to the caller as-is, and internal failures (database, storage,
//! configuration, I/O) that are logged and reported generically.

use thiserror::Error;

/// All errors produced by the service.
#[derive(Debug, Error)]
pub enum Error {
    /// No identity, or the bearer token did not verify.
    #[error("Authentication required")]
    Unauthorized,

    /// Authenticated, but the caller lacks the required household role.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// What the caller tried to do
        message: String,
    },

    /// The referenced entity does not exist or lies outside the caller's household.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity, e.g. `"Pet"`
        entity: &'static str,
        /// Identifier the caller supplied
        id: String,
    },

    /// Duplicate membership, duplicate pending request, already-processed invitation.
    #[error("Conflict: {message}")]
    Conflict {
        /// Human readable reason
        message: String,
    },

    /// Malformed or semantically invalid input.
    #[error("Bad request: {message}")]
    BadRequest {
        /// Human readable reason
        message: String,
    },

    /// A monetary amount that is zero, negative or not finite.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Configuration could not be loaded or is incomplete.
    #[error("Configuration error: {message}")]
    Config {
        /// Human readable reason
        message: String,
    },

    /// Object storage rejected a request.
    #[error("Storage error: {message}")]
    Storage {
        /// Response text or transport failure
        message: String,
    },

    /// Database error from `SeaORM`.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// HTTP transport error talking to an external collaborator.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`Error::BadRequest`].
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Whether this error is caused by the caller rather than by the service.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized
                | Self::Forbidden { .. }
                | Self::NotFound { .. }
                | Self::Conflict { .. }
                | Self::BadRequest { .. }
                | Self::InvalidAmount { .. }
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
