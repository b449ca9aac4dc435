//! Error types surfaced to the host framework.

use jsonwebtoken::Algorithm;
use thiserror::Error;

pub type IdentityResult<T> = Result<T, IdentityError>;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced while starting or completing a provider login flow.
///
/// Construction-time problems are reported as [`IdentityError::ConfigError`]
/// and failures to mint state at login as [`IdentityError::SigningError`].
/// Everything else is produced on the callback path and handed to the host's
/// [`LoginHandler`](crate::LoginHandler) for rendering.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// `found` is the raw header value, which may name an algorithm the
    /// JWT library does not model (e.g. `none`).
    #[error("Unexpected signing method: expected {expected:?}, found {found}")]
    UnexpectedSigningMethod { expected: Algorithm, found: String },

    #[error("Failed to sign state token: {0}")]
    SigningError(#[source] jsonwebtoken::errors::Error),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Malformed state token: {0}")]
    MalformedState(#[source] jsonwebtoken::errors::Error),

    #[error("Issuer error: {0}")]
    IssuerError(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Invalid account")]
    InvalidAccount,

    #[error("Persistence error: {0}")]
    PersistenceError(#[from] StoreError),
}

/// Errors reported by an [`IdentityStore`](crate::IdentityStore) backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Conflicting record: {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}
