//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur while resolving or establishing an identity.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Google sign-in is not configured on this server.
    #[error("google sign-in is not configured")]
    ProviderDisabled,

    /// HTTP request to the identity provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Identity provider returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Token response lacked a field the session needs.
    #[error("google credentials missing: {0}")]
    MissingCredentials(&'static str),

    /// Id token was rejected (bad audience, issuer or expiry).
    #[error("id token verification failed: {0}")]
    InvalidIdToken(String),

    /// Provider account has no usable email.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] cookbook_core::EmailError),

    /// Email is not registered for any user.
    #[error("user is not registered")]
    NotRegistered,

    /// No user is linked to the verified Google subject.
    #[error("user not found")]
    UserNotFound,

    /// Session cookie could not be decoded.
    #[error("invalid session: {0}")]
    InvalidSession(#[from] crate::session::SessionError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl AuthError {
    /// Whether the failure is ours rather than the caller's.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Repository(_))
    }
}
