//! Errors raised while talking to GitHub.

use ras_identity_core::IdentityError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Authorization denied by issuer: {0}")]
    CallbackError(String),

    #[error("Missing authorization code")]
    MissingAuthorizationCode,

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Issuer rejected the authorization code: {error}: {description}")]
    OAuthError { error: String, description: String },

    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("User info request failed: {0}")]
    UserInfoFailed(String),

    #[error("Invalid user info response: {0}")]
    InvalidUserInfoResponse(String),
}

impl From<GithubError> for IdentityError {
    fn from(err: GithubError) -> Self {
        IdentityError::IssuerError(Box::new(err))
    }
}
