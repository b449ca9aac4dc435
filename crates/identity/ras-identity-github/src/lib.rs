//! GitHub OAuth2 authorization-code login for `ras-identity-core` hosts.
//!
//! [`GithubProvider`] sends the browser to GitHub with a signed, expiring
//! state token, redeems the returned code, fetches the account profile and
//! links it to the host's identity store through [`IdentityLinker`].

mod client;
mod config;
mod error;
mod linker;
mod provider;
mod state;
mod types;


pub use client::GithubClient;
pub use config::{
    AUTHORIZE_URL, DEFAULT_STATE_TTL_SECONDS, DEFAULT_USER_AGENT, GithubConfig, OAuthClientConfig,
    TOKEN_URL, USER_URL,
};
pub use error::GithubError;
pub use linker::IdentityLinker;
pub use provider::{AuthorizeHandler, GithubProvider, PROVIDER_NAME};
pub use state::{STATE_SUBJECT, StateClaims, StateToken};
pub use types::{GithubUser, TokenResponse};

pub use ras_identity_core::{
    AuthContext, AuthInfo, AuthRequest, IdentityError, IdentityProvider, IdentityResult,
    IdentityStore, Principal,
};
